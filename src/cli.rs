//! # cli — Command-line arguments

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "autotrade", about = "Threshold trader — one worker per instrument")]
pub struct Cli {
    /// CSV of directives: ticker,quantity,min_gain,max_loss
    #[arg(short, long)]
    pub file: PathBuf,

    /// Trading algorithm to run.
    #[arg(short, long, value_enum, default_value = "simple")]
    pub algorithm: Algorithm,

    /// Print the arguments and parsed directives, then exit without trading.
    #[arg(short, long, default_value_t = false)]
    pub test: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    /// Buy when flat; sell on take-profit or stop-loss.
    Simple,
}
