//! # autotrade — Threshold Trader
//!
//! ```text
//!  directives.csv ──▶ load_directives ──▶ Supervisor::run_all
//!                                             │
//!            ┌────────────────┬───────────────┼────────────────┐
//!            ▼                ▼               ▼                ▼
//!        Worker(AAA)      Worker(BBB)     Worker(CCC)   …  one per row
//!            │                │               │
//!            └────────────────┴───────┬───────┘
//!                                     ▼
//!                       Arc<dyn Broker>  (Alpaca REST | paper book)
//!
//!  SIGINT / SIGTERM / SIGHUP / SIGQUIT ──▶ CancellationToken ──▶ every Worker
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod broker;
mod cli;
mod config;
mod engine;
mod error;
mod models;
mod shutdown;

use broker::alpaca::{AlpacaBroker, AlpacaConfig};
use broker::paper::PaperBroker;
use broker::SharedBroker;
use cli::{Algorithm, Cli};
use config::{env_or, MOCK_BASE_URL};
use engine::supervisor::Supervisor;
use engine::worker::WorkerTiming;
use models::load_directives;
use shutdown::ShutdownController;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("autotrade=debug".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    // ── 3. Arguments & directives ─────────────────────────────────────────────
    let cli = Cli::parse();
    let directives = load_directives(&cli.file)
        .with_context(|| format!("failed to load directives from {}", cli.file.display()))?;

    if cli.test {
        println!("file:      {}", cli.file.display());
        println!("algorithm: {:?}", cli.algorithm);
        println!("directives ({}):", directives.len());
        for d in &directives {
            println!("  {d}");
        }
        return Ok(());
    }

    info!(r#"

  ╔═══════════════════════════════════════════════════════╗
  ║           AUTOTRADE — Threshold Trader                ║
  ║  Directives · Workers · Take-profit · Stop-loss       ║
  ╚═══════════════════════════════════════════════════════╝"#);

    match cli.algorithm {
        Algorithm::Simple => info!(directives = directives.len(), "📈 Algorithm: simple"),
    }

    // ── 4. Broker ─────────────────────────────────────────────────────────────
    let mut paper: Option<Arc<PaperBroker>> = None;
    let broker: SharedBroker = if env_or("BASE_URL", "") == MOCK_BASE_URL {
        let book = Arc::new(PaperBroker::from_env()?);
        paper = Some(book.clone());
        book
    } else {
        let config = AlpacaConfig::from_env()?;
        let alpaca = AlpacaBroker::new(&config).context("failed to build Alpaca client")?;
        match alpaca.account().await {
            Ok(account) => info!(
                base_url        = %config.base_url,
                cash            = account.cash,
                equity          = account.equity,
                buying_power    = account.buying_power,
                portfolio_value = account.portfolio_value,
                "🏦 Alpaca account"
            ),
            Err(e) => warn!(error = %e, "Could not fetch account summary — continuing"),
        }
        Arc::new(alpaca)
    };

    // ── 5. Worker pool ────────────────────────────────────────────────────────
    let timing = WorkerTiming::from_env()?;
    info!(
        market_closed_wait = ?timing.market_closed_wait,
        cycle_interval     = ?timing.cycle_interval,
        "⏱️ Worker timing"
    );

    let shutdown = ShutdownController::with_os_signals();
    let supervisor = Supervisor::new(broker, timing, shutdown.clone());
    let report = supervisor.run_all(directives).await;

    info!(
        launched  = report.launched,
        stopped   = report.stopped,
        panicked  = report.panicked,
        signalled = shutdown.is_cancelled(),
        "👋 Shutdown complete"
    );

    // ── 6. Paper summary ──────────────────────────────────────────────────────
    if let Some(book) = paper {
        let orders = book.orders().await;
        info!(orders = orders.len(), "🎭 Paper session summary");
        for order in &orders {
            info!(order = %serde_json::to_string(order)?, "🎭 Paper fill");
        }
    }

    Ok(())
}
