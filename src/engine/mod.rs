//! # engine
//!
//! * [`decision`]   — the pure threshold rule.
//! * [`worker`]     — one polling loop per directive.
//! * [`supervisor`] — launches the pool and joins it on shutdown.

pub mod decision;
pub mod supervisor;
pub mod worker;

#[cfg(test)]
mod testing;
