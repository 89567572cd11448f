//! # engine::worker
//!
//! One [`Worker`] per directive.  It polls the shared broker forever and only
//! stops when the pool's cancellation token fires.
//!
//! ## Cycle
//! ```text
//!   ┌─▶ cancelled? ── yes ──▶ Stopped
//!   │       │ no
//!   │   market open? ── closed ──▶ wait market_closed_wait ─┐
//!   │       │ open                                          │
//!   │   held == 0 ? ── yes ──▶ buy quantity                 │
//!   │       │                     │                         │
//!   │   current price, entry price ◀┘                       │
//!   │       │                                               │
//!   │   gain_loss ≥ min_gain / ≤ max_loss ? ── sell         │
//!   │       │                                               │
//!   └── wait cycle_interval ◀───────────────────────────────┘
//! ```
//!
//! Broker errors abandon the current cycle and are logged; the worker keeps
//! its fixed cadence (no backoff).  Both waits race the cancellation token,
//! and the token is also checked between broker steps, so a stop request is
//! honoured within one broker round trip.  An in-flight call is never
//! aborted, and no order is submitted once a stop has been requested.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::broker::SharedBroker;
use crate::config::env_secs;
use crate::engine::decision::{decide, Decision};
use crate::error::{BrokerError, ConfigError};
use crate::models::Directive;

// ─── Timing ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerTiming {
    /// How long to wait before re-checking a closed market.
    pub market_closed_wait: Duration,
    /// Pause after every other cycle, including abandoned ones.
    pub cycle_interval:     Duration,
}

impl Default for WorkerTiming {
    fn default() -> Self {
        Self {
            market_closed_wait: Duration::from_secs(60),
            cycle_interval:     Duration::from_secs(10),
        }
    }
}

impl WorkerTiming {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::read_env("MARKET_CLOSED_WAIT_SECS", "CYCLE_INTERVAL_SECS")
    }

    fn read_env(closed_key: &'static str, interval_key: &'static str) -> Result<Self, ConfigError> {
        let default = Self::default();
        Ok(Self {
            market_closed_wait: env_secs(closed_key, default.market_closed_wait.as_secs())?,
            cycle_interval:     env_secs(interval_key, default.cycle_interval.as_secs())?,
        })
    }
}

// ─── Cycle Outcome ────────────────────────────────────────────────────────────

/// The broker call a cycle was on when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    MarketStatus,
    Position,
    Buy,
    CurrentPrice,
    EntryPrice,
    Sell,
}

impl CycleStep {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleStep::MarketStatus => "market_status",
            CycleStep::Position     => "position",
            CycleStep::Buy          => "buy",
            CycleStep::CurrentPrice => "current_price",
            CycleStep::EntryPrice   => "entry_price",
            CycleStep::Sell         => "sell",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Market closed; nothing but the clock was queried.
    MarketClosed,
    /// A broker call failed at `step`; the rest of the cycle was skipped.
    Aborted(CycleStep),
    /// Stop was requested part-way through the cycle.
    Interrupted,
    /// Prices were read and the threshold rule applied.
    Evaluated {
        bought:    bool,
        gain_loss: f64,
        decision:  Decision,
    },
}

// ─── Worker ───────────────────────────────────────────────────────────────────

pub struct Worker {
    directive: Directive,
    broker:    SharedBroker,
    cancel:    CancellationToken,
    timing:    WorkerTiming,
}

impl Worker {
    pub fn new(
        directive: Directive,
        broker: SharedBroker,
        cancel: CancellationToken,
        timing: WorkerTiming,
    ) -> Self {
        Self { directive, broker, cancel, timing }
    }

    /// Poll until cancelled.  Never fails: every broker error is absorbed.
    pub async fn run(self) {
        info!(directive = %self.directive, "▶️ Worker started");
        let mut cycles: u64 = 0;

        while !self.cancel.is_cancelled() {
            let outcome = self.run_cycle().await;
            cycles += 1;

            let wait = match outcome {
                CycleOutcome::MarketClosed => self.timing.market_closed_wait,
                _ => self.timing.cycle_interval,
            };
            debug!(cycle = cycles, ?outcome, ?wait, "Cycle finished");

            if !self.pause(wait).await {
                break;
            }
        }

        info!(cycles, "⏹️ Worker stopped");
    }

    /// `false` when cancellation cut the wait short.
    async fn pause(&self, wait: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        }
    }

    /// One pass of the decision loop.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let ticker = self.directive.ticker.as_str();
        let quantity = self.directive.quantity;

        // ── 1. Market status ─────────────────────────────────────────────────
        match self.broker.is_market_open().await {
            Ok(true) => {}
            Ok(false) => {
                debug!(wait = ?self.timing.market_closed_wait, "Market closed");
                return CycleOutcome::MarketClosed;
            }
            Err(e) => return abandon(CycleStep::MarketStatus, &e),
        }
        if self.cancel.is_cancelled() {
            return CycleOutcome::Interrupted;
        }

        // ── 2. Position; open one if flat ────────────────────────────────────
        let held = match self.broker.held_quantity(ticker).await {
            Ok(q) => q,
            Err(e) => return abandon(CycleStep::Position, &e),
        };
        if self.cancel.is_cancelled() {
            return CycleOutcome::Interrupted;
        }

        let bought = held == 0.0;
        if bought {
            info!(quantity, "No units held — buying");
            if let Err(e) = self.broker.place_buy(ticker, quantity).await {
                return abandon(CycleStep::Buy, &e);
            }
        }

        // ── 3. Prices ────────────────────────────────────────────────────────
        let current = match self.broker.current_price(ticker).await {
            Ok(p) => p,
            Err(e) => return abandon(CycleStep::CurrentPrice, &e),
        };
        let entry = match self.broker.entry_price(ticker).await {
            Ok(p) => p,
            Err(e) => return abandon(CycleStep::EntryPrice, &e),
        };
        if self.cancel.is_cancelled() {
            return CycleOutcome::Interrupted;
        }

        // ── 4. Decide ────────────────────────────────────────────────────────
        let gain_loss = current - entry;
        let decision = decide(gain_loss, &self.directive);
        info!(
            current,
            entry,
            gain_loss = %format!("{gain_loss:.2}"),
            decision  = decision.as_str(),
            "Gain/loss evaluated"
        );

        if decision.is_sell() {
            info!(quantity, reason = decision.as_str(), "Threshold crossed — selling");
            if let Err(e) = self.broker.place_sell(ticker, quantity).await {
                return abandon(CycleStep::Sell, &e);
            }
        }

        CycleOutcome::Evaluated { bought, gain_loss, decision }
    }
}

fn abandon(step: CycleStep, error: &BrokerError) -> CycleOutcome {
    error!(step = step.as_str(), error = %error, "❌ Broker call failed — retrying next cycle");
    CycleOutcome::Aborted(step)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
