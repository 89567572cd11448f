//! # engine::supervisor
//!
//! Launches one [`Worker`] per directive on the multi-threaded runtime and
//! waits for every one of them to exit.
//!
//! All workers share a single broker handle and a single cancellation token
//! owned by the [`ShutdownController`].  [`Supervisor::run_all`] returns only
//! after the number of joined tasks equals the number launched, whether a task
//! stopped cleanly or panicked.  Panicked workers are counted, never restarted.

use std::collections::HashSet;

use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use crate::broker::SharedBroker;
use crate::engine::worker::{Worker, WorkerTiming};
use crate::models::Directive;
use crate::shutdown::ShutdownController;

/// How the pool ended.  `stopped + panicked == launched` once `run_all` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub launched: usize,
    pub stopped:  usize,
    pub panicked: usize,
}

pub struct Supervisor {
    broker:   SharedBroker,
    timing:   WorkerTiming,
    shutdown: ShutdownController,
}

impl Supervisor {
    pub fn new(broker: SharedBroker, timing: WorkerTiming, shutdown: ShutdownController) -> Self {
        Self { broker, timing, shutdown }
    }

    /// Spawn every worker, then block until all of them have exited.
    pub async fn run_all(&self, directives: Vec<Directive>) -> PoolReport {
        let mut report = PoolReport::default();

        if directives.is_empty() {
            warn!("No directives loaded — nothing to trade");
            return report;
        }

        let mut seen = HashSet::new();
        for d in &directives {
            if !seen.insert(d.ticker.as_str()) {
                warn!(
                    ticker = %d.ticker,
                    "⚠️ Duplicate ticker — its workers will trade the same position independently"
                );
            }
        }

        let mut workers = JoinSet::new();
        for directive in directives {
            let span = info_span!("worker", ticker = %directive.ticker);
            let worker = Worker::new(
                directive,
                self.broker.clone(),
                self.shutdown.token(),
                self.timing,
            );
            workers.spawn(worker.run().instrument(span));
            report.launched += 1;
        }
        info!(workers = report.launched, "🚀 Worker pool running — waiting for stop signal");

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(()) => report.stopped += 1,
                Err(e) if e.is_panic() => {
                    error!(error = %e, "💥 Worker panicked — not restarting");
                    report.panicked += 1;
                }
                Err(e) => {
                    // Only reachable if the set were aborted; count it as stopped.
                    warn!(error = %e, "Worker task cancelled");
                    report.stopped += 1;
                }
            }
        }

        info!(
            launched = report.launched,
            stopped  = report.stopped,
            panicked = report.panicked,
            "🏁 All workers exited"
        );
        report
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
