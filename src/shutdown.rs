//! # shutdown — Cooperative stop for the worker pool
//!
//! A single `tokio_util::sync::CancellationToken` is the stop flag for every
//! worker.  Unlike a channel receive, checking or awaiting the token never
//! consumes it, so one `cancel()` reaches all workers at once.
//!
//! [`ShutdownController::with_os_signals`] cancels the token on the first
//! SIGINT, SIGTERM, SIGHUP or SIGQUIT (Ctrl+C elsewhere).  Later signals are
//! logged and otherwise ignored: the pool is already draining.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self { token: CancellationToken::new() }
    }

    /// Create a controller and spawn the background task that turns process
    /// signals into cancellation.  Must be called inside a Tokio runtime.
    pub fn with_os_signals() -> Self {
        let controller = Self::new();
        tokio::spawn(listen_for_signals(controller.token.clone()));
        controller
    }

    /// A handle on the shared token.  Clones observe the same cancellation.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
impl ShutdownController {
    /// Request shutdown without a signal.  Idempotent.
    pub fn shutdown(&self, reason: &str) {
        request_stop(&self.token, reason);
    }
}

/// Cancel `token` unless it already is.  Returns `true` only for the call
/// that actually triggered the stop.
fn request_stop(token: &CancellationToken, reason: &str) -> bool {
    if token.is_cancelled() {
        warn!(reason, "Shutdown already in progress — waiting for workers");
        return false;
    }
    info!(reason, "🛑 Stop requested — signalling all workers");
    token.cancel();
    true
}

#[cfg(unix)]
async fn listen_for_signals(token: CancellationToken) {
    let (mut int, mut term, mut hup, mut quit) = match unix_signals() {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Cannot install signal handlers — falling back to Ctrl+C only");
            return listen_for_ctrl_c(token).await;
        }
    };

    loop {
        let name = tokio::select! {
            _ = int.recv()  => "SIGINT",
            _ = term.recv() => "SIGTERM",
            _ = hup.recv()  => "SIGHUP",
            _ = quit.recv() => "SIGQUIT",
        };
        request_stop(&token, name);
    }
}

#[cfg(unix)]
fn unix_signals() -> std::io::Result<(
    tokio::signal::unix::Signal,
    tokio::signal::unix::Signal,
    tokio::signal::unix::Signal,
    tokio::signal::unix::Signal,
)> {
    use tokio::signal::unix::{signal, SignalKind};

    Ok((
        signal(SignalKind::interrupt())?,
        signal(SignalKind::terminate())?,
        signal(SignalKind::hangup())?,
        signal(SignalKind::quit())?,
    ))
}

#[cfg(not(unix))]
async fn listen_for_signals(token: CancellationToken) {
    listen_for_ctrl_c(token).await
}

async fn listen_for_ctrl_c(token: CancellationToken) {
    loop {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                request_stop(&token, "Ctrl+C");
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_shutdown_reaches_every_clone() {
        let controller = ShutdownController::new();
        let a = controller.token();
        let b = controller.token();

        assert!(!controller.is_cancelled());
        controller.shutdown("test");

        assert!(controller.is_cancelled());
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        // Awaiting does not consume the signal.
        a.cancelled().await;
        b.cancelled().await;
    }

    #[test]
    fn test_only_first_request_triggers() {
        let token = CancellationToken::new();
        assert!(request_stop(&token, "first"));
        assert!(!request_stop(&token, "second"));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_listener_starts_uncancelled() {
        let controller = ShutdownController::with_os_signals();
        tokio::task::yield_now().await;
        assert!(!controller.is_cancelled());
    }
}
