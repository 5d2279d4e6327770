//! Scanner shutdown
//!
//! Every ticker task holds a child of one root [`CancellationToken`]. The
//! root is cancelled by Ctrl+C or by a task that hits a fatal upstream
//! error; the first reason given is kept for the exit report.

use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller that Ctrl+C also cancels
    pub fn with_ctrl_c() -> Self {
        let controller = Self::new();
        let signalled = controller.clone();

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => signalled.shutdown("interrupted"),
                Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
            }
        });

        controller
    }

    /// Token for one task; cancelling it leaves the others running
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Stop every task. Only the first reason is recorded.
    pub fn shutdown(&self, reason: &str) {
        if self.reason.set(reason.to_string()).is_ok() {
            info!(reason, "Shutting down scanners");
        }
        self.token.cancel();
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }
}

/// Run `future` unless the token is cancelled first
///
/// Cancellation is checked before the future is polled, so an already
/// cancelled token never starts new work.
pub async fn run_until_shutdown<F, T>(token: CancellationToken, future: F) -> Option<T>
where
    F: std::future::Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        result = future => Some(result),
    }
}
