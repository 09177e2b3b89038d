//! Run-wide cancellation flag.

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Shared cancellation handle for one pipeline run.
///
/// Clones observe the same flag. Chains poll it at stage boundaries only,
/// so an in-flight stage always runs to completion. The first reason wins;
/// later calls to [`cancel`](Self::cancel) are ignored.
#[derive(Clone, Default)]
pub struct CancellationToken {
    reason: Arc<OnceLock<String>>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the run. Returns false if it was already cancelled.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let first = self.reason.set(reason.clone()).is_ok();
        if first {
            info!(reason = %reason, "Run cancellation requested");
        }
        first
    }

    /// Cancels the run once `delay` has elapsed, unless something else did first.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn cancel_after(&self, delay: Duration) -> JoinHandle<()> {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            token.cancel(format!("timed out after {delay:?}"));
        })
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.reason.get().is_some()
    }

    /// The reason given by the first canceller.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.get().cloned()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CancellationToken")
            .field(&self.reason.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        assert!(token.cancel("interrupted"));
        assert!(!token.cancel("timed out"));
        assert_eq!(token.reason().as_deref(), Some("interrupted"));
    }

    #[test]
    fn test_clones_share_the_flag() {
        let token = CancellationToken::new();
        let remote = token.clone();
        std::thread::spawn(move || remote.cancel("from thread"))
            .join()
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_after_delay() {
        let token = CancellationToken::new();
        token.cancel_after(Duration::from_millis(5)).await.unwrap();
        assert_eq!(token.reason().as_deref(), Some("timed out after 5ms"));
    }
}
