//! Per-run deadline and cancellation signal.
//!
//! One [`RunContext`] is created for each pipeline run and cloned into every
//! worker. External calls are wrapped in [`RunContext::bound`] so they fail
//! fast once the deadline passes or the run is cancelled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{Cs2StatError, Result};

/// Shared deadline + cancellation flag for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunContext {
    deadline: Instant,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl RunContext {
    /// Create a context whose deadline is `budget` from now.
    pub fn with_timeout(budget: Duration) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            deadline: Instant::now() + budget,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        }
    }

    /// Signal cancellation to every clone of this context.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Time left before the deadline (zero once expired).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// `Ok` while the run may still start new work.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Cs2StatError::Cancelled);
        }
        if self.is_expired() {
            return Err(Cs2StatError::Timeout);
        }
        Ok(())
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Sender gone means nobody can cancel any more.
            std::future::pending::<()>().await;
        }
    }

    /// Race `fut` against the deadline and the cancellation flag.
    pub async fn bound<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cs2StatError::Cancelled),
            res = tokio::time::timeout_at(self.deadline, fut) => match res {
                Ok(inner) => inner,
                Err(_) => Err(Cs2StatError::Timeout),
            },
        }
    }

    /// Sleep for `delay`, cut short by the deadline or cancellation.
    pub async fn sleep(&self, delay: Duration) -> Result<()> {
        self.bound(async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bound_passes_through_results() {
        let ctx = RunContext::with_timeout(Duration::from_secs(5));
        let value = ctx.bound(async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);

        let err = ctx
            .bound(async { Err::<(), _>(Cs2StatError::Network("boom".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Cs2StatError::Network(_)));
    }

    #[tokio::test]
    async fn bound_times_out_at_deadline() {
        let ctx = RunContext::with_timeout(Duration::from_millis(20));
        let err = ctx
            .sleep(Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Cs2StatError::Timeout));
        assert!(ctx.is_expired());
        assert!(matches!(ctx.check(), Err(Cs2StatError::Timeout)));
    }

    #[tokio::test]
    async fn cancel_reaches_every_clone() {
        let ctx = RunContext::with_timeout(Duration::from_secs(30));
        let worker = ctx.clone();

        let handle = tokio::spawn(async move { worker.sleep(Duration::from_secs(10)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        ctx.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, Cs2StatError::Cancelled));
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn no_new_work_after_cancel() {
        let ctx = RunContext::with_timeout(Duration::from_secs(30));
        ctx.cancel();
        let err = ctx.bound(async { Ok(()) }).await.unwrap_err();
        assert!(matches!(err, Cs2StatError::Cancelled));
    }
}
