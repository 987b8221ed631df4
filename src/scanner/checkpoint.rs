//! Cooperative yield points.
//!
//! Every phase of a scan calls [`Checkpoint::tick`] once per file. A tick
//! checks the cancellation token and hands control back to the runtime
//! every `interval` ticks, so a scan never runs more than `interval` files
//! without yielding.

use tokio_util::sync::CancellationToken;
use tvshelf_common::{Error, Result};

/// Message recorded when a user cancels a running scan.
pub const CANCELLED_MESSAGE: &str = "Scan cancelled by user";

pub struct Checkpoint {
    cancel: CancellationToken,
    interval: usize,
    ticks: usize,
}

impl Checkpoint {
    pub fn new(cancel: CancellationToken, interval: usize) -> Self {
        Self {
            cancel,
            interval: interval.max(1),
            ticks: 0,
        }
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::cancelled(CANCELLED_MESSAGE));
        }
        Ok(())
    }

    /// Per-file checkpoint.
    pub async fn tick(&mut self) -> Result<()> {
        self.check()?;
        self.ticks += 1;
        if self.ticks % self.interval == 0 {
            self.yield_now().await?;
        }
        Ok(())
    }

    /// Unconditional yield, used after every persisted batch.
    pub async fn yield_now(&mut self) -> Result<()> {
        tokio::task::yield_now().await;
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tick_passes_until_cancelled() {
        let token = CancellationToken::new();
        let mut cp = Checkpoint::new(token.clone(), 2);

        for _ in 0..5 {
            cp.tick().await.unwrap();
        }

        token.cancel();
        let err = cp.tick().await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), CANCELLED_MESSAGE);
    }

    #[tokio::test]
    async fn test_yield_observes_cancellation() {
        let token = CancellationToken::new();
        let mut cp = Checkpoint::new(token.clone(), 100);
        token.cancel();
        assert!(cp.yield_now().await.is_err());
        assert!(cp.check().is_err());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let cp = Checkpoint::new(CancellationToken::new(), 0);
        assert_eq!(cp.interval, 1);
    }
}
