//! Cooperative, broadcast-style stop signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// What happened when [`CancelSignal::trigger`] was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// This call fired the signal.
    Initiated,
    /// The signal had already fired.
    AlreadyStopped,
}

/// Single-trigger, multi-observer stop indicator shared by every stage.
///
/// Triggering is idempotent and never blocks, so it is safe from any thread,
/// including the control interface.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl CancelSignal {
    /// Create a signal that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Only the first call reports [`CancelOutcome::Initiated`].
    pub fn trigger(&self) -> CancelOutcome {
        if self.fired.swap(true, Ordering::AcqRel) {
            return CancelOutcome::AlreadyStopped;
        }
        self.token.cancel();
        CancelOutcome::Initiated
    }

    /// Whether the signal has fired.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal fires; immediately if it already has.
    pub fn triggered(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trigger_is_idempotent() {
        let signal = CancelSignal::new();
        assert!(!signal.is_triggered());
        assert_eq!(signal.trigger(), CancelOutcome::Initiated);
        assert_eq!(signal.trigger(), CancelOutcome::AlreadyStopped);
        assert_eq!(signal.clone().trigger(), CancelOutcome::AlreadyStopped);
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn test_all_observers_wake() {
        let signal = CancelSignal::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.triggered().await })
            })
            .collect();

        signal.trigger();
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("observer did not wake")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_concurrent_triggers_fire_once() {
        let signal = CancelSignal::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.trigger() })
            })
            .collect();

        let mut initiated = 0;
        for handle in handles {
            if handle.await.unwrap() == CancelOutcome::Initiated {
                initiated += 1;
            }
        }
        assert_eq!(initiated, 1);
    }
}
