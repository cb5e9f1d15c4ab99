//! Single consumer of scan outcomes.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use dupscan_core::{MetricsStore, ScanOutcome};

use crate::cancel::CancelSignal;

/// Drains the result queue into the [`MetricsStore`].
///
/// This is the only writer of the duplicate, type and error tables.
pub struct Aggregator {
    store: MetricsStore,
    signal: CancelSignal,
}

impl Aggregator {
    /// Create an aggregator writing into `store`.
    pub fn new(store: MetricsStore, signal: CancelSignal) -> Self {
        Self { store, signal }
    }

    /// Run on its own task. Resolves to the number of outcomes applied.
    pub fn spawn(self, results: mpsc::Receiver<ScanOutcome>) -> JoinHandle<u64> {
        tokio::spawn(self.run(results))
    }

    /// Apply outcomes until the result queue closes or the signal fires.
    ///
    /// Once the signal has fired no further outcome is applied, even if some
    /// are still queued.
    pub async fn run(self, mut results: mpsc::Receiver<ScanOutcome>) -> u64 {
        let mut applied = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.signal.triggered() => {
                    debug!(applied, "aggregation cancelled");
                    break;
                }
                next = results.recv() => match next {
                    Some(outcome) => {
                        self.store.apply(outcome);
                        applied += 1;
                    }
                    None => {
                        debug!(applied, "result queue drained");
                        break;
                    }
                },
            }
        }

        applied
    }
}
