//! Read and cancel access for callers outside the pipeline.

use dupscan_core::{MetricsStore, Report, ScanMetrics, ScanStatus};

use crate::cancel::{CancelOutcome, CancelSignal};

/// Handle given to external callers (an HTTP server, a signal handler).
///
/// Every method returns promptly: reads hold the shared lock only for the
/// copy, and cancelling never waits on any stage.
#[derive(Debug, Clone)]
pub struct ScanControl {
    store: MetricsStore,
    signal: CancelSignal,
}

impl ScanControl {
    pub(crate) fn new(store: MetricsStore, signal: CancelSignal) -> Self {
        Self { store, signal }
    }

    /// Small status projection of the live report.
    pub fn status(&self) -> ScanStatus {
        self.store.status()
    }

    /// Full metrics projection, independent of the live report.
    pub fn metrics(&self) -> ScanMetrics {
        self.store.metrics()
    }

    /// Deep copy of the live report.
    pub fn snapshot(&self) -> Report {
        self.store.snapshot()
    }

    /// Ask the pipeline to stop. Safe to call any number of times.
    ///
    /// Once the report is frozen the run is over and the signal is left
    /// untouched.
    pub fn cancel(&self) -> CancelOutcome {
        self.store.inspect(|report| {
            if report.is_running() {
                self.signal.trigger()
            } else {
                CancelOutcome::AlreadyStopped
            }
        })
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_triggered()
    }

    /// Whether the run has not finished yet.
    pub fn is_running(&self) -> bool {
        self.store.is_running()
    }
}
