//! Shared, lock-guarded holder of the live report.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::item::ScanOutcome;
use crate::report::{Report, ScanMetrics, ScanStatus};

/// Owns the one live [`Report`] of a run.
///
/// Writes take the exclusive lock, reads the shared lock. The lock is never
/// held across I/O or an `.await`, and it is the only lock in the pipeline.
/// Cloning the store clones the handle, not the report.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    inner: Arc<RwLock<Report>>,
}

impl MetricsStore {
    /// Create a store holding an empty report that starts now.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Report::new(Utc::now()))),
        }
    }

    /// Bump the discovered-files counter.
    pub fn record_discovered(&self) {
        self.write().record_discovered();
    }

    /// Apply one outcome. The counter bump and the map or error update happen
    /// under a single exclusive lock, so no reader sees half an outcome.
    pub fn apply(&self, outcome: ScanOutcome) {
        let now = Utc::now();
        self.write().apply(outcome, now);
    }

    /// Set the end time, then run `f` against the frozen report without
    /// releasing the exclusive lock. The flag is `false` if the report was
    /// already frozen.
    pub fn finish_with<R>(&self, f: impl FnOnce(&Report) -> R) -> (bool, R) {
        let now = Utc::now();
        let mut report = self.write();
        let frozen = report.finish(now);
        (frozen, f(&report))
    }

    /// Run `f` against the report under the shared lock.
    ///
    /// `f` must not block; the aggregator waits for it to return.
    pub fn inspect<R>(&self, f: impl FnOnce(&Report) -> R) -> R {
        let report = self.read();
        f(&report)
    }

    /// Status projection, computed under the shared lock.
    pub fn status(&self) -> ScanStatus {
        self.inspect(Report::status)
    }

    /// Full metrics projection, computed under the shared lock.
    pub fn metrics(&self) -> ScanMetrics {
        self.inspect(Report::metrics)
    }

    /// Deep copy of the report.
    pub fn snapshot(&self) -> Report {
        self.inspect(Report::clone)
    }

    /// Whether the report has not been frozen yet.
    pub fn is_running(&self) -> bool {
        self.inspect(Report::is_running)
    }

    // A panicking writer can only leave a fully applied or untouched outcome
    // behind, so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Report> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Report> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}
