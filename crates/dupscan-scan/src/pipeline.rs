//! Wiring of discoverer, worker pool and aggregator into one run.

use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use dupscan_core::{MetricsStore, ScanConfig, ScanError};

use crate::aggregate::Aggregator;
use crate::cancel::CancelSignal;
use crate::control::ScanControl;
use crate::discover::{DiscoveryStats, Discoverer};
use crate::worker::{PoolStats, WorkerPool};

/// Final figures of a finished run.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Files handed to the workers.
    pub files_discovered: u64,
    /// Outcomes applied to the report.
    pub files_scanned: u64,
    /// Extra copies across all duplicate groups.
    pub duplicate_files: u64,
    /// Hashes shared by two or more files.
    pub duplicate_groups: usize,
    /// Bytes of every applied outcome.
    pub total_bytes: u64,
    /// Per-file processing errors.
    pub errors: usize,
    /// Whether the run was cut short.
    pub cancelled: bool,
    /// Wall-clock time from start to freeze.
    pub elapsed: Duration,
    /// What discovery skipped or warned about.
    pub discovery: DiscoveryStats,
    /// Per-worker throughput.
    pub pool: PoolStats,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Files scanned: {}, duplicates: {}, total bytes: {}, errors: {}",
            self.files_scanned, self.duplicate_files, self.total_bytes, self.errors
        )?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}

/// A configured, not yet started scan run.
pub struct Pipeline {
    config: ScanConfig,
    store: MetricsStore,
    signal: CancelSignal,
}

impl Pipeline {
    /// Validate `config` and prepare an empty report.
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;
        Ok(Self {
            config,
            store: MetricsStore::new(),
            signal: CancelSignal::new(),
        })
    }

    /// Control handle for this run; usable before and after [`start`](Self::start).
    pub fn control(&self) -> ScanControl {
        ScanControl::new(self.store.clone(), self.signal.clone())
    }

    /// Start every stage on the current tokio runtime.
    ///
    /// The report is frozen once all stages have stopped, whether or not
    /// anyone waits on the returned handle.
    pub fn start(self) -> ScanHandle {
        let control = self.control();
        let started = Instant::now();

        let (work_tx, work_rx) = async_channel::bounded(self.config.queue_capacity);
        let (result_tx, result_rx) = mpsc::channel(self.config.queue_capacity);

        info!(
            roots = ?self.config.directories,
            workers = self.config.workers,
            max_file_size = self.config.max_file_size,
            "starting scan"
        );

        let aggregator = Aggregator::new(self.store.clone(), self.signal.clone()).spawn(result_rx);
        let pool = WorkerPool::new(self.config.workers, self.signal.clone()).spawn(work_rx, result_tx);
        let discovery = Discoverer::new(self.config, self.store.clone(), self.signal.clone())
            .spawn(work_tx);

        let driver = tokio::spawn(drive(
            self.store,
            self.signal,
            started,
            discovery,
            pool,
            aggregator,
        ));

        ScanHandle { control, driver }
    }

    /// Start the run and wait for it to finish.
    pub async fn run(self) -> Result<ScanSummary, ScanError> {
        self.start().wait().await
    }
}

/// A running scan.
pub struct ScanHandle {
    control: ScanControl,
    driver: JoinHandle<ScanSummary>,
}

impl ScanHandle {
    /// Control handle for the running scan.
    pub fn control(&self) -> ScanControl {
        self.control.clone()
    }

    /// Wait until every stage has stopped and the report is frozen.
    pub async fn wait(self) -> Result<ScanSummary, ScanError> {
        self.driver.await.map_err(|err| ScanError::Other {
            message: format!("scan driver failed: {err}"),
        })
    }
}

async fn drive(
    store: MetricsStore,
    signal: CancelSignal,
    started: Instant,
    discovery: JoinHandle<DiscoveryStats>,
    pool: JoinHandle<PoolStats>,
    aggregator: JoinHandle<u64>,
) -> ScanSummary {
    // The aggregator finishes last on a natural drain and first on
    // cancellation, so waiting on it first covers both.
    let applied = aggregator
        .await
        .unwrap_or_else(|err| stage_failed("aggregator", err, &signal, 0));
    let pool = pool
        .await
        .unwrap_or_else(|err| stage_failed("worker pool", err, &signal, PoolStats::default()));
    let discovery = discovery.await.unwrap_or_else(|err| {
        stage_failed("discoverer", err, &signal, DiscoveryStats::default())
    });

    // Cancels are accepted only while the report is unfrozen, so reading
    // the signal under the freezing lock settles whether this run counts
    // as cancelled.
    let (_, summary) = store.finish_with(|report| ScanSummary {
        files_discovered: report.total_files_discovered,
        files_scanned: report.files_scanned,
        duplicate_files: report.duplicate_files_count(),
        duplicate_groups: report.duplicate_groups().count(),
        total_bytes: report.total_bytes,
        errors: report.errors.len(),
        cancelled: signal.is_triggered(),
        elapsed: started.elapsed(),
        discovery,
        pool,
    });
    let cancelled = summary.cancelled;

    info!(
        applied,
        cancelled,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "scan finished"
    );
    summary
}

/// A stage that panicked can leave its peers blocked on a queue; firing the
/// signal unwinds them.
fn stage_failed<T>(stage: &str, err: JoinError, signal: &CancelSignal, fallback: T) -> T {
    error!("{stage} task failed: {err}");
    signal.trigger();
    fallback
}
