//! Concurrent scanning pipeline for dupscan.
//!
//! # Overview
//!
//! A scan is three kinds of stage joined by two bounded queues:
//!
//! - **Discoverer** walks the configured roots with jwalk and emits one
//!   [`WorkItem`] per regular file under the size limit
//! - **Worker pool** hashes each file with SHA-256 and emits exactly one
//!   [`ScanOutcome`] per item, success or failure
//! - **Aggregator** applies outcomes to the shared [`MetricsStore`]; it is
//!   the only writer of duplicate groups, type counts and errors
//!
//! A single [`CancelSignal`] is observed at every point where a stage could
//! block. [`ScanControl`] gives outside callers status, metrics and cancel.
//!
//! # Example
//!
//! ```rust,no_run
//! use dupscan_scan::{Pipeline, ScanConfig};
//!
//! # async fn example() -> Result<(), dupscan_scan::ScanError> {
//! let pipeline = Pipeline::new(ScanConfig::new("/path/to/scan"))?;
//! let handle = pipeline.start();
//! let control = handle.control();
//!
//! println!("{:?}", control.status());
//! let summary = handle.wait().await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod cancel;
mod control;
mod discover;
mod pipeline;
mod worker;

pub use aggregate::Aggregator;
pub use cancel::{CancelOutcome, CancelSignal};
pub use control::ScanControl;
pub use discover::{DiscoveryStats, Discoverer};
pub use pipeline::{Pipeline, ScanHandle, ScanSummary};
pub use worker::{PoolStats, WorkerPool, hash_file};

// Re-export core types for convenience
pub use dupscan_core::{
    ContentHash, DiscoveryWarning, FileError, MetricsStore, Report, ScanConfig, ScanError,
    ScanMetrics, ScanOutcome, ScanStatus, WarningKind, WorkItem,
};
