//! Core types for dupscan.
//!
//! This crate provides the data passed between pipeline stages, the scan
//! configuration, and the [`MetricsStore`] that guards the single live
//! [`Report`] of a run together with its serializable projections.

mod config;
mod error;
mod item;
mod report;
mod store;

pub use config::{
    DEFAULT_MAX_FILE_SIZE, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, ScanConfig,
    ScanConfigBuilder, ScanConfigBuilderError,
};
pub use error::{DiscoveryWarning, ScanError, WarningKind};
pub use item::{ContentHash, ScanOutcome, WorkItem, file_type};
pub use report::{ErrorEntry, FileError, Report, ScanMetrics, ScanStatus};
pub use store::MetricsStore;
