//! The scan report and its read-only projections.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::item::ScanOutcome;

/// A per-file processing failure recorded against the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    /// File that failed.
    pub path: PathBuf,
    /// Error message from the failed open or read.
    pub message: String,
    /// When the failure was recorded.
    pub time: DateTime<Utc>,
}

/// Aggregate state of a single scan run.
///
/// Only the aggregator writes to a live report (through
/// [`MetricsStore`](crate::MetricsStore)); everyone else sees copies.
#[derive(Debug, Clone)]
pub struct Report {
    /// Files handed to the worker pool so far.
    pub total_files_discovered: u64,
    /// Outcomes applied so far, successful or not.
    pub files_scanned: u64,
    /// Sum of sizes of every applied outcome.
    pub total_bytes: u64,
    /// Hex content hash to the paths sharing it, in aggregation order.
    pub duplicates_by_hash: HashMap<String, Vec<PathBuf>>,
    /// File type to number of successfully hashed files of that type.
    pub type_counts: HashMap<String, u64>,
    /// Every per-file failure, in the order it was applied.
    pub errors: Vec<FileError>,
    /// When the run started.
    pub start_time: DateTime<Utc>,
    /// When the run was frozen; `None` while it is still running.
    pub end_time: Option<DateTime<Utc>>,
}

impl Report {
    /// Create an empty report for a run starting at `start_time`.
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            total_files_discovered: 0,
            files_scanned: 0,
            total_bytes: 0,
            duplicates_by_hash: HashMap::new(),
            type_counts: HashMap::new(),
            errors: Vec::new(),
            start_time,
            end_time: None,
        }
    }

    /// Record that the discoverer emitted another work item.
    pub fn record_discovered(&mut self) {
        self.total_files_discovered += 1;
    }

    /// Apply one scan outcome.
    ///
    /// Errored outcomes count as scanned and contribute their size, but never
    /// reach the duplicate or type tables.
    pub fn apply(&mut self, outcome: ScanOutcome, now: DateTime<Utc>) {
        self.files_scanned += 1;
        self.total_bytes += outcome.size;

        match outcome.hash {
            Err(message) => {
                self.errors.push(FileError {
                    path: outcome.path,
                    message,
                    time: now,
                });
            }
            Ok(hash) => {
                self.duplicates_by_hash
                    .entry(hash.to_hex())
                    .or_default()
                    .push(outcome.path);
                *self.type_counts.entry(outcome.file_type).or_insert(0) += 1;
            }
        }
    }

    /// Freeze the report. Returns `false` if it was already frozen.
    pub fn finish(&mut self, now: DateTime<Utc>) -> bool {
        if self.end_time.is_some() {
            return false;
        }
        self.end_time = Some(now);
        true
    }

    /// Whether the run is still in progress.
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }

    /// Discovered minus scanned.
    ///
    /// Discovery and aggregation update their counters independently, so this
    /// can be momentarily negative while a run is in flight.
    pub fn files_pending(&self) -> i64 {
        self.total_files_discovered as i64 - self.files_scanned as i64
    }

    /// Groups of two or more paths sharing a content hash.
    pub fn duplicate_groups(&self) -> impl Iterator<Item = (&String, &Vec<PathBuf>)> {
        self.duplicates_by_hash
            .iter()
            .filter(|(_, paths)| paths.len() >= 2)
    }

    /// Number of extra copies: each group of N paths contributes N - 1.
    pub fn duplicate_files_count(&self) -> u64 {
        self.duplicate_groups()
            .map(|(_, paths)| paths.len() as u64 - 1)
            .sum()
    }

    /// Number of paths that were hashed successfully.
    pub fn hashed_files(&self) -> u64 {
        self.duplicates_by_hash.values().map(|p| p.len() as u64).sum()
    }

    /// Small status projection.
    pub fn status(&self) -> ScanStatus {
        ScanStatus {
            files_scanned: self.files_scanned,
            files_pending: self.files_pending(),
            total_bytes: self.total_bytes,
            errors_count: self.errors.len(),
            running: self.is_running(),
        }
    }

    /// Full metrics projection. Only actual duplicate groups are included.
    pub fn metrics(&self) -> ScanMetrics {
        let duplicates = self
            .duplicate_groups()
            .map(|(hash, paths)| {
                let paths = paths
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect();
                (hash.clone(), paths)
            })
            .collect();

        let errors = self
            .errors
            .iter()
            .map(|e| ErrorEntry {
                path: e.path.to_string_lossy().into_owned(),
                error: e.message.clone(),
                time: e.time,
            })
            .collect();

        ScanMetrics {
            total_files: self.total_files_discovered,
            total_bytes: self.total_bytes,
            files_scanned: self.files_scanned,
            files_pending: self.files_pending(),
            duplicates,
            duplicate_files_count: self.duplicate_files_count(),
            type_count: self
                .type_counts
                .iter()
                .map(|(ext, count)| (ext.clone(), *count))
                .collect(),
            errors,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Read-only status view of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    pub files_scanned: u64,
    pub files_pending: i64,
    pub total_bytes: u64,
    pub errors_count: usize,
    pub running: bool,
}

/// One entry of the `errors` list in [`ScanMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub path: String,
    pub error: String,
    pub time: DateTime<Utc>,
}

/// Full metrics view of a run, independent of the live report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMetrics {
    pub total_files: u64,
    pub total_bytes: u64,
    pub files_scanned: u64,
    pub files_pending: i64,
    /// Hex hash to paths, only for groups with two or more paths.
    pub duplicates: BTreeMap<String, Vec<String>>,
    pub duplicate_files_count: u64,
    pub type_count: BTreeMap<String, u64>,
    pub errors: Vec<ErrorEntry>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}
