//! Scan configuration types.

use std::fs;
use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Default number of hashing workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default maximum file size considered for hashing (100 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Default capacity of the work and result queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Configuration for a scan run. Immutable once the pipeline starts.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root directories to scan.
    pub directories: Vec<PathBuf>,

    /// Number of concurrent hashing workers.
    #[builder(default = "DEFAULT_WORKERS")]
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Files larger than this many bytes are skipped.
    #[builder(default = "DEFAULT_MAX_FILE_SIZE")]
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Capacity of each bounded hand-off queue.
    #[builder(default = "DEFAULT_QUEUE_CAPACITY")]
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Threads used for directory traversal (0 = serial walk).
    #[builder(default = "0")]
    #[serde(default)]
    pub walk_threads: usize,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.directories {
            Some(ref dirs) if dirs.is_empty() => {
                return Err("At least one directory is required".to_string());
            }
            None => return Err("At least one directory is required".to_string()),
            Some(_) => {}
        }
        if self.workers == Some(0) {
            return Err("Worker count must be greater than zero".to_string());
        }
        if self.max_file_size == Some(0) {
            return Err("Maximum file size must be greater than zero".to_string());
        }
        if self.queue_capacity == Some(0) {
            return Err("Queue capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl From<ScanConfigBuilderError> for ScanError {
    fn from(err: ScanConfigBuilderError) -> Self {
        ScanError::invalid_config(err.to_string())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a single directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            directories: vec![root.into()],
            workers: DEFAULT_WORKERS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            walk_threads: 0,
        }
    }

    /// Check the invariants the builder enforces, for configs built by hand.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.directories.is_empty() {
            return Err(ScanError::invalid_config("At least one directory is required"));
        }
        if self.workers == 0 {
            return Err(ScanError::invalid_config(
                "Worker count must be greater than zero",
            ));
        }
        if self.max_file_size == 0 {
            return Err(ScanError::invalid_config(
                "Maximum file size must be greater than zero",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ScanError::invalid_config(
                "Queue capacity must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Roots to walk: duplicates removed, and any root nested inside another
    /// configured root dropped, so no file is discovered twice.
    ///
    /// Roots are compared by their canonical form, so `.` and its absolute
    /// path count as the same root. A root that cannot be canonicalized is
    /// compared as given. The first spelling of each kept root is returned.
    pub fn roots(&self) -> Vec<PathBuf> {
        let keys: Vec<PathBuf> = self
            .directories
            .iter()
            .map(|dir| fs::canonicalize(dir).unwrap_or_else(|_| dir.clone()))
            .collect();

        let mut seen: Vec<&PathBuf> = Vec::with_capacity(keys.len());
        let mut roots = Vec::with_capacity(keys.len());
        for (dir, key) in self.directories.iter().zip(&keys) {
            let nested = keys
                .iter()
                .any(|other| other != key && key.starts_with(other));
            if !nested && !seen.contains(&key) {
                seen.push(key);
                roots.push(dir.clone());
            }
        }
        roots
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
