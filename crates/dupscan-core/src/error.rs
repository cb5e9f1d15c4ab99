//! Error and warning types for scanning operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that keep a scan from starting or from reporting its result.
///
/// Nothing that happens to an individual file is a `ScanError`; per-file
/// failures are recorded in the report and discovery problems become
/// [`DiscoveryWarning`]s.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ScanError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Kind of discovery warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A configured root does not exist or could not be read.
    MissingRoot,
    /// A configured root exists but is not a directory.
    NotADirectory,
    /// Error reading a directory during traversal.
    WalkError,
    /// Error reading metadata for an entry.
    MetadataError,
}

/// Non-fatal problem encountered while discovering files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl DiscoveryWarning {
    /// Create a new discovery warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning for a root that could not be inspected.
    pub fn missing_root(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        Self {
            message: format!("Cannot read root {}: {error}", path.display()),
            path,
            kind: WarningKind::MissingRoot,
        }
    }

    /// Create a warning for a root that is not a directory.
    pub fn not_a_directory(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("{} is not a directory", path.display()),
            path,
            kind: WarningKind::NotADirectory,
        }
    }
}
