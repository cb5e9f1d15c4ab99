//! Work items and scan outcomes passed between pipeline stages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A discovered candidate file awaiting hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Path to the file.
    pub path: PathBuf,
    /// Size in bytes as reported at discovery time.
    pub size: u64,
}

impl WorkItem {
    /// Create a new work item.
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// SHA-256 content hash for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Result of hashing or inspecting one file. Produced exactly once per
/// consumed [`WorkItem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Path to the file.
    pub path: PathBuf,
    /// Size in bytes, carried over from the work item.
    pub size: u64,
    /// Final extension including the leading dot, or empty.
    pub file_type: String,
    /// Content hash, or the message describing why hashing failed.
    pub hash: Result<ContentHash, String>,
}

impl ScanOutcome {
    /// Outcome for a successfully hashed file.
    pub fn hashed(item: WorkItem, hash: ContentHash) -> Self {
        let file_type = file_type(&item.path);
        Self {
            path: item.path,
            size: item.size,
            file_type,
            hash: Ok(hash),
        }
    }

    /// Outcome for a file that could not be opened or fully read.
    pub fn failed(item: WorkItem, message: impl Into<String>) -> Self {
        let file_type = file_type(&item.path);
        Self {
            path: item.path,
            size: item.size,
            file_type,
            hash: Err(message.into()),
        }
    }

    /// Whether this outcome carries an error.
    pub fn is_error(&self) -> bool {
        self.hash.is_err()
    }
}

/// Derive the file type from the final path segment: everything from the last
/// `.` onwards, or an empty string when the name has no dot.
///
/// `archive.tar.gz` yields `.gz` and `.bashrc` yields `.bashrc`.
pub fn file_type(path: &Path) -> String {
    let Some(name) = path.file_name() else {
        return String::new();
    };
    let name = name.to_string_lossy();
    match name.rfind('.') {
        Some(idx) => name[idx..].to_string(),
        None => String::new(),
    }
}
