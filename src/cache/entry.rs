//! Cache entry definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum modification-time difference (seconds) still treated as equal.
///
/// Absorbs timestamp rounding between filesystems and the `REAL` column.
pub const MTIME_TOLERANCE_SECS: f64 = 0.001;

/// Represents a single file entry in the hash cache.
///
/// Each digest is independently optional: a scan that only needed exact
/// digests leaves the perceptual columns empty, and a later similarity scan
/// fills them in without discarding the exact digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// File path (primary key).
    pub path: PathBuf,
    /// File size in bytes at computation time.
    pub size: u64,
    /// Modification time in seconds since the Unix epoch at computation time.
    pub mtime: f64,
    /// BLAKE3 digest as lowercase hex.
    pub exact_digest: Option<String>,
    /// Structural (DCT) perceptual digest, base64 encoded.
    pub structural_digest: Option<String>,
    /// Gradient perceptual digest, base64 encoded.
    pub gradient_digest: Option<String>,
}

impl CacheEntry {
    /// Check whether this entry still describes a file with the given
    /// size and modification time.
    #[must_use]
    pub fn matches(&self, size: u64, mtime: f64) -> bool {
        self.size == size && (self.mtime - mtime).abs() <= MTIME_TOLERANCE_SECS
    }
}

/// Convert a [`SystemTime`] to floating-point seconds since the Unix epoch.
///
/// Times before the epoch map to negative values.
#[must_use]
pub fn system_time_to_secs(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}
