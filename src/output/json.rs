//! JSON output formatter for scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "summary": {
//!     "total_images": 120,
//!     "total_size": 48211968,
//!     "exact_duplicate_count": 3,
//!     "similar_count": 2,
//!     "potential_savings_exact": 1536000,
//!     "potential_savings_similar": 2048000,
//!     "error_count": 1,
//!     "scan_duration_ms": 1234,
//!     "exit_code": 0,
//!     "exit_code_name": "ID000"
//!   },
//!   "total_images": 120,
//!   "total_size": 48211968,
//!   "exact_duplicates": [
//!     {
//!       "files": [{"path": "/photos/a.jpg", "size": 512000}, {"path": "/photos/b.jpg", "size": 512000}],
//!       "potential_savings": 512000
//!     }
//!   ],
//!   "similar_images": [
//!     {
//!       "files": [{"path": "/photos/c.jpg", "size": 900000}, {"path": "/photos/c_small.jpg", "size": 300000}],
//!       "similarity_bits": 3,
//!       "potential_savings": 300000
//!     }
//!   ],
//!   "errors": [{"path": "/photos/broken.jpg", "error": "Failed to decode image ..."}]
//! }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::duplicates::DuplicateFinder;
//! use imgdupe::error::ExitCode;
//! use imgdupe::output::json::JsonOutput;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (result, stats) = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
//!
//! let output = JsonOutput::new(&result, &stats, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DeduplicationResult, DuplicateGroup, FileError, ScanStats};
use crate::error::ExitCode;

/// One file within a group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Path as scanned
    pub path: String,
    /// File size in bytes
    pub size: u64,
}

/// A file that could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct JsonError {
    /// Path as scanned, lossily converted for non-UTF-8 names
    pub path: String,
    /// Failure description
    pub error: String,
}

impl From<&FileError> for JsonError {
    fn from(e: &FileError) -> Self {
        Self {
            path: e.path.to_string_lossy().into_owned(),
            error: e.error.clone(),
        }
    }
}

/// An exact-duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonExactGroup {
    /// Group members in scan order
    pub files: Vec<JsonFile>,
    /// Bytes reclaimed by keeping only the best member
    pub potential_savings: u64,
}

/// A similar-image group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSimilarGroup {
    /// Group members, anchor first
    pub files: Vec<JsonFile>,
    /// Smallest combined Hamming distance seen while forming the group
    pub similarity_bits: u32,
    /// Bytes reclaimed by keeping only the best member
    pub potential_savings: u64,
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Number of images enumerated
    pub total_images: usize,
    /// Total size of all enumerated images in bytes
    pub total_size: u64,
    /// Exact duplicate files, excluding one keeper per group
    pub exact_duplicate_count: usize,
    /// Number of similar groups
    pub similar_count: usize,
    /// Savings from exact groups (bytes)
    pub potential_savings_exact: u64,
    /// Savings from similar groups (bytes)
    pub potential_savings_similar: u64,
    /// Number of files that could not be processed
    pub error_count: usize,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "ID000")
    pub exit_code_name: String,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Scan summary statistics
    pub summary: JsonSummary,
    /// Number of images enumerated
    pub total_images: usize,
    /// Total size of all enumerated images in bytes
    pub total_size: u64,
    /// Byte-identical groups
    pub exact_duplicates: Vec<JsonExactGroup>,
    /// Near-duplicate groups
    pub similar_images: Vec<JsonSimilarGroup>,
    /// Files that could not be processed
    pub errors: Vec<JsonError>,
}

fn json_files(group: &DuplicateGroup) -> Vec<JsonFile> {
    group
        .images
        .iter()
        .map(|img| JsonFile {
            path: img.path.to_string_lossy().into_owned(),
            size: img.size,
        })
        .collect()
}

impl JsonOutput {
    /// Create a new JSON output from a scan result, its statistics and the
    /// exit code of this run.
    ///
    /// # Example
    ///
    /// ```
    /// use imgdupe::duplicates::{DeduplicationResult, ScanStats};
    /// use imgdupe::error::ExitCode;
    /// use imgdupe::output::json::JsonOutput;
    ///
    /// let output = JsonOutput::new(
    ///     &DeduplicationResult::default(),
    ///     &ScanStats::default(),
    ///     ExitCode::NoDuplicates,
    /// );
    /// assert!(output.exact_duplicates.is_empty());
    /// assert_eq!(output.summary.exit_code, 2);
    /// ```
    #[must_use]
    pub fn new(result: &DeduplicationResult, stats: &ScanStats, exit_code: ExitCode) -> Self {
        Self {
            summary: JsonSummary {
                total_images: result.total_images,
                total_size: result.total_size,
                exact_duplicate_count: result.exact_duplicate_count(),
                similar_count: result.similar_count(),
                potential_savings_exact: result.potential_savings_exact(),
                potential_savings_similar: result.potential_savings_similar(),
                error_count: result.errors.len(),
                scan_duration_ms: stats.scan_duration.as_millis() as u64,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
            total_images: result.total_images,
            total_size: result.total_size,
            exact_duplicates: result
                .exact_duplicates
                .iter()
                .map(|g| JsonExactGroup {
                    files: json_files(g),
                    potential_savings: g.potential_savings(),
                })
                .collect(),
            similar_images: result
                .similar_images
                .iter()
                .map(|g| JsonSimilarGroup {
                    files: json_files(g),
                    similarity_bits: g.similarity.unwrap_or(0),
                    potential_savings: g.potential_savings(),
                })
                .collect(),
            errors: result.errors.iter().map(JsonError::from).collect(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Arguments
    ///
    /// * `writer` - The writer to output to (e.g., stdout)
    /// * `pretty` - Whether to pretty-print the output
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
