//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Exact duplicate grouping by BLAKE3 digest
//! - Near-duplicate clustering by perceptual digest distance
//! - Group and result bookkeeping (best image, potential savings)

pub mod finder;
pub mod groups;
pub mod similarity;

pub use finder::{DuplicateFinder, FinderConfig, FinderError, ScanStats};
pub use groups::{DeduplicationResult, DuplicateGroup, FileError, ImageRecord, MatchKind};
pub use similarity::{cluster_similar, select_candidates, SimilarCluster};
