//! Duplicate groups and scan results.
//!
//! # Overview
//!
//! An [`ImageRecord`] is created for every enumerated image and filled in by
//! the hashing phase. Records judged equivalent are collected into a
//! [`DuplicateGroup`], and all groups plus per-file failures make up the
//! [`DeduplicationResult`] of one scan.
//!
//! ## Best image
//!
//! Within a group the recommended keeper is the largest file; ties go to
//! the member seen first during the scan. Potential savings are the sizes
//! of every other member.
//!
//! # Example
//!
//! ```
//! use imgdupe::duplicates::{DuplicateGroup, ImageRecord};
//! use std::path::PathBuf;
//!
//! let group = DuplicateGroup::exact(vec![
//!     ImageRecord::new(0, PathBuf::from("/a.jpg"), 500),
//!     ImageRecord::new(1, PathBuf::from("/b.jpg"), 800),
//! ]);
//!
//! assert_eq!(group.best().path, PathBuf::from("/b.jpg"));
//! assert_eq!(group.potential_savings(), 500);
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scanner::PerceptualDigests;

/// One candidate image observed during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Position in scan order (0-based).
    pub index: usize,
    /// Path as yielded by the scanner.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// BLAKE3 digest as lowercase hex.
    pub exact_digest: Option<String>,
    /// Structural and gradient perceptual digests.
    pub perceptual: Option<PerceptualDigests>,
}

impl ImageRecord {
    /// Create a record with no digests yet.
    #[must_use]
    pub fn new(index: usize, path: PathBuf, size: u64) -> Self {
        Self {
            index,
            path,
            size,
            exact_digest: None,
            perceptual: None,
        }
    }
}

/// How the members of a group were matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Byte-identical content.
    Exact,
    /// Perceptual digests within the similarity threshold.
    Similar,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Similar => write!(f, "similar"),
        }
    }
}

/// Two or more images judged equivalent or near-equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Members in scan order.
    pub images: Vec<ImageRecord>,
    /// Match kind.
    pub kind: MatchKind,
    /// For similar groups, the smallest combined distance (whole bits)
    /// among the pairs that formed the group.
    pub similarity: Option<u32>,
}

impl DuplicateGroup {
    /// Create an exact-duplicate group.
    #[must_use]
    pub fn exact(images: Vec<ImageRecord>) -> Self {
        debug_assert!(images.len() >= 2, "duplicate groups need two members");
        Self {
            images,
            kind: MatchKind::Exact,
            similarity: None,
        }
    }

    /// Create a similar-image group.
    #[must_use]
    pub fn similar(images: Vec<ImageRecord>, similarity: u32) -> Self {
        debug_assert!(images.len() >= 2, "duplicate groups need two members");
        Self {
            images,
            kind: MatchKind::Similar,
            similarity: Some(similarity),
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.images.iter().map(|img| img.size).sum()
    }

    /// Position of the recommended keeper within [`Self::images`].
    ///
    /// Largest size wins; ties go to the earliest scanned member.
    #[must_use]
    pub fn best_index(&self) -> usize {
        let mut best = 0;
        for (i, img) in self.images.iter().enumerate().skip(1) {
            let current = &self.images[best];
            if img.size > current.size || (img.size == current.size && img.index < current.index)
            {
                best = i;
            }
        }
        best
    }

    /// The recommended keeper.
    ///
    /// # Panics
    ///
    /// Panics if the group is empty, which the constructors rule out.
    #[must_use]
    pub fn best(&self) -> &ImageRecord {
        &self.images[self.best_index()]
    }

    /// Members other than the keeper, in group order.
    pub fn removable(&self) -> impl Iterator<Item = &ImageRecord> {
        let best = self.best_index();
        self.images
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != best)
            .map(|(_, img)| img)
    }

    /// Space reclaimed by keeping only the best member.
    #[must_use]
    pub fn potential_savings(&self) -> u64 {
        if self.images.len() < 2 {
            return 0;
        }
        self.total_size() - self.best().size
    }
}

/// A file that could not be enumerated or fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    /// Offending path.
    pub path: PathBuf,
    /// Human-readable cause.
    pub error: String,
}

impl FileError {
    /// Create a new file error.
    pub fn new(path: PathBuf, error: impl std::fmt::Display) -> Self {
        Self {
            path,
            error: error.to_string(),
        }
    }
}

/// The complete output of one scan.
#[derive(Debug, Clone, Default)]
pub struct DeduplicationResult {
    /// Byte-identical groups.
    pub exact_duplicates: Vec<DuplicateGroup>,
    /// Near-duplicate groups.
    pub similar_images: Vec<DuplicateGroup>,
    /// Number of images enumerated (including ones that later failed to hash).
    pub total_images: usize,
    /// Total bytes of all enumerated images.
    pub total_size: u64,
    /// Files that could not be processed.
    pub errors: Vec<FileError>,
}

impl DeduplicationResult {
    /// Number of exact duplicate files, excluding one keeper per group.
    #[must_use]
    pub fn exact_duplicate_count(&self) -> usize {
        self.exact_duplicates.iter().map(|g| g.len() - 1).sum()
    }

    /// Number of similar image groups.
    #[must_use]
    pub fn similar_count(&self) -> usize {
        self.similar_images.len()
    }

    /// Number of files across all similar groups.
    #[must_use]
    pub fn similar_file_count(&self) -> usize {
        self.similar_images.iter().map(DuplicateGroup::len).sum()
    }

    /// Potential savings from exact duplicates.
    #[must_use]
    pub fn potential_savings_exact(&self) -> u64 {
        self.exact_duplicates
            .iter()
            .map(DuplicateGroup::potential_savings)
            .sum()
    }

    /// Potential savings from similar images.
    #[must_use]
    pub fn potential_savings_similar(&self) -> u64 {
        self.similar_images
            .iter()
            .map(DuplicateGroup::potential_savings)
            .sum()
    }

    /// Combined potential savings.
    #[must_use]
    pub fn potential_savings(&self) -> u64 {
        self.potential_savings_exact() + self.potential_savings_similar()
    }

    /// All groups, exact first.
    pub fn groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.exact_duplicates.iter().chain(self.similar_images.iter())
    }

    /// Whether any duplicates were found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.exact_duplicates.is_empty() || !self.similar_images.is_empty()
    }
}
