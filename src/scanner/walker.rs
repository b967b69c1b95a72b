//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory
//! and yielding candidate image paths, plus [`scan_directories`] which
//! chains several roots and drops paths already seen through an
//! overlapping root.
//!
//! The walker does no hashing and reads no metadata beyond the directory
//! entry type; the deduplication engine stats every candidate itself.
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::scanner::{scan_directories, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let roots = vec![PathBuf::from("/photos"), PathBuf::from("/photos/2023")];
//! for entry in scan_directories(&roots, &WalkerConfig::default()) {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use super::{is_image_file, ScanError, WalkerConfig};

/// Directory walker for image discovery.
///
/// Children are visited in file-name order so the same tree always yields
/// the same sequence.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use imgdupe::scanner::{Walker, WalkerConfig};
    /// use std::path::Path;
    ///
    /// let walker = Walker::new(Path::new("."), WalkerConfig::default());
    /// ```
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Walk the directory tree, yielding image file paths.
    ///
    /// Non-image files and directories are skipped silently; entries that
    /// cannot be read are yielded as errors so the caller can record them.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        let mut walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(false)
            .sort(true);

        if !self.config.recursive {
            walk_dir = walk_dir.max_depth(1);
        }

        walk_dir
            .into_iter()
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    let path = entry.path();

                    // Skip the root directory itself
                    if path == self.root {
                        return None;
                    }

                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }

                    if file_type.is_symlink() && !self.config.follow_symlinks {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }

                    if !is_image_file(&path) {
                        log::trace!("Skipping non-image file: {}", path.display());
                        return None;
                    }

                    Some(Ok(path))
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    log::warn!("Walker error for {}: {}", path.display(), e);
                    Some(Err(ScanError::Io {
                        path,
                        source: std::io::Error::other(e.to_string()),
                    }))
                }
            })
    }
}

/// Walk several roots in order, yielding each file at most once.
///
/// Files are de-duplicated by their canonical (resolved absolute) path, so
/// overlapping roots such as `/photos` and `/photos/2023` do not produce
/// the same image twice. The first spelling encountered is kept.
pub fn scan_directories<'a>(
    roots: &'a [PathBuf],
    config: &'a WalkerConfig,
) -> impl Iterator<Item = Result<PathBuf, ScanError>> + 'a {
    let mut seen: HashSet<PathBuf> = HashSet::new();

    roots
        .iter()
        .flat_map(move |root| {
            let walker = Walker::new(root, config.clone());
            walker.walk().collect::<Vec<_>>()
        })
        .filter(move |entry| match entry {
            Ok(path) => {
                let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());
                if seen.insert(resolved) {
                    true
                } else {
                    log::trace!("Skipping already seen path: {}", path.display());
                    false
                }
            }
            Err(_) => true,
        })
}
