//! Move non-keeper images out of the scanned tree.
//!
//! # Overview
//!
//! For every group the best image (largest, earliest on ties) stays where it
//! is and every other member is moved into a single destination directory.
//! A file that is the keeper of any group is never moved, even when it is a
//! non-keeper in another group.
//! Name clashes are resolved by appending `_1`, `_2`, … to the file stem.
//!
//! # Safety
//!
//! Each file is re-checked before moving: a file that disappeared or whose
//! size changed since the scan is skipped and reported as a failure. A dry
//! run plans the same moves without touching the filesystem.
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::actions::relocate::{relocate_duplicates, RelocateConfig};
//! use imgdupe::duplicates::DuplicateFinder;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (result, _) = finder.find_duplicates(&[PathBuf::from("/photos")]).unwrap();
//!
//! let config = RelocateConfig::new(PathBuf::from("/photos-dupes")).with_dry_run(true);
//! let outcome = relocate_duplicates(&result, &config).unwrap();
//! println!("Would move {} files", outcome.moved.len());
//! ```

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::duplicates::{DeduplicationResult, ImageRecord};

/// Error type for relocation.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// The destination directory could not be created.
    #[error("cannot create destination {path}: {source}")]
    Destination {
        /// Destination directory
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// File size changed since the scan.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// The source path has no file name to reuse.
    #[error("no file name in {0}")]
    NoFileName(PathBuf),

    /// The move itself failed.
    #[error("failed to move {from} to {to}: {source}")]
    Move {
        /// Source path
        from: PathBuf,
        /// Planned destination
        to: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Configuration for relocation.
#[derive(Debug, Clone)]
pub struct RelocateConfig {
    /// Directory receiving the moved files.
    pub destination: PathBuf,
    /// Plan the moves without performing them.
    pub dry_run: bool,
}

impl RelocateConfig {
    /// Create a configuration moving files into `destination`.
    #[must_use]
    pub fn new(destination: PathBuf) -> Self {
        Self {
            destination,
            dry_run: false,
        }
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A move that was performed (or planned, in dry-run mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    /// Original location.
    pub from: PathBuf,
    /// New location.
    pub to: PathBuf,
    /// File size in bytes.
    pub size: u64,
}

/// Outcome of a relocation run.
#[derive(Debug, Default)]
pub struct RelocateOutcome {
    /// Files moved, or that would be moved in dry-run mode.
    pub moved: Vec<PlannedMove>,
    /// Files that could not be moved.
    pub failures: Vec<RelocateError>,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl RelocateOutcome {
    /// Total bytes moved (or that would be moved).
    #[must_use]
    pub fn bytes_moved(&self) -> u64 {
        self.moved.iter().map(|m| m.size).sum()
    }
}

/// Move every non-keeper member of every group into the destination.
///
/// Per-file problems are collected in [`RelocateOutcome::failures`]; only
/// failing to create the destination aborts the run.
///
/// # Errors
///
/// Returns [`RelocateError::Destination`] if the destination directory
/// cannot be created.
pub fn relocate_duplicates(
    result: &DeduplicationResult,
    config: &RelocateConfig,
) -> Result<RelocateOutcome, RelocateError> {
    if !config.dry_run {
        fs::create_dir_all(&config.destination).map_err(|source| RelocateError::Destination {
            path: config.destination.clone(),
            source,
        })?;
    }

    let mut outcome = RelocateOutcome {
        dry_run: config.dry_run,
        ..RelocateOutcome::default()
    };
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    let keepers: HashSet<&Path> = result.groups().map(|g| g.best().path.as_path()).collect();

    for group in result.groups() {
        for image in group.removable() {
            if keepers.contains(image.path.as_path()) {
                log::debug!("Keeping {}: best copy of another group", image.path.display());
                continue;
            }
            match relocate_one(image, config, &mut claimed) {
                Ok(planned) => {
                    if config.dry_run {
                        log::info!(
                            "Would move {} -> {}",
                            planned.from.display(),
                            planned.to.display()
                        );
                    } else {
                        log::info!("Moved {} -> {}", planned.from.display(), planned.to.display());
                    }
                    outcome.moved.push(planned);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    outcome.failures.push(e);
                }
            }
        }
    }

    Ok(outcome)
}

fn relocate_one(
    image: &ImageRecord,
    config: &RelocateConfig,
    claimed: &mut HashSet<PathBuf>,
) -> Result<PlannedMove, RelocateError> {
    let meta = fs::metadata(&image.path).map_err(|_| RelocateError::NotFound(image.path.clone()))?;
    if meta.len() != image.size {
        return Err(RelocateError::Modified(image.path.clone()));
    }

    let to = unique_destination(&config.destination, &image.path, claimed)?;

    if !config.dry_run {
        move_file(&image.path, &to).map_err(|source| RelocateError::Move {
            from: image.path.clone(),
            to: to.clone(),
            source,
        })?;
    }

    claimed.insert(to.clone());
    Ok(PlannedMove {
        from: image.path.clone(),
        to,
        size: image.size,
    })
}

/// Pick `destination/name`, or `destination/stem_N.ext` for the first free N.
///
/// A name is taken if it exists on disk or was already handed out in this run.
fn unique_destination(
    destination: &Path,
    source: &Path,
    claimed: &HashSet<PathBuf>,
) -> Result<PathBuf, RelocateError> {
    let name = source
        .file_name()
        .ok_or_else(|| RelocateError::NoFileName(source.to_path_buf()))?;

    let taken = |p: &Path| p.exists() || claimed.contains(p);

    let candidate = destination.join(name);
    if !taken(&candidate) {
        return Ok(candidate);
    }

    let stem = source.file_stem().unwrap_or_default();
    let extension = source.extension();

    let mut counter = 1u32;
    loop {
        let mut file_name = OsString::from(stem);
        file_name.push(format!("_{}", counter));
        if let Some(ext) = extension {
            file_name.push(".");
            file_name.push(ext);
        }
        let candidate = destination.join(file_name);
        if !taken(&candidate) {
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// Rename, falling back to copy and remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            log::debug!(
                "Rename {} failed ({}), copying instead",
                from.display(),
                rename_err
            );
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
