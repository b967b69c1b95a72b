//! Duplicate finder implementation with multi-phase detection.
//!
//! # Overview
//!
//! [`DuplicateFinder`] orchestrates the detection pipeline:
//! 1. **Enumerate**: pull every candidate image once and stat it for size
//! 2. **Hash**: fingerprint each file, reusing cached digests when the
//!    file's size and modification time still match
//! 3. **Exact grouping**: bucket files by BLAKE3 digest
//! 4. **Similarity grouping**: greedy clustering over perceptual digests
//!    (see [`crate::duplicates::similarity`])
//!
//! Per-file failures never abort a scan; they are collected in
//! [`DeduplicationResult::errors`]. An unusable root directory, a cache
//! storage failure or an invalid configuration is fatal.
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::PathBuf;
//!
//! let config = FinderConfig::default()
//!     .with_similarity_threshold(8)
//!     .with_io_threads(4);
//! let finder = DuplicateFinder::new(config);
//!
//! let (result, stats) = finder.find_duplicates(&[PathBuf::from("/photos")]).unwrap();
//! println!(
//!     "{} exact groups, {} similar groups, {} cache hits",
//!     result.exact_duplicates.len(),
//!     result.similar_images.len(),
//!     stats.cache_hits
//! );
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;

use super::groups::{DeduplicationResult, DuplicateGroup, FileError, ImageRecord};
use super::similarity::{cluster_similar, select_candidates};
use crate::cache::{system_time_to_secs, CacheEntry, CacheError, HashCache};
use crate::config::{
    validate_similarity, ConfigError, DEFAULT_THRESHOLD, MAX_GRID_SIZE, MIN_GRID_SIZE,
};
use crate::progress::{ProgressCallback, PHASE_ENUMERATE, PHASE_HASH, PHASE_SIMILAR};
use crate::scanner::{
    digest_from_string, digest_to_string, scan_directories, Hasher, PerceptualDigests,
    PerceptualHasher, ScanError, WalkerConfig, DEFAULT_GRID_SIZE,
};

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Descend into subdirectories of each root.
    pub recursive: bool,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    /// Compute exact digests and report byte-identical groups.
    pub find_exact: bool,
    /// Compute perceptual digests and report near-duplicate groups.
    pub find_similar: bool,
    /// Maximum combined Hamming distance (bits) for two images to match.
    pub similarity_threshold: u32,
    /// Perceptual grid size; digests are `grid_size²` bits.
    pub grid_size: u32,
    /// Number of I/O threads for parallel hashing.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Optional hash cache for faster rescans.
    pub cache: Option<Arc<HashCache>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("recursive", &self.recursive)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("find_exact", &self.find_exact)
            .field("find_similar", &self.find_similar)
            .field("similarity_threshold", &self.similarity_threshold)
            .field("grid_size", &self.grid_size)
            .field("io_threads", &self.io_threads)
            .field("cache", &self.cache.as_ref().map(|_| "<cache>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
            find_exact: true,
            find_similar: true,
            similarity_threshold: DEFAULT_THRESHOLD,
            grid_size: DEFAULT_GRID_SIZE,
            io_threads: 4,
            cache: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set whether subdirectories are scanned.
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set whether symbolic links are followed.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Enable or disable exact duplicate detection.
    #[must_use]
    pub fn with_find_exact(mut self, enabled: bool) -> Self {
        self.find_exact = enabled;
        self
    }

    /// Enable or disable near-duplicate detection.
    #[must_use]
    pub fn with_find_similar(mut self, enabled: bool) -> Self {
        self.find_similar = enabled;
        self
    }

    /// Set the similarity threshold in bits.
    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: u32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the perceptual grid size.
    #[must_use]
    pub fn with_grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Set the I/O thread count.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads;
        self
    }

    /// Set the hash cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<HashCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check the configuration before any work starts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if both detection modes are off, the grid size
    /// or threshold is out of range, or no I/O threads are requested.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.find_exact && !self.find_similar {
            return Err(ConfigError::NothingToFind);
        }
        validate_similarity(self.grid_size, self.similarity_threshold)?;
        if self.io_threads == 0 {
            return Err(ConfigError::InvalidThreads);
        }
        Ok(())
    }

    fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(self.recursive, self.follow_symlinks)
    }
}

/// Counters collected alongside a [`DeduplicationResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Files whose requested digests all came from the cache.
    pub cache_hits: usize,
    /// Files that needed at least one digest computed.
    pub cache_misses: usize,
    /// Rows written to the cache.
    pub cache_writes: usize,
    /// Files fingerprinted successfully, from cache or fresh.
    pub files_hashed: usize,
    /// Wall-clock duration of the whole scan.
    pub scan_duration: Duration,
}

/// Errors that abort a scan.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The directory exists but cannot be listed.
    #[error("Cannot read directory {path}: {source}")]
    Unreadable {
        /// Offending root
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The hash cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The hashing thread pool could not be started.
    #[error("Failed to build hashing thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A file that survived enumeration.
struct Candidate {
    path: PathBuf,
    size: u64,
    mtime: f64,
}

/// What the hash phase learned about one file.
#[derive(Default)]
struct Fingerprint {
    exact_digest: Option<String>,
    perceptual: Option<PerceptualDigests>,
    error: Option<String>,
    cache_hit: bool,
    cache_written: bool,
}

/// Duplicate finder that orchestrates the detection pipeline.
///
/// # Example
///
/// ```no_run
/// use imgdupe::duplicates::DuplicateFinder;
/// use std::path::PathBuf;
///
/// let finder = DuplicateFinder::with_defaults();
/// match finder.find_duplicates(&[PathBuf::from(".")]) {
///     Ok((result, _stats)) => {
///         println!("{} images scanned", result.total_images);
///         println!("Can reclaim {} bytes", result.potential_savings());
///     }
///     Err(e) => eprintln!("Scan failed: {}", e),
/// }
/// ```
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
    perceptual: PerceptualHasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    ///
    /// The configuration is validated when a scan starts, not here.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let perceptual =
            PerceptualHasher::new(config.grid_size.clamp(MIN_GRID_SIZE, MAX_GRID_SIZE));
        Self {
            config,
            hasher: Hasher::new(),
            perceptual,
        }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Find duplicate and similar images under the given directories.
    ///
    /// Every root must be a readable directory. Overlapping roots are
    /// allowed; each file is considered once.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if the configuration is invalid, a root is
    /// missing, not a directory or unreadable, or the cache fails.
    pub fn find_duplicates(
        &self,
        directories: &[PathBuf],
    ) -> Result<(DeduplicationResult, ScanStats), FinderError> {
        let start_time = Instant::now();
        self.config.validate()?;

        let roots = directories
            .iter()
            .map(|dir| validate_root(dir))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Starting image scan of {} director{}",
            roots.len(),
            if roots.len() == 1 { "y" } else { "ies" }
        );

        let walker_config = self.config.walker_config();
        self.run(scan_directories(&roots, &walker_config), start_time)
    }

    /// Find duplicates among an explicit sequence of image paths.
    ///
    /// Paths are taken as-is (no extension filtering); repeated paths that
    /// resolve to the same file are considered once.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if the configuration is invalid or the cache
    /// fails.
    pub fn find_duplicates_in_paths<I>(
        &self,
        paths: I,
    ) -> Result<(DeduplicationResult, ScanStats), FinderError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let start_time = Instant::now();
        self.config.validate()?;

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let unique = paths.into_iter().filter(move |path| {
            let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());
            seen.insert(resolved)
        });

        self.run(unique.map(Ok), start_time)
    }

    fn run<I>(
        &self,
        entries: I,
        start_time: Instant,
    ) -> Result<(DeduplicationResult, ScanStats), FinderError>
    where
        I: Iterator<Item = Result<PathBuf, ScanError>>,
    {
        let mut result = DeduplicationResult::default();
        let mut stats = ScanStats::default();

        // Phase 1: enumerate
        let candidates = self.enumerate(entries, &mut result);
        result.total_images = candidates.len();
        result.total_size = candidates.iter().map(|c| c.size).sum();

        log::info!(
            "Found {} images ({} total)",
            result.total_images,
            ByteSize::b(result.total_size)
        );

        if candidates.is_empty() {
            stats.scan_duration = start_time.elapsed();
            return Ok((result, stats));
        }

        // Phase 2: hash with cache
        let fingerprints = self.hash_all(&candidates)?;

        let mut records = Vec::with_capacity(candidates.len());
        for (index, (candidate, fingerprint)) in
            candidates.into_iter().zip(fingerprints).enumerate()
        {
            if fingerprint.cache_hit {
                stats.cache_hits += 1;
            } else {
                stats.cache_misses += 1;
            }
            if fingerprint.cache_written {
                stats.cache_writes += 1;
            }

            if let Some(error) = fingerprint.error {
                log::warn!("Failed to fingerprint {}: {}", candidate.path.display(), error);
                result.errors.push(FileError::new(candidate.path, error));
                continue;
            }

            stats.files_hashed += 1;
            let mut record = ImageRecord::new(index, candidate.path, candidate.size);
            record.exact_digest = fingerprint.exact_digest;
            record.perceptual = fingerprint.perceptual;
            records.push(record);
        }

        log::info!(
            "Hashing complete: {} fingerprinted, {} failed, {} cache hits, {} cache writes",
            stats.files_hashed,
            result.errors.len(),
            stats.cache_hits,
            stats.cache_writes
        );

        // Phase 3: exact groups
        if self.config.find_exact {
            result.exact_duplicates = group_exact(&records);
            log::info!(
                "Exact grouping complete: {} groups, {} duplicate files",
                result.exact_duplicates.len(),
                result.exact_duplicate_count()
            );
        }

        // Phase 4: similar groups
        if self.config.find_similar {
            result.similar_images = self.group_similar(&records);
            log::info!(
                "Similarity grouping complete: {} groups, {} files",
                result.similar_count(),
                result.similar_file_count()
            );
        }

        stats.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete in {:.2?}: {} reclaimable, {} errors",
            stats.scan_duration,
            ByteSize::b(result.potential_savings()),
            result.errors.len()
        );

        Ok((result, stats))
    }

    /// Pull every entry once and stat it. Failures are recorded.
    fn enumerate<I>(&self, entries: I, result: &mut DeduplicationResult) -> Vec<Candidate>
    where
        I: Iterator<Item = Result<PathBuf, ScanError>>,
    {
        let callback = self.config.progress_callback.as_ref();
        if let Some(callback) = callback {
            callback.on_phase_start(PHASE_ENUMERATE, 0);
        }

        let mut candidates = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    log::warn!("Skipping {}: {}", e.path().display(), e);
                    result.errors.push(FileError::new(e.path().to_path_buf(), &e));
                    continue;
                }
            };

            match std::fs::metadata(&path) {
                Ok(meta) => {
                    let mtime = meta.modified().map(system_time_to_secs).unwrap_or(0.0);
                    candidates.push(Candidate {
                        path,
                        size: meta.len(),
                        mtime,
                    });
                    if let Some(callback) = callback {
                        let last = &candidates[candidates.len() - 1];
                        callback.on_progress(candidates.len(), &last.path.to_string_lossy());
                    }
                }
                Err(e) => {
                    let e = ScanError::from_io(&path, e);
                    log::warn!("Cannot stat {}: {}", path.display(), e);
                    result.errors.push(FileError::new(path, e));
                }
            }
        }

        if let Some(callback) = callback {
            callback.on_phase_end(PHASE_ENUMERATE);
        }

        candidates
    }

    /// Fingerprint every candidate on a bounded pool, preserving order.
    fn hash_all(&self, candidates: &[Candidate]) -> Result<Vec<Fingerprint>, FinderError> {
        let callback = self.config.progress_callback.as_ref();
        if let Some(callback) = callback {
            callback.on_phase_start(PHASE_HASH, candidates.len());
        }

        log::info!(
            "Hashing {} files on {} threads",
            candidates.len(),
            self.config.io_threads
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()?;

        // Incremented and reported under the lock so counts never go backwards.
        let completed = Mutex::new(0usize);

        let fingerprints = pool.install(|| {
            candidates
                .par_iter()
                .map(|candidate| {
                    let fingerprint = self.fingerprint(candidate)?;
                    if let Some(callback) = callback {
                        if let Ok(mut done) = completed.lock() {
                            *done += 1;
                            callback.on_progress(*done, &candidate.path.to_string_lossy());
                        }
                    }
                    Ok(fingerprint)
                })
                .collect::<Result<Vec<_>, CacheError>>()
        })?;

        if let Some(callback) = callback {
            callback.on_phase_end(PHASE_HASH);
        }

        Ok(fingerprints)
    }

    /// Fingerprint one file, consulting and updating the cache.
    ///
    /// Only cache failures are returned as errors; unreadable or
    /// undecodable files are reported through [`Fingerprint::error`].
    fn fingerprint(&self, candidate: &Candidate) -> Result<Fingerprint, CacheError> {
        let path = candidate.path.as_path();
        let cached = match self.config.cache {
            Some(ref cache) => cache.get(path)?,
            None => None,
        };

        let mut fingerprint = Fingerprint::default();

        if let Some(ref entry) = cached {
            if self.config.find_exact {
                fingerprint.exact_digest = entry.exact_digest.clone();
            }
            if self.config.find_similar {
                fingerprint.perceptual = self.cached_perceptual(entry);
            }
        }

        let need_exact = self.config.find_exact && fingerprint.exact_digest.is_none();
        let need_perceptual = self.config.find_similar && fingerprint.perceptual.is_none();

        if !need_exact && !need_perceptual {
            log::trace!("Cache hit: {}", path.display());
            fingerprint.cache_hit = true;
            return Ok(fingerprint);
        }

        log::trace!(
            "Cache miss: {} (exact: {}, perceptual: {})",
            path.display(),
            need_exact,
            need_perceptual
        );

        if need_exact {
            match self.hasher.full_hash_hex(path) {
                Ok(hex) => fingerprint.exact_digest = Some(hex),
                Err(e) => {
                    fingerprint.error = Some(e.to_string());
                    return Ok(fingerprint);
                }
            }
        }

        if need_perceptual {
            match self.perceptual.compute(path) {
                Ok(digests) => fingerprint.perceptual = Some(digests),
                Err(e) => {
                    fingerprint.error = Some(e.to_string());
                    return Ok(fingerprint);
                }
            }
        }

        if let Some(ref cache) = self.config.cache {
            // Digests this scan did not ask for are carried over untouched.
            let previous = cached.as_ref();
            let exact = fingerprint
                .exact_digest
                .clone()
                .or_else(|| previous.and_then(|e| e.exact_digest.clone()));
            let (structural, gradient) = match fingerprint.perceptual {
                Some(ref digests) => (
                    Some(digest_to_string(&digests.structural)),
                    Some(digest_to_string(&digests.gradient)),
                ),
                None => (
                    previous.and_then(|e| e.structural_digest.clone()),
                    previous.and_then(|e| e.gradient_digest.clone()),
                ),
            };

            cache.set(
                path,
                candidate.size,
                candidate.mtime,
                exact.as_deref(),
                structural.as_deref(),
                gradient.as_deref(),
            )?;
            fingerprint.cache_written = true;
        }

        Ok(fingerprint)
    }

    /// Decode cached perceptual digests, rejecting ones from another grid size.
    fn cached_perceptual(&self, entry: &CacheEntry) -> Option<PerceptualDigests> {
        let structural = digest_from_string(entry.structural_digest.as_deref()?).ok()?;
        let gradient = digest_from_string(entry.gradient_digest.as_deref()?).ok()?;
        let digests = PerceptualDigests::new(structural, gradient);

        let expected = self.perceptual.digest_bits() as usize;
        if digests.bit_len() != expected || digests.gradient.as_bytes().len() * 8 != expected {
            log::trace!(
                "Ignoring cached perceptual digests for {}: {} bits, expected {}",
                entry.path.display(),
                digests.bit_len(),
                expected
            );
            return None;
        }

        Some(digests)
    }

    fn group_similar(&self, records: &[ImageRecord]) -> Vec<DuplicateGroup> {
        let candidates = select_candidates(records, self.config.find_exact);
        let digests: Vec<&PerceptualDigests> = candidates
            .iter()
            .filter_map(|&i| records[i].perceptual.as_ref())
            .collect();

        let callback = self.config.progress_callback.as_ref();
        if let Some(callback) = callback {
            callback.on_phase_start(PHASE_SIMILAR, digests.len());
        }

        log::info!(
            "Comparing {} images (threshold {} bits)",
            digests.len(),
            self.config.similarity_threshold
        );

        let clusters = cluster_similar(&digests, self.config.similarity_threshold, |done, _| {
            if let Some(callback) = callback {
                let anchor = &records[candidates[done - 1]];
                callback.on_progress(done, &anchor.path.to_string_lossy());
            }
        });

        if let Some(callback) = callback {
            callback.on_phase_end(PHASE_SIMILAR);
        }

        clusters
            .into_iter()
            .map(|cluster| {
                let images = cluster
                    .members
                    .iter()
                    .map(|&m| records[candidates[m]].clone())
                    .collect();
                DuplicateGroup::similar(images, cluster.similarity)
            })
            .collect()
    }
}

/// Check that a root is a listable directory and resolve it.
fn validate_root(dir: &Path) -> Result<PathBuf, FinderError> {
    let meta = std::fs::metadata(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FinderError::PathNotFound(dir.to_path_buf()),
        _ => FinderError::Unreadable {
            path: dir.to_path_buf(),
            source: e,
        },
    })?;

    if !meta.is_dir() {
        return Err(FinderError::NotADirectory(dir.to_path_buf()));
    }

    std::fs::read_dir(dir).map_err(|e| FinderError::Unreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    dir.canonicalize().map_err(|e| FinderError::Unreadable {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Bucket records by exact digest, keeping first-seen order of buckets.
fn group_exact(records: &[ImageRecord]) -> Vec<DuplicateGroup> {
    let mut order: Vec<&str> = Vec::new();
    let mut buckets: HashMap<&str, Vec<&ImageRecord>> = HashMap::new();

    for record in records {
        if let Some(ref digest) = record.exact_digest {
            buckets
                .entry(digest.as_str())
                .or_insert_with(|| {
                    order.push(digest.as_str());
                    Vec::new()
                })
                .push(record);
        }
    }

    order
        .into_iter()
        .filter_map(|digest| buckets.remove(digest))
        .filter(|members| members.len() > 1)
        .map(|members| DuplicateGroup::exact(members.into_iter().cloned().collect()))
        .collect()
}
