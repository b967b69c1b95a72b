//! SQLite-backed hash cache database.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use super::entry::{system_time_to_secs, CacheEntry};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS image_hashes (
    path BLOB PRIMARY KEY,
    size INTEGER NOT NULL,
    mtime REAL NOT NULL,
    exact_digest TEXT,
    digest_a TEXT,
    digest_b TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_exact_digest ON image_hashes(exact_digest);
";

/// Row key for a path: its raw OS bytes, so distinct non-UTF-8 names
/// never share a row.
fn path_key(path: &Path) -> &[u8] {
    path.as_os_str().as_encoded_bytes()
}

/// Errors raised by the cache layer.
///
/// Every variant is fatal to a scan: continuing would let stale or missing
/// fingerprints pass as authoritative.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The underlying SQLite operation failed.
    #[error("cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The cache directory could not be created.
    #[error("failed to create cache directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No per-user cache directory could be determined.
    #[error("could not determine a cache directory for this user")]
    NoCacheDir,

    /// A thread panicked while holding the connection.
    #[error("cache connection lock poisoned")]
    Poisoned,
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Aggregate statistics about the cache contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Number of rows.
    pub total: u64,
    /// Rows holding an exact digest.
    pub with_exact: u64,
    /// Rows holding perceptual digests.
    pub with_perceptual: u64,
    /// Database file location (`None` for in-memory caches).
    pub path: Option<PathBuf>,
    /// Database file size in bytes.
    pub file_size: u64,
}

/// Persistent cache for image fingerprints using SQLite.
///
/// The connection is guarded by a mutex so one cache can be shared through
/// an `Arc` by every hashing worker. Each operation holds the lock for its
/// whole read-validate-evict or upsert sequence.
///
/// # Example
///
/// ```no_run
/// use imgdupe::cache::HashCache;
/// use std::path::Path;
///
/// let cache = HashCache::open(Path::new("/tmp/imgdupe-cache.db")).unwrap();
/// if let Some(entry) = cache.get(Path::new("/photos/a.jpg")).unwrap() {
///     println!("cached digest: {:?}", entry.exact_digest);
/// }
/// cache.close().unwrap();
/// ```
pub struct HashCache {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for HashCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashCache")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl HashCache {
    /// Open or create a cache database at the given path.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the directory or database cannot be created.
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        log::debug!("Opened hash cache at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open the cache at the default per-user location.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if no cache directory can be determined or
    /// the database cannot be opened.
    pub fn open_default() -> CacheResult<Self> {
        Self::open(&Self::default_path()?)
    }

    /// Open a transient in-memory cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if SQLite fails to initialise.
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Default cache location: `<user cache dir>/imgdupe/cache.db`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NoCacheDir`] if the platform has no home directory.
    pub fn default_path() -> CacheResult<PathBuf> {
        let dirs = ProjectDirs::from("", "", "imgdupe").ok_or(CacheError::NoCacheDir)?;
        Ok(dirs.cache_dir().join("cache.db"))
    }

    /// Location of the database file, if on disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Look up a file, validating the entry against the live file.
    ///
    /// Returns `None` if the file cannot be stat'ed, has no row, or has a
    /// row whose size or modification time no longer match. In the last
    /// case the stale row is deleted before returning.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the database read or eviction fails.
    pub fn get(&self, path: &Path) -> CacheResult<Option<CacheEntry>> {
        let (current_size, current_mtime) = match std::fs::metadata(path) {
            Ok(meta) => {
                let mtime = meta.modified().map(system_time_to_secs).unwrap_or(0.0);
                (meta.len(), mtime)
            }
            Err(_) => return Ok(None),
        };

        let key = path_key(path);
        let conn = self.lock()?;

        let entry = conn
            .query_row(
                "SELECT size, mtime, exact_digest, digest_a, digest_b
                 FROM image_hashes WHERE path = ?1",
                params![key],
                |row| {
                    Ok(CacheEntry {
                        path: path.to_path_buf(),
                        size: row.get::<_, i64>(0)? as u64,
                        mtime: row.get(1)?,
                        exact_digest: row.get(2)?,
                        structural_digest: row.get(3)?,
                        gradient_digest: row.get(4)?,
                    })
                },
            )
            .optional()?;

        let Some(entry) = entry else {
            return Ok(None);
        };

        if !entry.matches(current_size, current_mtime) {
            log::trace!(
                "Evicting stale cache entry for {} (size {} -> {}, mtime {} -> {})",
                path.display(),
                entry.size,
                current_size,
                entry.mtime,
                current_mtime
            );
            conn.execute(
                "DELETE FROM image_hashes WHERE path = ?1",
                params![key],
            )?;
            return Ok(None);
        }

        Ok(Some(entry))
    }

    /// Insert or replace the fingerprints for a file.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write fails.
    pub fn set(
        &self,
        path: &Path,
        size: u64,
        mtime: f64,
        exact_digest: Option<&str>,
        structural_digest: Option<&str>,
        gradient_digest: Option<&str>,
    ) -> CacheResult<()> {
        let key = path_key(path);
        self.lock()?.execute(
            "INSERT OR REPLACE INTO image_hashes
                 (path, size, mtime, exact_digest, digest_a, digest_b)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key,
                size as i64,
                mtime,
                exact_digest,
                structural_digest,
                gradient_digest
            ],
        )?;
        Ok(())
    }

    /// Remove a file from the cache. Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the delete fails.
    pub fn delete(&self, path: &Path) -> CacheResult<bool> {
        let key = path_key(path);
        let rows = self.lock()?.execute(
            "DELETE FROM image_hashes WHERE path = ?1",
            params![key],
        )?;
        Ok(rows > 0)
    }

    /// Remove every entry. Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the delete fails.
    pub fn clear(&self) -> CacheResult<u64> {
        let rows = self.lock()?.execute("DELETE FROM image_hashes", [])?;
        log::info!("Cleared {} cache entries", rows);
        Ok(rows as u64)
    }

    /// Gather statistics about the cache contents.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if a query fails.
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let conn = self.lock()?;
        let count = |sql: &str| -> CacheResult<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        let total = count("SELECT COUNT(*) FROM image_hashes")?;
        let with_exact = count("SELECT COUNT(*) FROM image_hashes WHERE exact_digest IS NOT NULL")?;
        let with_perceptual = count(
            "SELECT COUNT(*) FROM image_hashes WHERE digest_a IS NOT NULL AND digest_b IS NOT NULL",
        )?;

        let file_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map_or(0, |m| m.len());

        Ok(CacheStats {
            total,
            with_exact,
            with_perceptual,
            path: self.path.clone(),
            file_size,
        })
    }

    /// Close the connection, flushing any pending state.
    ///
    /// Dropping the cache also closes it; this variant reports errors.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if SQLite reports a failure on close.
    pub fn close(self) -> CacheResult<()> {
        let conn = self.conn.into_inner().map_err(|_| CacheError::Poisoned)?;
        conn.close().map_err(|(_, e)| CacheError::Database(e))?;
        log::debug!("Closed hash cache");
        Ok(())
    }
}
