//! Application configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. TOML file (`<config dir>/imgdupe/config.toml`, or `--config PATH`)
//! 3. `IMGDUPE_*` environment variables (e.g. `IMGDUPE_THRESHOLD=6`)
//! 4. CLI flags, applied by the caller on top of the extracted settings
//!
//! # Example
//!
//! ```toml
//! threshold = 8
//! hash_size = 16
//! io_threads = 4
//! cache_path = "/mnt/fast/imgdupe.db"
//! ```

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::scanner::DEFAULT_GRID_SIZE;

/// Default similarity threshold (combined Hamming distance in bits).
pub const DEFAULT_THRESHOLD: u32 = 10;

/// Smallest accepted perceptual grid size.
pub const MIN_GRID_SIZE: u32 = 4;

/// Largest accepted perceptual grid size.
pub const MAX_GRID_SIZE: u32 = 64;

/// Configuration errors. Always raised before any scanning begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The grid size is outside the supported range.
    #[error("invalid hash size {0}: must be between {MIN_GRID_SIZE} and {MAX_GRID_SIZE}")]
    InvalidGridSize(u32),

    /// The threshold exceeds the digest bit length.
    #[error("invalid similarity threshold {threshold}: must be between 0 and {max} for hash size {grid_size}")]
    InvalidThreshold {
        /// Requested threshold
        threshold: u32,
        /// Largest meaningful threshold for the grid
        max: u32,
        /// Grid size in effect
        grid_size: u32,
    },

    /// Hashing needs at least one worker.
    #[error("io_threads must be at least 1")]
    InvalidThreads,

    /// Both exact and similar matching were disabled.
    #[error("nothing to do: exact and similar matching are both disabled")]
    NothingToFind,

    /// The layered configuration could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Validate a grid size and threshold pair.
///
/// The threshold may not exceed the digest bit length (`grid_size²`),
/// which is 64 for an 8×8 grid.
///
/// # Errors
///
/// Returns [`ConfigError`] for an out-of-range grid or threshold.
pub fn validate_similarity(grid_size: u32, threshold: u32) -> Result<(), ConfigError> {
    if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&grid_size) {
        return Err(ConfigError::InvalidGridSize(grid_size));
    }
    let max = grid_size * grid_size;
    if threshold > max {
        return Err(ConfigError::InvalidThreshold {
            threshold,
            max,
            grid_size,
        });
    }
    Ok(())
}

/// User-tunable settings shared by the CLI and library callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Similarity threshold in bits.
    pub threshold: u32,
    /// Perceptual grid size.
    pub hash_size: u32,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Number of hashing threads.
    pub io_threads: usize,
    /// Use the persistent hash cache.
    pub use_cache: bool,
    /// Cache database location (default: per-user cache directory).
    pub cache_path: Option<PathBuf>,
    /// Follow symbolic links while scanning.
    pub follow_symlinks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            hash_size: DEFAULT_GRID_SIZE,
            recursive: true,
            io_threads: 4,
            use_cache: true,
            cache_path: None,
            follow_symlinks: false,
        }
    }
}

impl Settings {
    /// Build the layered figment for the given (or default) config file.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        match config_file {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                if let Some(path) = Self::default_config_path() {
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        figment.merge(Env::prefixed("IMGDUPE_"))
    }

    /// Load settings from defaults, config file and environment.
    ///
    /// A missing config file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a present file or variable is malformed.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let settings: Settings = Self::figment(config_file)
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))?;
        log::debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Check the settings for values the engine would reject.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_similarity(self.hash_size, self.threshold)?;
        if self.io_threads == 0 {
            return Err(ConfigError::InvalidThreads);
        }
        Ok(())
    }

    /// Default platform-specific configuration file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "imgdupe").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
