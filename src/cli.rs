//! Command-line interface definitions for imgdupe.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Find exact and similar images under two folders
//! imgdupe scan ~/Pictures /mnt/backup/photos
//!
//! # Stricter similarity, JSON output for scripting
//! imgdupe scan ~/Pictures --threshold 5 --output json
//!
//! # Preview moving every non-keeper into a review folder
//! imgdupe scan ~/Pictures --move-to ~/dupes --dry-run
//!
//! # Inspect the hash cache
//! imgdupe cache stats
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Settings;

/// Find duplicate and visually similar images.
///
/// imgdupe groups byte-identical files by BLAKE3 digest and near-identical
/// images by perceptual hashes, and reports how much space removing the
/// extras would free.
#[derive(Debug, Parser)]
#[command(name = "imgdupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan directories for duplicate and similar images
    Scan(ScanArgs),
    /// Inspect or clear the hash cache
    Cache(CacheArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directories to scan
    #[arg(value_name = "DIR", required = true, num_args = 1..)]
    pub directories: Vec<PathBuf>,

    /// Only scan the top level of each directory
    #[arg(long)]
    pub no_recursive: bool,

    /// Only report byte-identical duplicates
    #[arg(short = 'e', long, conflicts_with = "similar_only")]
    pub exact_only: bool,

    /// Only report visually similar images
    #[arg(short = 's', long)]
    pub similar_only: bool,

    /// Maximum combined Hamming distance for similar images (bits)
    #[arg(short, long, value_name = "BITS")]
    pub threshold: Option<u32>,

    /// Perceptual hash grid size (digests are SIZE×SIZE bits)
    #[arg(long, value_name = "SIZE")]
    pub hash_size: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Path to the hash cache database
    ///
    /// If not specified, a default platform-specific path is used.
    #[arg(long, value_name = "FILE")]
    pub cache: Option<PathBuf>,

    /// Disable hash caching
    #[arg(long, conflicts_with = "cache")]
    pub no_cache: bool,

    /// Number of I/O threads for hashing
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Follow symbolic links during scan
    ///
    /// Warning: May cause infinite loops if symlinks form cycles.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Move every non-keeper file into this directory
    #[arg(long, value_name = "DIR")]
    pub move_to: Option<PathBuf>,

    /// Show what --move-to would do without moving anything
    #[arg(long, requires = "move_to")]
    pub dry_run: bool,
}

impl ScanArgs {
    /// Overlay the flags given on the command line onto loaded settings.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(threshold) = self.threshold {
            settings.threshold = threshold;
        }
        if let Some(hash_size) = self.hash_size {
            settings.hash_size = hash_size;
        }
        if let Some(threads) = self.io_threads {
            settings.io_threads = threads;
        }
        if self.no_recursive {
            settings.recursive = false;
        }
        if self.follow_symlinks {
            settings.follow_symlinks = true;
        }
        if self.no_cache {
            settings.use_cache = false;
        }
        if let Some(ref path) = self.cache {
            settings.use_cache = true;
            settings.cache_path = Some(path.clone());
        }
    }

    /// Whether exact matching is requested.
    #[must_use]
    pub fn find_exact(&self) -> bool {
        !self.similar_only
    }

    /// Whether similarity matching is requested.
    #[must_use]
    pub fn find_similar(&self) -> bool {
        !self.exact_only
    }
}

/// Arguments for the cache subcommand.
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Cache operation
    #[command(subcommand)]
    pub action: CacheCommand,

    /// Path to the hash cache database
    #[arg(long, global = true, value_name = "FILE")]
    pub cache: Option<PathBuf>,
}

/// Cache operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum CacheCommand {
    /// Show entry counts and the database location
    Stats,
    /// Remove every cached entry
    Clear,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
