//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`ProgressCallback`] trait the engine reports
//! through, and [`Progress`], which renders terminal progress bars for
//! the three scan phases:
//!
//! - `enumerate`: spinner while candidate images are discovered
//! - `hash`: bar over files being fingerprinted
//! - `similar`: bar over similarity anchors

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name for candidate enumeration.
pub const PHASE_ENUMERATE: &str = "enumerate";
/// Phase name for fingerprinting.
pub const PHASE_HASH: &str = "hash";
/// Phase name for similarity clustering.
pub const PHASE_SIMILAR: &str = "similar";

/// Progress callback for the deduplication pipeline.
///
/// Implementations must be thread-safe: during hashing, callbacks come from
/// worker threads. The engine serializes calls so `current` never goes
/// backwards within a phase.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (e.g., "hash", "similar")
    /// * `total` - Total number of items to process (0 if unknown)
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Completed item count (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use imgdupe::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} images")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn with_active(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.active.lock() {
            if let Some(ref pb) = *guard {
                f(pb);
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = match phase {
            PHASE_ENUMERATE => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::spinner_style());
                pb.set_message("Scanning directories");
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            PHASE_HASH => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style());
                pb.set_message("Computing hashes");
                pb
            }
            PHASE_SIMILAR => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style());
                pb.set_message("Finding similar images");
                pb
            }
            other => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style());
                pb.set_message(other.to_string());
                pb
            }
        };

        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = active.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        let display = truncate_path(path, 30);
        self.with_active(|pb| {
            pb.set_position(current as u64);
            if !display.is_empty() {
                pb.set_message(display);
            }
        });
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        if let Ok(mut active) = self.active.lock() {
            if let Some(pb) = active.take() {
                let message = match phase {
                    PHASE_ENUMERATE => "Scan complete",
                    PHASE_HASH => "Hashing complete",
                    PHASE_SIMILAR => "Similarity search complete",
                    _ => "Done",
                };
                pb.finish_with_message(message);
            }
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let chars: Vec<char> = file_name.chars().collect();
    if chars.len() >= max_len {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
