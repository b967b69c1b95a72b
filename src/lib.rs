//! imgdupe - Duplicate and Similar Image Finder
//!
//! A Rust library and CLI for finding byte-identical images (BLAKE3) and
//! visually near-identical ones (perceptual hashes), with a persistent
//! SQLite cache so rescans only fingerprint files that changed.

pub mod actions;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;

use std::io::{IsTerminal, Write};
use std::sync::Arc;

use anyhow::Context;
use bytesize::ByteSize;

use crate::actions::relocate::{relocate_duplicates, RelocateConfig};
use crate::cache::HashCache;
use crate::cli::{CacheArgs, CacheCommand, Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Settings;
use crate::duplicates::{DuplicateFinder, FinderConfig};
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::Progress;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for fatal conditions: invalid configuration, an
/// unusable root directory, or a cache failure.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let color = !cli.no_color && std::io::stdout().is_terminal();

    match cli.command {
        Commands::Scan(ref args) => run_scan(args, settings, cli.quiet, color),
        Commands::Cache(ref args) => run_cache(args, &settings),
    }
}

fn open_cache(path: Option<&std::path::Path>) -> anyhow::Result<HashCache> {
    match path {
        Some(path) => HashCache::open(path)
            .with_context(|| format!("Failed to open cache at {}", path.display())),
        None => HashCache::open_default().context("Failed to open default cache"),
    }
}

fn run_scan(
    args: &ScanArgs,
    mut settings: Settings,
    quiet: bool,
    color: bool,
) -> anyhow::Result<ExitCode> {
    args.apply_to(&mut settings);
    settings.validate().context("Invalid settings")?;

    let mut config = FinderConfig::default()
        .with_recursive(settings.recursive)
        .with_follow_symlinks(settings.follow_symlinks)
        .with_find_exact(args.find_exact())
        .with_find_similar(args.find_similar())
        .with_similarity_threshold(settings.threshold)
        .with_grid_size(settings.hash_size)
        .with_io_threads(settings.io_threads)
        .with_progress_callback(Arc::new(Progress::new(quiet)));

    if settings.use_cache {
        let cache = open_cache(settings.cache_path.as_deref())?;
        log::debug!("Using hash cache at {:?}", cache.path());
        config = config.with_cache(Arc::new(cache));
    }

    let finder = DuplicateFinder::new(config);
    let (result, stats) = finder
        .find_duplicates(&args.directories)
        .context("Scan failed")?;

    let mut exit_code = ExitCode::for_result(&result);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Json => JsonOutput::new(&result, &stats, exit_code)
            .write_to(&mut out, true)
            .context("Failed to write JSON output")?,
        OutputFormat::Text => TextOutput::new(&result, &stats)
            .with_color(color)
            .write_to(&mut out)
            .context("Failed to write report")?,
    }

    if let Some(ref destination) = args.move_to {
        if result.has_duplicates() {
            let relocate = RelocateConfig::new(destination.clone()).with_dry_run(args.dry_run);
            let outcome = relocate_duplicates(&result, &relocate)?;

            // Keep stdout valid JSON.
            let mut report: Box<dyn Write> = match args.output {
                OutputFormat::Json => Box::new(std::io::stderr()),
                OutputFormat::Text => Box::new(out),
            };
            let verb = if outcome.dry_run { "Would move" } else { "Moved" };
            for planned in &outcome.moved {
                writeln!(
                    report,
                    "  {}: {} -> {}",
                    verb,
                    planned.from.display(),
                    planned.to.display()
                )?;
            }
            for failure in &outcome.failures {
                writeln!(report, "  Error: {}", failure)?;
            }
            writeln!(
                report,
                "{} {} files ({})",
                verb,
                outcome.moved.len(),
                ByteSize::b(outcome.bytes_moved())
            )?;

            if !outcome.failures.is_empty() {
                exit_code = ExitCode::PartialSuccess;
            }
        }
    }

    Ok(exit_code)
}

fn run_cache(args: &CacheArgs, settings: &Settings) -> anyhow::Result<ExitCode> {
    let path = args.cache.as_deref().or(settings.cache_path.as_deref());
    let cache = open_cache(path)?;

    match args.action {
        CacheCommand::Stats => {
            let stats = cache.stats().context("Failed to read cache statistics")?;
            let location = stats
                .path
                .as_ref()
                .map_or_else(|| "<in memory>".to_string(), |p| p.display().to_string());
            println!("Cache:            {}", location);
            println!("Entries:          {}", stats.total);
            println!("With exact hash:  {}", stats.with_exact);
            println!("With perceptual:  {}", stats.with_perceptual);
            println!("Database size:    {}", ByteSize::b(stats.file_size));
        }
        CacheCommand::Clear => {
            let removed = cache.clear().context("Failed to clear cache")?;
            println!("Removed {} cache entries", removed);
        }
    }

    cache.close().context("Failed to close cache")?;
    Ok(ExitCode::Success)
}
