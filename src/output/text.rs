//! Human-readable report for terminal output.
//!
//! Groups are listed with the recommended keeper first, marked `keep`; the
//! remaining members are marked `dup`. Sizes use binary units via bytesize.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::{Paint, Style};

use crate::duplicates::{DeduplicationResult, DuplicateGroup, MatchKind, ScanStats};

/// Errors listed before the report truncates.
const MAX_LISTED_ERRORS: usize = 10;

const HEADING: Style = Style::new().bold();
const KEEP: Style = Style::new().green();
const DUP: Style = Style::new().dim();
const EXACT_TITLE: Style = Style::new().red().bold();
const SIMILAR_TITLE: Style = Style::new().yellow().bold();
const ERROR: Style = Style::new().red();

/// Plain-text rendering of a scan result.
pub struct TextOutput<'a> {
    result: &'a DeduplicationResult,
    stats: &'a ScanStats,
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a report for a result and its statistics.
    #[must_use]
    pub fn new(result: &'a DeduplicationResult, stats: &'a ScanStats) -> Self {
        Self {
            result,
            stats,
            color: true,
        }
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.paint(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// Write the full report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let result = self.result;

        writeln!(writer, "{}", self.paint("Scan Results", HEADING))?;
        writeln!(
            writer,
            "  Scanned:           {} images ({})",
            result.total_images,
            ByteSize::b(result.total_size)
        )?;
        writeln!(
            writer,
            "  Exact duplicates:  {} files in {} groups",
            result.exact_duplicate_count(),
            result.exact_duplicates.len()
        )?;
        writeln!(
            writer,
            "  Similar images:    {} files in {} groups",
            result.similar_file_count(),
            result.similar_count()
        )?;
        writeln!(
            writer,
            "  Potential savings: {}",
            ByteSize::b(result.potential_savings())
        )?;
        writeln!(
            writer,
            "  Errors:            {} files could not be processed",
            result.errors.len()
        )?;
        writeln!(
            writer,
            "  Scan time:         {:.2?} ({} cached, {} hashed)",
            self.stats.scan_duration,
            self.stats.cache_hits,
            self.stats.cache_misses
        )?;

        if !result.exact_duplicates.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "{}", self.paint("Exact Duplicates:", EXACT_TITLE))?;
            for (i, group) in result.exact_duplicates.iter().enumerate() {
                self.write_group(writer, group, i + 1)?;
            }
        }

        if !result.similar_images.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "{}", self.paint("Similar Images:", SIMILAR_TITLE))?;
            for (i, group) in result.similar_images.iter().enumerate() {
                self.write_group(writer, group, i + 1)?;
            }
        }

        if !result.errors.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "{}", self.paint("Errors:", EXACT_TITLE))?;
            for error in result.errors.iter().take(MAX_LISTED_ERRORS) {
                let line = format!("  {}: {}", error.path.display(), error.error);
                writeln!(writer, "{}", self.paint(&line, ERROR))?;
            }
            if result.errors.len() > MAX_LISTED_ERRORS {
                writeln!(
                    writer,
                    "  ... and {} more errors",
                    result.errors.len() - MAX_LISTED_ERRORS
                )?;
            }
        }

        Ok(())
    }

    fn write_group<W: Write>(
        &self,
        writer: &mut W,
        group: &DuplicateGroup,
        number: usize,
    ) -> io::Result<()> {
        let mut title = format!("Group {}", number);
        if group.kind == MatchKind::Similar {
            if let Some(bits) = group.similarity {
                title.push_str(&format!(" (similarity: {} bits different)", bits));
            }
        }
        writeln!(writer, "  {}", self.paint(&title, HEADING))?;

        let best = group.best();
        writeln!(
            writer,
            "    {}",
            self.paint(
                &format!("keep {} ({})", best.path.display(), ByteSize::b(best.size)),
                KEEP
            )
        )?;
        for image in group.removable() {
            writeln!(
                writer,
                "    {}",
                self.paint(
                    &format!("dup  {} ({})", image.path.display(), ByteSize::b(image.size)),
                    DUP
                )
            )?;
        }
        writeln!(
            writer,
            "    Potential savings: {}",
            ByteSize::b(group.potential_savings())
        )
    }
}
