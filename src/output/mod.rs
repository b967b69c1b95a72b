//! Output formatters for scan results.
//!
//! This module provides different output formats for scan results:
//! - JSON for automation and scripting
//! - Plain text for terminals
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::duplicates::DuplicateFinder;
//! use imgdupe::output::TextOutput;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (result, stats) = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
//!
//! TextOutput::new(&result, &stats)
//!     .write_to(&mut std::io::stdout())
//!     .unwrap();
//! ```

pub mod json;
pub mod text;

// Re-export main types
pub use json::JsonOutput;
pub use text::TextOutput;
