//! File actions module.
//!
//! Actions operate on a finished [`crate::duplicates::DeduplicationResult`].
//! Currently this is relocation: moving every non-keeper image into a
//! review directory, with conflict-free naming and a dry-run mode.
//!
//! ```no_run
//! use imgdupe::actions::relocate::{relocate_duplicates, RelocateConfig};
//! use imgdupe::duplicates::DeduplicationResult;
//! use std::path::PathBuf;
//!
//! let result = DeduplicationResult::default();
//! let config = RelocateConfig::new(PathBuf::from("dupes")).with_dry_run(true);
//! let outcome = relocate_duplicates(&result, &config).unwrap();
//! assert!(outcome.moved.is_empty());
//! ```

pub mod relocate;

pub use relocate::{
    relocate_duplicates, PlannedMove, RelocateConfig, RelocateError, RelocateOutcome,
};
