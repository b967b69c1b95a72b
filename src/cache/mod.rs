//! Hash caching module for imgdupe.
//!
//! This module provides persistent storage for image fingerprints so that
//! repeat scans skip re-hashing unchanged files.
//!
//! # Architecture
//!
//! The caching system is split into two main components:
//!
//! * [`database`]: SQLite persistence, schema management, and CRUD operations.
//! * [`entry`]: The row model stored in the cache and its validation logic.
//!
//! # Cache Invalidation
//!
//! Entries are validated using a combination of:
//! * File path (primary key)
//! * File size
//! * Modification time (mtime, 1 ms tolerance)
//!
//! [`HashCache::get`] stats the live file on every lookup. If either
//! attribute changed, the row is deleted and the lookup reports a miss, so
//! a caller never receives a fingerprint computed against other content.
//!
//! # Durability
//!
//! Every mutation commits before returning. An interrupted scan loses at
//! most the files that were being hashed at the time.

pub mod database;
pub mod entry;

pub use database::{CacheError, CacheResult, CacheStats, HashCache};
pub use entry::{system_time_to_secs, CacheEntry, MTIME_TOLERANCE_SECS};
