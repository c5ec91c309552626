//! Incremental generation cache.
//!
//! Generating doubles for an unchanged target is wasted work. This crate
//! persists one JSON record per (target, optional test bundle) capturing
//! everything the last generation depended on: the generator version,
//! configuration and path-set hashes, the generated output's own hash, and
//! per-file content hashes of every source involved. On the next run the
//! record is recomputed category by category in a fixed order; the first
//! mismatch invalidates and leaves a diagnostic explaining exactly what
//! changed, and a record that survives every category lets the target skip
//! generation entirely.
//!
//! All reads are fail-safe: a missing, corrupt, or stale-format record is a
//! cache miss, never an error.

#![warn(missing_docs)]

pub mod error;
pub mod hasher;
pub mod record;
pub mod store;
pub mod trail;
pub mod validity;

pub use error::CacheError;
pub use hasher::SourceHasher;
pub use record::{ReferencedScan, SourceFileEntry, TargetRecord};
pub use store::CacheStore;
pub use validity::{check_validity, CacheDecision, CurrentInputs, StaleCategory};
