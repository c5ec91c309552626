//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while persisting cache records.
///
/// Reads are fail-safe and never surface these: a record that is missing,
/// unreadable, or corrupt is simply a cache miss. Writes do surface them,
/// but the orchestrator downgrades write failures to warnings — an
/// unwritable cache directory means regenerating next run, not failing
/// this one.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A record could not be serialized to JSON.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
