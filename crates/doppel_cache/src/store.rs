//! Persistence for per-target cache records.
//!
//! Records live as individual JSON files in the project cache directory.
//! Reads are fail-safe (anything wrong is a cache miss); writes are atomic
//! so a crash mid-write can never leave a record that spuriously validates
//! on the next run.

use std::path::{Path, PathBuf};

use doppel_common::ContentHash;
use doppel_diagnostics::DiagnosticSink;

use crate::error::CacheError;
use crate::record::TargetRecord;
use crate::trail;

/// Reads and writes [`TargetRecord`]s under one cache directory.
pub struct CacheStore {
    cache_dir: PathBuf,
}

impl CacheStore {
    /// Creates a store rooted at the given directory.
    ///
    /// The directory is not created until the first write.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// The directory records are stored in.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The path a record for this (target, bundle) pair lives at.
    pub fn record_path(&self, target: &str, test_bundle: Option<&str>) -> PathBuf {
        self.cache_dir
            .join(TargetRecord::file_name(target, test_bundle))
    }

    /// Loads a record, returning `None` if the file doesn't exist or can't
    /// be parsed.
    ///
    /// Fail-safe: any error results in `None` (cache miss), triggering
    /// regeneration.
    pub fn load(&self, target: &str, test_bundle: Option<&str>) -> Option<TargetRecord> {
        let path = self.record_path(target, test_bundle);
        let content = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Loads a record and discards it up front when it was written by a
    /// different generator version or project state.
    ///
    /// The discard leaves a trail note; the per-category validity check
    /// never sees such a record.
    pub fn load_current(
        &self,
        target: &str,
        test_bundle: Option<&str>,
        generator_version: &str,
        project_hash: ContentHash,
        sink: &DiagnosticSink,
    ) -> Option<TargetRecord> {
        let record = self.load(target, test_bundle)?;
        if !record.is_current(generator_version, project_hash) {
            let reason = if record.generator_version != generator_version {
                format!(
                    "written by generator {}, running {}",
                    record.generator_version, generator_version
                )
            } else {
                "project configuration hash changed".to_string()
            };
            sink.emit(trail::note_record_discarded(&record.display_name(), &reason));
            return None;
        }
        Some(record)
    }

    /// Writes a record atomically: JSON to a temp file in the cache
    /// directory, then rename over the final path.
    ///
    /// Creates the cache directory if it doesn't exist.
    pub fn store(&self, record: &TargetRecord) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.cache_dir).map_err(|e| CacheError::Io {
            path: self.cache_dir.clone(),
            source: e,
        })?;
        let json =
            serde_json::to_string_pretty(record).map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let path = self.record_path(&record.target, record.test_bundle.as_deref());
        let tmp = path.with_extension("lock.tmp");
        std::fs::write(&tmp, json).map_err(|e| CacheError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| CacheError::Io { path, source: e })
    }

    /// Removes the cache directory and everything in it.
    ///
    /// A directory that never existed is already clean.
    pub fn clean(&self) -> Result<(), CacheError> {
        match std::fs::remove_dir_all(&self.cache_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                path: self.cache_dir.clone(),
                source: e,
            }),
        }
    }
}
