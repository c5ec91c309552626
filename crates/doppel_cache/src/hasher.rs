//! Source file and set hashing.
//!
//! All invalidation comparisons reduce to [`ContentHash`] equality: file
//! contents hash directly, while path sets and name sets hash their sorted
//! rendered elements so the set's identity is order-independent.

use std::path::{Path, PathBuf};

use doppel_common::ContentHash;

use crate::error::CacheError;
use crate::record::SourceFileEntry;

/// Utility for computing the content hashes the validity check compares.
pub struct SourceHasher;

impl SourceHasher {
    /// Computes the content hash of a single file.
    pub fn hash_file(path: &Path) -> Result<ContentHash, CacheError> {
        let content = std::fs::read(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(ContentHash::from_bytes(&content))
    }

    /// Hashes every readable file in `paths`, sorted by path.
    ///
    /// Unreadable files are skipped; the validity check treats a recorded
    /// file with no current hash as a mismatch, so a vanished file still
    /// invalidates.
    pub fn hash_files(paths: &[PathBuf]) -> Vec<SourceFileEntry> {
        let mut entries: Vec<SourceFileEntry> = paths
            .iter()
            .filter_map(|path| {
                Self::hash_file(path).ok().map(|hash| SourceFileEntry {
                    path: path.clone(),
                    hash,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    /// Hashes the identity of a path set: sorted rendered paths, joined.
    ///
    /// Adding, removing, or renaming a path changes the hash; file contents
    /// do not participate.
    pub fn hash_paths(paths: &[PathBuf]) -> ContentHash {
        let mut rendered: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        rendered.sort();
        ContentHash::from_parts(rendered)
    }

    /// Hashes the identity of a name set, same joining rule as paths.
    pub fn hash_names<I, S>(names: I) -> ContentHash
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rendered: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().to_string())
            .collect();
        rendered.sort();
        ContentHash::from_parts(rendered)
    }
}
