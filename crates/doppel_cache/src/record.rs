//! Per-target cache records.
//!
//! One record is written per generated target (or per target + test bundle
//! when bundles are configured), named `<target>.lock` or
//! `<target>.<bundle>.lock` in the project cache directory. The record pins
//! everything the previous generation depended on; the validity check
//! recomputes each pinned value and compares.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use doppel_common::ContentHash;
use serde::{Deserialize, Serialize};

/// The content hash of one source file at the time a target was generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFileEntry {
    /// Path of the hashed file, as configured (relative to the project root).
    pub path: PathBuf,

    /// Content hash of the file when the record was written.
    pub hash: ContentHash,
}

/// The reference-scan result for one test declaration file.
///
/// The file's hash is stored alongside the scanned names so a later run can
/// reuse the scan when the file is unchanged instead of re-reading it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedScan {
    /// Content hash of the test file when it was scanned.
    pub hash: ContentHash,

    /// The qualified type names the file references.
    pub types: BTreeSet<String>,
}

/// Everything a previous generation of one target depended on.
///
/// Serialized as JSON. Every field must be present when loading; a record
/// missing a field fails to parse and counts as a cache miss. Field order
/// in the file is irrelevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// The compilation target this record belongs to.
    pub target: String,

    /// The test bundle the generation was scoped to, when pruning by bundle.
    pub test_bundle: Option<String>,

    /// Generator version that wrote the record. Any change invalidates.
    pub generator_version: String,

    /// Hash of the configuration slice that affects this target.
    pub config_hash: ContentHash,

    /// Hash identifying the whole project configuration. Checked at load
    /// time: a record from another project state is discarded outright.
    pub project_hash: ContentHash,

    /// Path-set hash over the target's own source files.
    pub target_paths_hash: ContentHash,

    /// Path-set hash over the target's transitive dependency source files.
    pub dependency_paths_hash: ContentHash,

    /// Content hash of the generated output file as written.
    pub output_hash: ContentHash,

    /// Per-file content hashes over own + transitive dependency sources,
    /// sorted by path.
    pub source_files: Vec<SourceFileEntry>,

    /// Name-set hash over the referenced types found in the bundle's test
    /// files. `None` when the record was written without pruning.
    pub referenced_types_hash: Option<ContentHash>,

    /// The reference-scan results keyed by scanned file, kept so an
    /// unchanged test file's scan can be reused instead of re-run.
    pub referenced_types: BTreeMap<PathBuf, ReferencedScan>,
}

impl TargetRecord {
    /// Returns the file name a record for this (target, bundle) pair uses.
    pub fn file_name(target: &str, test_bundle: Option<&str>) -> String {
        match test_bundle {
            Some(bundle) => format!("{target}.{bundle}.lock"),
            None => format!("{target}.lock"),
        }
    }

    /// The target name with its bundle qualifier, for log lines.
    pub fn display_name(&self) -> String {
        match &self.test_bundle {
            Some(bundle) => format!("{} ({bundle})", self.target),
            None => self.target.clone(),
        }
    }

    /// Whether this record was written by the running generator against the
    /// same project state. Checked before any per-category comparison.
    pub fn is_current(&self, generator_version: &str, project_hash: ContentHash) -> bool {
        self.generator_version == generator_version && self.project_hash == project_hash
    }
}
