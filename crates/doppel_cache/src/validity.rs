//! The ordered validity check.
//!
//! A loaded record validates only if every category matches its recomputed
//! current value. Categories are compared in a fixed order and the first
//! mismatch decides; cheap comparisons (version, set hashes) run before the
//! per-file sweep so most invalidations never touch file contents. Every
//! decision, fresh or stale, leaves a trail note on the sink.

use std::collections::HashMap;
use std::path::Path;

use doppel_common::ContentHash;
use doppel_diagnostics::DiagnosticSink;

use crate::record::{SourceFileEntry, TargetRecord};
use crate::trail;

/// The recomputed inputs a record is compared against.
#[derive(Debug, Clone)]
pub struct CurrentInputs {
    /// Version of the running generator.
    pub generator_version: String,

    /// Hash of the configuration slice affecting the target.
    pub config_hash: ContentHash,

    /// Path-set hash over the target's own source files.
    pub target_paths_hash: ContentHash,

    /// Path-set hash over the transitive dependency source files.
    pub dependency_paths_hash: ContentHash,

    /// Content hash of the previously generated output file as it exists
    /// now. `None` when the file is missing or unreadable.
    pub output_hash: Option<ContentHash>,

    /// Current content hashes of own + dependency sources, sorted by path.
    pub source_files: Vec<SourceFileEntry>,

    /// Name-set hash over the referenced types in the bundle's test files.
    /// `None` when pruning is disabled; the category is skipped entirely.
    pub referenced_types_hash: Option<ContentHash>,
}

/// The category that invalidated a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleCategory {
    /// The generator version changed.
    GeneratorVersion,
    /// The set of type names referenced by the test bundle changed.
    ReferencedTypes,
    /// The target's configuration slice changed.
    Config,
    /// The target's own source path set changed.
    TargetPaths,
    /// The transitive dependency source path set changed.
    DependencyPaths,
    /// The previously generated output was edited, moved, or deleted.
    Output,
    /// A source file's content changed.
    SourceFile,
}

impl StaleCategory {
    /// Human-readable category name for the trail.
    pub fn describe(self) -> &'static str {
        match self {
            StaleCategory::GeneratorVersion => "generator version",
            StaleCategory::ReferencedTypes => "referenced type set",
            StaleCategory::Config => "target configuration",
            StaleCategory::TargetPaths => "target source path set",
            StaleCategory::DependencyPaths => "dependency source path set",
            StaleCategory::Output => "previous output",
            StaleCategory::SourceFile => "source file contents",
        }
    }
}

/// The outcome of checking one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDecision {
    /// Every category matched; the cached output can be kept.
    Fresh,
    /// A category mismatched; the target must regenerate.
    Stale {
        /// The first category that failed, in check order.
        category: StaleCategory,
    },
}

impl CacheDecision {
    /// Returns `true` for [`CacheDecision::Fresh`].
    pub fn is_fresh(&self) -> bool {
        matches!(self, CacheDecision::Fresh)
    }
}

/// Compares a record against the current inputs, category by category.
///
/// The first mismatch wins and is reported through the sink; a record that
/// passes every category leaves a "skipping generation" note instead.
pub fn check_validity(
    record: &TargetRecord,
    current: &CurrentInputs,
    sink: &DiagnosticSink,
) -> CacheDecision {
    let target = record.display_name();

    if record.generator_version != current.generator_version {
        return stale(
            sink,
            &target,
            StaleCategory::GeneratorVersion,
            &record.generator_version,
            &current.generator_version,
        );
    }

    if let Some(current_refs) = current.referenced_types_hash {
        match record.referenced_types_hash {
            Some(recorded) if recorded == current_refs => {}
            Some(recorded) => {
                return stale(
                    sink,
                    &target,
                    StaleCategory::ReferencedTypes,
                    &recorded.to_string(),
                    &current_refs.to_string(),
                );
            }
            None => {
                return stale(
                    sink,
                    &target,
                    StaleCategory::ReferencedTypes,
                    "(no recorded scan)",
                    &current_refs.to_string(),
                );
            }
        }
    }

    if record.config_hash != current.config_hash {
        return stale(
            sink,
            &target,
            StaleCategory::Config,
            &record.config_hash.to_string(),
            &current.config_hash.to_string(),
        );
    }

    if record.target_paths_hash != current.target_paths_hash {
        return stale(
            sink,
            &target,
            StaleCategory::TargetPaths,
            &record.target_paths_hash.to_string(),
            &current.target_paths_hash.to_string(),
        );
    }

    if record.dependency_paths_hash != current.dependency_paths_hash {
        return stale(
            sink,
            &target,
            StaleCategory::DependencyPaths,
            &record.dependency_paths_hash.to_string(),
            &current.dependency_paths_hash.to_string(),
        );
    }

    match current.output_hash {
        Some(output) if output == record.output_hash => {}
        Some(output) => {
            return stale(
                sink,
                &target,
                StaleCategory::Output,
                &record.output_hash.to_string(),
                &output.to_string(),
            );
        }
        None => {
            return stale(
                sink,
                &target,
                StaleCategory::Output,
                &record.output_hash.to_string(),
                "(output file missing)",
            );
        }
    }

    let current_hashes: HashMap<&Path, ContentHash> = current
        .source_files
        .iter()
        .map(|entry| (entry.path.as_path(), entry.hash))
        .collect();
    for entry in &record.source_files {
        match current_hashes.get(entry.path.as_path()) {
            Some(hash) if *hash == entry.hash => {}
            Some(hash) => {
                return stale_file(
                    sink,
                    &target,
                    &entry.path,
                    &format!("recorded {}, current {hash}", entry.hash),
                );
            }
            None => {
                return stale_file(sink, &target, &entry.path, "file is missing or unreadable");
            }
        }
    }
    // A file the record never saw (unreadable at record time, readable now)
    // also invalidates; the path-set hash cannot catch it.
    let recorded_paths: HashMap<&Path, ()> = record
        .source_files
        .iter()
        .map(|entry| (entry.path.as_path(), ()))
        .collect();
    for entry in &current.source_files {
        if !recorded_paths.contains_key(entry.path.as_path()) {
            return stale_file(sink, &target, &entry.path, "file is not in the record");
        }
    }

    sink.emit(trail::note_fresh(&target));
    CacheDecision::Fresh
}

fn stale(
    sink: &DiagnosticSink,
    target: &str,
    category: StaleCategory,
    old: &str,
    new: &str,
) -> CacheDecision {
    sink.emit(trail::note_invalidated(target, category.describe(), old, new));
    CacheDecision::Stale { category }
}

fn stale_file(sink: &DiagnosticSink, target: &str, file: &Path, detail: &str) -> CacheDecision {
    sink.emit(trail::note_invalidated_file(target, file, detail));
    CacheDecision::Stale {
        category: StaleCategory::SourceFile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn matched_pair() -> (TargetRecord, CurrentInputs) {
        let source_files = vec![
            SourceFileEntry {
                path: PathBuf::from("Sources/Bird.types.json"),
                hash: ContentHash::from_bytes(b"bird"),
            },
            SourceFileEntry {
                path: PathBuf::from("Vendor/Nest.types.json"),
                hash: ContentHash::from_bytes(b"nest"),
            },
        ];
        let record = TargetRecord {
            target: "MyLib".to_string(),
            test_bundle: None,
            generator_version: "0.1.0".to_string(),
            config_hash: ContentHash::from_bytes(b"config"),
            project_hash: ContentHash::from_bytes(b"project"),
            target_paths_hash: ContentHash::from_bytes(b"targets"),
            dependency_paths_hash: ContentHash::from_bytes(b"deps"),
            output_hash: ContentHash::from_bytes(b"output"),
            source_files: source_files.clone(),
            referenced_types_hash: None,
            referenced_types: BTreeMap::new(),
        };
        let current = CurrentInputs {
            generator_version: "0.1.0".to_string(),
            config_hash: ContentHash::from_bytes(b"config"),
            target_paths_hash: ContentHash::from_bytes(b"targets"),
            dependency_paths_hash: ContentHash::from_bytes(b"deps"),
            output_hash: Some(ContentHash::from_bytes(b"output")),
            source_files,
            referenced_types_hash: None,
        };
        (record, current)
    }

    fn check(record: &TargetRecord, current: &CurrentInputs) -> (CacheDecision, Vec<String>) {
        let sink = DiagnosticSink::new();
        let decision = check_validity(record, current, &sink);
        let codes = sink
            .diagnostics()
            .iter()
            .map(|d| format!("{}", d.code))
            .collect();
        (decision, codes)
    }

    #[test]
    fn matching_record_is_fresh_with_trail() {
        let (record, current) = matched_pair();
        let (decision, codes) = check(&record, &current);
        assert_eq!(decision, CacheDecision::Fresh);
        assert_eq!(codes, vec!["K502".to_string()]);
    }

    #[test]
    fn generator_version_change_invalidates() {
        let (record, mut current) = matched_pair();
        current.generator_version = "0.2.0".to_string();
        let (decision, codes) = check(&record, &current);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::GeneratorVersion
            }
        );
        assert_eq!(codes, vec!["K501".to_string()]);
    }

    #[test]
    fn config_change_invalidates() {
        let (record, mut current) = matched_pair();
        current.config_hash = ContentHash::from_bytes(b"new config");
        let (decision, _) = check(&record, &current);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::Config
            }
        );
    }

    #[test]
    fn target_path_set_change_invalidates() {
        let (record, mut current) = matched_pair();
        current.target_paths_hash = ContentHash::from_bytes(b"targets + one more");
        let (decision, _) = check(&record, &current);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::TargetPaths
            }
        );
    }

    #[test]
    fn dependency_path_set_change_invalidates() {
        let (record, mut current) = matched_pair();
        current.dependency_paths_hash = ContentHash::from_bytes(b"deps changed");
        let (decision, _) = check(&record, &current);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::DependencyPaths
            }
        );
    }

    #[test]
    fn edited_output_invalidates() {
        let (record, mut current) = matched_pair();
        current.output_hash = Some(ContentHash::from_bytes(b"hand-edited output"));
        let (decision, _) = check(&record, &current);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::Output
            }
        );
    }

    #[test]
    fn missing_output_invalidates() {
        let (record, mut current) = matched_pair();
        current.output_hash = None;
        let (decision, _) = check(&record, &current);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::Output
            }
        );
    }

    #[test]
    fn changed_file_invalidates_and_names_the_file() {
        let (record, mut current) = matched_pair();
        current.source_files[0].hash = ContentHash::from_bytes(b"bird v2");

        let sink = DiagnosticSink::new();
        let decision = check_validity(&record, &current, &sink);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::SourceFile
            }
        );
        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].location.as_ref().unwrap().path,
            PathBuf::from("Sources/Bird.types.json")
        );
    }

    #[test]
    fn vanished_file_invalidates() {
        let (record, mut current) = matched_pair();
        current.source_files.remove(1);
        let (decision, _) = check(&record, &current);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::SourceFile
            }
        );
    }

    #[test]
    fn unrecorded_file_invalidates() {
        let (record, mut current) = matched_pair();
        current.source_files.push(SourceFileEntry {
            path: PathBuf::from("Sources/New.types.json"),
            hash: ContentHash::from_bytes(b"new"),
        });
        let (decision, _) = check(&record, &current);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::SourceFile
            }
        );
    }

    #[test]
    fn first_mismatch_in_order_wins() {
        // Both the config and a source file changed; config is checked
        // first and is the only diagnostic emitted.
        let (record, mut current) = matched_pair();
        current.config_hash = ContentHash::from_bytes(b"new config");
        current.source_files[0].hash = ContentHash::from_bytes(b"bird v2");

        let sink = DiagnosticSink::new();
        let decision = check_validity(&record, &current, &sink);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::Config
            }
        );
        assert_eq!(sink.diagnostics().len(), 1);
    }

    #[test]
    fn referenced_types_checked_before_config() {
        let (mut record, mut current) = matched_pair();
        record.referenced_types_hash = Some(ContentHash::from_bytes(b"Bird"));
        current.referenced_types_hash = Some(ContentHash::from_bytes(b"Bird:Nest"));
        current.config_hash = ContentHash::from_bytes(b"new config");

        let (decision, _) = check(&record, &current);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::ReferencedTypes
            }
        );
    }

    #[test]
    fn referenced_types_skipped_when_pruning_disabled() {
        let (mut record, current) = matched_pair();
        // Record was written with pruning on; the current run has it off.
        record.referenced_types_hash = Some(ContentHash::from_bytes(b"Bird"));
        let (decision, _) = check(&record, &current);
        assert_eq!(decision, CacheDecision::Fresh);
    }

    #[test]
    fn record_without_scan_is_stale_under_pruning() {
        let (record, mut current) = matched_pair();
        current.referenced_types_hash = Some(ContentHash::from_bytes(b"Bird"));
        let (decision, _) = check(&record, &current);
        assert_eq!(
            decision,
            CacheDecision::Stale {
                category: StaleCategory::ReferencedTypes
            }
        );
    }

    #[test]
    fn matching_referenced_types_validate() {
        let (mut record, mut current) = matched_pair();
        record.referenced_types_hash = Some(ContentHash::from_bytes(b"Bird:Nest"));
        current.referenced_types_hash = Some(ContentHash::from_bytes(b"Bird:Nest"));
        let (decision, codes) = check(&record, &current);
        assert_eq!(decision, CacheDecision::Fresh);
        assert_eq!(codes, vec!["K502".to_string()]);
    }
}
