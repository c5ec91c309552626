//! The generation orchestrator.
//!
//! [`Generator::generate`] validates the configuration, then builds one
//! task chain per requested target on a shared [`TaskGraph`]:
//!
//! ```text
//! extract -> scan-refs -> check-cache -> parse -> flatten -> render+write
//! ```
//!
//! The cache check publishes a per-target short-circuit flag; when a
//! target's record validated, the downstream stages of its chain no-op. All
//! targets' parse stages feed the one shared [`RawTypeRepository`], and the
//! flatten stage selects each target's own module surface out of it. Every
//! flatten depends on every target's parse: the flattener memoizes resolved
//! surfaces, so no resolution may start until the repository is settled.
//! Failures stay inside the smallest unit that can continue without them: a
//! bad declaration file costs its declarations, a failed type costs that
//! type, and only configuration errors abort the run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use doppel_cache::{
    check_validity, trail, CacheStore, CurrentInputs, ReferencedScan, SourceFileEntry,
    SourceHasher, TargetRecord,
};
use doppel_common::{ContentHash, Interner};
use doppel_config::{resolve_generation, ProjectConfig, ResolvedTarget};
use doppel_diagnostics::{Diagnostic, DiagnosticSink};
use doppel_flatten::{FlattenOptions, FlattenedType, Flattener};
use doppel_model::RawTypeRepository;
use doppel_schedule::{Task, TaskError, TaskGraph};
use rayon::prelude::*;

use crate::error::{self, GeneratorError};
use crate::parser::JsonDeclParser;
use crate::render::InterfaceDumpRenderer;
use crate::scan::JsonReferenceScanner;
use crate::sources::ConfigSourceEnumerator;
use crate::traits::{
    DeclParser, ParsedDecls, ReferencedTypeScanner, Renderer, SourceEnumerator, TargetSources,
};

/// The version string recorded in cache records. Any change invalidates
/// every record.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The collaborator implementations a generation run is wired with.
#[derive(Clone)]
pub struct Collaborators {
    /// Maps target names to their declaration files.
    pub enumerator: Arc<dyn SourceEnumerator>,
    /// Parses declaration files into raw types and aliases.
    pub parser: Arc<dyn DeclParser>,
    /// Renders flattened types into the generated file's content.
    pub renderer: Arc<dyn Renderer>,
    /// Extracts referenced type names from test files, for pruning.
    pub scanner: Arc<dyn ReferencedTypeScanner>,
}

impl Collaborators {
    /// The file-based wiring: directory enumeration from the configuration,
    /// JSON declaration files, and the plain-text interface dump.
    pub fn file_based(config: Arc<ProjectConfig>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            enumerator: Arc::new(ConfigSourceEnumerator::new(config, project_root)),
            parser: Arc::new(JsonDeclParser),
            renderer: Arc::new(InterfaceDumpRenderer),
            scanner: Arc::new(JsonReferenceScanner),
        }
    }
}

/// What happened to one regenerated target.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    /// The target name.
    pub target: String,
    /// The output file the rendered doubles were written to.
    pub output: PathBuf,
    /// How many types were flattened and rendered.
    pub types_generated: usize,
    /// How many requested types failed to resolve (alias or inheritance
    /// cycles). Already reported through the diagnostic stream.
    pub failed_types: usize,
}

/// The aggregate result of one generation run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Targets that regenerated, with their outcomes.
    pub generated: Vec<TargetOutcome>,
    /// Targets served from a validated cache record, by name.
    pub from_cache: Vec<String>,
    /// Total error diagnostics emitted during the run.
    pub error_count: usize,
}

impl RunSummary {
    /// Returns `true` when some requested type failed to resolve.
    ///
    /// Cache problems and opacity never set this; they degrade silently.
    pub fn has_failed_types(&self) -> bool {
        self.generated.iter().any(|t| t.failed_types > 0)
    }
}

/// State a target's task chain threads from stage to stage.
///
/// Stages communicate through these slots instead of return values because
/// the scheduler's unit of work is an opaque closure; each stage fills the
/// slot the next stage reads, and the graph's dependency edges guarantee
/// the write happens before the read.
struct TargetState {
    resolved: ResolvedTarget,
    prior_record: Option<TargetRecord>,
    sources: Mutex<Option<TargetSources>>,
    scans: Mutex<Option<BTreeMap<PathBuf, ReferencedScan>>>,
    inputs: Mutex<Option<CurrentInputs>>,
    flattened: Mutex<Option<Vec<Arc<FlattenedType>>>>,
    failed_types: AtomicUsize,
    from_cache: AtomicBool,
    outcome: Mutex<Option<TargetOutcome>>,
}

impl TargetState {
    fn new(resolved: ResolvedTarget, prior_record: Option<TargetRecord>) -> Arc<Self> {
        Arc::new(Self {
            resolved,
            prior_record,
            sources: Mutex::new(None),
            scans: Mutex::new(None),
            inputs: Mutex::new(None),
            flattened: Mutex::new(None),
            failed_types: AtomicUsize::new(0),
            from_cache: AtomicBool::new(false),
            outcome: Mutex::new(None),
        })
    }
}

/// Everything the stage closures share.
struct Shared {
    config: Arc<ProjectConfig>,
    project_root: PathBuf,
    interner: Arc<Interner>,
    sink: Arc<DiagnosticSink>,
    repo: Arc<RawTypeRepository>,
    flattener: Arc<Flattener>,
    store: Option<CacheStore>,
    collab: Collaborators,
}

/// Runs the generation pipeline for one project.
pub struct Generator {
    shared: Arc<Shared>,
}

impl Generator {
    /// Creates a generator over a loaded configuration.
    pub fn new(
        config: Arc<ProjectConfig>,
        project_root: impl Into<PathBuf>,
        collab: Collaborators,
    ) -> Self {
        let project_root = project_root.into();
        let interner = Arc::new(Interner::new());
        let sink = Arc::new(DiagnosticSink::new());
        let repo = Arc::new(RawTypeRepository::new());
        let flattener = Arc::new(Flattener::new(
            Arc::clone(&repo),
            Arc::clone(&interner),
            Arc::clone(&sink),
            FlattenOptions {
                relaxed_linking: config.generate.relaxed_linking,
            },
        ));
        let store = if config.cache.disabled {
            None
        } else {
            Some(CacheStore::new(project_root.join(&config.cache.dir)))
        };
        Self {
            shared: Arc::new(Shared {
                config,
                project_root,
                interner,
                sink,
                repo,
                flattener,
                store,
                collab,
            }),
        }
    }

    /// Every diagnostic emitted so far, in emission order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.shared.sink.diagnostics()
    }

    /// Runs the pipeline for every requested target.
    ///
    /// Returns an error only for configuration problems found before any
    /// scheduling; per-target and per-type failures are reported through
    /// the diagnostic stream and reflected in the summary.
    pub fn generate(&self) -> Result<RunSummary, GeneratorError> {
        let shared = &self.shared;
        let targets = resolve_generation(&shared.config)?;
        for target in &targets {
            let output = absolute_output(&shared.project_root, &target.output);
            if output.is_dir() {
                return Err(GeneratorError::OutputIsDirectory(output));
            }
        }

        let project_hash = project_identity_hash(&shared.config);
        let graph = TaskGraph::new();
        let mut states = Vec::with_capacity(targets.len());
        let mut parse_tasks = Vec::with_capacity(targets.len());
        for resolved in targets {
            let prior_record = shared.store.as_ref().and_then(|store| {
                store.load_current(
                    &resolved.name,
                    resolved.test_bundle.as_deref(),
                    GENERATOR_VERSION,
                    project_hash,
                    &shared.sink,
                )
            });
            let state = TargetState::new(resolved, prior_record);
            parse_tasks.push(self.register_parse_chain(&graph, &state));
            states.push(state);
        }
        // Flattening reads the shared repository and memoizes what it
        // resolves; it must not start until every target's parse has merged.
        for state in &states {
            self.register_flatten_chain(&graph, state, &parse_tasks);
        }

        graph.run();
        graph.wait_for_all();
        for failure in graph.take_failures() {
            shared
                .sink
                .emit(error::error_task_failure(&failure.label, &failure.error.message));
        }

        let mut summary = RunSummary::default();
        for state in states {
            if state.from_cache.load(Ordering::Acquire) {
                summary.from_cache.push(state.resolved.name.clone());
            } else if let Some(outcome) = state.outcome.lock().unwrap().take() {
                summary.generated.push(outcome);
            }
        }
        summary.error_count = shared.sink.error_count();
        Ok(summary)
    }

    /// Registers `extract -> scan -> check-cache -> parse` for one target
    /// and returns the parse task for cross-target flatten edges.
    fn register_parse_chain(&self, graph: &TaskGraph, state: &Arc<TargetState>) -> Arc<Task> {
        let name = &state.resolved.name;
        let pruning = self.shared.config.generate.prune;

        let extract = {
            let shared = Arc::clone(&self.shared);
            let state = Arc::clone(state);
            Task::new(format!("extract:{name}"), move || {
                stage_extract(&shared, &state)
            })
        };
        let scan = {
            let shared = Arc::clone(&self.shared);
            let state = Arc::clone(state);
            Task::new(format!("scan:{name}"), move || {
                if pruning {
                    stage_scan(&shared, &state);
                }
                Ok(())
            })
        };
        let check = {
            let shared = Arc::clone(&self.shared);
            let state = Arc::clone(state);
            Task::new(format!("check-cache:{name}"), move || {
                stage_check_cache(&shared, &state);
                Ok(())
            })
        };
        let parse = {
            let shared = Arc::clone(&self.shared);
            let state = Arc::clone(state);
            Task::new(format!("parse:{name}"), move || {
                stage_parse(&shared, &state);
                Ok(())
            })
        };

        graph.register(&extract, &[]);
        graph.register(&scan, &[Arc::clone(&extract)]);
        graph.register(&check, &[Arc::clone(&extract), Arc::clone(&scan)]);
        graph.register(&parse, &[Arc::clone(&check)]);
        parse
    }

    /// Registers `flatten -> render+write` for one target. The flatten node
    /// depends on every target's parse, not just its own: a later parse can
    /// merge more members into a type this target flattens.
    fn register_flatten_chain(
        &self,
        graph: &TaskGraph,
        state: &Arc<TargetState>,
        parse_tasks: &[Arc<Task>],
    ) {
        let name = &state.resolved.name;

        let flatten = {
            let shared = Arc::clone(&self.shared);
            let state = Arc::clone(state);
            Task::new(format!("flatten:{name}"), move || {
                stage_flatten(&shared, &state);
                Ok(())
            })
        };
        let render = {
            let shared = Arc::clone(&self.shared);
            let state = Arc::clone(state);
            Task::new(format!("render:{name}"), move || {
                stage_render(&shared, &state)
            })
        };

        graph.register(&flatten, parse_tasks);
        graph.register(&render, &[Arc::clone(&flatten)]);
    }
}

fn stage_extract(shared: &Shared, state: &TargetState) -> Result<(), TaskError> {
    let sources = shared
        .collab
        .enumerator
        .enumerate(&state.resolved.name)
        .map_err(|e| TaskError::new(e.to_string()))?;
    *state.sources.lock().unwrap() = Some(sources);
    Ok(())
}

/// Scans the target's test files for referenced type names, reusing a prior
/// record's scan for any file whose content hash is unchanged.
fn stage_scan(shared: &Shared, state: &TargetState) {
    let guard = state.sources.lock().unwrap();
    let Some(sources) = guard.as_ref() else {
        return;
    };
    let recorded = state
        .prior_record
        .as_ref()
        .map(|r| &r.referenced_types);

    let mut scans = BTreeMap::new();
    for path in &sources.test_files {
        let Ok(hash) = SourceHasher::hash_file(path) else {
            continue;
        };
        let key = relative_to(&shared.project_root, path);
        let types = match recorded.and_then(|m| m.get(&key)) {
            Some(prior) if prior.hash == hash => prior.types.clone(),
            _ => shared.collab.scanner.scan(path),
        };
        scans.insert(key, ReferencedScan { hash, types });
    }
    *state.scans.lock().unwrap() = Some(scans);
}

/// Recomputes the current input hashes and compares them against the prior
/// record, publishing the short-circuit flag on a fresh hit.
fn stage_check_cache(shared: &Shared, state: &TargetState) {
    if shared.store.is_none() {
        return;
    }
    let guard = state.sources.lock().unwrap();
    let Some(sources) = guard.as_ref() else {
        return;
    };

    let referenced_types_hash = if shared.config.generate.prune {
        let scans = state.scans.lock().unwrap();
        let names: BTreeSet<&String> = scans
            .iter()
            .flat_map(|m| m.values())
            .flat_map(|scan| scan.types.iter())
            .collect();
        Some(SourceHasher::hash_names(names.iter().map(|n| n.as_str())))
    } else {
        None
    };

    let output = absolute_output(&shared.project_root, &state.resolved.output);
    let inputs = CurrentInputs {
        generator_version: GENERATOR_VERSION.to_string(),
        config_hash: config_slice_hash(&shared.config, &state.resolved),
        target_paths_hash: SourceHasher::hash_paths(&relativize(
            &shared.project_root,
            &sources.own,
        )),
        dependency_paths_hash: SourceHasher::hash_paths(&relativize(
            &shared.project_root,
            &sources.dependencies,
        )),
        output_hash: SourceHasher::hash_file(&output).ok(),
        source_files: hash_source_files(&shared.project_root, &sources.generation_inputs()),
        referenced_types_hash,
    };

    if let Some(record) = &state.prior_record {
        if check_validity(record, &inputs, &shared.sink).is_fresh() {
            state.from_cache.store(true, Ordering::Release);
        }
    }
    *state.inputs.lock().unwrap() = Some(inputs);
}

/// Parses the target's own and dependency declaration files into the shared
/// repository, fanning out per file.
fn stage_parse(shared: &Shared, state: &TargetState) {
    if state.from_cache.load(Ordering::Acquire) {
        return;
    }
    let guard = state.sources.lock().unwrap();
    let Some(sources) = guard.as_ref() else {
        return;
    };

    let files: Vec<(&PathBuf, bool)> = sources
        .own
        .iter()
        .map(|p| (p, false))
        .chain(sources.dependencies.iter().map(|p| (p, true)))
        .collect();
    let parsed: Vec<_> = files
        .par_iter()
        .map(|(path, in_dependency)| {
            shared
                .collab
                .parser
                .parse(path, &sources.module, *in_dependency, &shared.interner)
        })
        .collect();

    for result in parsed {
        match result {
            Ok(ParsedDecls { types, aliases }) => {
                for raw in types {
                    shared.repo.add_raw_type(raw, &shared.interner, &shared.sink);
                }
                for alias in aliases {
                    shared
                        .repo
                        .add_typealias(alias, &shared.interner, &shared.sink);
                }
            }
            Err(e) => {
                let path = relative_to(&shared.project_root, &e.path);
                shared
                    .sink
                    .emit(error::error_parse_failure(&path, &e.reason));
            }
        }
    }
}

/// Flattens the target module's top-level mockable types, honoring pruning.
fn stage_flatten(shared: &Shared, state: &TargetState) {
    if state.from_cache.load(Ordering::Acquire) {
        return;
    }
    let module = {
        let guard = state.sources.lock().unwrap();
        let Some(sources) = guard.as_ref() else {
            return;
        };
        shared.interner.get_or_intern(&sources.module)
    };

    let referenced: Option<BTreeSet<String>> = if shared.config.generate.prune {
        let scans = state.scans.lock().unwrap();
        Some(
            scans
                .iter()
                .flat_map(|m| m.values())
                .flat_map(|scan| scan.types.iter().cloned())
                .collect(),
        )
    } else {
        None
    };

    let names = shared
        .repo
        .top_level_mockable(shared.config.generate.only_interfaces, &shared.interner);
    let mut flattened = Vec::new();
    for name in names {
        let in_module = shared
            .repo
            .lookup(name)
            .map_or(false, |raw| raw.module == module);
        if !in_module {
            continue;
        }
        if let Some(referenced) = &referenced {
            if !referenced.contains(shared.interner.resolve(name)) {
                continue;
            }
        }
        match shared.flattener.flatten(name) {
            Some(flat) => flattened.push(flat),
            None => {
                state.failed_types.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
    *state.flattened.lock().unwrap() = Some(flattened);
}

/// Renders the flattened surface, writes the output file, and persists a
/// fresh cache record for the regenerated target.
fn stage_render(shared: &Shared, state: &TargetState) -> Result<(), TaskError> {
    if state.from_cache.load(Ordering::Acquire) {
        return Ok(());
    }
    let Some(types) = state.flattened.lock().unwrap().take() else {
        return Ok(());
    };
    let module = {
        let guard = state.sources.lock().unwrap();
        match guard.as_ref() {
            Some(sources) => sources.module.clone(),
            None => return Ok(()),
        }
    };

    let rendered = shared
        .collab
        .renderer
        .render(&module, &types, &shared.interner);
    let output = absolute_output(&shared.project_root, &state.resolved.output);
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| TaskError::new(format!("creating {}: {e}", parent.display())))?;
    }
    std::fs::write(&output, &rendered)
        .map_err(|e| TaskError::new(format!("writing {}: {e}", output.display())))?;

    if let Some(store) = &shared.store {
        let inputs = state.inputs.lock().unwrap().take();
        if let Some(inputs) = inputs {
            let record = TargetRecord {
                target: state.resolved.name.clone(),
                test_bundle: state.resolved.test_bundle.clone(),
                generator_version: GENERATOR_VERSION.to_string(),
                config_hash: inputs.config_hash,
                project_hash: project_identity_hash(&shared.config),
                target_paths_hash: inputs.target_paths_hash,
                dependency_paths_hash: inputs.dependency_paths_hash,
                output_hash: ContentHash::from_bytes(rendered.as_bytes()),
                source_files: inputs.source_files,
                referenced_types_hash: inputs.referenced_types_hash,
                referenced_types: state.scans.lock().unwrap().take().unwrap_or_default(),
            };
            if let Err(e) = store.store(&record) {
                shared
                    .sink
                    .emit(trail::warn_record_unwritable(&record.display_name(), &e.to_string()));
            }
        }
    }

    *state.outcome.lock().unwrap() = Some(TargetOutcome {
        target: state.resolved.name.clone(),
        output,
        types_generated: types.len(),
        failed_types: state.failed_types.load(Ordering::Relaxed),
    });
    Ok(())
}

/// Hash of the configuration slice that affects one target's output.
fn config_slice_hash(config: &ProjectConfig, resolved: &ResolvedTarget) -> ContentHash {
    let mut parts = vec![
        format!("target={}", resolved.name),
        format!("module={}", resolved.module),
        format!("output={}", resolved.output.display()),
        format!("bundle={}", resolved.test_bundle.as_deref().unwrap_or("")),
        config.generate.fingerprint(),
    ];
    if let Some(target) = config.targets.get(&resolved.name) {
        for dir in &target.sources {
            parts.push(format!("source={}", dir.display()));
        }
        for dep in &target.dependencies {
            parts.push(format!("dependency={dep}"));
        }
        for dir in &target.tests {
            parts.push(format!("tests={}", dir.display()));
        }
    }
    ContentHash::from_parts(parts)
}

/// Hash identifying the whole project configuration. Records written
/// against a different project identity are discarded at load time.
fn project_identity_hash(config: &ProjectConfig) -> ContentHash {
    let mut parts = vec![format!("project={}", config.project.name)];
    parts.extend(config.targets.keys().map(|name| format!("target={name}")));
    ContentHash::from_parts(parts)
}

fn absolute_output(project_root: &Path, output: &Path) -> PathBuf {
    if output.is_absolute() {
        output.to_path_buf()
    } else {
        project_root.join(output)
    }
}

fn relative_to(project_root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(project_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

fn relativize(project_root: &Path, paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|p| relative_to(project_root, p))
        .collect()
}

/// Hashes source files by absolute path, recording project-relative paths
/// so records survive a project checkout moving on disk.
fn hash_source_files(project_root: &Path, paths: &[PathBuf]) -> Vec<SourceFileEntry> {
    let mut entries: Vec<SourceFileEntry> = SourceHasher::hash_files(paths)
        .into_iter()
        .map(|entry| SourceFileEntry {
            path: relative_to(project_root, &entry.path),
            hash: entry.hash,
        })
        .collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use doppel_config::load_config_from_str;

    const CONFIG: &str = r#"
[project]
name = "birdwatch"

[targets.Core]
sources = ["decls/core"]
tests = ["decls/tests"]
"#;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn generator(root: &Path, toml: &str) -> Generator {
        let config = Arc::new(load_config_from_str(toml).unwrap());
        let collab = Collaborators::file_based(Arc::clone(&config), root);
        Generator::new(config, root, collab)
    }

    fn bird_decls(root: &Path) {
        write(
            root,
            "decls/core/animal.types.json",
            r#"{"types": [{
                "name": "Animal",
                "kind": "class",
                "members": [{"kind": "method", "name": "breathe"}]
            }]}"#,
        );
        write(
            root,
            "decls/core/bird.types.json",
            r#"{"types": [{
                "name": "Bird",
                "kind": "class",
                "inherited": [{"name": "Animal"}],
                "members": [{"kind": "method", "name": "fly"}]
            }]}"#,
        );
    }

    #[test]
    fn end_to_end_generates_flattened_surface() {
        let dir = tempfile::tempdir().unwrap();
        bird_decls(dir.path());

        let summary = generator(dir.path(), CONFIG).generate().unwrap();
        assert_eq!(summary.generated.len(), 1);
        assert!(summary.from_cache.is_empty());
        assert_eq!(summary.generated[0].types_generated, 2);
        assert_eq!(summary.generated[0].failed_types, 0);

        let output =
            std::fs::read_to_string(dir.path().join("generated/CoreDoubles.generated.txt"))
                .unwrap();
        assert!(output.contains("class Bird"));
        assert!(output.contains("class Animal"));
        // Bird's surface carries the inherited member.
        let bird_section = output.split("class Bird").nth(1).unwrap();
        assert!(bird_section.contains("fly"));
        assert!(bird_section.contains("breathe"));
    }

    #[test]
    fn second_run_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        bird_decls(dir.path());

        let first = generator(dir.path(), CONFIG).generate().unwrap();
        assert_eq!(first.generated.len(), 1);

        let gen = generator(dir.path(), CONFIG);
        let second = gen.generate().unwrap();
        assert!(second.generated.is_empty());
        assert_eq!(second.from_cache, vec!["Core".to_string()]);
        assert!(gen
            .diagnostics()
            .iter()
            .any(|d| format!("{}", d.code) == "K502"));
    }

    #[test]
    fn editing_a_declaration_file_regenerates_with_trail() {
        let dir = tempfile::tempdir().unwrap();
        bird_decls(dir.path());
        generator(dir.path(), CONFIG).generate().unwrap();

        write(
            dir.path(),
            "decls/core/bird.types.json",
            r#"{"types": [{
                "name": "Bird",
                "kind": "class",
                "inherited": [{"name": "Animal"}],
                "members": [{"kind": "method", "name": "fly"},
                            {"kind": "method", "name": "sing"}]
            }]}"#,
        );

        let gen = generator(dir.path(), CONFIG);
        let summary = gen.generate().unwrap();
        assert_eq!(summary.generated.len(), 1);
        assert!(summary.from_cache.is_empty());
        let trail: Vec<_> = gen
            .diagnostics()
            .into_iter()
            .filter(|d| format!("{}", d.code) == "K501")
            .collect();
        assert_eq!(trail.len(), 1);
        assert_eq!(
            trail[0].location.as_ref().unwrap().path,
            PathBuf::from("decls/core/bird.types.json")
        );
    }

    #[test]
    fn editing_the_output_regenerates() {
        let dir = tempfile::tempdir().unwrap();
        bird_decls(dir.path());
        generator(dir.path(), CONFIG).generate().unwrap();

        let output_path = dir.path().join("generated/CoreDoubles.generated.txt");
        std::fs::write(&output_path, "// hand edited\n").unwrap();

        let summary = generator(dir.path(), CONFIG).generate().unwrap();
        assert_eq!(summary.generated.len(), 1);
        let regenerated = std::fs::read_to_string(&output_path).unwrap();
        assert!(regenerated.contains("class Bird"));
    }

    #[test]
    fn cache_disabled_writes_no_records() {
        let dir = tempfile::tempdir().unwrap();
        bird_decls(dir.path());
        let toml = format!("{CONFIG}\n[cache]\ndisabled = true\n");

        let first = generator(dir.path(), &toml).generate().unwrap();
        assert_eq!(first.generated.len(), 1);
        assert!(!dir.path().join(".doppel-cache").exists());

        let second = generator(dir.path(), &toml).generate().unwrap();
        assert_eq!(second.generated.len(), 1);
        assert!(second.from_cache.is_empty());
    }

    #[test]
    fn pruning_limits_output_to_referenced_types() {
        let dir = tempfile::tempdir().unwrap();
        bird_decls(dir.path());
        write(
            dir.path(),
            "decls/tests/bird_tests.types.json",
            r#"{"referenced_types": ["Bird"]}"#,
        );
        let toml = format!("{CONFIG}\n[generate]\nprune = true\n");

        let summary = generator(dir.path(), &toml).generate().unwrap();
        assert_eq!(summary.generated[0].types_generated, 1);
        let output =
            std::fs::read_to_string(dir.path().join("generated/CoreDoubles.generated.txt"))
                .unwrap();
        assert!(output.contains("class Bird"));
        assert!(!output.contains("class Animal"));
    }

    #[test]
    fn changing_the_referenced_set_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        bird_decls(dir.path());
        write(
            dir.path(),
            "decls/tests/bird_tests.types.json",
            r#"{"referenced_types": ["Bird"]}"#,
        );
        let toml = format!("{CONFIG}\n[generate]\nprune = true\n");
        generator(dir.path(), &toml).generate().unwrap();

        write(
            dir.path(),
            "decls/tests/bird_tests.types.json",
            r#"{"referenced_types": ["Bird", "Animal"]}"#,
        );
        let summary = generator(dir.path(), &toml).generate().unwrap();
        assert_eq!(summary.generated.len(), 1);
        assert_eq!(summary.generated[0].types_generated, 2);
    }

    #[test]
    fn unparseable_file_degrades_not_aborts() {
        let dir = tempfile::tempdir().unwrap();
        bird_decls(dir.path());
        write(dir.path(), "decls/core/broken.types.json", "not json {{{");

        let gen = generator(dir.path(), CONFIG);
        let summary = gen.generate().unwrap();
        // The parseable declarations still generate.
        assert_eq!(summary.generated.len(), 1);
        assert_eq!(summary.generated[0].types_generated, 2);
        assert!(summary.error_count >= 1);
        assert!(gen
            .diagnostics()
            .iter()
            .any(|d| format!("{}", d.code) == "E105"));
    }

    #[test]
    fn resolution_failure_counts_against_the_target() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "decls/core/cycle.types.json",
            r#"{"types": [
                {"name": "Chicken", "kind": "class", "inherited": [{"name": "Egg"}]},
                {"name": "Egg", "kind": "class", "inherited": [{"name": "Chicken"}]},
                {"name": "Bird", "kind": "class"}
            ]}"#,
        );

        let summary = generator(dir.path(), CONFIG).generate().unwrap();
        assert_eq!(summary.generated.len(), 1);
        let outcome = &summary.generated[0];
        // Bird generated; the two cycle participants failed.
        assert_eq!(outcome.types_generated, 1);
        assert_eq!(outcome.failed_types, 2);
        assert!(summary.has_failed_types());
    }

    #[test]
    fn multiple_targets_generate_independently() {
        let dir = tempfile::tempdir().unwrap();
        let toml = r#"
[project]
name = "birdwatch"

[targets.Base]
sources = ["decls/base"]

[targets.App]
sources = ["decls/app"]
dependencies = ["Base"]
"#;
        write(
            dir.path(),
            "decls/base/animal.types.json",
            r#"{"types": [{"name": "Animal", "kind": "class",
                "members": [{"kind": "method", "name": "breathe"}]}]}"#,
        );
        write(
            dir.path(),
            "decls/app/bird.types.json",
            r#"{"module": "App", "types": [{"name": "Bird", "kind": "class",
                "inherited": [{"name": "Animal"}],
                "members": [{"kind": "method", "name": "fly"}]}]}"#,
        );

        let summary = generator(dir.path(), toml).generate().unwrap();
        assert_eq!(summary.generated.len(), 2);

        let app = std::fs::read_to_string(dir.path().join("generated/AppDoubles.generated.txt"))
            .unwrap();
        // App's output carries only App's type, with the inherited surface.
        assert!(app.contains("class Bird"));
        assert!(!app.contains("class Animal"));
        assert!(app.contains("breathe"));

        let base = std::fs::read_to_string(dir.path().join("generated/BaseDoubles.generated.txt"))
            .unwrap();
        assert!(base.contains("class Animal"));
    }

    #[test]
    fn cross_target_partial_declarations_merge_before_flattening() {
        // Base declares Animal; App's sources extend Animal with another
        // member (attributed back to Base's module). Base's flatten must
        // see the merged surface no matter how the workers interleave, so
        // the run is repeated with caching off.
        let dir = tempfile::tempdir().unwrap();
        let toml = r#"
[project]
name = "birdwatch"

[cache]
disabled = true

[targets.Base]
sources = ["decls/base"]

[targets.App]
sources = ["decls/app"]
dependencies = ["Base"]
"#;
        write(
            dir.path(),
            "decls/base/animal.types.json",
            r#"{"types": [{"name": "Animal", "kind": "class",
                "members": [{"kind": "method", "name": "breathe"}]}]}"#,
        );
        write(
            dir.path(),
            "decls/app/animal_ext.types.json",
            r#"{"module": "Base", "types": [{"name": "Animal", "kind": "class",
                "members": [{"kind": "method", "name": "molt"}]}]}"#,
        );
        write(
            dir.path(),
            "decls/app/bird.types.json",
            r#"{"module": "App", "types": [{"name": "Bird", "kind": "class",
                "inherited": [{"name": "Animal"}],
                "members": [{"kind": "method", "name": "fly"}]}]}"#,
        );

        for _ in 0..8 {
            let summary = generator(dir.path(), toml).generate().unwrap();
            assert_eq!(summary.generated.len(), 2);

            let base =
                std::fs::read_to_string(dir.path().join("generated/BaseDoubles.generated.txt"))
                    .unwrap();
            let animal = base.split("class Animal").nth(1).unwrap();
            assert!(animal.contains("breathe"));
            assert!(animal.contains("molt"));

            let app =
                std::fs::read_to_string(dir.path().join("generated/AppDoubles.generated.txt"))
                    .unwrap();
            let bird = app.split("class Bird").nth(1).unwrap();
            assert!(bird.contains("fly"));
            assert!(bird.contains("breathe"));
            assert!(bird.contains("molt"));
        }
    }

    #[test]
    fn output_directory_collision_fails_before_scheduling() {
        let dir = tempfile::tempdir().unwrap();
        bird_decls(dir.path());
        std::fs::create_dir_all(dir.path().join("generated/CoreDoubles.generated.txt")).unwrap();

        let err = generator(dir.path(), CONFIG).generate().unwrap_err();
        assert!(matches!(err, GeneratorError::OutputIsDirectory(_)));
    }

    #[test]
    fn mismatched_outputs_fail_before_scheduling() {
        let dir = tempfile::tempdir().unwrap();
        bird_decls(dir.path());
        let toml = format!("{CONFIG}\n[generate]\noutputs = [\"a.txt\", \"b.txt\"]\n");

        let err = generator(dir.path(), &toml).generate().unwrap_err();
        assert!(matches!(err, GeneratorError::Config(_)));
    }
}
