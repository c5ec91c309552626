//! Configuration types deserialized from `doppel.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The top-level project configuration parsed from `doppel.toml`.
///
/// Contains project metadata, target definitions, generation settings, and
/// cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Named compilation targets declared by the project.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
    /// Generation settings (requested targets, outputs, flags).
    #[serde(default)]
    pub generate: GenerateOptions,
    /// Incremental cache settings.
    #[serde(default)]
    pub cache: CacheOptions,
}

/// Core project metadata required in every `doppel.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
}

/// Configuration for a single compilation target.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// The product module name; defaults to the target name when empty.
    #[serde(default)]
    pub module: String,
    /// Directories scanned for this target's own declaration files.
    pub sources: Vec<PathBuf>,
    /// Names of other targets whose sources this target depends on
    /// (transitively enumerated).
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Directories scanned for test declaration files, used for pruning.
    #[serde(default)]
    pub tests: Vec<PathBuf>,
    /// The test bundle that owns this target's generated doubles, scoping
    /// the cache record name.
    #[serde(default)]
    pub test_bundle: Option<String>,
}

/// Generation settings from the `[generate]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// The targets to generate doubles for; empty means every declared target.
    pub targets: Vec<String>,
    /// Output file paths parallel to `targets`; empty means defaulted
    /// per-target paths under `output_dir`.
    pub outputs: Vec<PathBuf>,
    /// Directory that defaulted output paths are placed in.
    pub output_dir: PathBuf,
    /// Generate doubles only for interface types.
    pub only_interfaces: bool,
    /// Permit generation despite unresolved external ancestors, degrading
    /// affected types to partially opaque output.
    pub relaxed_linking: bool,
    /// Limit output to types referenced from test declaration files.
    pub prune: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            outputs: Vec::new(),
            output_dir: PathBuf::from("generated"),
            only_interfaces: false,
            relaxed_linking: true,
            prune: false,
        }
    }
}

impl GenerateOptions {
    /// Returns a stable fingerprint of the flags that change generated
    /// output. Recorded in cache records so a flag flip invalidates them.
    pub fn fingerprint(&self) -> String {
        format!(
            "only_interfaces={};relaxed_linking={};prune={}",
            self.only_interfaces, self.relaxed_linking, self.prune
        )
    }
}

/// Cache settings from the `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// The cache directory, relative to the project root.
    pub dir: PathBuf,
    /// Disables reading and writing the cache entirely.
    pub disabled: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".doppel-cache"),
            disabled: false,
        }
    }
}
