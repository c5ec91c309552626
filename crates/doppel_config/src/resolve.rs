//! Resolution of requested targets to concrete generation inputs.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::PathBuf;

/// The file name suffix appended to defaulted output paths.
pub const GENERATED_FILE_SUFFIX: &str = "Doubles.generated.txt";

/// A requested target resolved against the configuration: concrete module
/// name, output path, and owning test bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// The target name as declared under `[targets.<name>]`.
    pub name: String,
    /// The product module name (target name when not overridden).
    pub module: String,
    /// The output file the rendered doubles are written to.
    pub output: PathBuf,
    /// The test bundle that owns the generated doubles, if any.
    pub test_bundle: Option<String>,
}

/// Resolves the configuration's requested targets to concrete generation
/// inputs.
///
/// An empty `generate.targets` list requests every declared target, in
/// declaration-name order. Explicit output paths must match the requested
/// target count one-to-one; otherwise each target defaults to
/// `<output_dir>/[<bundle>-]<module>Doubles.generated.txt`.
pub fn resolve_generation(config: &ProjectConfig) -> Result<Vec<ResolvedTarget>, ConfigError> {
    let requested: Vec<String> = if config.generate.targets.is_empty() {
        config.targets.keys().cloned().collect()
    } else {
        config.generate.targets.clone()
    };

    if !config.generate.outputs.is_empty() && config.generate.outputs.len() != requested.len() {
        return Err(ConfigError::MismatchedOutputs {
            targets: requested.len(),
            outputs: config.generate.outputs.len(),
        });
    }

    let mut resolved = Vec::with_capacity(requested.len());
    for (index, name) in requested.iter().enumerate() {
        let target = config
            .targets
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTarget(name.clone()))?;
        let module = if target.module.is_empty() {
            name.clone()
        } else {
            target.module.clone()
        };
        let output = match config.generate.outputs.get(index) {
            Some(path) => path.clone(),
            None => default_output_path(config, &module, target.test_bundle.as_deref()),
        };
        resolved.push(ResolvedTarget {
            name: name.clone(),
            module,
            output,
            test_bundle: target.test_bundle.clone(),
        });
    }
    Ok(resolved)
}

fn default_output_path(
    config: &ProjectConfig,
    module: &str,
    test_bundle: Option<&str>,
) -> PathBuf {
    let prefix = match test_bundle {
        Some(bundle) if bundle != module => format!("{bundle}-"),
        _ => String::new(),
    };
    config
        .generate
        .output_dir
        .join(format!("{prefix}{module}{GENERATED_FILE_SUFFIX}"))
}
