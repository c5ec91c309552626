//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// The configuration file name looked for in a project root.
pub const CONFIG_FILE_NAME: &str = "doppel.toml";

/// Loads and validates a `doppel.toml` configuration from a project directory.
///
/// Reads `<project_dir>/doppel.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `doppel.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and cross-references resolve.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    for (name, target) in &config.targets {
        if target.sources.is_empty() {
            return Err(ConfigError::MissingField(format!(
                "targets.{name}.sources"
            )));
        }
        for dep in &target.dependencies {
            if !config.targets.contains_key(dep) {
                return Err(ConfigError::UnknownTarget(dep.clone()));
            }
            if dep == name {
                return Err(ConfigError::ValidationError(format!(
                    "target '{name}' depends on itself"
                )));
            }
        }
    }
    for requested in &config.generate.targets {
        if !config.targets.contains_key(requested) {
            return Err(ConfigError::UnknownTarget(requested.clone()));
        }
    }
    Ok(())
}
