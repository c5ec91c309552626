//! Declaration file enumeration driven by `doppel.toml`.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use doppel_config::ProjectConfig;

use crate::traits::{SourceEnumerator, TargetSources};

/// The file name suffix identifying declaration files inside source
/// directories.
pub const DECL_FILE_SUFFIX: &str = ".types.json";

/// Enumerates declaration files from the directories each target lists in
/// `doppel.toml`.
///
/// Dependency files come from the transitive closure of the target's
/// declared dependencies. Configured directories that do not exist
/// contribute nothing; a project can list a tests directory before writing
/// any tests.
pub struct ConfigSourceEnumerator {
    config: Arc<ProjectConfig>,
    project_root: PathBuf,
}

impl ConfigSourceEnumerator {
    /// Creates an enumerator for one project.
    pub fn new(config: Arc<ProjectConfig>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            project_root: project_root.into(),
        }
    }

    fn collect_dirs(&self, dirs: &[PathBuf], out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for dir in dirs {
            self.walk(&self.project_root.join(dir), out)?;
        }
        Ok(())
    }

    fn walk(&self, dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.walk(&path, out)?;
            } else if path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().ends_with(DECL_FILE_SUFFIX))
            {
                out.push(path);
            }
        }
        Ok(())
    }
}

impl SourceEnumerator for ConfigSourceEnumerator {
    fn enumerate(&self, target: &str) -> std::io::Result<TargetSources> {
        let Some(target_config) = self.config.targets.get(target) else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("target '{target}' is not declared in the configuration"),
            ));
        };
        let module = if target_config.module.is_empty() {
            target.to_string()
        } else {
            target_config.module.clone()
        };

        let mut own = Vec::new();
        self.collect_dirs(&target_config.sources, &mut own)?;
        own.sort();
        own.dedup();

        // Transitive closure over declared dependency targets. Configuration
        // validation already rejected unknown names.
        let mut queue: VecDeque<&str> = target_config
            .dependencies
            .iter()
            .map(String::as_str)
            .collect();
        let mut visited: HashSet<&str> = queue.iter().copied().collect();
        let mut dependencies = Vec::new();
        while let Some(name) = queue.pop_front() {
            let Some(dep) = self.config.targets.get(name) else {
                continue;
            };
            self.collect_dirs(&dep.sources, &mut dependencies)?;
            for next in &dep.dependencies {
                if visited.insert(next.as_str()) {
                    queue.push_back(next.as_str());
                }
            }
        }
        dependencies.sort();
        dependencies.dedup();

        let mut test_files = Vec::new();
        self.collect_dirs(&target_config.tests, &mut test_files)?;
        test_files.sort();
        test_files.dedup();

        Ok(TargetSources {
            module,
            own,
            dependencies,
            test_files,
        })
    }
}
