//! Project discovery and diagnostic output shared by the subcommands.

use std::path::{Path, PathBuf};

use doppel_config::loader::CONFIG_FILE_NAME;
use doppel_diagnostics::{Diagnostic, DiagnosticRenderer, Severity, TerminalRenderer};

use crate::GlobalArgs;

/// Walks up from `start` looking for a directory containing `doppel.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(CONFIG_FILE_NAME).is_file() {
            return Ok(dir);
        }
        if !dir.pop() {
            return Err(format!(
                "no {CONFIG_FILE_NAME} found in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root from the `--config` flag or the current
/// directory.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match &global.config {
        Some(config) => {
            let path = PathBuf::from(config);
            if !path.is_file() {
                return Err(format!("configuration file not found: {}", path.display()).into());
            }
            Ok(path
                .parent()
                .map(Path::to_path_buf)
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(".")))
        }
        None => find_project_root(&std::env::current_dir()?),
    }
}

/// Selects the diagnostics the verbosity flags allow through.
///
/// Errors always show; warnings are dropped under `--quiet`; notes and help
/// (the cache and opacity trails) show only under `--verbose`.
pub fn visible_diagnostics<'a>(
    diagnostics: &'a [Diagnostic],
    global: &GlobalArgs,
) -> Vec<&'a Diagnostic> {
    diagnostics
        .iter()
        .filter(|d| match d.severity {
            Severity::Error => true,
            Severity::Warning => !global.quiet,
            Severity::Note | Severity::Help => global.verbose,
        })
        .collect()
}

/// Renders the visible diagnostics to stderr.
pub fn render_diagnostics(diagnostics: &[Diagnostic], global: &GlobalArgs) {
    let renderer = TerminalRenderer::new(global.color);
    for diag in visible_diagnostics(diagnostics, global) {
        eprint!("{}", renderer.render(diag));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doppel_diagnostics::{Category, DiagnosticCode};

    fn global(quiet: bool, verbose: bool) -> GlobalArgs {
        GlobalArgs {
            quiet,
            verbose,
            color: false,
            config: None,
        }
    }

    #[test]
    fn find_project_root_in_current_dir() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "[project]\nname = \"p\"").unwrap();
        let root = find_project_root(tmp.path()).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_project_root_in_parent() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "[project]\nname = \"p\"").unwrap();
        let sub = tmp.path().join("decls").join("core");
        std::fs::create_dir_all(&sub).unwrap();
        let root = find_project_root(&sub).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_project_root_missing_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(find_project_root(tmp.path()).is_err());
    }

    #[test]
    fn explicit_config_flag_resolves_to_its_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config, "[project]\nname = \"p\"").unwrap();
        let global = GlobalArgs {
            quiet: false,
            verbose: false,
            color: false,
            config: Some(config.to_string_lossy().into_owned()),
        };
        assert_eq!(resolve_project_root(&global).unwrap(), tmp.path());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let global = GlobalArgs {
            quiet: false,
            verbose: false,
            color: false,
            config: Some("/nonexistent/doppel.toml".to_string()),
        };
        assert!(resolve_project_root(&global).is_err());
    }

    #[test]
    fn verbosity_gating() {
        let error = DiagnosticCode::new(Category::Error, 101);
        let cache = DiagnosticCode::new(Category::Cache, 502);
        let warn = DiagnosticCode::new(Category::Warning, 201);
        let diags = vec![
            Diagnostic::error(error, "boom"),
            Diagnostic::warning(warn, "conflicting kind"),
            Diagnostic::note(cache, "skipping generation"),
        ];

        let default: Vec<_> = visible_diagnostics(&diags, &global(false, false))
            .iter()
            .map(|d| d.severity)
            .collect();
        assert_eq!(default, vec![Severity::Error, Severity::Warning]);

        let quiet: Vec<_> = visible_diagnostics(&diags, &global(true, false))
            .iter()
            .map(|d| d.severity)
            .collect();
        assert_eq!(quiet, vec![Severity::Error]);

        let verbose = visible_diagnostics(&diags, &global(false, true));
        assert_eq!(verbose.len(), 3);
    }
}
