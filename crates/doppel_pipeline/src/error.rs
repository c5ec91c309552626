//! Pipeline errors and task-failure diagnostics.

use std::path::PathBuf;

use doppel_config::ConfigError;
use doppel_diagnostics::{Category, Diagnostic, DiagnosticCode};
use thiserror::Error;

/// A failure that aborts the run before any target chain starts.
///
/// Per-target failures never surface here: a target whose parse or render
/// stage fails is reported through the diagnostic sink while sibling targets
/// finish their runs.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The project configuration could not be loaded or resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A resolved output path points at an existing directory.
    #[error("output path '{}' is a directory", .0.display())]
    OutputIsDirectory(PathBuf),
}

/// A registered task returned an error.
pub const T401: DiagnosticCode = DiagnosticCode {
    category: Category::Task,
    number: 401,
};

/// A declaration file that could not be read or parsed.
pub const E105: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 105,
};

/// Creates the error diagnostic for a failed task.
pub fn error_task_failure(label: &str, message: &str) -> Diagnostic {
    Diagnostic::error(T401, format!("task '{label}' failed: {message}"))
}

/// Creates the error diagnostic for a declaration file that failed to parse.
///
/// The target keeps generating from the declarations that did parse; the
/// missing surface degrades the output the same way an unparsed dependency
/// would.
pub fn error_parse_failure(path: &std::path::Path, reason: &str) -> Diagnostic {
    Diagnostic::error(E105, format!("could not parse declaration file: {reason}"))
        .with_location(doppel_diagnostics::SourceLocation::file(path))
}
