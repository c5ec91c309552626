//! The cache diagnostic trail.
//!
//! Every cache decision leaves a note: which category invalidated a record
//! (and what changed), or that a target was served from cache. The trail is
//! the only way a user can answer "why did this regenerate?", so emitting it
//! is not optional for the validity check.

use std::path::Path;

use doppel_diagnostics::{Category, Diagnostic, DiagnosticCode, SourceLocation};

/// A cached record was invalidated; the message names the category.
pub const K501: DiagnosticCode = DiagnosticCode {
    category: Category::Cache,
    number: 501,
};

/// A cached record validated; generation is skipped for the target.
pub const K502: DiagnosticCode = DiagnosticCode {
    category: Category::Cache,
    number: 502,
};

/// A record that could not be used at all: unreadable, corrupt, or written
/// by a different generator version or project state.
pub const K503: DiagnosticCode = DiagnosticCode {
    category: Category::Cache,
    number: 503,
};

/// Creates the trail note for a category mismatch.
pub fn note_invalidated(target: &str, category: &str, old: &str, new: &str) -> Diagnostic {
    Diagnostic::note(
        K501,
        format!("regenerating '{target}': {category} changed"),
    )
    .with_note(format!("recorded {old}, current {new}"))
}

/// Creates the trail note for a changed source file; names the file.
pub fn note_invalidated_file(target: &str, file: &Path, detail: &str) -> Diagnostic {
    Diagnostic::note(
        K501,
        format!("regenerating '{target}': source file changed"),
    )
    .with_location(SourceLocation::file(file))
    .with_note(detail.to_string())
}

/// Creates the trail note for a record that validated.
pub fn note_fresh(target: &str) -> Diagnostic {
    Diagnostic::note(
        K502,
        format!("skipping generation for '{target}': cached output is up to date"),
    )
}

/// Creates the trail note for a record discarded before category checks.
pub fn note_record_discarded(target: &str, reason: &str) -> Diagnostic {
    Diagnostic::note(K503, format!("ignoring cache record for '{target}': {reason}"))
}

/// Creates the warning for a record that could not be written.
pub fn warn_record_unwritable(target: &str, reason: &str) -> Diagnostic {
    Diagnostic::warning(
        K503,
        format!("could not write cache record for '{target}': {reason}"),
    )
    .with_note("the target will regenerate on the next run")
}

#[cfg(test)]
mod tests {
    use super::*;
    use doppel_diagnostics::Severity;
    use std::path::PathBuf;

    #[test]
    fn code_formats() {
        assert_eq!(format!("{K501}"), "K501");
        assert_eq!(format!("{K502}"), "K502");
        assert_eq!(format!("{K503}"), "K503");
    }

    #[test]
    fn invalidation_note_names_category_and_values() {
        let diag = note_invalidated("MyLib", "generator version", "0.1.0", "0.2.0");
        assert_eq!(diag.severity, Severity::Note);
        assert!(diag.message.contains("generator version"));
        assert!(diag.notes[0].contains("0.1.0"));
        assert!(diag.notes[0].contains("0.2.0"));
    }

    #[test]
    fn file_invalidation_note_names_the_file() {
        let diag = note_invalidated_file(
            "MyLib",
            &PathBuf::from("Sources/Bird.types.json"),
            "content hash changed",
        );
        assert_eq!(
            diag.location.unwrap().path,
            PathBuf::from("Sources/Bird.types.json")
        );
    }

    #[test]
    fn fresh_note_mentions_skipping() {
        let diag = note_fresh("MyLib");
        assert_eq!(diag.severity, Severity::Note);
        assert!(diag.message.contains("skipping generation"));
    }

    #[test]
    fn unwritable_record_is_a_warning() {
        let diag = warn_record_unwritable("MyLib", "permission denied");
        assert_eq!(diag.severity, Severity::Warning);
        assert!(diag.message.contains("permission denied"));
    }
}
