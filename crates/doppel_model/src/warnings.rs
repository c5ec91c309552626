//! Diagnostic codes and helpers for declaration-merge conflicts.
//!
//! Warning codes `W201`--`W203` cover non-fatal conflicts between partial
//! declarations of the same type: mismatched declaration kinds, mismatched
//! generic parameter lists, and conflicting alias redefinitions.

use doppel_diagnostics::{Category, Diagnostic, DiagnosticCode};

/// Conflicting declaration kinds across partial declarations.
pub const W201: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 201,
};

/// Conflicting generic parameter lists across partial declarations.
pub const W202: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 202,
};

/// A type alias redefined with a different target.
pub const W203: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 203,
};

/// Creates a warning for partial declarations disagreeing on a type's kind.
pub fn warn_kind_conflict(name: &str, kept: &str, discarded: &str) -> Diagnostic {
    Diagnostic::warning(
        W201,
        format!("conflicting declaration kinds for '{name}': {discarded} vs {kept}"),
    )
    .with_note(format!("keeping the later declaration ({kept})"))
}

/// Creates a warning for partial declarations disagreeing on a type's
/// generic parameter list.
pub fn warn_generic_params_conflict(name: &str) -> Diagnostic {
    Diagnostic::warning(
        W202,
        format!("conflicting generic parameter lists for '{name}'"),
    )
    .with_note("keeping the later declaration's parameters")
}

/// Creates a warning for an alias redefined with a different target.
pub fn warn_alias_redefinition(name: &str, scope: &str, kept: &str) -> Diagnostic {
    Diagnostic::warning(
        W203,
        format!("type alias '{name}' redefined in {scope}"),
    )
    .with_note(format!("keeping the first definition ({kept})"))
}
