//! Diagnostic codes and helpers for resolution failures.
//!
//! Error codes `E101`--`E104` cover failures that make a type impossible to
//! flatten (alias cycles, inheritance cycles, missing ancestors under strict
//! linking, unknown requested types). Linking note `N301` records the
//! opacity trail left behind when relaxed linking degrades a missing
//! ancestor instead of failing.

use doppel_diagnostics::{Category, Diagnostic, DiagnosticCode};

/// A type alias chain that revisits one of its own names.
pub const E101: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 101,
};

/// A type that inherits from itself, directly or transitively.
pub const E102: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 102,
};

/// An inherited type with no parsed declaration, under strict linking.
pub const E103: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 103,
};

/// A requested type with no parsed declaration.
pub const E104: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 104,
};

/// An inherited type with no parsed declaration, degraded to opacity under
/// relaxed linking.
pub const N301: DiagnosticCode = DiagnosticCode {
    category: Category::Linking,
    number: 301,
};

/// Creates a diagnostic for an alias cycle hit while resolving a type's
/// inheritance list.
pub fn error_alias_cycle(type_name: &str, chain: &str) -> Diagnostic {
    Diagnostic::error(
        E101,
        format!("type alias cycle while resolving '{type_name}': {chain}"),
    )
    .with_help("break the cycle by pointing one alias at a concrete type")
}

/// Creates a diagnostic for an inheritance cycle.
pub fn error_inheritance_cycle(chain: &str) -> Diagnostic {
    Diagnostic::error(E102, format!("inheritance cycle: {chain}"))
        .with_note("a type cannot inherit from itself, directly or through ancestors")
}

/// Creates a diagnostic for a missing ancestor under strict linking.
pub fn error_missing_ancestor(type_name: &str, ancestor: &str) -> Diagnostic {
    Diagnostic::error(
        E103,
        format!("'{type_name}' inherits from '{ancestor}', which has no parsed declaration"),
    )
    .with_help("enable relaxed linking to degrade missing ancestors to opaque results")
}

/// Creates a diagnostic for a requested type that was never declared.
pub fn error_unknown_type(name: &str) -> Diagnostic {
    Diagnostic::error(
        E104,
        format!("cannot resolve '{name}': no parsed declaration found"),
    )
}

/// Creates the opacity note left when relaxed linking skips a missing
/// ancestor.
pub fn note_opaque_ancestor(type_name: &str, ancestor: &str) -> Diagnostic {
    Diagnostic::note(
        N301,
        format!("'{type_name}' is opaque: ancestor '{ancestor}' has no parsed declaration"),
    )
    .with_note("the known surface is still generated; missing members are omitted")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_formats() {
        assert_eq!(format!("{E101}"), "E101");
        assert_eq!(format!("{E102}"), "E102");
        assert_eq!(format!("{E103}"), "E103");
        assert_eq!(format!("{E104}"), "E104");
        assert_eq!(format!("{N301}"), "N301");
    }

    #[test]
    fn alias_cycle_diagnostic() {
        let d = error_alias_cycle("Bird", "A -> B -> A");
        assert_eq!(d.code, E101);
        assert!(d.message.contains("Bird"));
        assert!(d.message.contains("A -> B -> A"));
    }

    #[test]
    fn inheritance_cycle_diagnostic() {
        let d = error_inheritance_cycle("Bird -> Animal -> Bird");
        assert_eq!(d.code, E102);
        assert!(!d.notes.is_empty());
    }

    #[test]
    fn missing_ancestor_diagnostic() {
        let d = error_missing_ancestor("Bird", "Animal");
        assert_eq!(d.code, E103);
        assert!(d.message.contains("Bird"));
        assert!(d.message.contains("Animal"));
    }

    #[test]
    fn unknown_type_diagnostic() {
        let d = error_unknown_type("Ghost");
        assert_eq!(d.code, E104);
        assert!(d.message.contains("Ghost"));
    }

    #[test]
    fn opaque_note_severity() {
        let d = note_opaque_ancestor("Bird", "Animal");
        assert_eq!(d.code, N301);
        assert_eq!(d.severity, doppel_diagnostics::Severity::Note);
    }
}
