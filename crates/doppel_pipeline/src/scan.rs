//! The test-file reference scanner.
//!
//! Pruned generation only regenerates types that some test file actually
//! names. Test files carry their references as JSON:
//!
//! ```json
//! {"referenced_types": ["Bird", "Core.Nest"]}
//! ```
//!
//! Scanning is fail-safe in the regenerate direction: a missing or
//! malformed file contributes no references, which can only shrink the
//! referenced set and force regeneration, never skip it.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::traits::ReferencedTypeScanner;

/// Scans JSON test files for referenced type names.
pub struct JsonReferenceScanner;

#[derive(Deserialize)]
struct TestFileDecl {
    #[serde(default)]
    referenced_types: Vec<String>,
}

impl ReferencedTypeScanner for JsonReferenceScanner {
    fn scan(&self, path: &Path) -> BTreeSet<String> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return BTreeSet::new();
        };
        match serde_json::from_str::<TestFileDecl>(&content) {
            Ok(decl) => decl.referenced_types.into_iter().collect(),
            Err(_) => BTreeSet::new(),
        }
    }
}
