//! Collaborator seams of the generation pipeline.
//!
//! The orchestrator does not read project layouts, parse declaration
//! syntax, or decide output formatting itself; those jobs sit behind the
//! traits here so a host tool can swap its own implementations in. The glue
//! implementations shipped in this crate cover the file-based workflow:
//! directory enumeration from `doppel.toml`, JSON declaration files, and a
//! plain-text interface dump.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use doppel_common::Interner;
use doppel_flatten::FlattenedType;
use doppel_model::{RawType, Typealias};

/// The declaration files enumerated for one target.
#[derive(Debug, Clone, Default)]
pub struct TargetSources {
    /// The target's product module name.
    pub module: String,

    /// The target's own declaration files, sorted.
    pub own: Vec<PathBuf>,

    /// Declaration files of every transitive dependency target, sorted.
    pub dependencies: Vec<PathBuf>,

    /// Test declaration files, consulted only when pruning.
    pub test_files: Vec<PathBuf>,
}

impl TargetSources {
    /// Own and dependency files together, the set cache records hash.
    pub fn generation_inputs(&self) -> Vec<PathBuf> {
        let mut all = self.own.clone();
        all.extend(self.dependencies.iter().cloned());
        all
    }
}

/// Maps a target name to the declaration files that feed its generation.
pub trait SourceEnumerator: Send + Sync {
    /// Enumerates the declaration files for one target.
    fn enumerate(&self, target: &str) -> std::io::Result<TargetSources>;
}

/// The declarations parsed out of one file.
#[derive(Debug, Clone, Default)]
pub struct ParsedDecls {
    /// Partial type declarations, one per declared (or extended) type.
    pub types: Vec<RawType>,

    /// Typealias declarations.
    pub aliases: Vec<Typealias>,
}

/// A declaration file that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("failed to parse {path}: {reason}")]
pub struct ParseError {
    /// The file that failed.
    pub path: PathBuf,
    /// Description of the failure.
    pub reason: String,
}

/// Parses declaration files into the raw type model.
pub trait DeclParser: Send + Sync {
    /// Parses one declaration file.
    ///
    /// `module` is the fallback module attribution (the enumerating
    /// target's product module); a file may override it. `in_dependency`
    /// marks declarations that came from a dependency target rather than
    /// the generated target itself.
    fn parse(
        &self,
        path: &Path,
        module: &str,
        in_dependency: bool,
        interner: &Interner,
    ) -> Result<ParsedDecls, ParseError>;
}

/// Renders flattened types into the generated file's content.
pub trait Renderer: Send + Sync {
    /// Produces the full text of one target's generated file.
    fn render(&self, module: &str, types: &[Arc<FlattenedType>], interner: &Interner) -> String;
}

/// Extracts the type names a test declaration file references.
///
/// Used only when pruning. Implementations are fail-safe: a file that
/// cannot be read or understood references nothing, which shrinks the
/// pruning set and at worst regenerates a target that could have been
/// skipped.
pub trait ReferencedTypeScanner: Send + Sync {
    /// Returns the qualified type names referenced by one test file.
    fn scan(&self, path: &Path) -> BTreeSet<String>;
}
