//! Pipeline orchestration for the doppel generator.
//!
//! This crate wires the core crates into a runnable pipeline: per target, a
//! chain of scheduler tasks (extract, cache check, referenced-type scan,
//! parse, flatten, render+write) runs on one shared [`TaskGraph`], with the
//! cache check short-circuiting chains whose previous output is still
//! valid. Project-layout knowledge, declaration syntax, and output
//! formatting sit behind the collaborator traits in [`traits`]; the glue
//! implementations here cover the file-based workflow.
//!
//! [`TaskGraph`]: doppel_schedule::TaskGraph

#![warn(missing_docs)]

pub mod error;
pub mod generator;
pub mod parser;
pub mod render;
pub mod scan;
pub mod sources;
pub mod traits;

pub use error::GeneratorError;
pub use generator::{Collaborators, Generator, RunSummary, TargetOutcome, GENERATOR_VERSION};
pub use parser::JsonDeclParser;
pub use render::InterfaceDumpRenderer;
pub use scan::JsonReferenceScanner;
pub use sources::ConfigSourceEnumerator;
pub use traits::{
    DeclParser, ParseError, ParsedDecls, ReferencedTypeScanner, Renderer, SourceEnumerator,
    TargetSources,
};
