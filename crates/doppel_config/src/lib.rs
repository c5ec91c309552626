//! Parsing and validation of `doppel.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a
//! strongly-typed [`ProjectConfig`] with requested-target resolution and
//! output path defaulting.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use resolve::{resolve_generation, ResolvedTarget};
pub use types::*;
