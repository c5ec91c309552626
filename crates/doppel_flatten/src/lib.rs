//! Type flattening.
//!
//! Merged raw types describe only their own declarations; generating a
//! usable double needs the type's complete observable surface. This crate
//! resolves each requested type against the repository: ancestors are
//! flattened recursively with generic arguments substituted along every
//! inheritance edge, typealiases in inheritance lists are expanded to a
//! fixed point, and overridden ancestor members are suppressed in favor of
//! the most derived declaration.
//!
//! Resolution is memoized per (type, generic bindings) and degrades
//! gracefully: an ancestor nobody parsed marks the result opaque rather
//! than failing it, unless strict linking is requested.

#![warn(missing_docs)]

pub mod errors;
pub mod flattened;
pub mod resolver;

pub use flattened::FlattenedType;
pub use resolver::{FlattenOptions, Flattener};
