//! Raw declared-type model for the doppel generator.
//!
//! This crate defines the parser-facing data model: [`RawType`] records of
//! declared types (merged from partial declarations), [`Member`] signatures
//! with their override and overload identity keys, structural [`TypeExpr`]
//! references supporting generic substitution, scoped type aliases, and the
//! thread-safe [`RawTypeRepository`] that concurrent parse tasks feed.
//!
//! Resolution of inheritance (flattening) lives in `doppel_flatten`; this
//! crate only stores what was declared.

#![warn(missing_docs)]

pub mod alias;
pub mod member;
pub mod repository;
pub mod types;
pub mod warnings;

pub use alias::{AliasCycle, AliasScope, Typealias, TypealiasIndex};
pub use member::{Member, MemberAttrs, MemberKind, Param, WhereClause};
pub use repository::RawTypeRepository;
pub use types::{GenericParam, Provenance, RawType, TypeExpr, TypeKind};
