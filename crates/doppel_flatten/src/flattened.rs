//! The immutable result of flattening one type.

use doppel_common::{Ident, Interner};
use doppel_model::{GenericParam, Member, TypeKind};
use std::collections::HashMap;

/// A type with its full observable surface resolved.
///
/// All inherited members are present with generics substituted per
/// inheritance edge, overridden ancestor copies suppressed, and members in
/// canonical order. A `FlattenedType` is immutable after construction and is
/// shared as `Arc<FlattenedType>` between the resolver's memo table and
/// concurrent renderer tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedType {
    /// The fully qualified type name.
    pub name: Ident,
    /// The module the type belongs to.
    pub module: Ident,
    /// The declaration kind.
    pub kind: TypeKind,
    /// Generic parameters still unbound after resolution, including
    /// parameters bubbled up from interface ancestors.
    pub generic_params: Vec<GenericParam>,
    /// The complete member surface in canonical order. Each member's
    /// `origin` names the type that declared it.
    pub members: Vec<Member>,
    /// The resolved ancestor chain in resolution order, rendered for
    /// diagnostics (e.g. `["Box<Int>", "Container<Int>"]`).
    pub ancestors: Vec<String>,
    /// `true` when at least one ancestor had no parsed declaration and
    /// relaxed linking degraded the result instead of failing.
    pub opaque: bool,
    /// Rendered names of the ancestors that could not be resolved.
    pub unresolved_ancestors: Vec<String>,
    /// Number of members per reduced signature. Renderers consult this to
    /// disambiguate generated names when distinct members reduce to the
    /// same overload signature.
    pub overload_counts: HashMap<String, u32>,
}

impl FlattenedType {
    /// Resolves the qualified type name.
    pub fn display_name<'a>(&self, interner: &'a Interner) -> &'a str {
        interner.resolve(self.name)
    }

    /// Returns `true` when unbound generic parameters remain.
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }

    /// Returns the members declared by the type itself (not inherited).
    pub fn own_members(&self) -> impl Iterator<Item = &Member> {
        let name = self.name;
        self.members.iter().filter(move |m| m.origin == name)
    }
}
