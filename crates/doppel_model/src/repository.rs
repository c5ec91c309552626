//! The mutable repository of raw declared types and aliases.
//!
//! Parse tasks for different files run concurrently and all feed the same
//! repository, so merging is guarded by one mutex and the merged records are
//! canonical (sorted, deduplicated) — the order in which partial declarations
//! arrive never shows in a merged record.

use crate::alias::{AliasCycle, AliasScope, Typealias, TypealiasIndex};
use crate::types::{RawType, TypeKind};
use crate::warnings;
use doppel_common::{Ident, Interner};
use doppel_diagnostics::DiagnosticSink;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

/// Thread-safe store of every raw type and alias seen by the parse stage.
#[derive(Debug, Default)]
pub struct RawTypeRepository {
    inner: Mutex<RepositoryInner>,
}

#[derive(Debug, Default)]
struct RepositoryInner {
    types: HashMap<Ident, RawType>,
    aliases: TypealiasIndex,
}

impl RawTypeRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one partial declaration, merging it into any existing record
    /// with the same qualified name.
    ///
    /// Members, inherited expressions, contained names, and provenance are
    /// unioned. The kind and the generic parameter list are singular: a
    /// conflicting later value wins and a warning is emitted through `sink`.
    pub fn add_raw_type(&self, mut raw: RawType, interner: &Interner, sink: &DiagnosticSink) {
        let mut inner = self.inner.lock().unwrap();
        match inner.types.entry(raw.name) {
            Entry::Occupied(mut entry) => {
                merge_into(entry.get_mut(), raw, interner, sink);
                canonicalize(entry.get_mut(), interner);
            }
            Entry::Vacant(entry) => {
                canonicalize(&mut raw, interner);
                entry.insert(raw);
            }
        }
    }

    /// Adds a type alias to the scoped index.
    ///
    /// A conflicting redefinition for the same (scope, name) keeps the first
    /// target and warns; an identical redeclaration is accepted silently.
    pub fn add_typealias(&self, alias: Typealias, interner: &Interner, sink: &DiagnosticSink) {
        let mut inner = self.inner.lock().unwrap();
        let name = alias.name;
        let scope = alias.scope;
        if !inner.aliases.insert(alias) {
            let kept = inner
                .aliases
                .lookup(scope, name)
                .map(|t| t.render(interner))
                .unwrap_or_default();
            sink.emit(warnings::warn_alias_redefinition(
                interner.resolve(name),
                &scope.describe(interner),
                &kept,
            ));
        }
    }

    /// Returns a clone of the merged record for `name`, if any.
    ///
    /// Clone-out keeps the lock scope to the map access; the resolver works
    /// on its own copy.
    pub fn lookup(&self, name: Ident) -> Option<RawType> {
        self.inner.lock().unwrap().types.get(&name).cloned()
    }

    /// Returns `true` when a record for `name` exists.
    pub fn contains(&self, name: Ident) -> bool {
        self.inner.lock().unwrap().types.contains_key(&name)
    }

    /// Unwraps the alias chain starting at `name` through the given scopes.
    pub fn resolve_alias_chain(
        &self,
        name: Ident,
        scopes: &[AliasScope],
    ) -> Result<Option<crate::types::TypeExpr>, AliasCycle> {
        self.inner.lock().unwrap().aliases.resolve_chain(name, scopes)
    }

    /// Returns the names of top-level types eligible for double generation,
    /// sorted by name.
    ///
    /// Eligible means: no enclosing type, a mockable kind, and at least one
    /// partial declaration from the generated target itself (types seen only
    /// through dependencies are flattened on demand but never drive output).
    pub fn top_level_mockable(&self, only_interfaces: bool, interner: &Interner) -> Vec<Ident> {
        let inner = self.inner.lock().unwrap();
        let mut names: Vec<Ident> = inner
            .types
            .values()
            .filter(|t| t.is_top_level() && t.has_own_declaration())
            .filter(|t| {
                if only_interfaces {
                    t.kind == TypeKind::Interface
                } else {
                    t.kind.is_mockable()
                }
            })
            .map(|t| t.name)
            .collect();
        names.sort_by_cached_key(|n| interner.resolve(*n).to_string());
        names
    }

    /// Returns the number of distinct type records.
    pub fn type_count(&self) -> usize {
        self.inner.lock().unwrap().types.len()
    }

    /// Returns `true` when no types have been added.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().types.is_empty()
    }
}

/// Merges a later partial declaration into an existing record.
fn merge_into(existing: &mut RawType, incoming: RawType, interner: &Interner, sink: &DiagnosticSink) {
    if existing.kind != incoming.kind {
        sink.emit(warnings::warn_kind_conflict(
            interner.resolve(existing.name),
            incoming.kind.display_name(),
            existing.kind.display_name(),
        ));
        existing.kind = incoming.kind;
    }
    // An empty incoming list means the partial declaration did not restate
    // the generics (extensions usually don't); only a non-empty conflicting
    // list is a real disagreement.
    if !incoming.generic_params.is_empty() && incoming.generic_params != existing.generic_params {
        if !existing.generic_params.is_empty() {
            sink.emit(warnings::warn_generic_params_conflict(
                interner.resolve(existing.name),
            ));
        }
        existing.generic_params = incoming.generic_params;
    }
    if existing.parent.is_none() {
        existing.parent = incoming.parent;
    }
    // Module attribution follows the declaration parsed by the owning
    // target; a dependent target's fallback attribution never overrides it.
    if existing.module != incoming.module
        && !existing.has_own_declaration()
        && incoming.provenance.iter().any(|p| !p.in_dependency)
    {
        existing.module = incoming.module;
    }
    existing.members.extend(incoming.members);
    existing.inherited.extend(incoming.inherited);
    existing.contained.extend(incoming.contained);
    existing.provenance.extend(incoming.provenance);
}

/// Puts a record into canonical form: members sorted by their ordering key,
/// inherited expressions sorted by rendered form, contained names sorted by
/// resolved name, provenance sorted, all deduplicated.
fn canonicalize(raw: &mut RawType, interner: &Interner) {
    raw.members.sort_by_cached_key(|m| m.sort_key(interner));
    raw.members.dedup();
    raw.inherited.sort_by_cached_key(|e| e.render(interner));
    raw.inherited.dedup();
    raw.contained
        .sort_by_cached_key(|c| interner.resolve(*c).to_string());
    raw.contained.dedup();
    raw.provenance.sort();
    raw.provenance.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{Member, MemberAttrs, MemberKind, Param};
    use crate::types::{Provenance, TypeExpr};

    fn method(interner: &Interner, origin: &str, name: &str, param_ty: Option<&str>) -> Member {
        Member {
            kind: MemberKind::Method,
            name: interner.get_or_intern(name),
            generic_params: Vec::new(),
            params: param_ty
                .map(|ty| {
                    vec![Param::plain(
                        interner.get_or_intern("value"),
                        TypeExpr::name(interner.get_or_intern(ty)),
                    )]
                })
                .unwrap_or_default(),
            return_type: TypeExpr::name(interner.get_or_intern("Void")),
            where_clauses: Vec::new(),
            attrs: MemberAttrs::default(),
            origin: interner.get_or_intern(origin),
        }
    }

    fn partial(
        interner: &Interner,
        name: &str,
        kind: TypeKind,
        members: Vec<Member>,
        file: &str,
    ) -> RawType {
        RawType {
            name: interner.get_or_intern(name),
            module: interner.get_or_intern("Core"),
            kind,
            generic_params: Vec::new(),
            inherited: Vec::new(),
            members,
            parent: None,
            contained: Vec::new(),
            provenance: vec![Provenance::own(file)],
        }
    }

    #[test]
    fn insert_and_lookup() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let repo = RawTypeRepository::new();
        let bird = partial(&interner, "Bird", TypeKind::Class, Vec::new(), "bird.types.json");
        repo.add_raw_type(bird.clone(), &interner, &sink);

        let found = repo.lookup(interner.get_or_intern("Bird")).unwrap();
        assert_eq!(found.name, bird.name);
        assert!(repo.contains(bird.name));
        assert_eq!(repo.type_count(), 1);
    }

    #[test]
    fn lookup_miss_is_none() {
        let interner = Interner::new();
        let repo = RawTypeRepository::new();
        assert!(repo.lookup(interner.get_or_intern("Nothing")).is_none());
        assert!(repo.is_empty());
    }

    #[test]
    fn merge_unions_members() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let repo = RawTypeRepository::new();
        repo.add_raw_type(
            partial(
                &interner,
                "Bird",
                TypeKind::Class,
                vec![method(&interner, "Bird", "fly", None)],
                "bird.types.json",
            ),
            &interner,
            &sink,
        );
        repo.add_raw_type(
            partial(
                &interner,
                "Bird",
                TypeKind::Class,
                vec![method(&interner, "Bird", "sing", None)],
                "bird_ext.types.json",
            ),
            &interner,
            &sink,
        );

        let merged = repo.lookup(interner.get_or_intern("Bird")).unwrap();
        assert_eq!(merged.members.len(), 2);
        assert_eq!(merged.provenance.len(), 2);
        assert!(!sink.has_errors());
    }

    #[test]
    fn merge_dedups_identical_members() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let repo = RawTypeRepository::new();
        repo.add_raw_type(
            partial(
                &interner,
                "Bird",
                TypeKind::Class,
                vec![method(&interner, "Bird", "fly", None)],
                "a.types.json",
            ),
            &interner,
            &sink,
        );
        repo.add_raw_type(
            partial(
                &interner,
                "Bird",
                TypeKind::Class,
                vec![method(&interner, "Bird", "fly", None)],
                "b.types.json",
            ),
            &interner,
            &sink,
        );

        let merged = repo.lookup(interner.get_or_intern("Bird")).unwrap();
        assert_eq!(merged.members.len(), 1);
        assert_eq!(merged.provenance.len(), 2);
    }

    #[test]
    fn merge_order_is_unobservable() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let partials = [
            partial(
                &interner,
                "Bird",
                TypeKind::Class,
                vec![
                    method(&interner, "Bird", "fly", None),
                    method(&interner, "Bird", "sing", None),
                ],
                "a.types.json",
            ),
            partial(
                &interner,
                "Bird",
                TypeKind::Class,
                vec![
                    method(&interner, "Bird", "sing", None),
                    method(&interner, "Bird", "eat", Some("Int")),
                ],
                "b.types.json",
            ),
            partial(
                &interner,
                "Bird",
                TypeKind::Class,
                vec![method(&interner, "Bird", "eat", Some("String"))],
                "c.types.json",
            ),
        ];

        let forward = RawTypeRepository::new();
        for p in partials.iter() {
            forward.add_raw_type(p.clone(), &interner, &sink);
        }
        let backward = RawTypeRepository::new();
        for p in partials.iter().rev() {
            backward.add_raw_type(p.clone(), &interner, &sink);
        }

        let name = interner.get_or_intern("Bird");
        assert_eq!(forward.lookup(name), backward.lookup(name));
        assert_eq!(forward.lookup(name).unwrap().members.len(), 4);
    }

    #[test]
    fn own_declaration_wins_module_attribution() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();

        // A dependent target parses the file with its own module as the
        // fallback attribution; the owning target knows the real module.
        let mut seen_as_dependency =
            partial(&interner, "Animal", TypeKind::Class, Vec::new(), "animal.types.json");
        seen_as_dependency.module = interner.get_or_intern("App");
        seen_as_dependency.provenance = vec![Provenance::dependency("animal.types.json")];
        let mut seen_as_own =
            partial(&interner, "Animal", TypeKind::Class, Vec::new(), "animal.types.json");
        seen_as_own.module = interner.get_or_intern("Base");

        let name = interner.get_or_intern("Animal");
        let base = interner.get_or_intern("Base");
        for ordering in [
            [&seen_as_dependency, &seen_as_own],
            [&seen_as_own, &seen_as_dependency],
        ] {
            let repo = RawTypeRepository::new();
            for p in ordering {
                repo.add_raw_type(p.clone(), &interner, &sink);
            }
            assert_eq!(repo.lookup(name).unwrap().module, base);
        }
    }

    #[test]
    fn kind_conflict_warns_and_later_wins() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let repo = RawTypeRepository::new();
        repo.add_raw_type(
            partial(&interner, "Bird", TypeKind::Class, Vec::new(), "a.types.json"),
            &interner,
            &sink,
        );
        repo.add_raw_type(
            partial(&interner, "Bird", TypeKind::Interface, Vec::new(), "b.types.json"),
            &interner,
            &sink,
        );

        let merged = repo.lookup(interner.get_or_intern("Bird")).unwrap();
        assert_eq!(merged.kind, TypeKind::Interface);
        let diags = repo_warnings(&sink);
        assert_eq!(diags.len(), 1);
        assert_eq!(format!("{}", diags[0].code), "W201");
    }

    #[test]
    fn generic_params_adopted_silently_when_missing() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let repo = RawTypeRepository::new();
        let mut with_generics = partial(
            &interner,
            "Container",
            TypeKind::Interface,
            Vec::new(),
            "a.types.json",
        );
        with_generics.generic_params = vec![crate::types::GenericParam::unconstrained(
            interner.get_or_intern("T"),
        )];
        // The extension restates nothing.
        let without = partial(
            &interner,
            "Container",
            TypeKind::Interface,
            Vec::new(),
            "b.types.json",
        );

        repo.add_raw_type(without, &interner, &sink);
        repo.add_raw_type(with_generics, &interner, &sink);

        let merged = repo.lookup(interner.get_or_intern("Container")).unwrap();
        assert_eq!(merged.generic_params.len(), 1);
        assert!(repo_warnings(&sink).is_empty());
    }

    #[test]
    fn generic_params_conflict_warns() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let repo = RawTypeRepository::new();
        let mut first = partial(
            &interner,
            "Container",
            TypeKind::Interface,
            Vec::new(),
            "a.types.json",
        );
        first.generic_params = vec![crate::types::GenericParam::unconstrained(
            interner.get_or_intern("T"),
        )];
        let mut second = first.clone();
        second.generic_params = vec![
            crate::types::GenericParam::unconstrained(interner.get_or_intern("T")),
            crate::types::GenericParam::unconstrained(interner.get_or_intern("U")),
        ];
        second.provenance = vec![Provenance::own("b.types.json")];

        repo.add_raw_type(first, &interner, &sink);
        repo.add_raw_type(second, &interner, &sink);

        let merged = repo.lookup(interner.get_or_intern("Container")).unwrap();
        assert_eq!(merged.generic_params.len(), 2);
        let diags = repo_warnings(&sink);
        assert_eq!(diags.len(), 1);
        assert_eq!(format!("{}", diags[0].code), "W202");
    }

    #[test]
    fn alias_redefinition_warns_and_keeps_first() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let repo = RawTypeRepository::new();
        let module = AliasScope::Module(interner.get_or_intern("Core"));
        let name = interner.get_or_intern("Identifier");
        repo.add_typealias(
            Typealias {
                name,
                scope: module,
                target: TypeExpr::name(interner.get_or_intern("String")),
            },
            &interner,
            &sink,
        );
        repo.add_typealias(
            Typealias {
                name,
                scope: module,
                target: TypeExpr::name(interner.get_or_intern("Int")),
            },
            &interner,
            &sink,
        );

        let resolved = repo.resolve_alias_chain(name, &[module]).unwrap().unwrap();
        assert_eq!(resolved.render(&interner), "String");
        let diags = repo_warnings(&sink);
        assert_eq!(diags.len(), 1);
        assert_eq!(format!("{}", diags[0].code), "W203");
    }

    #[test]
    fn top_level_mockable_filters_and_sorts() {
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let repo = RawTypeRepository::new();
        repo.add_raw_type(
            partial(&interner, "Wren", TypeKind::Class, Vec::new(), "a.types.json"),
            &interner,
            &sink,
        );
        repo.add_raw_type(
            partial(&interner, "Auk", TypeKind::Interface, Vec::new(), "b.types.json"),
            &interner,
            &sink,
        );
        // Structures are never mockable.
        repo.add_raw_type(
            partial(&interner, "Point", TypeKind::Structure, Vec::new(), "c.types.json"),
            &interner,
            &sink,
        );
        // Nested types are not top-level.
        let mut nested = partial(&interner, "Wren.Nest", TypeKind::Class, Vec::new(), "a.types.json");
        nested.parent = Some(interner.get_or_intern("Wren"));
        repo.add_raw_type(nested, &interner, &sink);
        // Dependency-only types never drive output.
        let mut dep_only = partial(&interner, "Imported", TypeKind::Class, Vec::new(), "d.types.json");
        dep_only.provenance = vec![Provenance::dependency("d.types.json")];
        repo.add_raw_type(dep_only, &interner, &sink);

        let all = repo.top_level_mockable(false, &interner);
        let names: Vec<&str> = all.iter().map(|n| interner.resolve(*n)).collect();
        assert_eq!(names, vec!["Auk", "Wren"]);

        let interfaces = repo.top_level_mockable(true, &interner);
        let names: Vec<&str> = interfaces.iter().map(|n| interner.resolve(*n)).collect();
        assert_eq!(names, vec!["Auk"]);
    }

    fn repo_warnings(sink: &DiagnosticSink) -> Vec<doppel_diagnostics::Diagnostic> {
        sink.diagnostics()
            .into_iter()
            .filter(|d| d.severity == doppel_diagnostics::Severity::Warning)
            .collect()
    }
}
