//! Type aliases and the scoped index used to resolve them.

use crate::types::TypeExpr;
use doppel_common::{Ident, Interner};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The scope a type alias was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AliasScope {
    /// Declared at the top level of a module.
    Module(Ident),
    /// Declared inside the named type.
    Type(Ident),
}

impl AliasScope {
    /// Renders the scope for diagnostics, e.g. `module 'Core'`.
    pub fn describe(&self, interner: &Interner) -> String {
        match self {
            AliasScope::Module(name) => format!("module '{}'", interner.resolve(*name)),
            AliasScope::Type(name) => format!("type '{}'", interner.resolve(*name)),
        }
    }
}

/// One declared type alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Typealias {
    /// The alias name.
    pub name: Ident,
    /// The scope the alias was declared in.
    pub scope: AliasScope,
    /// The aliased expression.
    pub target: TypeExpr,
}

/// A cycle discovered while unwrapping an alias chain.
///
/// `chain` holds the alias names in traversal order; the final entry is the
/// name that was revisited, so rendering the chain with `->` separators shows
/// the loop closing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasCycle {
    /// Alias names in traversal order, ending at the revisited name.
    pub chain: Vec<Ident>,
}

impl AliasCycle {
    /// Renders the chain for diagnostics, e.g. `A -> B -> A`.
    pub fn describe(&self, interner: &Interner) -> String {
        let names: Vec<&str> = self.chain.iter().map(|n| interner.resolve(*n)).collect();
        names.join(" -> ")
    }
}

/// Index of every declared alias, keyed by (scope, name).
#[derive(Debug, Default)]
pub struct TypealiasIndex {
    aliases: HashMap<(AliasScope, Ident), TypeExpr>,
}

impl TypealiasIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an alias, keeping any existing entry for the same (scope,
    /// name).
    ///
    /// Returns `false` when an entry with a different target already existed
    /// (the caller warns); an identical redeclaration is accepted silently.
    pub fn insert(&mut self, alias: Typealias) -> bool {
        let key = (alias.scope, alias.name);
        match self.aliases.get(&key) {
            Some(existing) => *existing == alias.target,
            None => {
                self.aliases.insert(key, alias.target);
                true
            }
        }
    }

    /// Looks up an alias target in one exact scope.
    pub fn lookup(&self, scope: AliasScope, name: Ident) -> Option<&TypeExpr> {
        self.aliases.get(&(scope, name))
    }

    /// Returns the number of distinct aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Returns `true` when no aliases were declared.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Unwraps the alias chain starting at `name`, consulting `scopes` in
    /// order at every step.
    ///
    /// Returns `Ok(None)` when `name` is not an alias in any scope,
    /// `Ok(Some(expr))` with the final target otherwise. The chain is
    /// followed while targets are bare named references that are themselves
    /// aliased; a revisited name aborts with the full chain for the
    /// diagnostic.
    pub fn resolve_chain(
        &self,
        name: Ident,
        scopes: &[AliasScope],
    ) -> Result<Option<TypeExpr>, AliasCycle> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = name;
        let mut result = None;
        loop {
            if !visited.insert(current) {
                chain.push(current);
                return Err(AliasCycle { chain });
            }
            chain.push(current);
            let target = scopes.iter().find_map(|scope| self.lookup(*scope, current));
            let Some(target) = target else {
                break;
            };
            result = Some(target.clone());
            match target {
                TypeExpr::Named { name: next, args } if args.is_empty() => current = *next,
                _ => break,
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(interner: &Interner, scope: AliasScope, name: &str, target: &str) -> Typealias {
        Typealias {
            name: interner.get_or_intern(name),
            scope,
            target: TypeExpr::name(interner.get_or_intern(target)),
        }
    }

    #[test]
    fn resolve_non_alias_is_none() {
        let interner = Interner::new();
        let index = TypealiasIndex::new();
        let module = AliasScope::Module(interner.get_or_intern("Core"));
        let bird = interner.get_or_intern("Bird");
        assert_eq!(index.resolve_chain(bird, &[module]), Ok(None));
    }

    #[test]
    fn resolve_single_alias() {
        let interner = Interner::new();
        let module = AliasScope::Module(interner.get_or_intern("Core"));
        let mut index = TypealiasIndex::new();
        assert!(index.insert(alias(&interner, module, "Identifier", "String")));

        let resolved = index
            .resolve_chain(interner.get_or_intern("Identifier"), &[module])
            .unwrap()
            .unwrap();
        assert_eq!(resolved.render(&interner), "String");
    }

    #[test]
    fn resolve_follows_chains() {
        let interner = Interner::new();
        let module = AliasScope::Module(interner.get_or_intern("Core"));
        let mut index = TypealiasIndex::new();
        index.insert(alias(&interner, module, "A", "B"));
        index.insert(alias(&interner, module, "B", "C"));

        let resolved = index
            .resolve_chain(interner.get_or_intern("A"), &[module])
            .unwrap()
            .unwrap();
        assert_eq!(resolved.render(&interner), "C");
    }

    #[test]
    fn resolve_stops_at_applied_targets() {
        let interner = Interner::new();
        let module = AliasScope::Module(interner.get_or_intern("Core"));
        let mut index = TypealiasIndex::new();
        index.insert(Typealias {
            name: interner.get_or_intern("IntList"),
            scope: module,
            target: TypeExpr::applied(
                interner.get_or_intern("Array"),
                vec![TypeExpr::name(interner.get_or_intern("Int"))],
            ),
        });
        // `Array` is itself aliased, but an applied target ends the chain;
        // head unwrapping of applied types is the resolver's job.
        index.insert(alias(&interner, module, "Array", "List"));

        let resolved = index
            .resolve_chain(interner.get_or_intern("IntList"), &[module])
            .unwrap()
            .unwrap();
        assert_eq!(resolved.render(&interner), "Array<Int>");
    }

    #[test]
    fn cycle_reports_full_chain() {
        let interner = Interner::new();
        let module = AliasScope::Module(interner.get_or_intern("Core"));
        let mut index = TypealiasIndex::new();
        index.insert(alias(&interner, module, "A", "B"));
        index.insert(alias(&interner, module, "B", "C"));
        index.insert(alias(&interner, module, "C", "A"));

        let err = index
            .resolve_chain(interner.get_or_intern("A"), &[module])
            .unwrap_err();
        assert_eq!(err.describe(&interner), "A -> B -> C -> A");
    }

    #[test]
    fn self_alias_is_a_cycle() {
        let interner = Interner::new();
        let module = AliasScope::Module(interner.get_or_intern("Core"));
        let mut index = TypealiasIndex::new();
        index.insert(alias(&interner, module, "A", "A"));

        let err = index
            .resolve_chain(interner.get_or_intern("A"), &[module])
            .unwrap_err();
        assert_eq!(err.describe(&interner), "A -> A");
    }

    #[test]
    fn type_scope_takes_precedence_over_module_scope() {
        let interner = Interner::new();
        let module = AliasScope::Module(interner.get_or_intern("Core"));
        let ty = AliasScope::Type(interner.get_or_intern("Core.Container"));
        let mut index = TypealiasIndex::new();
        index.insert(alias(&interner, module, "Element", "Int"));
        index.insert(alias(&interner, ty, "Element", "String"));

        let resolved = index
            .resolve_chain(interner.get_or_intern("Element"), &[ty, module])
            .unwrap()
            .unwrap();
        assert_eq!(resolved.render(&interner), "String");
    }

    #[test]
    fn conflicting_redefinition_keeps_first() {
        let interner = Interner::new();
        let module = AliasScope::Module(interner.get_or_intern("Core"));
        let mut index = TypealiasIndex::new();
        assert!(index.insert(alias(&interner, module, "Identifier", "String")));
        // Identical redeclaration is fine.
        assert!(index.insert(alias(&interner, module, "Identifier", "String")));
        // A different target is rejected and the first target kept.
        assert!(!index.insert(alias(&interner, module, "Identifier", "Int")));

        let resolved = index
            .resolve_chain(interner.get_or_intern("Identifier"), &[module])
            .unwrap()
            .unwrap();
        assert_eq!(resolved.render(&interner), "String");
        assert_eq!(index.len(), 1);
    }
}
