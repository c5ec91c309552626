//! The flattening resolver.
//!
//! [`Flattener::flatten`] turns one raw type into its complete observable
//! surface: aliases in the inheritance list are substituted to a fixed
//! point, ancestors are flattened first (recursively, memoized per exact
//! generic binding), inherited member signatures are rewritten under each
//! edge's bindings, and the member union suppresses ancestor copies that a
//! more derived type overrides.
//!
//! Failures are reported through the diagnostic sink and fail only the
//! affected type; sibling types keep resolving.

use crate::errors;
use crate::flattened::FlattenedType;
use doppel_common::{ContentHash, Ident, Interner};
use doppel_diagnostics::DiagnosticSink;
use doppel_model::{AliasScope, GenericParam, Member, RawType, RawTypeRepository, TypeExpr, TypeKind};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Behavior toggles for the resolver.
#[derive(Debug, Clone, Copy)]
pub struct FlattenOptions {
    /// When `true` (the default), an ancestor with no parsed declaration
    /// degrades the result to opaque instead of failing the type.
    pub relaxed_linking: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            relaxed_linking: true,
        }
    }
}

/// Memo key: one flattening exists per (type, exact generic bindings).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct FlattenKey {
    name: Ident,
    bindings: ContentHash,
}

/// The type-flattening resolver.
///
/// Thread-safe: concurrent flatten calls share the memo table, and a lost
/// race simply recomputes the same deterministic value.
pub struct Flattener {
    repo: Arc<RawTypeRepository>,
    interner: Arc<Interner>,
    sink: Arc<DiagnosticSink>,
    options: FlattenOptions,
    memo: Mutex<HashMap<FlattenKey, Option<Arc<FlattenedType>>>>,
}

impl Flattener {
    /// Creates a resolver over the given repository.
    pub fn new(
        repo: Arc<RawTypeRepository>,
        interner: Arc<Interner>,
        sink: Arc<DiagnosticSink>,
        options: FlattenOptions,
    ) -> Self {
        Self {
            repo,
            interner,
            sink,
            options,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Flattens a type by qualified name.
    ///
    /// Returns `None` when resolution failed; the failure has already been
    /// reported through the sink. Repeated calls return the memoized result
    /// without re-reporting.
    pub fn flatten(&self, name: Ident) -> Option<Arc<FlattenedType>> {
        let mut stack = Vec::new();
        self.flatten_inner(name, &HashMap::new(), &mut stack)
    }

    fn flatten_inner(
        &self,
        name: Ident,
        bindings: &HashMap<Ident, TypeExpr>,
        stack: &mut Vec<Ident>,
    ) -> Option<Arc<FlattenedType>> {
        let key = FlattenKey {
            name,
            bindings: self.binding_hash(bindings),
        };
        if let Some(hit) = self.memo.lock().unwrap().get(&key) {
            return hit.clone();
        }

        if let Some(position) = stack.iter().position(|n| *n == name) {
            let chain: Vec<&str> = stack[position..]
                .iter()
                .chain(std::iter::once(&name))
                .map(|n| self.interner.resolve(*n))
                .collect();
            self.sink
                .emit(errors::error_inheritance_cycle(&chain.join(" -> ")));
            // The failure is memoized by the frame that entered the cycle,
            // not by this re-entry.
            return None;
        }

        stack.push(name);
        let result = self.flatten_uncached(name, bindings, stack);
        stack.pop();
        self.memo.lock().unwrap().insert(key, result.clone());
        result
    }

    fn flatten_uncached(
        &self,
        name: Ident,
        bindings: &HashMap<Ident, TypeExpr>,
        stack: &mut Vec<Ident>,
    ) -> Option<Arc<FlattenedType>> {
        let interner = &*self.interner;
        let Some(raw) = self.repo.lookup(name) else {
            self.sink
                .emit(errors::error_unknown_type(interner.resolve(name)));
            return None;
        };

        // The type's own generic parameter names shadow same-named aliases.
        let shadowed: HashSet<Ident> = raw.generic_params.iter().map(|gp| gp.name).collect();
        let scopes = [AliasScope::Type(name), AliasScope::Module(raw.module)];

        let mut opaque = false;
        let mut unresolved: Vec<String> = Vec::new();
        let mut ancestors: Vec<String> = Vec::new();
        let mut edges: Vec<Arc<FlattenedType>> = Vec::new();

        for inherited in &raw.inherited {
            let bound = inherited.substitute(bindings);
            let mut expanding = Vec::new();
            let resolved = match self.expand_aliases(&bound, &scopes, &shadowed, &mut expanding) {
                Ok(expr) => expr,
                Err(cycle) => {
                    self.sink.emit(errors::error_alias_cycle(
                        interner.resolve(name),
                        &cycle.describe(interner),
                    ));
                    return None;
                }
            };
            let rendered = resolved.render(interner);

            let located = resolved
                .head()
                .and_then(|head| self.locate(head, raw.module));
            let Some((ancestor_name, ancestor_raw)) = located else {
                if self.options.relaxed_linking {
                    self.sink.emit(errors::note_opaque_ancestor(
                        interner.resolve(name),
                        &rendered,
                    ));
                    opaque = true;
                    unresolved.push(rendered);
                    continue;
                }
                self.sink.emit(errors::error_missing_ancestor(
                    interner.resolve(name),
                    &rendered,
                ));
                return None;
            };

            let edge_bindings = edge_bindings(&ancestor_raw, &resolved);
            let ancestor_flat = self.flatten_inner(ancestor_name, &edge_bindings, stack)?;

            if ancestor_flat.opaque {
                opaque = true;
                for missing in &ancestor_flat.unresolved_ancestors {
                    if !unresolved.contains(missing) {
                        unresolved.push(missing.clone());
                    }
                }
            }
            if !ancestors.contains(&rendered) {
                ancestors.push(rendered);
            }
            for chained in &ancestor_flat.ancestors {
                if !ancestors.contains(chained) {
                    ancestors.push(chained.clone());
                }
            }
            edges.push(ancestor_flat);
        }

        // Member union. All own members survive (the repository already
        // removed structural duplicates); each ancestor contributes the
        // members whose override identity no more-derived contributor has
        // claimed. Two same-identity members inside one contributor are
        // that contributor's own overloads and coexist.
        let mut members: Vec<Member> = raw.members.iter().map(|m| m.substitute(bindings)).collect();
        let mut claimed: HashSet<String> = members
            .iter()
            .map(|m| m.override_key(interner))
            .collect();
        for ancestor_flat in &edges {
            let mut group_keys: HashSet<String> = HashSet::new();
            for member in &ancestor_flat.members {
                let key = member.override_key(interner);
                if claimed.contains(&key) {
                    continue;
                }
                group_keys.insert(key);
                members.push(member.clone());
            }
            claimed.extend(group_keys);
        }
        members.sort_by_cached_key(|m| m.sort_key(interner));

        let mut overload_counts: HashMap<String, u32> = HashMap::new();
        for member in &members {
            *overload_counts
                .entry(member.reduced_signature(interner))
                .or_insert(0) += 1;
        }

        // Own parameters the caller's edge left unbound keep their place;
        // interface ancestors bubble their leftovers into interface heirs.
        let mut generic_params: Vec<GenericParam> = raw
            .generic_params
            .iter()
            .filter(|gp| !bindings.contains_key(&gp.name))
            .map(|gp| GenericParam {
                name: gp.name,
                constraints: gp
                    .constraints
                    .iter()
                    .map(|c| c.substitute(bindings))
                    .collect(),
            })
            .collect();
        if raw.kind == TypeKind::Interface {
            for ancestor_flat in &edges {
                if ancestor_flat.kind != TypeKind::Interface {
                    continue;
                }
                for gp in &ancestor_flat.generic_params {
                    if !generic_params.iter().any(|existing| existing.name == gp.name) {
                        generic_params.push(gp.clone());
                    }
                }
            }
        }

        Some(Arc::new(FlattenedType {
            name,
            module: raw.module,
            kind: raw.kind,
            generic_params,
            members,
            ancestors,
            opaque,
            unresolved_ancestors: unresolved,
            overload_counts,
        }))
    }

    /// Substitutes aliases to a fixed point.
    ///
    /// Bare named references are unwrapped through the alias index; applied
    /// references have their head renamed when the alias target is itself a
    /// bare name, and their arguments expanded recursively. `expanding`
    /// tracks the aliases currently being expanded so self-referential
    /// targets (e.g. an alias whose target mentions the alias in an
    /// argument) are reported as cycles instead of recursing forever.
    fn expand_aliases(
        &self,
        expr: &TypeExpr,
        scopes: &[AliasScope],
        shadowed: &HashSet<Ident>,
        expanding: &mut Vec<Ident>,
    ) -> Result<TypeExpr, doppel_model::AliasCycle> {
        match expr {
            TypeExpr::Named { name, args } => {
                let expanded_args: Vec<TypeExpr> = args
                    .iter()
                    .map(|a| self.expand_aliases(a, scopes, shadowed, expanding))
                    .collect::<Result<_, _>>()?;
                if shadowed.contains(name) {
                    return Ok(TypeExpr::Named {
                        name: *name,
                        args: expanded_args,
                    });
                }
                let target = self.repo.resolve_alias_chain(*name, scopes)?;
                match target {
                    None => Ok(TypeExpr::Named {
                        name: *name,
                        args: expanded_args,
                    }),
                    Some(target) if expanded_args.is_empty() => {
                        if expanding.contains(name) {
                            let mut chain = expanding.clone();
                            chain.push(*name);
                            return Err(doppel_model::AliasCycle { chain });
                        }
                        expanding.push(*name);
                        let out = self.expand_aliases(&target, scopes, shadowed, expanding);
                        expanding.pop();
                        out
                    }
                    Some(TypeExpr::Named {
                        name: head,
                        args: target_args,
                    }) if target_args.is_empty() => Ok(TypeExpr::Named {
                        name: head,
                        args: expanded_args,
                    }),
                    // An applied reference whose alias target is itself
                    // applied (or a function) has no meaningful expansion;
                    // keep the reference as written.
                    Some(_) => Ok(TypeExpr::Named {
                        name: *name,
                        args: expanded_args,
                    }),
                }
            }
            TypeExpr::Function { params, ret } => {
                let params: Vec<TypeExpr> = params
                    .iter()
                    .map(|p| self.expand_aliases(p, scopes, shadowed, expanding))
                    .collect::<Result<_, _>>()?;
                let ret = self.expand_aliases(ret, scopes, shadowed, expanding)?;
                Ok(TypeExpr::Function {
                    params,
                    ret: Box::new(ret),
                })
            }
        }
    }

    /// Finds the repository record an inherited head refers to, trying the
    /// name as written and then qualified with the referring type's module.
    fn locate(&self, head: Ident, module: Ident) -> Option<(Ident, RawType)> {
        if let Some(raw) = self.repo.lookup(head) {
            return Some((head, raw));
        }
        let qualified = format!(
            "{}.{}",
            self.interner.resolve(module),
            self.interner.resolve(head)
        );
        let qualified = self.interner.get_or_intern(&qualified);
        self.repo.lookup(qualified).map(|raw| (qualified, raw))
    }

    fn binding_hash(&self, bindings: &HashMap<Ident, TypeExpr>) -> ContentHash {
        let mut parts: Vec<String> = bindings
            .iter()
            .map(|(param, expr)| {
                format!(
                    "{}={}",
                    self.interner.resolve(*param),
                    expr.render(&self.interner)
                )
            })
            .collect();
        parts.sort();
        ContentHash::from_parts(parts)
    }
}

/// Builds the generic bindings for one inheritance edge by pairing the
/// ancestor's declared parameters with the edge's arguments. Parameters
/// without a matching argument stay unbound.
fn edge_bindings(ancestor: &RawType, resolved: &TypeExpr) -> HashMap<Ident, TypeExpr> {
    let args = match resolved {
        TypeExpr::Named { args, .. } => args.as_slice(),
        TypeExpr::Function { .. } => &[],
    };
    ancestor
        .generic_params
        .iter()
        .zip(args.iter())
        .map(|(gp, arg)| (gp.name, arg.clone()))
        .collect()
}
