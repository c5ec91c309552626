//! Declared members and their identity keys.
//!
//! Members carry two distinct identity notions used during flattening:
//!
//! - The *override key* decides whether a member in a derived type replaces
//!   a member inherited from an ancestor: kind, name, staticness, the ordered
//!   parameter type signature, and the generic constraint shape. The return
//!   type is deliberately excluded — a redeclaration that only narrows the
//!   return still suppresses the inherited member.
//! - The *reduced signature* is the overload-bookkeeping key on flattened
//!   output: kind, name, staticness, parameter types, and return type, with
//!   the constraint shape excluded so constrained variants of one overload
//!   count together.
//!
//! Both keys render the member's own generic parameters positionally, so
//! `get<T>(T) -> T` and `get<U>(U) -> U` are the same member.

use crate::types::{GenericParam, TypeExpr};
use doppel_common::{Ident, Interner};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind of a declared member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    /// A callable function member.
    Method,
    /// A stored or computed value member.
    Property,
    /// An indexed accessor member.
    Subscript,
}

impl MemberKind {
    /// Returns the lowercase display word for this kind.
    pub fn display_name(self) -> &'static str {
        match self {
            MemberKind::Method => "method",
            MemberKind::Property => "property",
            MemberKind::Subscript => "subscript",
        }
    }

    /// Returns `true` for kinds that carry a parameter list.
    pub fn has_params(self) -> bool {
        !matches!(self, MemberKind::Property)
    }
}

/// One declared parameter of a method or subscript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// The external parameter name.
    pub name: Ident,
    /// The declared parameter type.
    pub ty: TypeExpr,
    /// `true` for variadic parameters.
    pub variadic: bool,
    /// `true` for pass-by-reference parameters.
    pub inout: bool,
    /// `true` when a function-typed parameter is wrapped lazily at the call
    /// site.
    pub autoclosure: bool,
    /// `true` when the parameter declares a default value.
    pub has_default: bool,
}

impl Param {
    /// Creates a plain by-value parameter with no modifiers.
    pub fn plain(name: Ident, ty: TypeExpr) -> Self {
        Self {
            name,
            ty,
            variadic: false,
            inout: false,
            autoclosure: false,
            has_default: false,
        }
    }
}

/// Modifier flags on a member declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberAttrs {
    /// `true` for type-level members.
    pub is_static: bool,
    /// `true` when the member can throw.
    pub throws: bool,
    /// `true` for members every subclass must re-declare.
    pub required: bool,
    /// `true` for value-type members that mutate their receiver.
    pub mutating: bool,
}

/// One clause of a member's `where`-style constraint list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhereClause {
    /// The constrained subject (a generic parameter or a projection of one).
    pub subject: TypeExpr,
    /// The bound the subject must satisfy.
    pub bound: TypeExpr,
}

/// A declared member of a raw type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The member kind.
    pub kind: MemberKind,
    /// The member name. Subscripts use the conventional name `subscript`.
    pub name: Ident,
    /// Generic parameters declared on the member itself.
    pub generic_params: Vec<GenericParam>,
    /// Declared parameters; empty for properties.
    pub params: Vec<Param>,
    /// The return type for methods and subscripts, the value type for
    /// properties.
    pub return_type: TypeExpr,
    /// Constraint clauses on the member.
    pub where_clauses: Vec<WhereClause>,
    /// Modifier flags.
    pub attrs: MemberAttrs,
    /// The type that declared this member. Rewritten to the original
    /// declarer during flattening so diagnostics can attribute inherited
    /// members.
    pub origin: Ident,
}

impl Member {
    /// Positional placeholders for the member's own generic parameters, so
    /// identity keys are insensitive to parameter naming.
    fn placeholders(&self) -> HashMap<Ident, String> {
        self.generic_params
            .iter()
            .enumerate()
            .map(|(index, gp)| (gp.name, format!("${index}")))
            .collect()
    }

    fn param_signature(&self, interner: &Interner, placeholders: &HashMap<Ident, String>) -> String {
        let parts: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let mut ty = render_normalized(&p.ty, interner, placeholders);
                if p.autoclosure {
                    ty = format!("@autoclosure {ty}");
                }
                if p.inout {
                    ty = format!("inout {ty}");
                }
                if p.variadic {
                    ty.push_str("...");
                }
                ty
            })
            .collect();
        parts.join(", ")
    }

    fn constraint_shape(&self, interner: &Interner, placeholders: &HashMap<Ident, String>) -> String {
        let mut parts: Vec<String> = Vec::new();
        for (index, gp) in self.generic_params.iter().enumerate() {
            for bound in &gp.constraints {
                parts.push(format!(
                    "${index}: {}",
                    render_normalized(bound, interner, placeholders)
                ));
            }
        }
        for clause in &self.where_clauses {
            parts.push(format!(
                "{}: {}",
                render_normalized(&clause.subject, interner, placeholders),
                render_normalized(&clause.bound, interner, placeholders)
            ));
        }
        parts.sort();
        parts.join("; ")
    }

    /// The override-suppression identity of this member.
    ///
    /// Two members with equal override keys are the same member for
    /// inheritance purposes: the most derived declaration wins and the
    /// ancestor's copy is dropped. The return type does not participate.
    pub fn override_key(&self, interner: &Interner) -> String {
        let placeholders = self.placeholders();
        format!(
            "{}|{}|static:{}|({})|where:[{}]",
            self.kind.display_name(),
            interner.resolve(self.name),
            self.attrs.is_static,
            self.param_signature(interner, &placeholders),
            self.constraint_shape(interner, &placeholders)
        )
    }

    /// The overload-bookkeeping signature of this member.
    ///
    /// Constraint clauses do not participate, so differently-constrained
    /// variants of one surface count as the same overload; the return type
    /// does, so same-name members differing only in return are distinct.
    pub fn reduced_signature(&self, interner: &Interner) -> String {
        let placeholders = self.placeholders();
        format!(
            "{}|{}|static:{}|({})|-> {}",
            self.kind.display_name(),
            interner.resolve(self.name),
            self.attrs.is_static,
            self.param_signature(interner, &placeholders),
            render_normalized(&self.return_type, interner, &placeholders)
        )
    }

    /// Rewrites every type expression in the member under the given generic
    /// bindings.
    ///
    /// The member's own generic parameters shadow outer bindings of the same
    /// name and are never rewritten.
    pub fn substitute(&self, bindings: &HashMap<Ident, TypeExpr>) -> Member {
        let effective: HashMap<Ident, TypeExpr> = bindings
            .iter()
            .filter(|(name, _)| !self.generic_params.iter().any(|gp| gp.name == **name))
            .map(|(name, expr)| (*name, expr.clone()))
            .collect();
        if effective.is_empty() {
            return self.clone();
        }
        Member {
            kind: self.kind,
            name: self.name,
            generic_params: self
                .generic_params
                .iter()
                .map(|gp| GenericParam {
                    name: gp.name,
                    constraints: gp
                        .constraints
                        .iter()
                        .map(|c| c.substitute(&effective))
                        .collect(),
                })
                .collect(),
            params: self
                .params
                .iter()
                .map(|p| Param {
                    name: p.name,
                    ty: p.ty.substitute(&effective),
                    variadic: p.variadic,
                    inout: p.inout,
                    autoclosure: p.autoclosure,
                    has_default: p.has_default,
                })
                .collect(),
            return_type: self.return_type.substitute(&effective),
            where_clauses: self
                .where_clauses
                .iter()
                .map(|clause| WhereClause {
                    subject: clause.subject.substitute(&effective),
                    bound: clause.bound.substitute(&effective),
                })
                .collect(),
            attrs: self.attrs,
            origin: self.origin,
        }
    }

    /// Renders the full human-readable signature, e.g.
    /// `static method compare<T: Comparable>(lhs: T, rhs: T) -> Bool`.
    pub fn render_signature(&self, interner: &Interner) -> String {
        let mut out = String::new();
        if self.attrs.is_static {
            out.push_str("static ");
        }
        if self.attrs.required {
            out.push_str("required ");
        }
        if self.attrs.mutating {
            out.push_str("mutating ");
        }
        out.push_str(self.kind.display_name());
        out.push(' ');
        out.push_str(interner.resolve(self.name));
        if !self.generic_params.is_empty() {
            let rendered: Vec<String> = self
                .generic_params
                .iter()
                .map(|gp| {
                    let name = interner.resolve(gp.name).to_string();
                    if gp.constraints.is_empty() {
                        name
                    } else {
                        let bounds: Vec<String> =
                            gp.constraints.iter().map(|c| c.render(interner)).collect();
                        format!("{name}: {}", bounds.join(" & "))
                    }
                })
                .collect();
            out.push_str(&format!("<{}>", rendered.join(", ")));
        }
        if self.kind.has_params() {
            let rendered: Vec<String> = self
                .params
                .iter()
                .map(|p| render_param(p, interner))
                .collect();
            out.push_str(&format!("({})", rendered.join(", ")));
        }
        if self.attrs.throws {
            out.push_str(" throws");
        }
        out.push_str(" -> ");
        out.push_str(&self.return_type.render(interner));
        if !self.where_clauses.is_empty() {
            let rendered: Vec<String> = self
                .where_clauses
                .iter()
                .map(|clause| {
                    format!(
                        "{}: {}",
                        clause.subject.render(interner),
                        clause.bound.render(interner)
                    )
                })
                .collect();
            out.push_str(&format!(" where {}", rendered.join(", ")));
        }
        out
    }

    /// Canonical ordering key: kind, then name, then the full signature.
    ///
    /// Merged records and flattened member lists sort by this key so merge
    /// order and traversal order never show in output.
    pub fn sort_key(&self, interner: &Interner) -> (&'static str, String, String) {
        (
            self.kind.display_name(),
            interner.resolve(self.name).to_string(),
            self.render_signature(interner),
        )
    }
}

fn render_param(p: &Param, interner: &Interner) -> String {
    let mut ty = p.ty.render(interner);
    if p.autoclosure {
        ty = format!("@autoclosure {ty}");
    }
    if p.inout {
        ty = format!("inout {ty}");
    }
    if p.variadic {
        ty.push_str("...");
    }
    let mut out = format!("{}: {ty}", interner.resolve(p.name));
    if p.has_default {
        out.push_str(" = _");
    }
    out
}

/// Renders a type expression, replacing placeholder-mapped names so identity
/// keys do not depend on how a member named its own generic parameters.
fn render_normalized(
    expr: &TypeExpr,
    interner: &Interner,
    placeholders: &HashMap<Ident, String>,
) -> String {
    match expr {
        TypeExpr::Named { name, args } => {
            let head = match placeholders.get(name) {
                Some(placeholder) => placeholder.clone(),
                None => interner.resolve(*name).to_string(),
            };
            if args.is_empty() {
                head
            } else {
                let args: Vec<String> = args
                    .iter()
                    .map(|a| render_normalized(a, interner, placeholders))
                    .collect();
                format!("{head}<{}>", args.join(", "))
            }
        }
        TypeExpr::Function { params, ret } => {
            let params: Vec<String> = params
                .iter()
                .map(|p| render_normalized(p, interner, placeholders))
                .collect();
            format!(
                "({}) -> {}",
                params.join(", "),
                render_normalized(ret, interner, placeholders)
            )
        }
    }
}
