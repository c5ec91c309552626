//! Raw declared types: kinds, generic parameters, and type expressions.
//!
//! A [`RawType`] is the parser-facing record of one declared type, possibly
//! merged from several partial declarations across files. Type references
//! inside declarations are structural [`TypeExpr`] values that support
//! recursive generic substitution and stable rendering through the interner.

use doppel_common::{Ident, Interner};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// The declaration kind of a raw type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// A reference type with single inheritance plus interface conformances.
    Class,
    /// A behavioral contract; supports multiple inheritance.
    Interface,
    /// A value type; cannot be subclassed.
    Structure,
    /// A closed set of cases.
    Enumeration,
}

impl TypeKind {
    /// Returns `true` for kinds that can be turned into test doubles.
    pub fn is_mockable(self) -> bool {
        matches!(self, TypeKind::Class | TypeKind::Interface)
    }

    /// Returns the lowercase display word for this kind.
    pub fn display_name(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Structure => "structure",
            TypeKind::Enumeration => "enumeration",
        }
    }
}

/// A generic parameter declared on a type or a member, with its bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenericParam {
    /// The parameter name (e.g. `T`).
    pub name: Ident,
    /// Bounds the parameter must satisfy (e.g. `Comparable`).
    pub constraints: Vec<TypeExpr>,
}

impl GenericParam {
    /// Creates an unconstrained generic parameter.
    pub fn unconstrained(name: Ident) -> Self {
        Self {
            name,
            constraints: Vec::new(),
        }
    }
}

/// A structural type reference as written in a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeExpr {
    /// A named type, optionally applied to generic arguments.
    Named {
        /// The referenced type (or generic parameter) name.
        name: Ident,
        /// Generic arguments, empty for a plain reference.
        args: Vec<TypeExpr>,
    },
    /// A function type.
    Function {
        /// Parameter types, in order.
        params: Vec<TypeExpr>,
        /// The result type.
        ret: Box<TypeExpr>,
    },
}

impl TypeExpr {
    /// Creates a plain named reference with no generic arguments.
    pub fn name(name: Ident) -> Self {
        TypeExpr::Named {
            name,
            args: Vec::new(),
        }
    }

    /// Creates a named reference applied to generic arguments.
    pub fn applied(name: Ident, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Named { name, args }
    }

    /// Returns the head name for named references, `None` for function types.
    pub fn head(&self) -> Option<Ident> {
        match self {
            TypeExpr::Named { name, .. } => Some(*name),
            TypeExpr::Function { .. } => None,
        }
    }

    /// Rewrites the expression under the given generic bindings.
    ///
    /// A bare named reference whose name is bound is replaced by the bound
    /// expression wholesale; generic arguments and function components are
    /// rewritten recursively. Applied heads are never replaced — a generic
    /// parameter cannot itself take arguments.
    pub fn substitute(&self, bindings: &HashMap<Ident, TypeExpr>) -> TypeExpr {
        match self {
            TypeExpr::Named { name, args } => {
                if args.is_empty() {
                    if let Some(bound) = bindings.get(name) {
                        return bound.clone();
                    }
                    self.clone()
                } else {
                    TypeExpr::Named {
                        name: *name,
                        args: args.iter().map(|a| a.substitute(bindings)).collect(),
                    }
                }
            }
            TypeExpr::Function { params, ret } => TypeExpr::Function {
                params: params.iter().map(|p| p.substitute(bindings)).collect(),
                ret: Box::new(ret.substitute(bindings)),
            },
        }
    }

    /// Renders the canonical textual form: `Name`, `Name<A, B>`, or
    /// `(A, B) -> R`.
    pub fn render(&self, interner: &Interner) -> String {
        match self {
            TypeExpr::Named { name, args } => {
                let head = interner.resolve(*name);
                if args.is_empty() {
                    head.to_string()
                } else {
                    let args: Vec<String> = args.iter().map(|a| a.render(interner)).collect();
                    format!("{head}<{}>", args.join(", "))
                }
            }
            TypeExpr::Function { params, ret } => {
                let params: Vec<String> = params.iter().map(|p| p.render(interner)).collect();
                format!("({}) -> {}", params.join(", "), ret.render(interner))
            }
        }
    }

    /// Collects every named head referenced anywhere in the expression.
    pub fn referenced_names(&self, out: &mut Vec<Ident>) {
        match self {
            TypeExpr::Named { name, args } => {
                out.push(*name);
                for arg in args {
                    arg.referenced_names(out);
                }
            }
            TypeExpr::Function { params, ret } => {
                for param in params {
                    param.referenced_names(out);
                }
                ret.referenced_names(out);
            }
        }
    }
}

/// Where one partial declaration of a type came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Provenance {
    /// The declaration file.
    pub file: PathBuf,
    /// `true` when the file belongs to a dependency target rather than the
    /// target being generated.
    pub in_dependency: bool,
}

impl Provenance {
    /// Creates a provenance entry for a file owned by the generated target.
    pub fn own(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            in_dependency: false,
        }
    }

    /// Creates a provenance entry for a file owned by a dependency target.
    pub fn dependency(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            in_dependency: true,
        }
    }
}

/// One declared type, merged from all of its partial declarations.
///
/// Merged records are canonical: members, inherited expressions, contained
/// names, and provenance are deduplicated and sorted, so the order in which
/// partial declarations were merged never shows in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawType {
    /// The fully qualified type name.
    pub name: Ident,
    /// The module the type belongs to.
    pub module: Ident,
    /// The declaration kind.
    pub kind: TypeKind,
    /// Generic parameters declared on the type.
    pub generic_params: Vec<GenericParam>,
    /// Unresolved inheritance/conformance expressions.
    pub inherited: Vec<TypeExpr>,
    /// Declared members.
    pub members: Vec<crate::member::Member>,
    /// The enclosing type, for nested declarations.
    pub parent: Option<Ident>,
    /// Names of directly nested types.
    pub contained: Vec<Ident>,
    /// One entry per partial declaration that contributed to this record.
    pub provenance: Vec<Provenance>,
}

impl RawType {
    /// Returns `true` when the type is not nested inside another type.
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns `true` when at least one partial declaration came from the
    /// generated target itself rather than a dependency.
    pub fn has_own_declaration(&self) -> bool {
        self.provenance.iter().any(|p| !p.in_dependency)
    }
}
