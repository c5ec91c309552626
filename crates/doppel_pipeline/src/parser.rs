//! The JSON declaration file parser.
//!
//! Declaration files are plain JSON produced by an upstream syntax tool.
//! One file carries any number of partial type declarations and aliases:
//!
//! ```json
//! {
//!   "module": "BirdCore",
//!   "types": [{
//!     "name": "Bird",
//!     "kind": "class",
//!     "generic_params": [{"name": "T", "constraints": [{"name": "Comparable"}]}],
//!     "inherited": [{"name": "Animal"}],
//!     "members": [{
//!       "kind": "method",
//!       "name": "fly",
//!       "params": [{"name": "speed", "type": {"name": "Int"}}],
//!       "returns": {"name": "Void"},
//!       "throws": true
//!     }]
//!   }],
//!   "aliases": [{"name": "Flier", "target": {"name": "Bird"}}]
//! }
//! ```
//!
//! Type expressions are either named (`{"name": .., "args": [..]}`) or
//! function-shaped (`{"params": [..], "returns": ..}`). The mirror structs
//! here are string-keyed; names are interned during conversion so the rest
//! of the pipeline works on `Ident`s.

use std::path::Path;

use doppel_common::{Ident, Interner};
use doppel_model::{
    AliasScope, GenericParam, Member, MemberAttrs, MemberKind, Param, Provenance, RawType,
    Typealias, TypeExpr, TypeKind, WhereClause,
};
use serde::Deserialize;

use crate::traits::{DeclParser, ParseError, ParsedDecls};

/// Parses `.types.json` declaration files.
pub struct JsonDeclParser;

#[derive(Deserialize)]
struct FileDecl {
    #[serde(default)]
    module: Option<String>,
    #[serde(default)]
    types: Vec<TypeDecl>,
    #[serde(default)]
    aliases: Vec<AliasDecl>,
}

#[derive(Deserialize)]
struct TypeDecl {
    name: String,
    kind: String,
    #[serde(default)]
    generic_params: Vec<GenericParamDecl>,
    #[serde(default)]
    inherited: Vec<TypeExprDecl>,
    #[serde(default)]
    members: Vec<MemberDecl>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    contained: Vec<String>,
}

#[derive(Deserialize)]
struct GenericParamDecl {
    name: String,
    #[serde(default)]
    constraints: Vec<TypeExprDecl>,
}

#[derive(Deserialize)]
struct MemberDecl {
    kind: String,
    name: String,
    #[serde(default)]
    generic_params: Vec<GenericParamDecl>,
    #[serde(default)]
    params: Vec<ParamDecl>,
    #[serde(default)]
    returns: Option<TypeExprDecl>,
    #[serde(default)]
    where_clauses: Vec<WhereClauseDecl>,
    #[serde(default)]
    is_static: bool,
    #[serde(default)]
    throws: bool,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    mutating: bool,
}

#[derive(Deserialize)]
struct ParamDecl {
    name: String,
    #[serde(rename = "type")]
    ty: TypeExprDecl,
    #[serde(default)]
    variadic: bool,
    #[serde(default)]
    inout: bool,
    #[serde(default)]
    autoclosure: bool,
    #[serde(default)]
    has_default: bool,
}

#[derive(Deserialize)]
struct WhereClauseDecl {
    subject: TypeExprDecl,
    bound: TypeExprDecl,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TypeExprDecl {
    Named {
        name: String,
        #[serde(default)]
        args: Vec<TypeExprDecl>,
    },
    Function {
        #[serde(default)]
        params: Vec<TypeExprDecl>,
        returns: Box<TypeExprDecl>,
    },
}

#[derive(Deserialize)]
struct AliasDecl {
    name: String,
    #[serde(default)]
    scope: Option<ScopeDecl>,
    target: TypeExprDecl,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScopeDecl {
    Module {
        module: String,
    },
    Type {
        #[serde(rename = "type")]
        type_name: String,
    },
}

impl DeclParser for JsonDeclParser {
    fn parse(
        &self,
        path: &Path,
        module: &str,
        in_dependency: bool,
        interner: &Interner,
    ) -> Result<ParsedDecls, ParseError> {
        let fail = |reason: String| ParseError {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        let file: FileDecl = serde_json::from_str(&content).map_err(|e| fail(e.to_string()))?;

        let module = interner.get_or_intern(file.module.as_deref().unwrap_or(module));
        let provenance = if in_dependency {
            Provenance::dependency(path)
        } else {
            Provenance::own(path)
        };

        let mut types = Vec::with_capacity(file.types.len());
        for decl in &file.types {
            types.push(convert_type(decl, module, provenance.clone(), interner).map_err(fail)?);
        }
        let mut aliases = Vec::with_capacity(file.aliases.len());
        for decl in &file.aliases {
            aliases.push(convert_alias(decl, module, interner));
        }
        Ok(ParsedDecls { types, aliases })
    }
}

fn convert_type(
    decl: &TypeDecl,
    module: Ident,
    provenance: Provenance,
    interner: &Interner,
) -> Result<RawType, String> {
    let kind = match decl.kind.as_str() {
        "class" => TypeKind::Class,
        "interface" => TypeKind::Interface,
        "structure" => TypeKind::Structure,
        "enumeration" => TypeKind::Enumeration,
        other => return Err(format!("unknown type kind '{other}' on '{}'", decl.name)),
    };
    let name = interner.get_or_intern(&decl.name);
    let mut members = Vec::with_capacity(decl.members.len());
    for member in &decl.members {
        members.push(convert_member(member, name, interner)?);
    }
    Ok(RawType {
        name,
        module,
        kind,
        generic_params: decl
            .generic_params
            .iter()
            .map(|gp| convert_generic_param(gp, interner))
            .collect(),
        inherited: decl
            .inherited
            .iter()
            .map(|e| convert_expr(e, interner))
            .collect(),
        members,
        parent: decl.parent.as_deref().map(|p| interner.get_or_intern(p)),
        contained: decl
            .contained
            .iter()
            .map(|c| interner.get_or_intern(c))
            .collect(),
        provenance: vec![provenance],
    })
}

fn convert_member(decl: &MemberDecl, origin: Ident, interner: &Interner) -> Result<Member, String> {
    let kind = match decl.kind.as_str() {
        "method" => MemberKind::Method,
        "property" => MemberKind::Property,
        "subscript" => MemberKind::Subscript,
        other => return Err(format!("unknown member kind '{other}' on '{}'", decl.name)),
    };
    let return_type = match &decl.returns {
        Some(expr) => convert_expr(expr, interner),
        None => TypeExpr::name(interner.get_or_intern("Void")),
    };
    Ok(Member {
        kind,
        name: interner.get_or_intern(&decl.name),
        generic_params: decl
            .generic_params
            .iter()
            .map(|gp| convert_generic_param(gp, interner))
            .collect(),
        params: decl
            .params
            .iter()
            .map(|p| Param {
                name: interner.get_or_intern(&p.name),
                ty: convert_expr(&p.ty, interner),
                variadic: p.variadic,
                inout: p.inout,
                autoclosure: p.autoclosure,
                has_default: p.has_default,
            })
            .collect(),
        return_type,
        where_clauses: decl
            .where_clauses
            .iter()
            .map(|w| WhereClause {
                subject: convert_expr(&w.subject, interner),
                bound: convert_expr(&w.bound, interner),
            })
            .collect(),
        attrs: MemberAttrs {
            is_static: decl.is_static,
            throws: decl.throws,
            required: decl.required,
            mutating: decl.mutating,
        },
        origin,
    })
}

fn convert_generic_param(decl: &GenericParamDecl, interner: &Interner) -> GenericParam {
    GenericParam {
        name: interner.get_or_intern(&decl.name),
        constraints: decl
            .constraints
            .iter()
            .map(|c| convert_expr(c, interner))
            .collect(),
    }
}

fn convert_expr(decl: &TypeExprDecl, interner: &Interner) -> TypeExpr {
    match decl {
        TypeExprDecl::Named { name, args } => {
            let name = interner.get_or_intern(name);
            if args.is_empty() {
                TypeExpr::name(name)
            } else {
                TypeExpr::applied(name, args.iter().map(|a| convert_expr(a, interner)).collect())
            }
        }
        TypeExprDecl::Function { params, returns } => TypeExpr::Function {
            params: params.iter().map(|p| convert_expr(p, interner)).collect(),
            ret: Box::new(convert_expr(returns, interner)),
        },
    }
}

fn convert_alias(decl: &AliasDecl, module: Ident, interner: &Interner) -> Typealias {
    let scope = match &decl.scope {
        None => AliasScope::Module(module),
        Some(ScopeDecl::Module { module }) => AliasScope::Module(interner.get_or_intern(module)),
        Some(ScopeDecl::Type { type_name }) => AliasScope::Type(interner.get_or_intern(type_name)),
    };
    Typealias {
        name: interner.get_or_intern(&decl.name),
        scope,
        target: convert_expr(&decl.target, interner),
    }
}
