//! The flattened-surface renderer.
//!
//! Renders each flattened type as a deterministic textual dump: the type
//! header with any unbound generic parameters, its resolved ancestor chain,
//! and every member signature in canonical order. Overloaded surfaces are
//! annotated so readers of the generated file can see which signatures
//! collide after generic substitution.

use std::sync::Arc;

use doppel_common::Interner;
use doppel_flatten::FlattenedType;
use doppel_model::GenericParam;

use crate::traits::Renderer;

/// Renders flattened types as an annotated interface dump.
pub struct InterfaceDumpRenderer;

impl Renderer for InterfaceDumpRenderer {
    fn render(&self, module: &str, types: &[Arc<FlattenedType>], interner: &Interner) -> String {
        let mut sorted: Vec<&Arc<FlattenedType>> = types.iter().collect();
        sorted.sort_by_key(|t| t.display_name(interner));

        let mut out = String::new();
        out.push_str("// Generated by doppel. Do not edit.\n");
        out.push_str(&format!("// Module: {module}\n"));
        out.push_str(&format!("// Types: {}\n", sorted.len()));
        for flat in sorted {
            out.push('\n');
            out.push_str(&render_type(flat, interner));
        }
        out
    }
}

fn render_type(flat: &FlattenedType, interner: &Interner) -> String {
    let mut out = String::new();
    out.push_str(flat.kind.display_name());
    out.push(' ');
    out.push_str(flat.display_name(interner));
    if flat.is_generic() {
        out.push_str(&format!(
            "<{}>",
            flat.generic_params
                .iter()
                .map(|gp| render_generic_param(gp, interner))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    out.push('\n');
    if !flat.ancestors.is_empty() {
        out.push_str(&format!("    ancestors: {}\n", flat.ancestors.join(", ")));
    }
    if flat.opaque {
        out.push_str(&format!(
            "    opaque: {}\n",
            flat.unresolved_ancestors.join(", ")
        ));
    }
    for member in &flat.members {
        out.push_str("    ");
        out.push_str(&member.render_signature(interner));
        let overloads = flat
            .overload_counts
            .get(&member.reduced_signature(interner))
            .copied()
            .unwrap_or(1);
        if overloads > 1 {
            out.push_str(&format!(" [{overloads} overloads]"));
        }
        out.push('\n');
    }
    out
}

fn render_generic_param(gp: &GenericParam, interner: &Interner) -> String {
    let name = interner.resolve(gp.name).to_string();
    if gp.constraints.is_empty() {
        name
    } else {
        let bounds: Vec<String> = gp.constraints.iter().map(|c| c.render(interner)).collect();
        format!("{name}: {}", bounds.join(" & "))
    }
}
