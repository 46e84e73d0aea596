//! Rename fixup: rewriting dependent formula text in place after a
//! referenced entity's name has changed.

use log::debug;
use tabular_model::{
    bracket_reference_text, table_reference_text, EntityId, FormulaProperty, HolderId, Model,
};

use crate::graph::DependencyGraph;
use crate::resolve::Edge;
use crate::tracker::rebuild_holder;

/// Rewrite every dependent formula of `renamed`, whose name has already
/// changed in the model, then rebuild each rewritten holder so edges and
/// offsets match the new text. Returns the rewritten holders in
/// deterministic order; zero dependents is a no-op.
///
/// Rebuilds cascade from the text updates but fixup never re-triggers
/// itself.
pub(crate) fn apply_fixup(
    model: &mut Model,
    graph: &mut DependencyGraph,
    renamed: EntityId,
) -> Vec<HolderId> {
    // Snapshot before mutating: rewriting triggers rebuilds that would
    // otherwise mutate the dependent set mid-iteration.
    let holders = graph.referenced_by(renamed);
    if holders.is_empty() {
        return holders;
    }

    let Some(new_name) = model.entity_name(renamed).map(str::to_owned) else {
        debug_assert!(false, "fixup invoked for an entity missing from the model");
        return Vec::new();
    };

    for &holder in &holders {
        let spans: Vec<Edge> = graph
            .depends_on(holder)
            .iter()
            .filter(|e| e.target == renamed)
            .cloned()
            .collect();
        rewrite_holder(model, holder, &spans, &new_name);
        rebuild_holder(model, graph, holder);
    }

    debug!(
        "fixup: rewrote {} dependent holder(s) of {renamed:?}",
        holders.len()
    );
    holders
}

/// Apply all of one holder's replacement spans, property by property.
/// Multiple references to the renamed entity within one property are all
/// rewritten before the holder is rebuilt.
fn rewrite_holder(model: &mut Model, holder: HolderId, spans: &[Edge], new_name: &str) {
    let mut properties: Vec<FormulaProperty> = spans.iter().map(|e| e.property).collect();
    properties.sort_unstable();
    properties.dedup();

    for property in properties {
        let Some(text) = model.formula_property(holder, property).map(str::to_owned) else {
            debug_assert!(false, "edge points at a property missing from its holder");
            continue;
        };

        let edits: Vec<(usize, usize, String)> = spans
            .iter()
            .filter(|e| e.property == property)
            .map(|e| (e.start, e.end, replacement_text(e, new_name)))
            .collect();
        let new_text = splice_descending(&text, edits);

        if let Err(err) = model.set_formula_property(holder, property, new_text) {
            debug_assert!(false, "fixup text write rejected: {err}");
        }
    }
}

fn replacement_text(edge: &Edge, new_name: &str) -> String {
    if edge.is_table_ref {
        table_reference_text(new_name)
    } else {
        bracket_reference_text(new_name)
    }
}

/// Substitute each `[start, end)` span with its replacement, rightmost
/// first, so earlier offsets are never invalidated by length changes from
/// replacements already applied further right.
fn splice_descending(text: &str, mut edits: Vec<(usize, usize, String)>) -> String {
    edits.sort_unstable_by(|a, b| b.0.cmp(&a.0));
    let mut out = text.to_string();
    for (start, end, replacement) in &edits {
        out.replace_range(*start..*end, replacement);
    }
    out
}
