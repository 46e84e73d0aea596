//! The reference resolver: one property's token stream in, ordered
//! dependency edges out.
//!
//! A single left-to-right scan with one piece of state: the most recent
//! table-ish token, kept *pending* because only the following token decides
//! what it was. A `[bracket]` token consumes it as a qualifier; any other
//! token (or the end of the scan) flushes it as a standalone table
//! reference, provided it resolves to a known table. Unresolved names
//! (variables, functions, typos) simply produce no edge.

use tabular_model::{EntityId, FormulaProperty, Model, TableId};

use crate::tokens::{Token, TokenKind};

/// A single resolved reference from a span of property text to an entity.
///
/// Offsets are byte offsets into the property text as of the holder's last
/// rebuild. The span covers the reference's full source text, quoting
/// included, so a splice replaces the whole textual reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub property: FormulaProperty,
    pub target: EntityId,
    pub start: usize,
    pub end: usize,
    pub is_table_ref: bool,
}

/// Scanner state: nothing pending, or the table-ish token whose role the
/// next token has not yet decided.
#[derive(Clone, Copy)]
enum Pending<'a> {
    None,
    Table(&'a Token),
}

/// Resolve one property's token stream against `model`.
///
/// `owning_table` is the table containing the holder, used for unqualified
/// column/measure resolution. Emission order equals source order; the fixup
/// engine relies on it.
#[must_use]
pub fn resolve_property(
    model: &Model,
    owning_table: Option<TableId>,
    property: FormulaProperty,
    tokens: &[Token],
) -> Vec<Edge> {
    let mut edges = Vec::new();
    let mut pending = Pending::None;

    for token in tokens {
        match token.kind {
            TokenKind::TableName | TokenKind::TableOrBareName => {
                flush_pending(model, property, &mut pending, &mut edges);
                pending = Pending::Table(token);
            }
            TokenKind::ColumnOrMeasureName => {
                let qualifier = match pending {
                    Pending::Table(t) => model.table_by_name(&t.text),
                    Pending::None => None,
                };
                if let Some(target) = resolve_name(model, owning_table, qualifier, &token.text) {
                    edges.push(Edge {
                        property,
                        target,
                        start: token.start,
                        end: token.end,
                        is_table_ref: false,
                    });
                }
                // The qualifier was consumed; it emits no table edge.
                pending = Pending::None;
            }
            TokenKind::Other => {
                flush_pending(model, property, &mut pending, &mut edges);
            }
        }
    }
    flush_pending(model, property, &mut pending, &mut edges);

    edges
}

fn flush_pending(
    model: &Model,
    property: FormulaProperty,
    pending: &mut Pending<'_>,
    edges: &mut Vec<Edge>,
) {
    if let Pending::Table(token) = *pending {
        if let Some(table) = model.table_by_name(&token.text) {
            edges.push(Edge {
                property,
                target: EntityId::Table(table),
                start: token.start,
                end: token.end,
                is_table_ref: true,
            });
        }
        *pending = Pending::None;
    }
}

/// Column/measure name resolution.
///
/// A name qualified by a known table resolves only within that table
/// (column first, then measure). Unqualified names cascade: column in the
/// owning table, measure in the owning table, then the first measure with
/// that name across all tables in declaration order, the deterministic
/// tie-break for ambiguous references.
fn resolve_name(
    model: &Model,
    owning_table: Option<TableId>,
    qualifier: Option<TableId>,
    name: &str,
) -> Option<EntityId> {
    if let Some(table) = qualifier {
        return model
            .column_in_table(table, name)
            .map(EntityId::Column)
            .or_else(|| model.measure_in_table(table, name).map(EntityId::Measure));
    }

    if let Some(table) = owning_table {
        if let Some(column) = model.column_in_table(table, name) {
            return Some(EntityId::Column(column));
        }
        if let Some(measure) = model.measure_in_table(table, name) {
            return Some(EntityId::Measure(measure));
        }
    }

    model.first_measure_named(name).map(EntityId::Measure)
}
