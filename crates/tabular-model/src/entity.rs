use serde::{Deserialize, Serialize};

/// Stable identifier for a table. Assigned by the model, never reused.
pub type TableId = u32;

/// Stable identifier for a column. Assigned by the model, never reused.
pub type ColumnId = u32;

/// Stable identifier for a measure. Assigned by the model, never reused.
pub type MeasureId = u32;

/// Identity of a referenceable named entity.
///
/// Identity is id-based and survives renames; the display name is owned by
/// the [`crate::Model`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityId {
    Table(TableId),
    Column(ColumnId),
    Measure(MeasureId),
}

/// Identity of a formula-bearing entity whose dependencies are tracked.
///
/// Measures and calculated columns hold formula text. A holder is itself a
/// referenceable entity (a measure is both holder and target).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum HolderId {
    Column(ColumnId),
    Measure(MeasureId),
}

impl EntityId {
    /// The holder identity of this entity, if it can bear formulas.
    #[must_use]
    pub fn as_holder(self) -> Option<HolderId> {
        match self {
            EntityId::Table(_) => None,
            EntityId::Column(id) => Some(HolderId::Column(id)),
            EntityId::Measure(id) => Some(HolderId::Measure(id)),
        }
    }
}

impl From<HolderId> for EntityId {
    fn from(holder: HolderId) -> Self {
        match holder {
            HolderId::Column(id) => EntityId::Column(id),
            HolderId::Measure(id) => EntityId::Measure(id),
        }
    }
}

/// A formula-bearing property of a holder.
///
/// Dependency edges are local to exactly one `(holder, property)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaProperty {
    /// The main expression of a measure or calculated column.
    Expression,
    /// A measure's dynamic format string expression.
    FormatString,
}
