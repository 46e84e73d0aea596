//! `tabular-model` defines the core in-memory data model for Tabular-style
//! analytical models: tables owning columns and measures, with stable ids,
//! declaration-order storage, and quoting-normalized name lookup.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the dependency core (`tabular-refs`: reference resolution, rename fixup)
//! - UI/tree layers and IPC boundaries via `serde` (JSON-safe schema)

mod entity;
mod model;
pub mod names;

pub use entity::{ColumnId, EntityId, FormulaProperty, HolderId, MeasureId, TableId};
pub use model::{Column, Measure, Model, ModelError, ModelResult, Table};
pub use names::{
    bracket_reference_text, name_eq, strip_quoting, table_reference_text, validate_entity_name,
    NameValidationError,
};
