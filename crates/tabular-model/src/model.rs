//! The in-memory model: tables owning columns and measures.
//!
//! Declaration order is load-bearing: tables keep the order they were added
//! in, and so do members within a table. Unqualified measure lookup resolves
//! to the first match across tables in declaration order, so reordering a
//! model changes how ambiguous references resolve.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{ColumnId, EntityId, FormulaProperty, HolderId, MeasureId, TableId};
use crate::names::{self, name_eq, NameValidationError};

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error(transparent)]
    InvalidName(#[from] NameValidationError),

    #[error("duplicate table: {table}")]
    DuplicateTable { table: String },

    #[error("duplicate name {name} in table {table}")]
    DuplicateMemberName { table: String, name: String },

    #[error("table not found")]
    TableNotFound,

    #[error("column not found")]
    ColumnNotFound,

    #[error("measure not found")]
    MeasureNotFound,

    #[error("column has no expression (not a calculated column)")]
    NotACalculatedColumn,

    #[error("holder has no such formula property")]
    PropertyNotFound,
}

/// A column of a table. Calculated columns carry an expression; data columns
/// do not and are referenceable targets only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    id: ColumnId,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expression: Option<String>,
}

impl Column {
    #[must_use]
    pub fn id(&self) -> ColumnId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    #[must_use]
    pub fn is_calculated(&self) -> bool {
        self.expression.is_some()
    }
}

/// A measure: always formula-bearing, optionally with a dynamic format
/// string expression as a second formula property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    id: MeasureId,
    name: String,
    expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format_string: Option<String>,
}

impl Measure {
    #[must_use]
    pub fn id(&self) -> MeasureId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    #[must_use]
    pub fn format_string(&self) -> Option<&str> {
        self.format_string.as_deref()
    }
}

/// A named table containing columns and measures in declaration order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    id: TableId,
    name: String,
    columns: Vec<Column>,
    measures: Vec<Measure>,
}

impl Table {
    #[must_use]
    pub fn id(&self) -> TableId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    /// Column and measure names share one namespace within a table.
    fn has_member_named(&self, name: &str, exclude: Option<EntityId>) -> bool {
        let excluded = |candidate: EntityId| exclude == Some(candidate);
        self.columns
            .iter()
            .any(|c| name_eq(&c.name, name) && !excluded(EntityId::Column(c.id)))
            || self
                .measures
                .iter()
                .any(|m| name_eq(&m.name, name) && !excluded(EntityId::Measure(m.id)))
    }
}

/// The model: an ordered collection of tables with id-allocating mutation
/// APIs and quoting-normalized name lookup.
///
/// All lookups accept raw reference text (`Sales`, `'Sales Data'`,
/// `[Amount]`): quoting is stripped and comparison is case-insensitive.
/// Lookups return `Option` rather than failing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    tables: Vec<Table>,
    next_table_id: TableId,
    next_column_id: ColumnId,
    next_measure_id: MeasureId,
}

impl Model {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    #[must_use]
    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    // ---- mutation -------------------------------------------------------

    pub fn add_table(&mut self, name: impl Into<String>) -> ModelResult<TableId> {
        let name = name.into();
        names::validate_entity_name(&name)?;
        if self.tables.iter().any(|t| name_eq(&t.name, &name)) {
            return Err(ModelError::DuplicateTable { table: name });
        }

        let id = self.next_table_id;
        self.next_table_id += 1;
        self.tables.push(Table {
            id,
            name,
            columns: Vec::new(),
            measures: Vec::new(),
        });
        Ok(id)
    }

    /// Add a data column (referenceable, not formula-bearing).
    pub fn add_column(&mut self, table: TableId, name: impl Into<String>) -> ModelResult<ColumnId> {
        self.insert_column(table, name.into(), None)
    }

    /// Add a calculated column (referenceable and formula-bearing).
    pub fn add_calculated_column(
        &mut self,
        table: TableId,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> ModelResult<ColumnId> {
        self.insert_column(table, name.into(), Some(expression.into()))
    }

    fn insert_column(
        &mut self,
        table: TableId,
        name: String,
        expression: Option<String>,
    ) -> ModelResult<ColumnId> {
        names::validate_entity_name(&name)?;
        {
            let table = self.table(table).ok_or(ModelError::TableNotFound)?;
            if table.has_member_named(&name, None) {
                return Err(ModelError::DuplicateMemberName {
                    table: table.name.clone(),
                    name,
                });
            }
        }

        let id = self.next_column_id;
        self.next_column_id += 1;
        let table = self.table_mut(table).expect("table existence checked above");
        table.columns.push(Column {
            id,
            name,
            expression,
        });
        Ok(id)
    }

    pub fn add_measure(
        &mut self,
        table: TableId,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> ModelResult<MeasureId> {
        let name = name.into();
        names::validate_entity_name(&name)?;
        {
            let table = self.table(table).ok_or(ModelError::TableNotFound)?;
            if table.has_member_named(&name, None) {
                return Err(ModelError::DuplicateMemberName {
                    table: table.name.clone(),
                    name,
                });
            }
        }

        let id = self.next_measure_id;
        self.next_measure_id += 1;
        let table = self.table_mut(table).expect("table existence checked above");
        table.measures.push(Measure {
            id,
            name,
            expression: expression.into(),
            format_string: None,
        });
        Ok(id)
    }

    /// Set or clear a measure's dynamic format string expression.
    pub fn set_format_string(
        &mut self,
        measure: MeasureId,
        format_string: Option<String>,
    ) -> ModelResult<()> {
        let (_, m) = self
            .measure_entry_mut(measure)
            .ok_or(ModelError::MeasureNotFound)?;
        m.format_string = format_string;
        Ok(())
    }

    /// Rename a table. The returned id is what callers hand to the
    /// dependency core's rename notification.
    pub fn rename_table(&mut self, id: TableId, new_name: impl Into<String>) -> ModelResult<EntityId> {
        let new_name = new_name.into();
        names::validate_entity_name(&new_name)?;
        if self
            .tables
            .iter()
            .any(|t| t.id != id && name_eq(&t.name, &new_name))
        {
            return Err(ModelError::DuplicateTable { table: new_name });
        }

        let table = self.table_mut(id).ok_or(ModelError::TableNotFound)?;
        table.name = new_name;
        Ok(EntityId::Table(id))
    }

    pub fn rename_column(
        &mut self,
        id: ColumnId,
        new_name: impl Into<String>,
    ) -> ModelResult<EntityId> {
        let new_name = new_name.into();
        names::validate_entity_name(&new_name)?;
        let table = self
            .tables
            .iter_mut()
            .find(|t| t.columns.iter().any(|c| c.id == id))
            .ok_or(ModelError::ColumnNotFound)?;
        if table.has_member_named(&new_name, Some(EntityId::Column(id))) {
            return Err(ModelError::DuplicateMemberName {
                table: table.name.clone(),
                name: new_name,
            });
        }

        let column = table
            .columns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ModelError::ColumnNotFound)?;
        column.name = new_name;
        Ok(EntityId::Column(id))
    }

    pub fn rename_measure(
        &mut self,
        id: MeasureId,
        new_name: impl Into<String>,
    ) -> ModelResult<EntityId> {
        let new_name = new_name.into();
        names::validate_entity_name(&new_name)?;
        let table = self
            .tables
            .iter_mut()
            .find(|t| t.measures.iter().any(|m| m.id == id))
            .ok_or(ModelError::MeasureNotFound)?;
        if table.has_member_named(&new_name, Some(EntityId::Measure(id))) {
            return Err(ModelError::DuplicateMemberName {
                table: table.name.clone(),
                name: new_name,
            });
        }

        let measure = table
            .measures
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(ModelError::MeasureNotFound)?;
        measure.name = new_name;
        Ok(EntityId::Measure(id))
    }

    /// Remove a table and everything it contains. Returns the ids of every
    /// removed entity (members first, the table last) so callers can purge
    /// each from the dependency graph.
    pub fn remove_table(&mut self, id: TableId) -> ModelResult<Vec<EntityId>> {
        let idx = self
            .tables
            .iter()
            .position(|t| t.id == id)
            .ok_or(ModelError::TableNotFound)?;
        let table = self.tables.remove(idx);

        let mut removed: Vec<EntityId> = Vec::with_capacity(table.columns.len() + table.measures.len() + 1);
        removed.extend(table.columns.iter().map(|c| EntityId::Column(c.id)));
        removed.extend(table.measures.iter().map(|m| EntityId::Measure(m.id)));
        removed.push(EntityId::Table(id));
        Ok(removed)
    }

    pub fn remove_column(&mut self, id: ColumnId) -> ModelResult<()> {
        for table in &mut self.tables {
            if let Some(idx) = table.columns.iter().position(|c| c.id == id) {
                table.columns.remove(idx);
                return Ok(());
            }
        }
        Err(ModelError::ColumnNotFound)
    }

    pub fn remove_measure(&mut self, id: MeasureId) -> ModelResult<()> {
        for table in &mut self.tables {
            if let Some(idx) = table.measures.iter().position(|m| m.id == id) {
                table.measures.remove(idx);
                return Ok(());
            }
        }
        Err(ModelError::MeasureNotFound)
    }

    // ---- normalized lookup ----------------------------------------------

    pub fn table_by_name(&self, name: &str) -> Option<TableId> {
        let needle = names::strip_quoting(name);
        self.tables
            .iter()
            .find(|t| name_eq(&t.name, &needle))
            .map(|t| t.id)
    }

    pub fn column_in_table(&self, table: TableId, name: &str) -> Option<ColumnId> {
        let needle = names::strip_quoting(name);
        self.table(table)?
            .columns
            .iter()
            .find(|c| name_eq(&c.name, &needle))
            .map(|c| c.id)
    }

    pub fn measure_in_table(&self, table: TableId, name: &str) -> Option<MeasureId> {
        let needle = names::strip_quoting(name);
        self.table(table)?
            .measures
            .iter()
            .find(|m| name_eq(&m.name, &needle))
            .map(|m| m.id)
    }

    /// The first measure with this name across all tables, in table
    /// declaration order. This is the deterministic tie-break for ambiguous
    /// unqualified references.
    pub fn first_measure_named(&self, name: &str) -> Option<MeasureId> {
        let needle = names::strip_quoting(name);
        self.tables
            .iter()
            .flat_map(|t| &t.measures)
            .find(|m| name_eq(&m.name, &needle))
            .map(|m| m.id)
    }

    // ---- entity access ---------------------------------------------------

    pub fn entity_name(&self, entity: EntityId) -> Option<&str> {
        match entity {
            EntityId::Table(id) => self.table(id).map(Table::name),
            EntityId::Column(id) => self.column_entry(id).map(|(_, c)| c.name.as_str()),
            EntityId::Measure(id) => self.measure_entry(id).map(|(_, m)| m.name.as_str()),
        }
    }

    /// The table owning a holder.
    pub fn holder_table(&self, holder: HolderId) -> Option<TableId> {
        match holder {
            HolderId::Column(id) => self.column_entry(id).map(|(t, _)| t.id),
            HolderId::Measure(id) => self.measure_entry(id).map(|(t, _)| t.id),
        }
    }

    /// Every formula-bearing entity in the model: calculated columns and
    /// measures, in declaration order.
    #[must_use]
    pub fn holders(&self) -> Vec<HolderId> {
        let mut out = Vec::new();
        for table in &self.tables {
            out.extend(
                table
                    .columns
                    .iter()
                    .filter(|c| c.is_calculated())
                    .map(|c| HolderId::Column(c.id)),
            );
            out.extend(table.measures.iter().map(|m| HolderId::Measure(m.id)));
        }
        out
    }

    /// Ordered `(property, text)` pairs for every formula-bearing property
    /// of `holder`. Unknown holders and data columns enumerate nothing.
    #[must_use]
    pub fn formula_properties(&self, holder: HolderId) -> Vec<(FormulaProperty, &str)> {
        match holder {
            HolderId::Column(id) => self
                .column_entry(id)
                .and_then(|(_, c)| c.expression())
                .map(|expr| vec![(FormulaProperty::Expression, expr)])
                .unwrap_or_default(),
            HolderId::Measure(id) => {
                let Some((_, m)) = self.measure_entry(id) else {
                    return Vec::new();
                };
                let mut out = vec![(FormulaProperty::Expression, m.expression.as_str())];
                if let Some(fmt) = m.format_string() {
                    out.push((FormulaProperty::FormatString, fmt));
                }
                out
            }
        }
    }

    pub fn formula_property(&self, holder: HolderId, property: FormulaProperty) -> Option<&str> {
        self.formula_properties(holder)
            .into_iter()
            .find(|(p, _)| *p == property)
            .map(|(_, text)| text)
    }

    /// Replace one formula property's text. Used by the rename fixup engine;
    /// the property must already exist on the holder.
    pub fn set_formula_property(
        &mut self,
        holder: HolderId,
        property: FormulaProperty,
        text: String,
    ) -> ModelResult<()> {
        match (holder, property) {
            (HolderId::Column(id), FormulaProperty::Expression) => {
                let (_, column) = self
                    .column_entry_mut(id)
                    .ok_or(ModelError::ColumnNotFound)?;
                if column.expression.is_none() {
                    return Err(ModelError::NotACalculatedColumn);
                }
                column.expression = Some(text);
                Ok(())
            }
            (HolderId::Column(_), _) => Err(ModelError::PropertyNotFound),
            (HolderId::Measure(id), FormulaProperty::Expression) => {
                let (_, measure) = self
                    .measure_entry_mut(id)
                    .ok_or(ModelError::MeasureNotFound)?;
                measure.expression = text;
                Ok(())
            }
            (HolderId::Measure(id), FormulaProperty::FormatString) => {
                let (_, measure) = self
                    .measure_entry_mut(id)
                    .ok_or(ModelError::MeasureNotFound)?;
                if measure.format_string.is_none() {
                    return Err(ModelError::PropertyNotFound);
                }
                measure.format_string = Some(text);
                Ok(())
            }
        }
    }

    // ---- internal --------------------------------------------------------

    fn table_mut(&mut self, id: TableId) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.id == id)
    }

    fn column_entry(&self, id: ColumnId) -> Option<(&Table, &Column)> {
        self.tables.iter().find_map(|t| {
            t.columns
                .iter()
                .find(|c| c.id == id)
                .map(|c| (t, c))
        })
    }

    fn column_entry_mut(&mut self, id: ColumnId) -> Option<(TableId, &mut Column)> {
        self.tables.iter_mut().find_map(|t| {
            let table_id = t.id;
            t.columns
                .iter_mut()
                .find(|c| c.id == id)
                .map(|c| (table_id, c))
        })
    }

    fn measure_entry(&self, id: MeasureId) -> Option<(&Table, &Measure)> {
        self.tables.iter().find_map(|t| {
            t.measures
                .iter()
                .find(|m| m.id == id)
                .map(|m| (t, m))
        })
    }

    fn measure_entry_mut(&mut self, id: MeasureId) -> Option<(TableId, &mut Measure)> {
        self.tables.iter_mut().find_map(|t| {
            let table_id = t.id;
            t.measures
                .iter_mut()
                .find(|m| m.id == id)
                .map(|m| (table_id, m))
        })
    }
}
