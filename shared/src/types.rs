//! Common types used across the toolkit

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a remote row
///
/// PostgREST hands keys back as JSON numbers for serial columns and as
/// strings for UUID or text columns; all three shapes are kept as-is so the
/// key can be echoed back into an `id=eq.` filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Uuid(uuid::Uuid),
    Text(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(id) => write!(f, "{}", id),
            RowId::Uuid(id) => write!(f, "{}", id),
            RowId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        RowId::Int(id)
    }
}

impl From<i32> for RowId {
    fn from(id: i32) -> Self {
        RowId::Int(i64::from(id))
    }
}

impl From<uuid::Uuid> for RowId {
    fn from(id: uuid::Uuid) -> Self {
        RowId::Uuid(id)
    }
}

/// A table/column pair holding a denormalized vehicle-type label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TableColumn {
    pub table: String,
    pub column: String,
}

impl TableColumn {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for TableColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Tables that copy the vehicle-type label into a `vehicle_type` column
pub const DEFAULT_REFERENCE_TABLES: [&str; 4] = [
    "quality_costs",
    "deviations",
    "quality_inspections",
    "kaizen_entries",
];

/// Default cascade registry
pub fn default_registry() -> Vec<TableColumn> {
    DEFAULT_REFERENCE_TABLES
        .iter()
        .map(|table| TableColumn::new(*table, "vehicle_type"))
        .collect()
}

/// Tables that record a free-text `part_code`
pub const DEFAULT_PART_TABLES: [&str; 2] = ["quality_costs", "deviations"];

/// Columns scanned when seeding the parts catalog
pub fn default_part_registry() -> Vec<TableColumn> {
    DEFAULT_PART_TABLES
        .iter()
        .map(|table| TableColumn::new(*table, "part_code"))
        .collect()
}

/// Rows per page when scanning a dependent table
pub const DEFAULT_PAGE_SIZE: usize = 1000;
