//! Dependent-table rows carrying a denormalized vehicle-type label

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::RowId;

/// One row of a dependent table, reduced to its key and label column
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRow {
    pub id: RowId,
    pub value: Option<String>,
}

impl ReferenceRow {
    pub fn new(id: impl Into<RowId>, value: Option<&str>) -> Self {
        Self {
            id: id.into(),
            value: value.map(String::from),
        }
    }

    /// Build from a raw PostgREST object selected as `id,{column}`
    ///
    /// Returns `None` when the object carries no usable `id`. Non-string
    /// column values are treated as null.
    pub fn from_json(object: Map<String, Value>, column: &str) -> Option<Self> {
        let id = serde_json::from_value::<RowId>(object.get("id")?.clone()).ok()?;
        let value = match object.get(column) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        Some(Self { id, value })
    }
}
