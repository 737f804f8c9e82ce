//! Catalog models

use serde::{Deserialize, Serialize};

use crate::types::RowId;

/// Category code grouping the vehicle-type catalog rows
pub const VEHICLE_TYPES_CATEGORY: &str = "VEHICLE_TYPES";

/// Category code grouping the parts catalog rows
pub const PARTS_CATEGORY: &str = "PARTS";

/// A `product_categories` row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: RowId,
}

/// A `products` row of the vehicle-type catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRow {
    pub id: RowId,
    pub product_code: Option<String>,
    pub product_name: Option<String>,
}

impl ProductRow {
    /// Trimmed display label: the name, falling back to the code
    pub fn label(&self) -> Option<&str> {
        non_blank(self.product_name.as_deref()).or_else(|| non_blank(self.product_code.as_deref()))
    }
}

/// Payload for inserting a catalog row
#[derive(Debug, Clone, Serialize)]
pub struct NewProduct<'a> {
    pub product_code: &'a str,
    pub product_name: &'a str,
    pub category_id: &'a RowId,
    /// Set for parts, where the code doubles as the part number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_number: Option<&'a str>,
    pub is_active: bool,
}

/// Payload for relabeling a catalog row
#[derive(Debug, Clone, Serialize)]
pub struct ProductLabelUpdate<'a> {
    pub product_code: &'a str,
    pub product_name: &'a str,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
