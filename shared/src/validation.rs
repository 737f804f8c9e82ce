//! Validation utilities
//!
//! Table and column names end up inside PostgREST request URLs, so registry
//! entries are restricted to plain SQL identifiers.

use crate::types::TableColumn;

/// PostgreSQL truncates identifiers beyond this many bytes
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Largest page PostgREST is asked for in one request
pub const MAX_PAGE_SIZE: usize = 10_000;

/// Validate an unquoted SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`)
pub fn validate_identifier(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Identifier must not be empty");
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err("Identifier must be at most 63 bytes");
    }
    let mut chars = name.chars();
    if !chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
    {
        return Err("Identifier must start with a letter or underscore");
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Identifier must contain only letters, digits and underscores");
    }
    Ok(())
}

/// Validate both halves of a registry entry
pub fn validate_table_column(target: &TableColumn) -> Result<(), &'static str> {
    validate_identifier(&target.table)?;
    validate_identifier(&target.column)?;
    if target.column == "id" {
        return Err("The id column cannot be rewritten");
    }
    Ok(())
}

/// Validate the dependent-table page size
pub fn validate_page_size(page_size: usize) -> Result<(), &'static str> {
    if page_size == 0 {
        return Err("Page size must be positive");
    }
    if page_size > MAX_PAGE_SIZE {
        return Err("Page size must be at most 10000");
    }
    Ok(())
}
