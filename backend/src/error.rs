//! Error handling for the maintenance tools
//!
//! Per-item failures are counted and logged by the services; only errors
//! that make a whole run meaningless propagate to the binary.

use qms_shared::CatalogError;
use thiserror::Error;

/// Postgres: relation does not exist
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// PostgREST: relation missing from the schema cache
pub const POSTGREST_UNKNOWN_TABLE: &str = "PGRST205";

/// Postgres: unique constraint violation
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid vehicle-type catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Product category {0} not found")]
    CategoryNotFound(String),

    #[error("Table {0} does not exist")]
    MissingTable(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Backend error ({status}, {}): {message}", .code.as_deref().unwrap_or("no code"))]
    Backend {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Classify a PostgREST error body for the given table
    pub fn from_backend(table: &str, status: u16, code: Option<String>, message: String) -> Self {
        match code.as_deref() {
            Some(PG_UNDEFINED_TABLE) | Some(POSTGREST_UNKNOWN_TABLE) => {
                AppError::MissingTable(table.to_string())
            }
            Some(PG_UNIQUE_VIOLATION) => AppError::DuplicateEntry(message),
            _ => AppError::Backend {
                status,
                code,
                message,
            },
        }
    }

    pub fn is_missing_table(&self) -> bool {
        matches!(self, AppError::MissingTable(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, AppError::DuplicateEntry(_))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias for services
pub type AppResult<T> = Result<T, AppError>;
