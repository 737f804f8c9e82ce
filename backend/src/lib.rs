//! Quality Management Platform - data maintenance tools
//!
//! Batch jobs run against the hosted database API: vehicle-type
//! standardization (catalog merge plus cascade into dependent tables) and
//! catalog seeding.

pub mod config;
pub mod error;
pub mod external;
pub mod report;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use external::PostgrestClient;
pub use report::StandardizationReport;
pub use store::CatalogStore;
