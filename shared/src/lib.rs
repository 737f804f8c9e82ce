//! Shared domain logic for the quality-management data tools
//!
//! This crate holds the vehicle-type catalog and normalizer used by the
//! maintenance binary and, via WASM, by the browser front-end.

pub mod catalog;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod types;
pub mod validation;

pub use catalog::*;
pub use merge::*;
pub use models::*;
pub use normalize::*;
pub use types::*;
pub use validation::*;
