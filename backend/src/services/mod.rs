//! Business logic services for the data maintenance tools

pub mod seeding;
pub mod standardization;

pub use seeding::{SeedOutcome, SeedingService};
pub use standardization::{
    CascadeOutcome, ChangeAction, ProductChange, ProductMergeOutcome, RunScope,
    StandardizationService, StandardizationSettings, TableOutcome, TableStatus,
};
