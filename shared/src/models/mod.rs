//! Row models for the tables the toolkit reads and writes

mod product;
mod reference;

pub use product::*;
pub use reference::*;
