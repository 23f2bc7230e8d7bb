//! CLI command implementations.

pub mod parse;
pub mod pivot;
pub mod schema;
pub mod unpivot;
