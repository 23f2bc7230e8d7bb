//! # reshape-common
//!
//! Foundation layer for Reshape: values, types, schemas, and errors.
//!
//! This crate provides the fundamental building blocks used by all other
//! Reshape crates. It has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions (Value, LogicalType, Schema, Domain)
//! - [`utils`] - Utility functions and helpers (hashing, errors)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use types::{Domain, DomainBuilder, Field, LogicalType, Schema, Value};
pub use utils::error::{Error, Result};
