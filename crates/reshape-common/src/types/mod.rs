//! Core type definitions for Reshape.
//!
//! This module contains the fundamental types shared by planning and execution:
//! - Scalar values ([`Value`]) and their types ([`LogicalType`])
//! - Relation schemas ([`Schema`], [`Field`])
//! - Closed, ordered pivot domains ([`Domain`])

mod domain;
mod logical_type;
mod schema;
mod value;

pub use domain::{Domain, DomainBuilder, DomainTuple};
pub use logical_type::LogicalType;
pub use schema::{Field, Schema};
pub use value::Value;
