//! # reshape-engine
//!
//! The main entry point for Reshape: database and session management,
//! logical plans, PIVOT/UNPIVOT binding, planning and execution.
//!
//! ## Modules
//!
//! - [`database`] - ReshapeDB struct and query results
//! - [`session`] - Sessions, streaming and cancellation
//! - [`config`] - Configuration options
//! - [`catalog`] - Named table registry
//! - [`query`] - Logical plans, binding, planning, execution

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod config;
pub mod database;
pub mod query;
pub mod session;

pub use catalog::{Catalog, CatalogError};
pub use config::{Config, DomainOrder};
pub use database::{FromValue, QueryResult, ReshapeDB};
pub use query::QueryStream;
pub use session::Session;
