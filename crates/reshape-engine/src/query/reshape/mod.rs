//! PIVOT and UNPIVOT binding.
//!
//! - **Domain**: resolves the closed set of `ON` values, by explicit lists or
//!   a parallel distinct scan
//! - **Naming**: derives output column names from domain entries and
//!   aggregates
//! - **Builder**: binds a pivot and rewrites it into aggregation plus
//!   bucket expansion
//! - **Unpivot**: binds fold families against the input schema

pub mod builder;
pub mod domain;
pub mod naming;
pub mod unpivot;

pub use builder::{BoundPivot, PivotBuilder};
pub use domain::{BoundOn, DomainResolver};
pub use naming::{OutputColumn, quote_identifier, render_value, resolve_columns};
pub use unpivot::{BoundUnpivot, bind_unpivot};
