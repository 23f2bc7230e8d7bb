//! # Reshape
//!
//! A pure-Rust, embeddable engine for turning rows into columns (PIVOT) and
//! columns into rows (UNPIVOT).
//!
//! Start with [`ReshapeDB`]: register tables, open a [`Session`] and run
//! [`LogicalPlan`]s built from [`LogicalOperator`] builders. Pivots discover
//! their output columns during planning, so a result's schema is final
//! before the first row is produced.
//!
//! ## Quick Start
//!
//! ```rust
//! use reshape::plan::{AggregateExpr, PivotOp};
//! use reshape::{Field, LogicalExpression, LogicalOperator, LogicalPlan, LogicalType, ReshapeDB, Schema, Value};
//!
//! let db = ReshapeDB::new_in_memory();
//! db.create_table(
//!     "cities",
//!     Schema::new(vec![
//!         Field::new("country", LogicalType::String),
//!         Field::new("year", LogicalType::Int64),
//!         Field::new("population", LogicalType::Int64),
//!     ]),
//!     vec![
//!         vec![Value::from("NL"), Value::Int64(2000), Value::Int64(1005)],
//!         vec![Value::from("US"), Value::Int64(2010), Value::Int64(8175)],
//!     ],
//! )?;
//!
//! let pivot = PivotOp::new(LogicalOperator::scan("cities"))
//!     .on(LogicalExpression::column("year"))
//!     .using(AggregateExpr::sum("population"))
//!     .build();
//! let result = db.execute(&LogicalPlan::new(pivot))?;
//! assert_eq!(result.columns, vec!["country", "2000", "2010"]);
//! # Ok::<(), reshape::Error>(())
//! ```

// Re-export the main database API
pub use reshape_engine::{
    Catalog, CatalogError, Config, DomainOrder, FromValue, QueryResult, QueryStream, ReshapeDB,
    Session,
};

// Plan construction
pub use reshape_engine::query::plan;
pub use reshape_engine::query::{LogicalExpression, LogicalOperator, LogicalPlan};

// Core types
pub use reshape_common::types::{Domain, Field, LogicalType, Schema, Value};
pub use reshape_common::utils::error::{Error, Result};
pub use reshape_core::execution::CancellationToken;
