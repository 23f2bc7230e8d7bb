//! Query processing pipeline.
//!
//! - **Plan**: Logical operators, including PIVOT and UNPIVOT requests
//! - **Binder**: Name resolution against input schemas
//! - **Reshape**: Domain resolution, column naming and pivot rewriting
//! - **Planner**: Convert logical plans to partitioned physical operators
//! - **Executor**: Execute physical operators and collect or stream results

pub mod binder;
pub mod executor;
pub mod plan;
pub mod planner;
pub mod reshape;

pub use executor::{Executor, QueryStream};
pub use plan::{LogicalExpression, LogicalOperator, LogicalPlan};
pub use planner::{PhysicalPlan, Planner};
