//! Query executor.
//!
//! Drives a physical operator tree to completion, either collecting every
//! row into a [`QueryResult`] or handing rows out one at a time through a
//! [`QueryStream`].

use std::collections::VecDeque;
use std::time::Instant;

use reshape_common::types::{Schema, Value};
use reshape_common::utils::error::Result;
use reshape_core::execution::operators::Operator;
use tracing::info;

use super::planner::PhysicalPlan;
use crate::database::QueryResult;

/// Executes physical plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    query_logging: bool,
}

impl Executor {
    /// Creates an executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs every completed query at INFO level.
    #[must_use]
    pub fn with_query_logging(mut self, enabled: bool) -> Self {
        self.query_logging = enabled;
        self
    }

    /// Runs `plan` and collects every row.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any operator.
    pub fn execute(&self, plan: PhysicalPlan) -> Result<QueryResult> {
        let started = Instant::now();
        let PhysicalPlan {
            mut operator,
            schema,
        } = plan;

        let mut result = QueryResult::with_types(
            schema.names().into_iter().map(str::to_string).collect(),
            schema.types(),
        );
        while let Some(chunk) = operator.next()? {
            result.rows.extend(chunk.rows());
        }

        if self.query_logging {
            info!(
                rows = result.row_count(),
                columns = result.column_count(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "query completed"
            );
        }
        Ok(result)
    }

    /// Starts streaming `plan`. Nothing runs until the first row is pulled.
    #[must_use]
    pub fn stream(&self, plan: PhysicalPlan) -> QueryStream {
        QueryStream {
            operator: Some(plan.operator),
            schema: plan.schema,
            buffer: VecDeque::new(),
            query_logging: self.query_logging,
            rows: 0,
        }
    }
}

/// A lazily evaluated query result.
///
/// The schema is known before any row is produced. After an error the
/// stream yields `Err` once and then ends.
pub struct QueryStream {
    operator: Option<Box<dyn Operator>>,
    schema: Schema,
    buffer: VecDeque<Vec<Value>>,
    query_logging: bool,
    rows: usize,
}

impl QueryStream {
    /// Output schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Output column names.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        self.schema.names().into_iter().map(str::to_string).collect()
    }
}

impl Iterator for QueryStream {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                self.rows += 1;
                return Some(Ok(row));
            }
            let operator = self.operator.as_mut()?;
            match operator.next() {
                Ok(Some(chunk)) => self.buffer.extend(chunk.rows()),
                Ok(None) => {
                    self.operator = None;
                    if self.query_logging {
                        info!(rows = self.rows, "query stream completed");
                    }
                    return None;
                }
                Err(err) => {
                    self.operator = None;
                    return Some(Err(err.into()));
                }
            }
        }
    }
}
