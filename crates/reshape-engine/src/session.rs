//! Session management.

use std::sync::Arc;

use reshape_common::types::Schema;
use reshape_common::utils::error::Result;
use reshape_core::execution::CancellationToken;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::database::QueryResult;
use crate::query::{Executor, LogicalPlan, Planner, QueryStream};

/// A session for running queries against a database.
///
/// Every session owns a cancellation token. Cancelling it aborts the
/// session's running scans and PIVOT domain resolution with `Cancelled`.
/// The token stays cancelled until it is reset.
pub struct Session {
    /// Tables visible to this session.
    catalog: Arc<Catalog>,
    /// Configuration snapshot.
    config: Config,
    /// Cancellation for this session's queries.
    cancel: CancellationToken,
}

impl Session {
    /// Creates a new session.
    pub(crate) fn new(catalog: Arc<Catalog>, config: Config) -> Self {
        Self {
            catalog,
            config,
            cancel: CancellationToken::new(),
        }
    }

    fn planner(&self) -> Planner {
        Planner::new(self.catalog.clone(), self.config.clone(), self.cancel.clone())
    }

    fn executor(&self) -> Executor {
        Executor::new().with_query_logging(self.config.query_logging)
    }

    /// Executes a plan and collects every row.
    ///
    /// # Errors
    ///
    /// Returns an error if planning or execution fails.
    pub fn execute(&self, plan: &LogicalPlan) -> Result<QueryResult> {
        let physical = self.planner().plan(plan)?;
        self.executor().execute(physical)
    }

    /// Plans `plan` and returns a lazy row stream.
    ///
    /// Planning, including PIVOT domain resolution, completes before this
    /// returns, so the stream's schema is final.
    ///
    /// # Errors
    ///
    /// Returns an error if planning fails.
    pub fn stream(&self, plan: &LogicalPlan) -> Result<QueryStream> {
        let physical = self.planner().plan(plan)?;
        Ok(self.executor().stream(physical))
    }

    /// Returns the output schema of `plan` without producing rows.
    ///
    /// # Errors
    ///
    /// Returns an error if planning fails.
    pub fn schema(&self, plan: &LogicalPlan) -> Result<Schema> {
        Ok(self.planner().plan(plan)?.schema)
    }

    /// Returns a handle to this session's cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns the session's configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ReshapeDB;
    use crate::query::LogicalOperator;
    use reshape_common::types::{Field, LogicalType, Value};
    use reshape_common::utils::error::Error;

    fn db() -> ReshapeDB {
        let db = ReshapeDB::new_in_memory();
        db.create_table(
            "t",
            Schema::new(vec![Field::new("x", LogicalType::Int64)]),
            (0..5).map(|i| vec![Value::Int64(i)]),
        )
        .unwrap();
        db
    }

    #[test]
    fn test_session_execute() {
        let db = db();
        let session = db.session();
        let result = session
            .execute(&LogicalPlan::new(LogicalOperator::scan("t")))
            .unwrap();
        assert_eq!(result.row_count(), 5);
    }

    #[test]
    fn test_session_schema() {
        let db = db();
        let schema = db
            .session()
            .schema(&LogicalPlan::new(LogicalOperator::scan("t")))
            .unwrap();
        assert_eq!(schema.names(), vec!["x"]);
    }

    #[test]
    fn test_cancelled_session() {
        let db = db();
        let session = db.session();
        let token = session.cancel_token();
        token.cancel();

        let plan = LogicalPlan::new(LogicalOperator::scan("t"));
        assert!(matches!(session.execute(&plan), Err(Error::Cancelled)));

        token.reset();
        assert!(session.execute(&plan).is_ok());
    }
}
