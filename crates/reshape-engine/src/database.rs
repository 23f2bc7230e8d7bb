//! ReshapeDB main database struct.

use std::sync::Arc;

use reshape_common::types::{LogicalType, Schema, Value};
use reshape_common::utils::error::{Error, Result};
use reshape_core::storage::Table;
use tracing::debug;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::query::LogicalPlan;
use crate::session::Session;

/// The main Reshape database: a catalog of in-memory tables plus the
/// configuration every session inherits.
pub struct ReshapeDB {
    /// Database configuration.
    config: Config,
    /// Registered tables.
    catalog: Arc<Catalog>,
}

impl ReshapeDB {
    /// Creates a new in-memory database with the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use reshape_engine::ReshapeDB;
    ///
    /// let db = ReshapeDB::new_in_memory();
    /// let session = db.session();
    /// ```
    #[must_use]
    pub fn new_in_memory() -> Self {
        Self::with_config(Config::in_memory())
    }

    /// Creates a database with the given configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use reshape_engine::{Config, ReshapeDB};
    ///
    /// let db = ReshapeDB::with_config(Config::in_memory().with_threads(4));
    /// assert_eq!(db.config().threads, 4);
    /// ```
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        debug!(
            threads = config.threads,
            pivot_column_limit = config.pivot_column_limit,
            "database created"
        );
        Self {
            config,
            catalog: Arc::new(Catalog::new()),
        }
    }

    /// Builds a table from rows and registers it.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows do not fit the schema or the name is
    /// taken.
    pub fn create_table(
        &self,
        name: &str,
        schema: Schema,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> Result<Arc<Table>> {
        let table = Table::from_rows(name, schema, rows)?;
        self.register_table(table)
    }

    /// Registers an already built table.
    ///
    /// # Errors
    ///
    /// Returns `TableExists` if the name is taken.
    pub fn register_table(&self, table: Table) -> Result<Arc<Table>> {
        Ok(self.catalog.register(table)?)
    }

    /// Looks up a table.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound` if no table has that name.
    pub fn table(&self, name: &str) -> Result<Arc<Table>> {
        Ok(self.catalog.get(name)?)
    }

    /// Removes a table. Returns false if it did not exist.
    pub fn drop_table(&self, name: &str) -> bool {
        self.catalog.drop_table(name)
    }

    /// Returns the registered table names, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.catalog.table_names()
    }

    /// Opens a new session.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(self.catalog.clone(), self.config.clone())
    }

    /// Executes a plan in a fresh session.
    ///
    /// # Errors
    ///
    /// Returns an error if planning or execution fails.
    pub fn execute(&self, plan: &LogicalPlan) -> Result<QueryResult> {
        self.session().execute(plan)
    }

    /// Executes a plan expected to return a single value.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or does not return exactly one
    /// value of type `T`.
    pub fn query_scalar<T: FromValue>(&self, plan: &LogicalPlan) -> Result<T> {
        self.execute(plan)?.scalar()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// The result of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column names.
    pub columns: Vec<String>,
    /// Column types.
    pub column_types: Vec<LogicalType>,
    /// Result rows.
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Creates a new empty query result.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        let len = columns.len();
        Self {
            columns,
            column_types: vec![LogicalType::Any; len],
            rows: Vec::new(),
        }
    }

    /// Creates a new empty query result with column types.
    #[must_use]
    pub fn with_types(columns: Vec<String>, column_types: Vec<LogicalType>) -> Self {
        Self {
            columns,
            column_types,
            rows: Vec::new(),
        }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the result is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column called `name`.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Gets a single scalar value from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the result doesn't have exactly one row and one column.
    pub fn scalar<T: FromValue>(&self) -> Result<T> {
        if self.rows.len() != 1 || self.columns.len() != 1 {
            return Err(Error::Execution(format!(
                "expected a single value, got {} rows of {} columns",
                self.rows.len(),
                self.columns.len()
            )));
        }
        T::from_value(&self.rows[0][0])
    }

    /// Returns an iterator over the rows.
    pub fn iter(&self) -> impl Iterator<Item = &Vec<Value>> {
        self.rows.iter()
    }
}

/// Trait for converting from Value.
pub trait FromValue: Sized {
    /// Converts from a Value.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversion fails.
    fn from_value(value: &Value) -> Result<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_int64().ok_or_else(|| Error::TypeMismatch {
            expected: "BIGINT".to_string(),
            found: value.type_name().to_string(),
        })
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.to_f64().ok_or_else(|| Error::TypeMismatch {
            expected: "DOUBLE".to_string(),
            found: value.type_name().to_string(),
        })
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| Error::TypeMismatch {
                expected: "VARCHAR".to_string(),
                found: value.type_name().to_string(),
            })
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| Error::TypeMismatch {
            expected: "BOOLEAN".to_string(),
            found: value.type_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::LogicalOperator;
    use crate::query::plan::AggregateExpr;
    use reshape_common::types::Field;

    fn schema() -> Schema {
        Schema::new(vec![Field::new("x", LogicalType::Int64)])
    }

    #[test]
    fn test_create_in_memory_database() {
        let db = ReshapeDB::new_in_memory();
        assert!(db.table_names().is_empty());
        assert!(db.config().threads >= 1);
    }

    #[test]
    fn test_database_config() {
        let config = Config::in_memory().with_threads(4).with_query_logging();
        let db = ReshapeDB::with_config(config);
        assert_eq!(db.config().threads, 4);
        assert!(db.config().query_logging);
    }

    #[test]
    fn test_table_lifecycle() {
        let db = ReshapeDB::new_in_memory();
        db.create_table("t", schema(), vec![vec![Value::Int64(1)]])
            .unwrap();
        assert!(matches!(
            db.create_table("t", schema(), Vec::new()),
            Err(Error::TableExists(_))
        ));
        assert_eq!(db.table("t").unwrap().row_count(), 1);
        assert!(db.drop_table("t"));
        assert!(matches!(db.table("t"), Err(Error::TableNotFound(_))));
    }

    #[test]
    fn test_query_scalar() {
        let db = ReshapeDB::new_in_memory();
        db.create_table("t", schema(), (1..=4).map(|i| vec![Value::Int64(i)]))
            .unwrap();
        let plan = LogicalPlan::new(
            LogicalOperator::scan("t").aggregate(Vec::new(), vec![AggregateExpr::sum("x")]),
        );
        assert_eq!(db.query_scalar::<i64>(&plan).unwrap(), 10);
        assert!(db.query_scalar::<String>(&plan).is_err());
    }
}
