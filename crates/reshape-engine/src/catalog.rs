//! Table catalog.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use thiserror::Error;

use reshape_core::storage::Table;

/// Catalog lookup and registration failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No table with this name.
    #[error("table not found: {0}")]
    TableNotFound(String),
    /// A table with this name is already registered.
    #[error("table already exists: {0}")]
    TableExists(String),
}

impl From<CatalogError> for reshape_common::Error {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TableNotFound(name) => Self::TableNotFound(name),
            CatalogError::TableExists(name) => Self::TableExists(name),
        }
    }
}

/// Name → table map shared by every session of a database.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table under its own name.
    pub fn register(&self, table: Table) -> Result<Arc<Table>, CatalogError> {
        let mut tables = self.tables.write();
        if tables.contains_key(table.name()) {
            return Err(CatalogError::TableExists(table.name().to_string()));
        }
        let table = Arc::new(table);
        tables.insert(table.name().to_string(), Arc::clone(&table));
        Ok(table)
    }

    /// Looks a table up.
    pub fn get(&self, name: &str) -> Result<Arc<Table>, CatalogError> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))
    }

    /// Removes a table. Running queries keep their snapshot.
    pub fn drop_table(&self, name: &str) -> bool {
        self.tables.write().remove(name).is_some()
    }

    /// Registered table names, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}
