//! Database configuration.

use serde::{Deserialize, Serialize};

use reshape_core::execution::DEFAULT_CHUNK_CAPACITY;

/// Default cap on the number of values a PIVOT distinct scan may discover.
pub const DEFAULT_PIVOT_COLUMN_LIMIT: usize = 100_000;

/// Order of pivot domain entries that have no explicit ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainOrder {
    /// Order in which values first appear in the source.
    #[default]
    FirstSeen,
    /// Ascending value order.
    Sorted,
}

/// Configuration for a [`ReshapeDB`](crate::ReshapeDB) instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of partitions (and worker threads) per query.
    pub threads: usize,
    /// Maximum number of distinct values a PIVOT may discover by scanning.
    pub pivot_column_limit: usize,
    /// Rows per chunk produced by table scans.
    pub chunk_capacity: usize,
    /// Ordering of scanned pivot values.
    pub domain_order: DomainOrder,
    /// Log every completed query at INFO level.
    pub query_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            pivot_column_limit: DEFAULT_PIVOT_COLUMN_LIMIT,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            domain_order: DomainOrder::FirstSeen,
            query_logging: false,
        }
    }
}

impl Config {
    /// Creates the default configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Sets the number of partitions. Zero is treated as one.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Sets the PIVOT distinct-scan limit.
    #[must_use]
    pub fn with_pivot_column_limit(mut self, limit: usize) -> Self {
        self.pivot_column_limit = limit;
        self
    }

    /// Sets the scan chunk capacity.
    #[must_use]
    pub fn with_chunk_capacity(mut self, capacity: usize) -> Self {
        self.chunk_capacity = capacity.max(1);
        self
    }

    /// Sets the ordering of scanned pivot values.
    #[must_use]
    pub fn with_domain_order(mut self, order: DomainOrder) -> Self {
        self.domain_order = order;
        self
    }

    /// Enables query logging.
    #[must_use]
    pub fn with_query_logging(mut self) -> Self {
        self.query_logging = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.threads >= 1);
        assert_eq!(config.pivot_column_limit, 100_000);
        assert_eq!(config.chunk_capacity, 2048);
        assert_eq!(config.domain_order, DomainOrder::FirstSeen);
        assert!(!config.query_logging);
    }

    #[test]
    fn test_builder() {
        let config = Config::in_memory()
            .with_threads(0)
            .with_pivot_column_limit(10)
            .with_domain_order(DomainOrder::Sorted)
            .with_query_logging();
        assert_eq!(config.threads, 1);
        assert_eq!(config.pivot_column_limit, 10);
        assert_eq!(config.domain_order, DomainOrder::Sorted);
        assert!(config.query_logging);
    }
}
