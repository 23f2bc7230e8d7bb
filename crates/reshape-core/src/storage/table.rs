//! Immutable columnar tables.

use std::ops::Range;

use reshape_common::types::{LogicalType, Schema, Value};
use reshape_common::{Error, Result};

/// An immutable, column-oriented table.
///
/// Every value stored in a column has been validated against (and coerced
/// to) the column's declared type at construction time.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    schema: Schema,
    columns: Vec<Vec<Value>>,
    row_count: usize,
}

impl Table {
    /// Builds a table from rows.
    ///
    /// # Errors
    ///
    /// Returns an error if a row's width differs from the schema, if the
    /// schema has duplicate column names, or if a value does not fit its
    /// column type.
    pub fn from_rows(
        name: impl Into<String>,
        schema: Schema,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> Result<Self> {
        let name = name.into();
        if let Some(dup) = schema.duplicate_name() {
            return Err(Error::DuplicateColumnName(dup.to_string()));
        }

        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); schema.len()];
        let mut row_count = 0;
        for row in rows {
            if row.len() != schema.len() {
                return Err(Error::Planning(format!(
                    "row {row_count} of table {name} has {} values, expected {}",
                    row.len(),
                    schema.len()
                )));
            }
            for ((value, column), field) in row.into_iter().zip(&mut columns).zip(schema.fields())
            {
                column.push(coerce(value, &field.data_type, &field.name)?);
            }
            row_count += 1;
        }

        Ok(Self {
            name,
            schema,
            columns,
            row_count,
        })
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the values of column `index`.
    #[must_use]
    pub fn column(&self, index: usize) -> Option<&[Value]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    /// Materializes row `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<Vec<Value>> {
        (index < self.row_count).then(|| self.columns.iter().map(|c| c[index].clone()).collect())
    }

    /// Splits the rows into at most `n` contiguous, non-empty ranges of
    /// near-equal size, in row order. An empty table yields one empty range
    /// so every plan has at least one pipeline.
    #[must_use]
    pub fn partitions(&self, n: usize) -> Vec<Range<usize>> {
        if self.row_count == 0 {
            return vec![0..0];
        }
        let n = n.clamp(1, self.row_count);
        let base = self.row_count / n;
        let extra = self.row_count % n;

        let mut ranges = Vec::with_capacity(n);
        let mut start = 0;
        for i in 0..n {
            let len = base + usize::from(i < extra);
            ranges.push(start..start + len);
            start += len;
        }
        ranges
    }
}

fn coerce(value: Value, target: &LogicalType, column: &str) -> Result<Value> {
    if value.is_null() || *target == LogicalType::Any {
        return Ok(value);
    }
    let fits = value
        .logical_type()
        .common_supertype(target)
        .is_some_and(|t| t == *target);
    let coerced = if fits { value.cast(target) } else { None };
    coerced.ok_or_else(|| Error::TypeMismatch {
        expected: format!("{target} for column {column}"),
        found: value.type_name().to_string(),
    })
}
