//! Column vectors.

use reshape_common::types::{LogicalType, Value};

/// A single column of a [`DataChunk`](super::DataChunk).
#[derive(Debug, Clone)]
pub struct ValueVector {
    data_type: LogicalType,
    values: Vec<Value>,
}

impl ValueVector {
    /// Creates an empty vector of the given type.
    #[must_use]
    pub fn new(data_type: LogicalType) -> Self {
        Self {
            data_type,
            values: Vec::new(),
        }
    }

    /// Creates an empty vector with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(data_type: LogicalType, capacity: usize) -> Self {
        Self {
            data_type,
            values: Vec::with_capacity(capacity),
        }
    }

    /// Creates a vector from existing values.
    #[must_use]
    pub fn from_values(data_type: LogicalType, values: Vec<Value>) -> Self {
        Self { data_type, values }
    }

    /// The declared type of this column.
    #[must_use]
    pub fn data_type(&self) -> &LogicalType {
        &self.data_type
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the vector holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends a value.
    pub fn push_value(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Appends an integer.
    pub fn push_int64(&mut self, value: i64) {
        self.values.push(Value::Int64(value));
    }

    /// Appends a string.
    pub fn push_string(&mut self, value: &str) {
        self.values.push(Value::from(value));
    }

    /// Appends a NULL.
    pub fn push_null(&mut self) {
        self.values.push(Value::Null);
    }

    /// Returns a clone of the value at `index`.
    #[must_use]
    pub fn get_value(&self, index: usize) -> Option<Value> {
        self.values.get(index).cloned()
    }

    /// Borrows the value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the integer at `index`, if it is one.
    #[must_use]
    pub fn get_int64(&self, index: usize) -> Option<i64> {
        self.values.get(index).and_then(Value::as_int64)
    }

    /// Returns the string at `index`, if it is one.
    #[must_use]
    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(Value::as_str)
    }

    /// All values in row order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}
