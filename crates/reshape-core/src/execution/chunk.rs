//! Data chunks: the unit of data exchanged between operators.

use reshape_common::types::{LogicalType, Value};

use super::{SelectionVector, ValueVector};

/// A batch of rows stored column-wise.
///
/// `count` is the number of physical rows in every column. When a selection
/// vector is set, only the selected rows are visible to consumers.
#[derive(Debug, Clone)]
pub struct DataChunk {
    columns: Vec<ValueVector>,
    count: usize,
    selection: Option<SelectionVector>,
}

impl DataChunk {
    /// Creates an empty chunk with one column per type.
    #[must_use]
    pub fn new(types: &[LogicalType]) -> Self {
        Self::with_capacity(types, 0)
    }

    /// Creates an empty chunk with pre-allocated columns.
    #[must_use]
    pub fn with_capacity(types: &[LogicalType], capacity: usize) -> Self {
        Self {
            columns: types
                .iter()
                .map(|t| ValueVector::with_capacity(t.clone(), capacity))
                .collect(),
            count: 0,
            selection: None,
        }
    }

    /// Creates a chunk from filled columns. All columns must have the same
    /// length; the row count is taken from the first one.
    #[must_use]
    pub fn from_columns(columns: Vec<ValueVector>) -> Self {
        let count = columns.first().map_or(0, ValueVector::len);
        debug_assert!(columns.iter().all(|c| c.len() == count));
        Self {
            columns,
            count,
            selection: None,
        }
    }

    /// Creates a chunk from rows.
    #[must_use]
    pub fn from_rows(types: &[LogicalType], rows: Vec<Vec<Value>>) -> Self {
        let mut builder = DataChunkBuilder::with_capacity(types, rows.len());
        for row in rows {
            builder.push_row(row);
        }
        builder.finish()
    }

    /// Returns the column at `index`.
    #[must_use]
    pub fn column(&self, index: usize) -> Option<&ValueVector> {
        self.columns.get(index)
    }

    /// Returns the column at `index` mutably.
    pub fn column_mut(&mut self, index: usize) -> Option<&mut ValueVector> {
        self.columns.get_mut(index)
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column types.
    #[must_use]
    pub fn types(&self) -> Vec<LogicalType> {
        self.columns.iter().map(|c| c.data_type().clone()).collect()
    }

    /// Number of visible rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.selection.as_ref().map_or(self.count, SelectionVector::len)
    }

    /// Number of physical rows, ignoring the selection.
    #[must_use]
    pub fn total_row_count(&self) -> usize {
        self.count
    }

    /// Returns true if no rows are visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Sets the physical row count.
    pub fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    /// Restricts the visible rows.
    pub fn set_selection(&mut self, selection: SelectionVector) {
        self.selection = Some(selection);
    }

    /// Iterates the physical indices of visible rows.
    pub fn selected_indices(&self) -> SelectedIndices<'_> {
        match &self.selection {
            Some(sel) => SelectedIndices::Selected(sel.indices().iter()),
            None => SelectedIndices::All(0..self.count),
        }
    }

    /// Materializes the row at physical index `row`.
    #[must_use]
    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| c.get_value(row).unwrap_or_default())
            .collect()
    }

    /// Materializes every visible row.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<Value>> {
        self.selected_indices().map(|row| self.row(row)).collect()
    }
}

/// Iterator over the visible row indices of a chunk.
pub enum SelectedIndices<'a> {
    /// No selection: every physical row.
    All(std::ops::Range<usize>),
    /// Rows picked by a selection vector.
    Selected(std::slice::Iter<'a, usize>),
}

impl Iterator for SelectedIndices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            Self::All(range) => range.next(),
            Self::Selected(iter) => iter.next().copied(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::All(range) => range.size_hint(),
            Self::Selected(iter) => iter.size_hint(),
        }
    }
}

/// Row-at-a-time builder for [`DataChunk`]s.
pub struct DataChunkBuilder {
    chunk: DataChunk,
}

impl DataChunkBuilder {
    /// Creates a builder for the given column types.
    #[must_use]
    pub fn new(types: &[LogicalType]) -> Self {
        Self::with_capacity(types, 0)
    }

    /// Creates a builder with pre-allocated columns.
    #[must_use]
    pub fn with_capacity(types: &[LogicalType], capacity: usize) -> Self {
        Self {
            chunk: DataChunk::with_capacity(types, capacity),
        }
    }

    /// Returns the column at `index` for pushing values of the current row.
    pub fn column_mut(&mut self, index: usize) -> Option<&mut ValueVector> {
        self.chunk.column_mut(index)
    }

    /// Marks the current row as complete.
    pub fn advance_row(&mut self) {
        self.chunk.count += 1;
    }

    /// Appends a complete row. Missing trailing values are padded with NULL.
    pub fn push_row(&mut self, row: Vec<Value>) {
        let mut values = row.into_iter();
        for column in &mut self.chunk.columns {
            column.push_value(values.next().unwrap_or_default());
        }
        self.chunk.count += 1;
    }

    /// Number of completed rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.chunk.count
    }

    /// Finishes the chunk.
    #[must_use]
    pub fn finish(self) -> DataChunk {
        self.chunk
    }
}
