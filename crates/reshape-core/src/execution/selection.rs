//! Selection vectors for filtered chunks.

/// The row indices of a chunk that are still "live".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionVector {
    indices: Vec<usize>,
}

impl SelectionVector {
    /// Creates a selection from explicit row indices.
    #[must_use]
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    /// Selects every row in `0..count` for which `predicate` returns true.
    pub fn from_predicate(count: usize, mut predicate: impl FnMut(usize) -> bool) -> Self {
        Self {
            indices: (0..count).filter(|&row| predicate(row)).collect(),
        }
    }

    /// Number of selected rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns true if no rows are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Selected row indices, ascending.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_predicate() {
        let sel = SelectionVector::from_predicate(6, |row| row % 2 == 0);
        assert_eq!(sel.indices(), &[0, 2, 4]);
        assert_eq!(sel.len(), 3);
        assert!(!sel.is_empty());
    }
}
