//! Gather operator: runs partition pipelines in parallel.

use std::collections::VecDeque;

use rayon::prelude::*;

use super::{Operator, OperatorError, OperatorResult};
use crate::execution::DataChunk;

/// Drains each child pipeline on a rayon task and yields the produced
/// chunks in child order, so the output equals a sequential run.
pub struct GatherOperator {
    children: Vec<Box<dyn Operator>>,
    buffered: Option<VecDeque<DataChunk>>,
}

impl GatherOperator {
    /// Creates a gather over partition pipelines.
    #[must_use]
    pub fn new(children: Vec<Box<dyn Operator>>) -> Self {
        Self {
            children,
            buffered: None,
        }
    }

    fn drain(child: &mut Box<dyn Operator>) -> Result<Vec<DataChunk>, OperatorError> {
        let mut chunks = Vec::new();
        while let Some(chunk) = child.next()? {
            chunks.push(chunk);
        }
        Ok(chunks)
    }
}

impl Operator for GatherOperator {
    fn next(&mut self) -> OperatorResult {
        if self.buffered.is_none() {
            let parts = if self.children.len() == 1 {
                self.children.iter_mut().map(Self::drain).collect::<Result<Vec<_>, _>>()?
            } else {
                self.children
                    .par_iter_mut()
                    .map(Self::drain)
                    .collect::<Result<Vec<_>, _>>()?
            };
            self.buffered = Some(parts.into_iter().flatten().collect());
        }
        Ok(self.buffered.as_mut().and_then(VecDeque::pop_front))
    }

    fn reset(&mut self) {
        for child in &mut self.children {
            child.reset();
        }
        self.buffered = None;
    }

    fn name(&self) -> &'static str {
        "Gather"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operators::{ValuesOperator, collect_rows};
    use reshape_common::types::{LogicalType, Value};

    #[test]
    fn test_gather_preserves_partition_order() {
        let children: Vec<Box<dyn Operator>> = (0..8)
            .map(|p| {
                let rows = (0..3).map(|i| vec![Value::Int64(p * 3 + i)]).collect();
                Box::new(ValuesOperator::from_rows(&[LogicalType::Int64], rows)) as Box<dyn Operator>
            })
            .collect();

        let mut gather = GatherOperator::new(children);
        let rows = collect_rows(&mut gather).unwrap();
        assert_eq!(rows, (0..24).map(|i| vec![Value::Int64(i)]).collect::<Vec<_>>());
    }
}
