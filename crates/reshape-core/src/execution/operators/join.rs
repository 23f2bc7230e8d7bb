//! Hash join operator.

use smallvec::SmallVec;

use super::{Operator, OperatorError, OperatorResult};
use crate::execution::DataChunkBuilder;
use reshape_common::types::{LogicalType, Value};
use reshape_common::utils::hash::FastHashMap;

type JoinKey = SmallVec<[Value; 2]>;

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Only matching pairs.
    Inner,
    /// Every probe row; unmatched ones are padded with NULL.
    Left,
}

/// Equi-join that builds a hash table over the right input and probes it
/// with the left input. Output columns are the left columns followed by the
/// right columns. NULL keys never match.
pub struct HashJoinOperator {
    probe: Box<dyn Operator>,
    build: Box<dyn Operator>,
    probe_keys: Vec<usize>,
    build_keys: Vec<usize>,
    join_type: JoinType,
    output_types: Vec<LogicalType>,
    build_width: usize,
    table: Option<FastHashMap<JoinKey, Vec<Vec<Value>>>>,
}

impl HashJoinOperator {
    /// Creates a new hash join.
    #[must_use]
    pub fn new(
        probe: Box<dyn Operator>,
        build: Box<dyn Operator>,
        probe_keys: Vec<usize>,
        build_keys: Vec<usize>,
        join_type: JoinType,
        output_types: Vec<LogicalType>,
        build_width: usize,
    ) -> Self {
        Self {
            probe,
            build,
            probe_keys,
            build_keys,
            join_type,
            output_types,
            build_width,
            table: None,
        }
    }

    fn key(row: &[Value], columns: &[usize]) -> Option<JoinKey> {
        columns
            .iter()
            .map(|&c| row.get(c).filter(|v| !v.is_null()).cloned())
            .collect()
    }

    fn build_table(&mut self) -> Result<FastHashMap<JoinKey, Vec<Vec<Value>>>, OperatorError> {
        let mut table: FastHashMap<JoinKey, Vec<Vec<Value>>> = FastHashMap::default();
        while let Some(chunk) = self.build.next()? {
            for row in chunk.rows() {
                if let Some(key) = Self::key(&row, &self.build_keys) {
                    table.entry(key).or_default().push(row);
                }
            }
        }
        Ok(table)
    }
}

impl Operator for HashJoinOperator {
    fn next(&mut self) -> OperatorResult {
        if self.table.is_none() {
            self.table = Some(self.build_table()?);
        }

        while let Some(chunk) = self.probe.next()? {
            let mut out = DataChunkBuilder::new(&self.output_types);
            let table = self.table.as_ref();
            for left in chunk.rows() {
                let matches = Self::key(&left, &self.probe_keys)
                    .and_then(|k| table.and_then(|t| t.get(&k)));
                match matches {
                    Some(rights) => {
                        for right in rights {
                            let mut row = left.clone();
                            row.extend(right.iter().cloned());
                            out.push_row(row);
                        }
                    }
                    None if self.join_type == JoinType::Left => {
                        let mut row = left;
                        row.resize(row.len() + self.build_width, Value::Null);
                        out.push_row(row);
                    }
                    None => {}
                }
            }
            if out.row_count() > 0 {
                return Ok(Some(out.finish()));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.probe.reset();
        self.build.reset();
        self.table = None;
    }

    fn name(&self) -> &'static str {
        "HashJoin"
    }
}
