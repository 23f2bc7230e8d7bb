use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use reshape_common::types::{LogicalType, Value};
use reshape_core::execution::operators::{
    FoldFamily, Operator, PivotOperator, UnpivotOperator, ValuesOperator, collect_rows,
};
use reshape_core::execution::DataChunk;

const ROWS: usize = 10_000;

fn bucket_chunk(domain_len: usize) -> DataChunk {
    let list_type = LogicalType::list_of(LogicalType::Int64);
    let rows = (0..ROWS)
        .map(|i| {
            let items: Vec<Value> = (0..domain_len)
                .map(|d| {
                    if (i + d) % 5 == 0 {
                        Value::Null
                    } else {
                        Value::Int64((i * d) as i64)
                    }
                })
                .collect();
            vec![Value::Int64(i as i64), Value::from(items)]
        })
        .collect();
    DataChunk::from_rows(&[LogicalType::Int64, list_type], rows)
}

fn wide_chunk(width: usize) -> DataChunk {
    let types = vec![LogicalType::Int64; width + 1];
    let rows = (0..ROWS)
        .map(|i| {
            (0..=width)
                .map(|c| {
                    if c > 0 && (i + c) % 7 == 0 {
                        Value::Null
                    } else {
                        Value::Int64((i + c) as i64)
                    }
                })
                .collect()
        })
        .collect();
    DataChunk::from_rows(&types, rows)
}

fn bench_pivot_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("pivot_expand");
    for domain_len in [4, 32, 128] {
        let chunk = bucket_chunk(domain_len);
        let output = vec![LogicalType::Int64; domain_len + 1];
        group.bench_with_input(BenchmarkId::from_parameter(domain_len), &domain_len, |b, &n| {
            b.iter(|| {
                let child = Box::new(ValuesOperator::new(vec![chunk.clone()]));
                let mut pivot = PivotOperator::new(child, 1, 1, n, output.clone());
                black_box(collect_rows(&mut pivot).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_unpivot_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("unpivot_fold");
    for width in [2, 12, 48] {
        let chunk = wide_chunk(width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &w| {
            b.iter(|| {
                let child = Box::new(ValuesOperator::new(vec![chunk.clone()]));
                let mut unpivot = UnpivotOperator::new(
                    child,
                    vec![0],
                    vec![FoldFamily {
                        columns: (1..=w).collect(),
                        target: LogicalType::Int64,
                    }],
                    (1..=w).map(|i| format!("c{i}")).collect(),
                    false,
                    vec![LogicalType::Int64, LogicalType::String, LogicalType::Int64],
                );
                let mut rows = 0;
                while let Some(chunk) = unpivot.next().unwrap() {
                    rows += chunk.row_count();
                }
                black_box(rows)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pivot_expand, bench_unpivot_fold);
criterion_main!(benches);
