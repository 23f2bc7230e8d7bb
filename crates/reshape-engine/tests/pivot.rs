//! End-to-end PIVOT behavior.

use reshape_common::types::{Field, LogicalType, Schema, Value};
use reshape_common::utils::error::Error;
use reshape_engine::query::LogicalPlan;
use reshape_engine::query::plan::{
    AggregateExpr, AggregateFunction, BinaryOp, JoinType, LogicalExpression, LogicalOperator, PivotOn,
    PivotOp, PivotValue, SortKey, SortOrder,
};
use reshape_engine::{Config, QueryResult, ReshapeDB};

fn cities_schema() -> Schema {
    Schema::new(vec![
        Field::new("country", LogicalType::String),
        Field::new("name", LogicalType::String),
        Field::new("year", LogicalType::Int64),
        Field::new("population", LogicalType::Int64),
    ])
}

fn city(country: &str, name: &str, year: i64, population: i64) -> Vec<Value> {
    vec![
        Value::from(country),
        Value::from(name),
        Value::Int64(year),
        Value::Int64(population),
    ]
}

fn cities_db(threads: usize) -> ReshapeDB {
    let db = ReshapeDB::with_config(Config::in_memory().with_threads(threads));
    db.create_table(
        "cities",
        cities_schema(),
        vec![
            city("NL", "Amsterdam", 2000, 1005),
            city("NL", "Amsterdam", 2010, 1065),
            city("NL", "Amsterdam", 2020, 1158),
            city("US", "Seattle", 2000, 564),
            city("US", "Seattle", 2010, 608),
            city("US", "Seattle", 2020, 738),
            city("US", "New York City", 2000, 8015),
            city("US", "New York City", 2010, 8175),
            city("US", "New York City", 2020, 8772),
        ],
    )
    .unwrap();
    db
}

fn run(db: &ReshapeDB, root: LogicalOperator) -> QueryResult {
    db.execute(&LogicalPlan::new(root)).unwrap()
}

fn year() -> LogicalExpression {
    LogicalExpression::column("year")
}

fn country() -> LogicalExpression {
    LogicalExpression::column("country")
}

#[test]
fn test_population_by_country() {
    let db = ReshapeDB::with_config(Config::in_memory().with_threads(2));
    db.create_table(
        "cities",
        Schema::new(vec![
            Field::new("country", LogicalType::String),
            Field::new("year", LogicalType::Int64),
            Field::new("population", LogicalType::Int64),
        ]),
        vec![
            vec![Value::from("NL"), Value::Int64(2000), Value::Int64(1005)],
            vec![Value::from("NL"), Value::Int64(2010), Value::Int64(1065)],
            vec![Value::from("US"), Value::Int64(2000), Value::Int64(564)],
        ],
    )
    .unwrap();

    let result = run(
        &db,
        PivotOp::new(LogicalOperator::scan("cities"))
            .on(year())
            .using(AggregateExpr::sum("population"))
            .group_by(country())
            .build(),
    );

    assert_eq!(result.columns, vec!["country", "2000", "2010"]);
    assert_eq!(
        result.rows,
        vec![
            vec![Value::from("NL"), Value::Int64(1005), Value::Int64(1065)],
            vec![Value::from("US"), Value::Int64(564), Value::Null],
        ]
    );
}

#[test]
fn test_explicit_in_list_ignores_other_values() {
    let db = cities_db(3);
    let result = run(
        &db,
        PivotOp::new(LogicalOperator::scan("cities"))
            .on_in(year(), [2000, 2010])
            .using(AggregateExpr::sum("population"))
            .group_by(country())
            .build(),
    );

    assert_eq!(result.columns, vec!["country", "2000", "2010"]);
    assert_eq!(
        result.rows,
        vec![
            vec![Value::from("NL"), Value::Int64(1005), Value::Int64(1065)],
            vec![Value::from("US"), Value::Int64(8579), Value::Int64(8783)],
        ]
    );
}

#[test]
fn test_default_grouping_and_column_count() {
    let db = cities_db(4);
    let result = run(
        &db,
        PivotOp::new(LogicalOperator::scan("cities"))
            .on(year())
            .using(AggregateExpr::sum("population"))
            .build(),
    );

    assert_eq!(result.columns, vec!["country", "name", "2000", "2010", "2020"]);
    assert_eq!(result.row_count(), 3);
    assert_eq!(
        result.rows[2],
        vec![
            Value::from("US"),
            Value::from("New York City"),
            Value::Int64(8015),
            Value::Int64(8175),
            Value::Int64(8772)
        ]
    );
}

#[test]
fn test_multiple_using_expressions() {
    let db = cities_db(2);
    let result = run(
        &db,
        PivotOp::new(LogicalOperator::scan("cities"))
            .on_in(year(), [2000, 2010])
            .using(AggregateExpr::sum("population").with_alias("total"))
            .using(
                AggregateExpr::new(AggregateFunction::Max, LogicalExpression::column("population"))
                    .with_alias("largest"),
            )
            .group_by(country())
            .build(),
    );

    // groups + |domain| * |using|
    assert_eq!(result.column_count(), 1 + 2 * 2);
    assert_eq!(
        result.columns,
        vec![
            "country",
            "2000_total",
            "2000_largest",
            "2010_total",
            "2010_largest"
        ]
    );
    assert_eq!(
        result.rows[1],
        vec![
            Value::from("US"),
            Value::Int64(8579),
            Value::Int64(8015),
            Value::Int64(8783),
            Value::Int64(8175)
        ]
    );
}

#[test]
fn test_multiple_on_expressions() {
    let db = cities_db(2);
    let result = run(
        &db,
        PivotOp::new(LogicalOperator::scan("cities"))
            .on(country())
            .on_entry(PivotOn::new(year()).with_order(SortOrder::Descending))
            .using(AggregateExpr::sum("population"))
            .group_by(LogicalExpression::column("name"))
            .build(),
    );

    // Observed combinations only, years descending within each country.
    assert_eq!(
        result.columns,
        vec![
            "name", "NL_2020", "NL_2010", "NL_2000", "US_2020", "US_2010", "US_2000"
        ]
    );
    assert_eq!(
        result.rows[0],
        vec![
            Value::from("Amsterdam"),
            Value::Int64(1158),
            Value::Int64(1065),
            Value::Int64(1005),
            Value::Null,
            Value::Null,
            Value::Null
        ]
    );
}

#[test]
fn test_aliased_in_values() {
    let db = cities_db(1);
    let result = run(
        &db,
        PivotOp::new(LogicalOperator::scan("cities"))
            .on_entry(PivotOn::new(year()).with_values(vec![
                PivotValue::aliased(2000, "millennium"),
                PivotValue::new(2020),
            ]))
            .using(AggregateExpr::sum("population"))
            .group_by(country())
            .build(),
    );
    assert_eq!(result.columns, vec!["country", "millennium", "2020"]);
}

#[test]
fn test_null_for_absent_combinations() {
    let db = ReshapeDB::new_in_memory();
    db.create_table(
        "t",
        Schema::new(vec![
            Field::new("g", LogicalType::String),
            Field::new("k", LogicalType::String),
            Field::new("v", LogicalType::Int64),
        ]),
        vec![
            vec![Value::from("a"), Value::from("x"), Value::Int64(1)],
            vec![Value::from("b"), Value::from("y"), Value::Int64(2)],
        ],
    )
    .unwrap();

    let functions = [
        AggregateExpr::count_star(),
        AggregateExpr::new(AggregateFunction::Count, LogicalExpression::column("v")),
        AggregateExpr::sum("v"),
        AggregateExpr::new(AggregateFunction::Avg, LogicalExpression::column("v")),
        AggregateExpr::new(AggregateFunction::Min, LogicalExpression::column("v")),
        AggregateExpr::new(AggregateFunction::Max, LogicalExpression::column("v")),
        AggregateExpr::new(AggregateFunction::First, LogicalExpression::column("v")),
        AggregateExpr::new(AggregateFunction::List, LogicalExpression::column("v")),
    ];
    for agg in functions {
        let result = run(
            &db,
            PivotOp::new(LogicalOperator::scan("t"))
                .on(LogicalExpression::column("k"))
                .using(agg.clone())
                .group_by(LogicalExpression::column("g"))
                .build(),
        );
        assert_eq!(result.columns, vec!["g", "x", "y"], "{agg}");
        assert_eq!(result.rows[0][2], Value::Null, "{agg}");
        assert_eq!(result.rows[1][1], Value::Null, "{agg}");
        assert!(!result.rows[0][1].is_null(), "{agg}");
    }
}

#[test]
fn test_null_domain_value() {
    let db = ReshapeDB::new_in_memory();
    db.create_table(
        "t",
        Schema::new(vec![
            Field::new("k", LogicalType::String),
            Field::new("v", LogicalType::Int64),
        ]),
        vec![
            vec![Value::from("x"), Value::Int64(1)],
            vec![Value::Null, Value::Int64(2)],
            vec![Value::Null, Value::Int64(3)],
        ],
    )
    .unwrap();

    let result = run(
        &db,
        PivotOp::new(LogicalOperator::scan("t"))
            .on(LogicalExpression::column("k"))
            .using(AggregateExpr::sum("v"))
            .build(),
    );
    assert_eq!(result.columns, vec!["x", "NULL"]);
    assert_eq!(result.rows, vec![vec![Value::Int64(1), Value::Int64(5)]]);
}

#[test]
fn test_no_on_is_grouped_aggregation() {
    let db = cities_db(2);
    let result = run(
        &db,
        PivotOp::new(LogicalOperator::scan("cities"))
            .using(AggregateExpr::sum("population"))
            .group_by(country())
            .build(),
    );
    assert_eq!(result.columns, vec!["country", "sum(population)"]);
    assert_eq!(result.rows[0], vec![Value::from("NL"), Value::Int64(3228)]);
}

#[test]
fn test_count_star_when_using_is_empty() {
    let db = cities_db(2);
    let result = run(
        &db,
        PivotOp::new(LogicalOperator::scan("cities"))
            .on(year())
            .group_by(country())
            .build(),
    );
    assert_eq!(
        result.rows,
        vec![
            vec![
                Value::from("NL"),
                Value::Int64(1),
                Value::Int64(1),
                Value::Int64(1)
            ],
            vec![
                Value::from("US"),
                Value::Int64(2),
                Value::Int64(2),
                Value::Int64(2)
            ],
        ]
    );
}

#[test]
fn test_planning_errors() {
    let db = cities_db(2);
    let plan = |op: LogicalOperator| db.execute(&LogicalPlan::new(op));

    let empty_on = PivotOp::new(LogicalOperator::scan("cities"))
        .with_on(Some(Vec::new()))
        .build();
    assert!(matches!(plan(empty_on), Err(Error::EmptyOnClause)));

    let duplicate = PivotOp::new(LogicalOperator::scan("cities"))
        .on_entry(PivotOn::new(country()).with_values(vec![
            PivotValue::aliased("NL", "x"),
            PivotValue::aliased("US", "x"),
        ]))
        .using(AggregateExpr::sum("population"))
        .group_by(LogicalExpression::column("name"))
        .build();
    assert!(matches!(plan(duplicate), Err(Error::DuplicateColumnName(_))));

    let ambiguous = PivotOp::new(LogicalOperator::scan("cities"))
        .on(LogicalExpression::column("population"))
        .using(AggregateExpr::sum("population"))
        .build();
    assert!(matches!(
        plan(ambiguous),
        Err(Error::AmbiguousPivotExpression(_))
    ));
}

#[test]
fn test_unbounded_domain() {
    let db = ReshapeDB::with_config(
        Config::in_memory()
            .with_threads(4)
            .with_pivot_column_limit(2),
    );
    db.create_table(
        "cities",
        cities_schema(),
        vec![
            city("NL", "Amsterdam", 2000, 1005),
            city("NL", "Amsterdam", 2010, 1065),
            city("NL", "Amsterdam", 2020, 1158),
        ],
    )
    .unwrap();

    let scanned = PivotOp::new(LogicalOperator::scan("cities"))
        .on(year())
        .using(AggregateExpr::sum("population"))
        .build();
    assert!(matches!(
        db.execute(&LogicalPlan::new(scanned)),
        Err(Error::UnboundedDomain { limit: 2 })
    ));

    // The limit only bounds discovery by scanning.
    let explicit = PivotOp::new(LogicalOperator::scan("cities"))
        .on_in(year(), [2000, 2010, 2020])
        .using(AggregateExpr::sum("population"))
        .group_by(country())
        .build();
    assert_eq!(db.execute(&LogicalPlan::new(explicit)).unwrap().column_count(), 4);
}

#[test]
fn test_sum_overflow_surfaces_at_execution() {
    let db = ReshapeDB::new_in_memory();
    db.create_table(
        "t",
        Schema::new(vec![
            Field::new("k", LogicalType::String),
            Field::new("v", LogicalType::Int64),
        ]),
        vec![
            vec![Value::from("x"), Value::Int64(i64::MAX)],
            vec![Value::from("x"), Value::Int64(1)],
        ],
    )
    .unwrap();
    let pivot = PivotOp::new(LogicalOperator::scan("t"))
        .on(LogicalExpression::column("k"))
        .using(AggregateExpr::sum("v"))
        .build();

    let session = db.session();
    let mut stream = session.stream(&LogicalPlan::new(pivot)).unwrap();
    assert_eq!(stream.columns(), vec!["x"]);
    assert!(matches!(stream.next(), Some(Err(Error::Overflow(_)))));
    assert!(stream.next().is_none());
}

#[test]
fn test_pivot_under_filter_sort_and_join() {
    let db = cities_db(3);
    db.create_table(
        "countries",
        Schema::new(vec![
            Field::new("code", LogicalType::String),
            Field::new("continent", LogicalType::String),
        ]),
        vec![
            vec![Value::from("NL"), Value::from("Europe")],
            vec![Value::from("US"), Value::from("America")],
        ],
    )
    .unwrap();

    let root = PivotOp::new(LogicalOperator::scan("cities"))
        .on_in(year(), [2000, 2020])
        .using(AggregateExpr::sum("population"))
        .group_by(country())
        .build()
        .filter(LogicalExpression::binary(
            LogicalExpression::column("2020"),
            BinaryOp::Gt,
            LogicalExpression::literal(2000),
        ))
        .join(
            LogicalOperator::scan("countries"),
            JoinType::Inner,
            &[("country", "code")],
        )
        .sort(vec![SortKey::asc("continent")]);

    let result = run(&db, root);
    assert_eq!(
        result.columns,
        vec!["country", "2000", "2020", "code", "continent"]
    );
    assert_eq!(
        result.rows,
        vec![vec![
            Value::from("US"),
            Value::Int64(8579),
            Value::Int64(9510),
            Value::from("US"),
            Value::from("America")
        ]]
    );
}

#[test]
fn test_pivot_over_derived_expression() {
    let db = cities_db(2);
    let decade = LogicalExpression::binary(
        year(),
        BinaryOp::Div,
        LogicalExpression::literal(10),
    );
    let result = run(
        &db,
        PivotOp::new(LogicalOperator::scan("cities"))
            .on(LogicalExpression::call("lower", vec![country()]))
            .using(AggregateExpr::new(AggregateFunction::Max, decade))
            .group_by(LogicalExpression::column("name"))
            .build(),
    );
    assert_eq!(result.columns, vec!["name", "nl", "us"]);
    assert_eq!(result.rows[1], vec![Value::from("Seattle"), Value::Null, Value::Int64(202)]);
}

#[test]
fn test_source_columns_named_like_intermediates() {
    let db = ReshapeDB::with_config(Config::in_memory().with_threads(2));
    db.create_table(
        "t",
        Schema::new(vec![
            Field::new("__using_0", LogicalType::String),
            Field::new("pivot_slot(year)", LogicalType::Int64),
            Field::new("year", LogicalType::Int64),
            Field::new("p", LogicalType::Int64),
        ]),
        vec![
            vec![Value::from("a"), Value::Int64(1), Value::Int64(2000), Value::Int64(5)],
            vec![Value::from("a"), Value::Int64(1), Value::Int64(2010), Value::Int64(7)],
            vec![Value::from("b"), Value::Int64(2), Value::Int64(2000), Value::Int64(3)],
        ],
    )
    .unwrap();

    let result = run(
        &db,
        PivotOp::new(LogicalOperator::scan("t"))
            .on(year())
            .using(AggregateExpr::sum("p"))
            .build(),
    );
    assert_eq!(
        result.columns,
        vec!["__using_0", "pivot_slot(year)", "2000", "2010"]
    );
    assert_eq!(
        result.rows,
        vec![
            vec![Value::from("a"), Value::Int64(1), Value::Int64(5), Value::Int64(7)],
            vec![Value::from("b"), Value::Int64(2), Value::Int64(3), Value::Null],
        ]
    );
}
