//! Loading JSON input files as tables.

use std::path::Path;

use anyhow::{Context, Result, bail};
use reshape_common::types::{Field, LogicalType, Schema, Value};
use reshape_engine::{Config, ReshapeDB};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Name under which the input is registered.
pub const INPUT_TABLE: &str = "input";

/// Rows read from a JSON file, with their inferred schema.
#[derive(Debug)]
pub struct Input {
    /// Inferred schema, in first-seen key order.
    pub schema: Schema,
    /// Rows aligned with the schema.
    pub rows: Vec<Vec<Value>>,
}

impl Input {
    /// Reads `path`, which must hold a JSON array of objects.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let json: JsonValue = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        let input = Self::from_json(json)?;
        debug!(
            path = %path.display(),
            columns = input.schema.len(),
            rows = input.rows.len(),
            "input loaded"
        );
        Ok(input)
    }

    /// Builds an input from a parsed JSON document.
    pub fn from_json(json: JsonValue) -> Result<Self> {
        let JsonValue::Array(records) = json else {
            bail!("input must be a JSON array of objects");
        };

        let mut names: Vec<String> = Vec::new();
        let mut objects = Vec::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            let JsonValue::Object(object) = record else {
                bail!("element {i} of the input array is not an object");
            };
            for key in object.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
            objects.push(object);
        }

        let mut rows: Vec<Vec<Value>> = objects
            .iter()
            .map(|object| {
                names
                    .iter()
                    .map(|name| object.get(name).map_or(Value::Null, convert))
                    .collect()
            })
            .collect();

        let mut fields = Vec::with_capacity(names.len());
        for (col, name) in names.into_iter().enumerate() {
            let data_type = infer_type(rows.iter().map(|row| &row[col]));
            for row in &mut rows {
                if let Some(cast) = row[col].cast(&data_type) {
                    row[col] = cast;
                }
            }
            fields.push(Field::new(name, data_type));
        }

        Ok(Self {
            schema: Schema::new(fields),
            rows,
        })
    }

    /// Registers the rows as [`INPUT_TABLE`] in a fresh database.
    pub fn into_database(self, config: Config) -> Result<ReshapeDB> {
        let db = ReshapeDB::with_config(config);
        db.create_table(INPUT_TABLE, self.schema, self.rows)?;
        Ok(db)
    }
}

/// Common supertype of the non-null values, falling back to String.
fn infer_type<'a>(values: impl Iterator<Item = &'a Value>) -> LogicalType {
    let mut inferred: Option<LogicalType> = None;
    for value in values.filter(|v| !v.is_null()) {
        let ty = value.logical_type();
        inferred = match inferred {
            None => Some(ty),
            Some(current) => match current.common_supertype(&ty) {
                Some(t) => Some(t),
                None => return LogicalType::String,
            },
        };
    }
    inferred.unwrap_or(LogicalType::String)
}

fn convert(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => n.as_f64().map_or(Value::Null, Value::Float64),
        },
        JsonValue::String(s) => Value::from(s.as_str()),
        JsonValue::Array(items) => Value::from(items.iter().map(convert).collect::<Vec<_>>()),
        JsonValue::Object(_) => Value::from(json.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_first_seen_key_order_and_missing_keys() {
        let input = Input::from_json(json!([
            {"country": "NL", "year": 2000},
            {"year": 2010, "population": 1065, "country": "NL"},
        ]))
        .unwrap();

        assert_eq!(input.schema.names(), vec!["country", "year", "population"]);
        assert_eq!(input.rows[0][2], Value::Null);
        assert_eq!(input.rows[1][2], Value::Int64(1065));
    }

    #[test]
    fn test_type_inference() {
        let input = Input::from_json(json!([
            {"a": 1, "b": 1, "c": "x", "d": null, "e": true},
            {"a": 2, "b": 2.5, "c": 3, "d": null, "e": null},
        ]))
        .unwrap();

        assert_eq!(
            input.schema.types(),
            vec![
                LogicalType::Int64,
                LogicalType::Float64,
                LogicalType::String,
                LogicalType::String,
                LogicalType::Bool,
            ]
        );
        assert_eq!(input.rows[0][1], Value::Float64(1.0));
        assert_eq!(input.rows[1][2], Value::from("3"));
    }

    #[test]
    fn test_rejects_non_arrays() {
        assert!(Input::from_json(json!({"a": 1})).is_err());
        assert!(Input::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"empid": 1, "jan": 1, "feb": 2}}, {{"empid": 2, "jan": null, "feb": 7}}]"#
        )
        .unwrap();

        let input = Input::load(file.path()).unwrap();
        assert_eq!(input.rows.len(), 2);

        let db = input.into_database(Config::in_memory().with_threads(1)).unwrap();
        assert_eq!(db.table(INPUT_TABLE).unwrap().row_count(), 2);
    }

    #[test]
    fn test_load_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[{{").unwrap();
        assert!(Input::load(file.path()).is_err());
    }
}
