//! Dynamically typed scalar values.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::LogicalType;

/// A single cell value.
///
/// Values have total equality and hashing so that they can be used directly
/// as grouping and domain keys: `NULL` equals `NULL`, floats compare by their
/// canonical bit pattern (`-0.0 == 0.0`, all NaNs are equal), and values of
/// different variants are never equal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    String(Arc<str>),
    /// List of values.
    List(Arc<[Value]>),
}

impl Value {
    /// Returns true if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns a short name of the value's type for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOLEAN",
            Self::Int64(_) => "BIGINT",
            Self::Float64(_) => "DOUBLE",
            Self::String(_) => "VARCHAR",
            Self::List(_) => "LIST",
        }
    }

    /// Returns the logical type of this value.
    ///
    /// The element type of a list is the common supertype of its elements,
    /// falling back to `Any` for heterogeneous lists.
    #[must_use]
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Self::Null => LogicalType::Null,
            Self::Bool(_) => LogicalType::Bool,
            Self::Int64(_) => LogicalType::Int64,
            Self::Float64(_) => LogicalType::Float64,
            Self::String(_) => LogicalType::String,
            Self::List(items) => {
                let element = items
                    .iter()
                    .map(Value::logical_type)
                    .try_fold(LogicalType::Null, |acc, t| acc.common_supertype(&t))
                    .unwrap_or(LogicalType::Any);
                LogicalType::list_of(element)
            }
        }
    }

    /// Returns the boolean if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Int64`.
    #[must_use]
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Self::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float if this is a `Float64`.
    #[must_use]
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Self::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as `f64` if it is numeric.
    #[must_use]
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Int64(i) => Some(*i as f64),
            Self::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string slice if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements if this is a `List`.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Total ordering used for sorting.
    ///
    /// NULL sorts first, then booleans, numbers (integers and floats compare
    /// numerically), strings, and lists (lexicographically).
    #[must_use]
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::Float64(a), Self::Float64(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Self::Int64(a), Self::Float64(b)) => (*a as f64).total_cmp(&canonical(*b)),
            (Self::Float64(a), Self::Int64(b)) => canonical(*a).total_cmp(&(*b as f64)),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int64(_) | Self::Float64(_) => 2,
            Self::String(_) => 3,
            Self::List(_) => 4,
        }
    }

    /// Casts this value to `target`, returning `None` if the conversion is
    /// not possible. NULL casts to NULL of any type.
    #[must_use]
    pub fn cast(&self, target: &LogicalType) -> Option<Value> {
        if self.is_null() {
            return Some(Value::Null);
        }
        match (self, target) {
            (_, LogicalType::Any) => Some(self.clone()),
            (_, LogicalType::Null) => None,
            (Self::Bool(_), LogicalType::Bool)
            | (Self::Int64(_), LogicalType::Int64)
            | (Self::Float64(_), LogicalType::Float64)
            | (Self::String(_), LogicalType::String) => Some(self.clone()),
            (Self::Int64(i), LogicalType::Float64) => Some(Self::Float64(*i as f64)),
            (Self::Float64(f), LogicalType::Int64) => {
                let rounded = f.round();
                if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
                    Some(Self::Int64(rounded as i64))
                } else {
                    None
                }
            }
            (Self::Bool(b), LogicalType::Int64) => Some(Self::Int64(i64::from(*b))),
            (Self::Int64(i), LogicalType::Bool) => Some(Self::Bool(*i != 0)),
            (Self::String(s), LogicalType::Int64) => s.trim().parse().ok().map(Self::Int64),
            (Self::String(s), LogicalType::Float64) => s.trim().parse().ok().map(Self::Float64),
            (Self::String(s), LogicalType::Bool) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" => Some(Self::Bool(true)),
                    "false" | "f" | "0" => Some(Self::Bool(false)),
                    _ => None,
                }
            }
            (_, LogicalType::String) => Some(Self::String(self.to_string().into())),
            (Self::List(items), LogicalType::List(element)) => items
                .iter()
                .map(|v| v.cast(element))
                .collect::<Option<Vec<_>>>()
                .map(Value::from),
            _ => None,
        }
    }
}

/// Maps `-0.0` to `0.0` and every NaN to the same NaN.
fn canonical(f: f64) -> f64 {
    if f.is_nan() {
        f64::NAN
    } else if f == 0.0 {
        0.0
    } else {
        f
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => {
                canonical(*a).to_bits() == canonical(*b).to_bits()
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int64(i) => i.hash(state),
            Self::Float64(f) => canonical(*f).to_bits().hash(state),
            Self::String(s) => s.hash(state),
            Self::List(items) => items.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int64(i) => write!(f, "{i}"),
            Self::Float64(x) => write!(f, "{x:?}"),
            Self::String(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int64(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int64(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float64(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}
