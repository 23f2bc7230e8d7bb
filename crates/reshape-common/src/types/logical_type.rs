//! Logical types of values and columns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The logical type of a column or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    /// Unknown or dynamically typed.
    Any,
    /// Type of the bare NULL literal.
    Null,
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Variable-length list of the inner type.
    List(Box<LogicalType>),
}

impl LogicalType {
    /// Creates a list type with the given element type.
    #[must_use]
    pub fn list_of(element: LogicalType) -> Self {
        Self::List(Box::new(element))
    }

    /// Returns the element type if this is a list type.
    #[must_use]
    pub fn element_type(&self) -> Option<&LogicalType> {
        match self {
            Self::List(inner) => Some(inner),
            _ => None,
        }
    }

    /// Returns true for integer and floating point types.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }

    /// Returns the narrowest type both `self` and `other` can be cast to
    /// without loss of meaning, or `None` if there is no such type.
    ///
    /// `Null` unifies with everything, `Int64` widens to `Float64`, and lists
    /// unify element-wise. Strings never unify with numbers or booleans.
    #[must_use]
    pub fn common_supertype(&self, other: &LogicalType) -> Option<LogicalType> {
        match (self, other) {
            (a, b) if a == b => Some(a.clone()),
            (Self::Null, t) | (t, Self::Null) => Some(t.clone()),
            (Self::Any, _) | (_, Self::Any) => Some(Self::Any),
            (Self::Int64, Self::Float64) | (Self::Float64, Self::Int64) => Some(Self::Float64),
            (Self::List(a), Self::List(b)) => a.common_supertype(b).map(Self::list_of),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "ANY"),
            Self::Null => write!(f, "NULL"),
            Self::Bool => write!(f, "BOOLEAN"),
            Self::Int64 => write!(f, "BIGINT"),
            Self::Float64 => write!(f, "DOUBLE"),
            Self::String => write!(f, "VARCHAR"),
            Self::List(inner) => write!(f, "{inner}[]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_supertype_numeric() {
        assert_eq!(
            LogicalType::Int64.common_supertype(&LogicalType::Float64),
            Some(LogicalType::Float64)
        );
        assert_eq!(
            LogicalType::Int64.common_supertype(&LogicalType::Int64),
            Some(LogicalType::Int64)
        );
    }

    #[test]
    fn test_common_supertype_null_and_incompatible() {
        assert_eq!(
            LogicalType::Null.common_supertype(&LogicalType::String),
            Some(LogicalType::String)
        );
        assert_eq!(LogicalType::String.common_supertype(&LogicalType::Int64), None);
        assert_eq!(LogicalType::Bool.common_supertype(&LogicalType::Float64), None);
    }

    #[test]
    fn test_common_supertype_lists() {
        let a = LogicalType::list_of(LogicalType::Int64);
        let b = LogicalType::list_of(LogicalType::Float64);
        assert_eq!(
            a.common_supertype(&b),
            Some(LogicalType::list_of(LogicalType::Float64))
        );
        assert_eq!(a.common_supertype(&LogicalType::Int64), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(LogicalType::Int64.to_string(), "BIGINT");
        assert_eq!(
            LogicalType::list_of(LogicalType::String).to_string(),
            "VARCHAR[]"
        );
    }
}
