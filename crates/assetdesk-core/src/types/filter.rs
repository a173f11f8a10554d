//! Filter types for dynamic query building.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// SQL `LIKE` pattern match.
    Like,
    /// SQL `ILIKE` case-insensitive pattern match.
    #[serde(rename = "ilike")]
    ILike,
    /// SQL `IN` list membership.
    In,
    /// Inclusive range; the value is a two-element list.
    Between,
    /// SQL `IS NULL` check.
    IsNull,
    /// SQL `IS NOT NULL` check.
    IsNotNull,
}

impl FilterOp {
    /// Whether the operator ignores its value.
    pub fn is_null_check(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Whether the operator only makes sense on ordered types.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::Gt | Self::Gte | Self::Lt | Self::Lte | Self::Between
        )
    }

    /// Whether the operator is a pattern match.
    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Like | Self::ILike)
    }

    /// SQL operator for binary comparisons.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::In => "IN",
            Self::Between => "BETWEEN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }
}

/// A dynamic filter value.
///
/// Variant order matters for untagged deserialization: integers are tried
/// before floats so `5` stays an integer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null / no value (for `IS NULL`, `IS NOT NULL`).
    #[default]
    Null,
    /// A boolean value.
    Boolean(bool),
    /// An integer value.
    Integer(i64),
    /// A floating-point value.
    Float(f64),
    /// A string value (also used for dates and datetimes).
    String(String),
    /// A list of values (for `IN` and `BETWEEN`).
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Return the list items, if this is a list.
    pub fn as_list(&self) -> Option<&[FilterValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this is a scalar (not null, not a list).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Null | Self::List(_))
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// A single filter condition on a named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterField {
    /// The column or field name to filter on.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value to compare against.
    #[serde(default)]
    pub value: FilterValue,
}

impl FilterField {
    /// Create a new filter field.
    pub fn new(field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Shorthand for an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Eq, FilterValue::String(value.into()))
    }

    /// Shorthand for an inclusive range filter.
    pub fn between(field: impl Into<String>, low: FilterValue, high: FilterValue) -> Self {
        Self::new(field, FilterOp::Between, FilterValue::List(vec![low, high]))
    }
}
