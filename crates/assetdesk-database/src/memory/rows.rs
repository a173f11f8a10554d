//! In-memory row source.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use assetdesk_core::AppError;
use assetdesk_core::result::AppResult;
use assetdesk_core::types::{FilterField, FilterOp, FilterValue, SortDirection};
use assetdesk_entity::report::{FieldType, ReportKind, ResourceQuery, Row};

use crate::store::RowSource;

/// Resource rows per kind, filtered and sorted in process.
#[derive(Debug, Default)]
pub struct MemoryRowSource {
    rows: RwLock<HashMap<ReportKind, Vec<Row>>>,
}

impl MemoryRowSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows for `kind`.
    pub async fn extend(&self, kind: ReportKind, rows: impl IntoIterator<Item = Row>) {
        self.rows
            .write()
            .await
            .entry(kind)
            .or_default()
            .extend(rows);
    }

    async fn matching(&self, query: &ResourceQuery) -> AppResult<Vec<Row>> {
        let rows = self.rows.read().await;
        let mut out = Vec::new();
        for row in rows.get(&query.kind).into_iter().flatten() {
            let mut keep = true;
            for filter in &query.filters {
                let field_type = query
                    .kind
                    .field(&filter.field)
                    .map(|f| f.field_type)
                    .ok_or_else(|| {
                        AppError::validation(format!("Unknown filter field '{}'", filter.field))
                    })?;
                if !matches(row, filter, field_type) {
                    keep = false;
                    break;
                }
            }
            if keep {
                out.push(row.clone());
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
enum Key {
    Bool(bool),
    Num(f64),
    Text(String),
}

fn key(value: &Value, field_type: FieldType) -> Option<Key> {
    match (value, field_type) {
        (Value::Null, _) => None,
        (Value::Number(n), FieldType::Integer | FieldType::Decimal) => n.as_f64().map(Key::Num),
        (Value::String(s), FieldType::Integer | FieldType::Decimal) => {
            s.trim().parse().ok().map(Key::Num)
        }
        (Value::Bool(b), FieldType::Boolean) => Some(Key::Bool(*b)),
        (Value::String(s), FieldType::Boolean) => s.parse().ok().map(Key::Bool),
        (Value::String(s), _) => Some(Key::Text(s.clone())),
        (other, _) => Some(Key::Text(other.to_string())),
    }
}

fn filter_key(value: &FilterValue, field_type: FieldType) -> Option<Key> {
    let json = match value {
        FilterValue::Null | FilterValue::List(_) => Value::Null,
        FilterValue::Boolean(b) => Value::Bool(*b),
        FilterValue::Integer(i) => Value::from(*i),
        FilterValue::Float(f) => Value::from(*f),
        FilterValue::String(s) => Value::String(s.clone()),
    };
    key(&json, field_type)
}

fn like(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    fn go(t: &[char], p: &[char]) -> bool {
        match p.split_first() {
            None => t.is_empty(),
            Some(('%', rest)) => (0..=t.len()).any(|i| go(&t[i..], rest)),
            Some(('_', rest)) => !t.is_empty() && go(&t[1..], rest),
            Some((c, rest)) => t.first() == Some(c) && go(&t[1..], rest),
        }
    }
    let (text, pattern) = if case_insensitive {
        (text.to_lowercase(), pattern.to_lowercase())
    } else {
        (text.to_string(), pattern.to_string())
    };
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    go(&t, &p)
}

fn matches(row: &Row, filter: &FilterField, field_type: FieldType) -> bool {
    let value = row.get(&filter.field).unwrap_or(&Value::Null);
    match filter.op {
        FilterOp::IsNull => value.is_null(),
        FilterOp::IsNotNull => !value.is_null(),
        FilterOp::Like | FilterOp::ILike => match value {
            Value::Null => false,
            Value::String(s) => like(s, &filter.value.to_string(), filter.op == FilterOp::ILike),
            other => like(
                &other.to_string(),
                &filter.value.to_string(),
                filter.op == FilterOp::ILike,
            ),
        },
        FilterOp::In => {
            let Some(actual) = key(value, field_type) else {
                return false;
            };
            filter
                .value
                .as_list()
                .unwrap_or_default()
                .iter()
                .any(|item| filter_key(item, field_type).as_ref() == Some(&actual))
        }
        FilterOp::Between => {
            let (Some(actual), Some([low, high])) = (key(value, field_type), filter.value.as_list())
            else {
                return false;
            };
            match (filter_key(low, field_type), filter_key(high, field_type)) {
                (Some(low), Some(high)) => actual >= low && actual <= high,
                _ => false,
            }
        }
        op => {
            let (Some(actual), Some(expected)) =
                (key(value, field_type), filter_key(&filter.value, field_type))
            else {
                return false;
            };
            match op {
                FilterOp::Eq => actual == expected,
                FilterOp::Ne => actual != expected,
                FilterOp::Gt => actual > expected,
                FilterOp::Gte => actual >= expected,
                FilterOp::Lt => actual < expected,
                FilterOp::Lte => actual <= expected,
                _ => false,
            }
        }
    }
}

fn compare(a: &Row, b: &Row, field: &str, field_type: FieldType, direction: SortDirection) -> Ordering {
    let ka = a.get(field).and_then(|v| key(v, field_type));
    let kb = b.get(field).and_then(|v| key(v, field_type));
    let primary = match (ka, kb) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    };
    primary.then_with(|| {
        let ia = a.get("id").and_then(|v| key(v, FieldType::Integer));
        let ib = b.get("id").and_then(|v| key(v, FieldType::Integer));
        ia.partial_cmp(&ib).unwrap_or(Ordering::Equal)
    })
}

#[async_trait]
impl RowSource for MemoryRowSource {
    async fn count(&self, query: &ResourceQuery) -> AppResult<i64> {
        Ok(self.matching(query).await?.len() as i64)
    }

    async fn fetch(&self, query: &ResourceQuery, offset: i64, limit: i64) -> AppResult<Vec<Row>> {
        let sort_type = query
            .kind
            .field(&query.sort.field)
            .map(|f| f.field_type)
            .ok_or_else(|| {
                AppError::validation(format!("Unknown sort field '{}'", query.sort.field))
            })?;
        let mut rows = self.matching(query).await?;
        rows.sort_by(|a, b| compare(a, b, &query.sort.field, sort_type, query.sort.direction));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|row| {
                query
                    .columns
                    .iter()
                    .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                    .collect()
            })
            .collect())
    }
}
