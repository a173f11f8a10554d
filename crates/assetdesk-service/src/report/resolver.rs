//! Report data resolver: turns a definition into a validated query and rows.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use assetdesk_core::AppError;
use assetdesk_core::result::AppResult;
use assetdesk_core::types::{FilterField, FilterOp, FilterValue, SortDirection, SortField};
use assetdesk_database::RowSource;
use assetdesk_entity::report::{FieldType, ReportDefinition, ReportKind, ResourceQuery, Row};

/// Resolves report definitions against the host's resource tables.
#[derive(Debug, Clone)]
pub struct ReportDataResolver {
    source: Arc<dyn RowSource>,
}

impl ReportDataResolver {
    /// Creates a new resolver.
    pub fn new(source: Arc<dyn RowSource>) -> Self {
        Self { source }
    }

    /// Check columns, filters and sort field against the kind's catalogue.
    pub fn validate(&self, definition: &ReportDefinition) -> AppResult<()> {
        validate_parts(
            definition.kind,
            &definition.columns.0,
            &definition.filters.0,
            definition.sort_field.as_deref(),
        )
    }

    /// Build the source-level query for a definition.
    pub fn query(&self, definition: &ReportDefinition) -> AppResult<ResourceQuery> {
        self.validate(definition)?;
        let sort = match definition.sort_field.as_deref() {
            Some(field) => SortField::new(field, definition.sort_direction),
            None => SortField::new(definition.kind.default_sort_field(), SortDirection::Desc),
        };
        Ok(ResourceQuery {
            kind: definition.kind,
            columns: definition.columns.0.clone(),
            filters: definition.filters.0.clone(),
            sort,
        })
    }

    /// Number of rows the definition selects.
    pub async fn count(&self, definition: &ReportDefinition) -> AppResult<i64> {
        let query = self.query(definition)?;
        self.source.count(&query).await
    }

    /// One page of rows.
    pub async fn page(
        &self,
        definition: &ReportDefinition,
        offset: i64,
        limit: i64,
    ) -> AppResult<Vec<Row>> {
        let query = self.query(definition)?;
        self.source.fetch(&query, offset, limit).await
    }

    /// Stream every selected row through a bounded channel, one page at a time.
    ///
    /// Validation happens before the producer starts. A fetch error is sent
    /// as the last item and ends the stream. The producer stops as soon as the
    /// receiver is dropped.
    pub fn stream(
        &self,
        definition: &ReportDefinition,
        batch_size: usize,
    ) -> AppResult<mpsc::Receiver<AppResult<Row>>> {
        let query = self.query(definition)?;
        let batch_size = batch_size.max(1);
        let (tx, rx) = mpsc::channel(batch_size);
        let source = Arc::clone(&self.source);

        tokio::spawn(async move {
            let limit = batch_size as i64;
            let mut offset = 0i64;
            loop {
                let rows = match source.fetch(&query, offset, limit).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };
                let fetched = rows.len() as i64;
                for row in rows {
                    if tx.send(Ok(row)).await.is_err() {
                        return;
                    }
                }
                if fetched < limit {
                    return;
                }
                offset += fetched;
            }
        });

        Ok(rx)
    }
}

/// Validate report parts against `kind`'s field catalogue.
pub fn validate_parts(
    kind: ReportKind,
    columns: &[String],
    filters: &[FilterField],
    sort_field: Option<&str>,
) -> AppResult<()> {
    if columns.is_empty() {
        return Err(AppError::validation("A report needs at least one column"));
    }
    let mut seen = HashSet::new();
    for column in columns {
        if kind.field(column).is_none() {
            return Err(AppError::validation(format!(
                "Unknown column '{column}' for {kind} reports"
            )));
        }
        if !seen.insert(column.as_str()) {
            return Err(AppError::validation(format!("Duplicate column '{column}'")));
        }
    }

    for filter in filters {
        validate_filter(kind, filter)?;
    }

    match sort_field {
        Some(field) if kind.field(field).is_none() => Err(AppError::validation(format!(
            "Unknown sort field '{field}' for {kind} reports"
        ))),
        _ => Ok(()),
    }
}

fn validate_filter(kind: ReportKind, filter: &FilterField) -> AppResult<()> {
    let def = kind.field(&filter.field).ok_or_else(|| {
        AppError::validation(format!(
            "Unknown filter field '{}' for {kind} reports",
            filter.field
        ))
    })?;
    let name = &filter.field;

    match filter.op {
        FilterOp::IsNull | FilterOp::IsNotNull => {
            if filter.value != FilterValue::Null {
                return Err(AppError::validation(format!(
                    "Filter '{name}' {} takes no value",
                    filter.op.as_sql()
                )));
            }
        }
        FilterOp::In => match filter.value.as_list() {
            Some(items) if !items.is_empty() && items.iter().all(FilterValue::is_scalar) => {}
            _ => {
                return Err(AppError::validation(format!(
                    "Filter '{name}' IN needs a non-empty list of values"
                )));
            }
        },
        FilterOp::Between => {
            match filter.value.as_list() {
                Some([low, high]) if low.is_scalar() && high.is_scalar() => {}
                _ => {
                    return Err(AppError::validation(format!(
                        "Filter '{name}' BETWEEN needs exactly two values"
                    )));
                }
            }
            if !def.field_type.is_ordered() {
                return Err(AppError::validation(format!(
                    "Filter '{name}' does not support range comparison"
                )));
            }
        }
        FilterOp::Like | FilterOp::ILike => {
            if !def.field_type.is_textual() || !matches!(filter.value, FilterValue::String(_)) {
                return Err(AppError::validation(format!(
                    "Filter '{name}' {} needs a text field and a text pattern",
                    filter.op.as_sql()
                )));
            }
        }
        op => {
            if !filter.value.is_scalar() {
                return Err(AppError::validation(format!(
                    "Filter '{name}' {} needs a single value",
                    op.as_sql()
                )));
            }
            if op.is_ordering() && !def.field_type.is_ordered() {
                return Err(AppError::validation(format!(
                    "Filter '{name}' does not support {}",
                    op.as_sql()
                )));
            }
            if def.field_type == FieldType::Boolean
                && !matches!(filter.value, FilterValue::Boolean(_) | FilterValue::String(_))
            {
                return Err(AppError::validation(format!(
                    "Filter '{name}' needs a boolean value"
                )));
            }
        }
    }
    Ok(())
}
