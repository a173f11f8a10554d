//! Row source over the host application's resource tables.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use assetdesk_core::error::{AppError, ErrorKind};
use assetdesk_core::result::AppResult;
use assetdesk_core::types::{FilterField, FilterOp, FilterValue};
use assetdesk_entity::report::{FieldType, ResourceQuery, Row};

use crate::store::RowSource;

/// Reads report rows from PostgreSQL.
///
/// Identifiers come from a validated [`ResourceQuery`]; values are always
/// bound as text and cast to the field's type on the server.
#[derive(Debug, Clone)]
pub struct PgRowSource {
    pool: PgPool,
}

impl PgRowSource {
    /// Create a new row source.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn field_type(query: &ResourceQuery, name: &str) -> AppResult<FieldType> {
        query
            .kind
            .field(name)
            .map(|f| f.field_type)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Unknown field '{name}' for {} reports",
                    query.kind
                ))
            })
    }

    fn push_from_where(
        builder: &mut QueryBuilder<'_, Postgres>,
        query: &ResourceQuery,
    ) -> AppResult<()> {
        builder
            .push(" FROM ")
            .push(query.kind.table())
            .push(" t WHERE TRUE");
        for filter in &query.filters {
            let field_type = Self::field_type(query, &filter.field)?;
            builder.push(" AND ");
            push_predicate(builder, filter, field_type)?;
        }
        Ok(())
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: &FilterValue, cast: &str) {
    builder
        .push("CAST(")
        .push_bind(value.to_string())
        .push(" AS ")
        .push(cast)
        .push(")");
}

fn push_predicate(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &FilterField,
    field_type: FieldType,
) -> AppResult<()> {
    let cast = field_type.sql_cast();
    let column = format!("t.\"{}\"", filter.field);
    match filter.op {
        FilterOp::IsNull | FilterOp::IsNotNull => {
            builder.push(&column).push(" ").push(filter.op.as_sql());
        }
        FilterOp::Like | FilterOp::ILike => {
            builder
                .push(&column)
                .push("::text ")
                .push(filter.op.as_sql())
                .push(" ")
                .push_bind(filter.value.to_string());
        }
        FilterOp::In => {
            let items = filter.value.as_list().unwrap_or_default();
            builder.push(&column).push(" IN (");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                push_value(builder, item, cast);
            }
            builder.push(")");
        }
        FilterOp::Between => match filter.value.as_list() {
            Some([low, high]) => {
                builder.push(&column).push(" BETWEEN ");
                push_value(builder, low, cast);
                builder.push(" AND ");
                push_value(builder, high, cast);
            }
            _ => {
                return Err(AppError::validation(format!(
                    "Filter on '{}' with 'between' needs exactly two values",
                    filter.field
                )));
            }
        },
        FilterOp::Eq | FilterOp::Ne | FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
            builder
                .push(&column)
                .push(" ")
                .push(filter.op.as_sql())
                .push(" ");
            push_value(builder, &filter.value, cast);
        }
    }
    Ok(())
}

#[async_trait]
impl RowSource for PgRowSource {
    async fn count(&self, query: &ResourceQuery) -> AppResult<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        Self::push_from_where(&mut builder, query)?;
        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count report rows", e))
    }

    async fn fetch(&self, query: &ResourceQuery, offset: i64, limit: i64) -> AppResult<Vec<Row>> {
        let sort_type = Self::field_type(query, &query.sort.field)?;
        let mut builder = QueryBuilder::<Postgres>::new("SELECT jsonb_build_object(");
        for (i, column) in query.columns.iter().enumerate() {
            Self::field_type(query, column)?;
            if i > 0 {
                builder.push(", ");
            }
            builder
                .push("'")
                .push(column.as_str())
                .push("', t.\"")
                .push(column.as_str())
                .push("\"");
        }
        builder.push(") AS data");
        Self::push_from_where(&mut builder, query)?;
        builder
            .push(" ORDER BY t.\"")
            .push(query.sort.field.as_str())
            .push("\" ")
            .push(query.sort.direction.as_sql());
        if sort_type != FieldType::Boolean {
            builder.push(" NULLS LAST");
        }
        builder
            .push(", t.id ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<Json<Row>> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fetch report rows", e))?;
        Ok(rows.into_iter().map(|Json(row)| row).collect())
    }
}
