use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::marker::PhantomData;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::{RepoError, handle_sql_error};
use crate::{Dao, Document, FieldFilter, QueryParams, is_sortable};

#[derive(Debug)]
pub struct PgDao<T> {
    pool: PgPool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> PgDao<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }
}

fn push_where<T: Document>(builder: &mut QueryBuilder<'_, Postgres>, filter: Option<&FieldFilter>) {
    builder.push(" WHERE collection = ");
    builder.push_bind(T::COLLECTION);

    if let Some(filter) = filter {
        builder.push(" AND body #> ");
        builder.push_bind(filter.path());
        builder.push("::text[] = ");
        builder.push_bind(filter.value.clone());
        builder.push("::jsonb");
    }
}

// Rows always end in creation order so pages stay stable across updates.
const TIE_BREAKER: &str = "created_at ASC, id ASC";

pub fn build_query<T: Document>(builder: &mut QueryBuilder<'_, Postgres>, params: &QueryParams) {
    push_where::<T>(builder, params.filter.as_ref());

    let sorting: Vec<_> = params
        .sorting
        .iter()
        .filter(|(field, _)| {
            let sortable = is_sortable::<T>(field);
            if !sortable {
                warn!("Ignoring sort on unknown field {field} of {}", T::COLLECTION);
            }
            sortable
        })
        .collect();

    builder.push(" ORDER BY ");
    let mut separated = builder.separated(", ");
    for (field, order) in sorting {
        separated.push(format!("body -> '{field}' {}", order.to_sql()));
    }
    separated.push(TIE_BREAKER);

    if let Some(limit) = params.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit as i64);
    }

    if let Some(skip) = params.skip {
        builder.push(" OFFSET ");
        builder.push_bind(skip as i64);
    }
}

fn decode<T: Document>(body: serde_json::Value) -> Result<T, RepoError> {
    Ok(serde_json::from_value(body)?)
}

#[async_trait]
impl<T: Document> Dao<T> for PgDao<T> {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, RepoError> {
        let body = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(T::COLLECTION)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| {
            error!("Failed to retrieve {} {id}: {err}", T::COLLECTION);
            handle_sql_error(err)
        })?;

        body.map(decode).transpose()
    }

    async fn save(&self, document: &T) -> Result<T, RepoError> {
        let body = serde_json::to_value(document)?;
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body
            "#,
        )
        .bind(T::COLLECTION)
        .bind(document.id())
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(handle_sql_error)?;

        Ok(document.clone())
    }

    async fn update(&self, document: &T) -> Result<Option<T>, RepoError> {
        let body = serde_json::to_value(document)?;
        let result =
            sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
                .bind(T::COLLECTION)
                .bind(document.id())
                .bind(body)
                .execute(&self.pool)
                .await
                .map_err(handle_sql_error)?;

        Ok((result.rows_affected() > 0).then(|| document.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(T::COLLECTION)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                error!("Failed to delete {} {id}: {err}", T::COLLECTION);
                handle_sql_error(err)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_all(&self, params: &QueryParams) -> Result<Vec<T>, RepoError> {
        let mut builder = QueryBuilder::new("SELECT body FROM documents");
        build_query::<T>(&mut builder, params);

        let rows = builder
            .build_query_scalar::<serde_json::Value>()
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                error!("Failed to list {}: {err}", T::COLLECTION);
                handle_sql_error(err)
            })?;

        rows.into_iter().map(decode).collect()
    }

    async fn count(&self, filter: Option<&FieldFilter>) -> Result<u64, RepoError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM documents");
        push_where::<T>(&mut builder, filter);

        let total: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(handle_sql_error)?;

        Ok(total as u64)
    }

    async fn ping(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(handle_sql_error)
    }
}
