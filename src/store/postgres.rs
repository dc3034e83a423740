use anyhow::Context;
use async_trait::async_trait;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    types::Json,
    PgPool,
};
use std::str::FromStr;

use super::{Document, DocumentStore, Filter, StoreError, UNIQUE_KEYS};

/// Documents live in a single JSONB table; see `migrations/`.
#[derive(Clone)]
pub struct PostgresStore {
    db: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, database_name: Option<&str>) -> anyhow::Result<Self> {
        let mut opts = PgConnectOptions::from_str(database_url).context("parse DATABASE_URL")?;
        if let Some(name) = database_name {
            opts = opts.database(name);
        }
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

fn unique_index_name(collection: &str, field: &str) -> String {
    format!("{collection}_{field}_key")
}

/// Field guarded by `constraint`, or the raw constraint name when it is not one of ours.
fn unique_field(collection: &str, constraint: &str) -> String {
    UNIQUE_KEYS
        .iter()
        .find(|(c, f)| *c == collection && constraint == unique_index_name(c, f))
        .map(|(_, f)| f.to_string())
        .unwrap_or_else(|| constraint.to_string())
}

/// Maps a unique-index violation back to the field it guards.
fn map_insert_error(collection: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate {
                collection: collection.to_string(),
                field: unique_field(collection, db_err.constraint().unwrap_or_default()),
            };
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO documents (collection, body) VALUES ($1, $2)")
            .bind(collection)
            .bind(Json(doc))
            .execute(&self.db)
            .await
            .map_err(|e| map_insert_error(collection, e))?;
        Ok(())
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        for doc in docs {
            sqlx::query("INSERT INTO documents (collection, body) VALUES ($1, $2)")
                .bind(collection)
                .bind(Json(doc))
                .execute(&mut *tx)
                .await
                .map_err(|e| map_insert_error(collection, e))?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Document>>(
            r#"
            SELECT body
              FROM documents
             WHERE collection = $1 AND body @> $2
             ORDER BY seq ASC
             LIMIT 1
            "#,
        )
        .bind(collection)
        .bind(Json(filter.as_document()))
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Document>>(
            r#"
            SELECT body
              FROM documents
             WHERE collection = $1 AND body @> $2
             ORDER BY seq ASC
             LIMIT $3
            "#,
        )
        .bind(collection)
        .bind(Json(filter.as_document()))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM documents WHERE collection = $1 AND body @> $2",
        )
        .bind(collection)
        .bind(Json(filter.as_document()))
        .fetch_one(&self.db)
        .await?;
        Ok(n.max(0) as u64)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<u64, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE documents
               SET body = body || $3
             WHERE seq = (
                   SELECT seq
                     FROM documents
                    WHERE collection = $1 AND body @> $2
                    ORDER BY seq ASC
                    LIMIT 1
             )
            "#,
        )
        .bind(collection)
        .bind(Json(filter.as_document()))
        .bind(Json(set))
        .execute(&self.db)
        .await
        .map_err(|e| map_insert_error(collection, e))?;
        Ok(res.rows_affected())
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM documents WHERE collection = $1 AND body @> $2")
            .bind(collection)
            .bind(Json(filter.as_document()))
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
