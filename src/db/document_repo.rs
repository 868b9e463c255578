use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::Path;

use super::init_db;
use crate::models::RecordId;
use crate::store::{
    validate_partial, validate_query, Document, DocumentStore, Fields, StoreError,
};

/// Document store persisted in a single SQLite table.
///
/// Fields are kept as JSON text; queries go through SQLite's JSON1
/// functions. `seq` preserves insertion order.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

// Row type for database queries
#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    fields: String,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document, StoreError> {
        let fields: Fields = serde_json::from_str(&self.fields)?;
        Ok(Document::new(RecordId::from(self.id), fields))
    }
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(init_db(path).await?))
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        tracing::debug!("Listing documents in '{}'", collection);
        let rows: Vec<DocumentRow> =
            sqlx::query_as("SELECT id, fields FROM documents WHERE collection = ? ORDER BY seq")
                .bind(collection)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<RecordId, StoreError> {
        let id = RecordId::generate();
        let json = serde_json::to_string(&fields)?;
        tracing::debug!("Inserting {} into '{}'", id, collection);

        sqlx::query("INSERT INTO documents (collection, id, fields) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(id.as_str())
            .bind(&json)
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        validate_query(field, value)?;
        let path = format!("$.{}", field);
        tracing::debug!("Querying '{}' where {} = {}", collection, field, value);

        // json_extract turns JSON true into 1, so the JSON type is compared too
        let query = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, fields FROM documents
            WHERE collection = ?
              AND json_type(fields, ?) = ?
              AND json_extract(fields, ?) = ?
            ORDER BY seq
            "#,
        )
        .bind(collection)
        .bind(path.clone());

        let query = match value {
            Value::String(s) => query.bind("text").bind(path).bind(s.clone()),
            Value::Bool(b) => query
                .bind(if *b { "true" } else { "false" })
                .bind(path)
                .bind(i64::from(*b)),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => query.bind("integer").bind(path).bind(i),
                (None, Some(f)) => query.bind("real").bind(path).bind(f),
                (None, None) => {
                    return Err(StoreError::InvalidQuery(format!(
                        "unsupported number {}",
                        n
                    )))
                }
            },
            other => {
                return Err(StoreError::InvalidQuery(format!(
                    "cannot match field '{}' against {}",
                    field, other
                )))
            }
        };

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &RecordId,
        partial: Fields,
    ) -> Result<(), StoreError> {
        validate_partial(&partial)?;
        tracing::debug!("Updating {} in '{}' ({} field(s))", id, collection, partial.len());

        // One json_set path/value pair per key; json() keeps null as a value
        let fields_expr = if partial.is_empty() {
            "fields".to_string()
        } else {
            format!("json_set(fields{})", ", ?, json(?)".repeat(partial.len()))
        };
        let sql = format!(
            "UPDATE documents SET fields = {} WHERE collection = ? AND id = ?",
            fields_expr
        );

        let mut query = sqlx::query(&sql);
        for (key, value) in &partial {
            query = query
                .bind(format!("$.{}", key))
                .bind(serde_json::to_string(value)?);
        }

        let result = query
            .bind(collection)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn delete_by_id(&self, collection: &str, id: &RecordId) -> Result<(), StoreError> {
        tracing::debug!("Deleting {} from '{}'", id, collection);
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }
}
