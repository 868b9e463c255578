//! Remote document store abstraction.
//!
//! A store holds named collections of JSON documents, each addressed by an
//! opaque [`RecordId`] the store assigns on insert. The synchronizer only
//! talks to this trait; backends are:
//!
//! - [`crate::db::SqliteDocumentStore`]: SQLite through sqlx
//! - [`HttpDocumentStore`]: a `pantry-server` over HTTP
//! - [`MemoryDocumentStore`]: in-process, with failure injection for tests

mod http;
mod memory;

pub use http::{ErrorBody, FieldQuery, HttpDocumentStore, Inserted};
pub use memory::{MemoryDocumentStore, StoreOp};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::RecordId;

/// Collection holding pantry items.
pub const ITEMS_COLLECTION: &str = "items";

/// Document field map.
pub type Fields = Map<String, Value>;

/// A stored document: its id and its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: RecordId,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: RecordId, fields: Fields) -> Self {
        Self { id, fields }
    }
}

/// Errors returned by document store backends.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Document {id} not found in collection '{collection}'")]
    NotFound { collection: String, id: RecordId },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &RecordId) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Operations every document store backend provides.
///
/// `list_all` and `find_by_field` return documents in insertion order, so
/// the first match of a field query is the oldest record.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in the collection.
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Stores a new document and returns its generated id.
    async fn insert(&self, collection: &str, fields: Fields) -> Result<RecordId, StoreError>;

    /// Documents whose `field` equals `value`, compared as JSON.
    ///
    /// `true` never matches `1`, and `5` never matches `5.0`. Only strings,
    /// booleans and numbers can be queried.
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError>;

    /// Merges `partial` into the document's fields.
    ///
    /// Each top-level key replaces the stored value whole; a `null` value is
    /// stored as `null`, not treated as a removal. Fails with [`StoreError::NotFound`] if no such document exists.
    async fn update_by_id(
        &self,
        collection: &str,
        id: &RecordId,
        partial: Fields,
    ) -> Result<(), StoreError>;

    /// Removes the document.
    ///
    /// Fails with [`StoreError::NotFound`] if no such document exists.
    async fn delete_by_id(&self, collection: &str, id: &RecordId) -> Result<(), StoreError>;
}

#[async_trait]
impl DocumentStore for Box<dyn DocumentStore> {
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        (**self).list_all(collection).await
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<RecordId, StoreError> {
        (**self).insert(collection, fields).await
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).find_by_field(collection, field, value).await
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &RecordId,
        partial: Fields,
    ) -> Result<(), StoreError> {
        (**self).update_by_id(collection, id, partial).await
    }

    async fn delete_by_id(&self, collection: &str, id: &RecordId) -> Result<(), StoreError> {
        (**self).delete_by_id(collection, id).await
    }
}

/// Field names usable in queries: non-empty ASCII alphanumerics and `_`.
pub fn validate_field_name(field: &str) -> Result<(), StoreError> {
    if field.is_empty()
        || !field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(StoreError::InvalidQuery(format!(
            "invalid field name '{}'",
            field
        )));
    }
    Ok(())
}

/// Checks a field query before it reaches a backend.
pub fn validate_query(field: &str, value: &Value) -> Result<(), StoreError> {
    validate_field_name(field)?;
    match value {
        Value::String(_) | Value::Bool(_) => Ok(()),
        Value::Number(n) if n.is_i64() || n.is_f64() => Ok(()),
        other => Err(StoreError::InvalidQuery(format!(
            "cannot match field '{}' against {}",
            field, other
        ))),
    }
}

/// Checks every key of a partial update.
pub fn validate_partial(partial: &Fields) -> Result<(), StoreError> {
    partial.keys().try_for_each(|key| validate_field_name(key))
}
