//! In-memory document store.
//!
//! Keeps collections in insertion order behind a tokio mutex. Clones share
//! the same state. Individual operations can be made to fail with
//! [`MemoryDocumentStore::fail_on`] to exercise error paths.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{validate_partial, validate_query, Document, DocumentStore, Fields, StoreError};
use crate::models::RecordId;

/// Store operations that can be failed on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListAll,
    Insert,
    FindByField,
    UpdateById,
    DeleteById,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, Vec<Document>>,
    failing: HashSet<StoreOp>,
}

impl MemoryState {
    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.failing.contains(&op) {
            return Err(StoreError::Unavailable(format!("{:?} disabled", op)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `op` fail with [`StoreError::Unavailable`].
    pub async fn fail_on(&self, op: StoreOp) {
        self.state.lock().await.failing.insert(op);
    }

    /// Undo [`fail_on`](Self::fail_on) for every operation.
    pub async fn recover(&self) {
        self.state.lock().await.failing.clear();
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .await
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// A single document by id, bypassing failure injection.
    pub async fn get(&self, collection: &str, id: &RecordId) -> Option<Document> {
        self.state
            .lock()
            .await
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| &d.id == id).cloned())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let state = self.state.lock().await;
        state.check(StoreOp::ListAll)?;
        Ok(state.collections.get(collection).cloned().unwrap_or_default())
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<RecordId, StoreError> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::Insert)?;

        let id = RecordId::generate();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(id.clone(), fields));
        Ok(id)
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        validate_query(field, value)?;
        let state = self.state.lock().await;
        state.check(StoreOp::FindByField)?;

        Ok(state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.fields.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &RecordId,
        partial: Fields,
    ) -> Result<(), StoreError> {
        validate_partial(&partial)?;
        let mut state = self.state.lock().await;
        state.check(StoreOp::UpdateById)?;

        let doc = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| &d.id == id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        for (key, value) in partial {
            doc.fields.insert(key, value);
        }
        Ok(())
    }

    async fn delete_by_id(&self, collection: &str, id: &RecordId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::DeleteById)?;

        let docs = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let position = docs
            .iter()
            .position(|d| &d.id == id)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        docs.remove(position);
        Ok(())
    }
}
