//! HTTP front end for a document store, used by `pantry-server`.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET /collections/{collection}/documents`: list documents
//! - `POST /collections/{collection}/documents`: insert, returns `{id}`
//! - `POST /collections/{collection}/query`: `{field, value}` equality query
//! - `PATCH /collections/{collection}/documents/{id}`: merge fields
//! - `DELETE /collections/{collection}/documents/{id}`: remove
//!
//! All routes but `/health` require `Authorization: Bearer <key>` when an
//! API key is configured.

mod auth;
mod routes;

pub use auth::auth_middleware;
pub use routes::{router, ApiError};

use std::sync::Arc;

/// Application state shared across handlers
pub struct AppState<S> {
    store: Arc<S>,
    api_key: Option<Arc<str>>,
}

impl<S> AppState<S> {
    pub fn new(store: S, api_key: Option<String>) -> Self {
        Self {
            store: Arc::new(store),
            api_key: api_key.map(Arc::from),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            api_key: self.api_key.clone(),
        }
    }
}
