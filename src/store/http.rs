//! HTTP client for a `pantry-server` document store.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Document, DocumentStore, Fields, StoreError};
use crate::models::RecordId;

/// Body of `POST /collections/{c}/query`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FieldQuery {
    pub field: String,
    pub value: Value,
}

/// Response of `POST /collections/{c}/documents`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Inserted {
    pub id: RecordId,
}

/// Error body returned by the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(server_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(&server_url.into()),
            api_key,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/collections/{}",
            self.base_url,
            urlencoding::encode(collection)
        )
    }

    fn document_url(&self, collection: &str, id: &RecordId) -> String {
        format!(
            "{}/documents/{}",
            self.collection_url(collection),
            urlencoding::encode(id.as_str())
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.authorize(request).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(status_error(response).await)
    }

    /// Like [`send`](Self::send) but maps 404 to [`StoreError::NotFound`].
    async fn send_for_document(
        &self,
        request: RequestBuilder,
        collection: &str,
        id: &RecordId,
    ) -> Result<Response, StoreError> {
        let response = self.authorize(request).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(collection, id));
        }
        if response.status().is_success() {
            return Ok(response);
        }
        Err(status_error(response).await)
    }
}

async fn status_error(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => "no error details".to_string(),
    };
    StoreError::Status { status, message }
}

/// Strips trailing slashes and defaults to `http://` for bare hosts.
fn normalize_base_url(server_url: &str) -> String {
    let trimmed = server_url.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn list_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}/documents", self.collection_url(collection));
        tracing::debug!("GET {}", url);

        let response = self.send(self.client.get(url)).await?;
        Ok(response.json().await?)
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<RecordId, StoreError> {
        let url = format!("{}/documents", self.collection_url(collection));
        tracing::debug!("POST {}", url);

        let response = self.send(self.client.post(url).json(&fields)).await?;
        let inserted: Inserted = response.json().await?;
        Ok(inserted.id)
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}/query", self.collection_url(collection));
        tracing::debug!("POST {} ({} = {})", url, field, value);

        let query = FieldQuery {
            field: field.to_string(),
            value: value.clone(),
        };
        let response = self.send(self.client.post(url).json(&query)).await?;
        Ok(response.json().await?)
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &RecordId,
        partial: Fields,
    ) -> Result<(), StoreError> {
        let url = self.document_url(collection, id);
        tracing::debug!("PATCH {}", url);

        self.send_for_document(self.client.patch(url).json(&partial), collection, id)
            .await?;
        Ok(())
    }

    async fn delete_by_id(&self, collection: &str, id: &RecordId) -> Result<(), StoreError> {
        let url = self.document_url(collection, id);
        tracing::debug!("DELETE {}", url);

        self.send_for_document(self.client.delete(url), collection, id)
            .await?;
        Ok(())
    }
}
