use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use super::{auth_middleware, AppState};
use crate::models::RecordId;
use crate::store::{Document, DocumentStore, ErrorBody, FieldQuery, Fields, Inserted, StoreError};

/// Store error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            StoreError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "invalid_query"),
            StoreError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        };

        if status.is_server_error() {
            tracing::error!("Store error: {}", self.0);
        }

        (
            status,
            Json(ErrorBody {
                error: error.to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_documents<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.store.list_all(&collection).await?))
}

async fn insert_document<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Path(collection): Path<String>,
    Json(fields): Json<Fields>,
) -> Result<(StatusCode, Json<Inserted>), ApiError> {
    let id = state.store.insert(&collection, fields).await?;
    tracing::debug!("Inserted {} into '{}'", id, collection);
    Ok((StatusCode::CREATED, Json(Inserted { id })))
}

async fn query_documents<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Path(collection): Path<String>,
    Json(query): Json<FieldQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let documents = state
        .store
        .find_by_field(&collection, &query.field, &query.value)
        .await?;
    Ok(Json(documents))
}

async fn update_document<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, String)>,
    Json(partial): Json<Fields>,
) -> Result<StatusCode, ApiError> {
    let id = RecordId::from(id);
    state.store.update_by_id(&collection, &id, partial).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_document<S: DocumentStore + 'static>(
    State(state): State<AppState<S>>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let id = RecordId::from(id);
    state.store.delete_by_id(&collection, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Builds the application router over `store`.
pub fn router<S: DocumentStore + 'static>(store: S, api_key: Option<String>) -> Router {
    let state = AppState::new(store, api_key);

    // Public routes (no auth)
    let public_routes = Router::new().route("/health", get(health));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/collections/{collection}/documents",
            get(list_documents::<S>).post(insert_document::<S>),
        )
        .route(
            "/collections/{collection}/documents/{id}",
            patch(update_document::<S>).delete(delete_document::<S>),
        )
        .route("/collections/{collection}/query", post(query_documents::<S>))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<S>,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
