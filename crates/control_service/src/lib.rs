use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::put,
};
use datastore::{Repository, StoreError};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Response for a successful write
#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub success: bool,
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

fn error(status: StatusCode, error: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error,
        }),
    )
        .into_response()
}

fn store_failure(collection: &str, id: &str, err: StoreError) -> Response {
    tracing::error!(collection, id, error = %err, "Document write failed");
    error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// Handler for creating or replacing a document
async fn put_document(
    State(repo): State<Arc<dyn Repository>>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let Value::Object(document) = body else {
        return error(
            StatusCode::BAD_REQUEST,
            "document body must be a JSON object".to_string(),
        );
    };

    match repo.set(&collection, &id, document).await {
        Ok(()) => {
            tracing::info!(collection, id, "Document stored");
            let response = CreateResponse {
                success: true,
                message: format!("Document '{id}' stored in '{collection}'"),
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(err) => store_failure(&collection, &id, err),
    }
}

/// Handler for deleting a document
async fn delete_document(
    State(repo): State<Arc<dyn Repository>>,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    match repo.delete(&collection, &id).await {
        Ok(true) => {
            tracing::info!(collection, id, "Document deleted");
            let response = CreateResponse {
                success: true,
                message: format!("Document '{id}' deleted from '{collection}'"),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(false) => error(
            StatusCode::NOT_FOUND,
            format!("Document '{id}' not found in '{collection}'"),
        ),
        Err(err) => store_failure(&collection, &id, err),
    }
}

/// Create the router for the control API
pub fn create_router(repo: Arc<dyn Repository>) -> Router {
    Router::new()
        .route(
            "/collections/{collection}/documents/{id}",
            put(put_document).delete(delete_document),
        )
        .with_state(repo)
}
