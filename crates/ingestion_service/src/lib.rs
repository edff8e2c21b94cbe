mod client;
mod job;
pub mod scheduler;

pub use client::{DEFAULT_LIVES_API_URL, LivesClient, LivesClientConfig, LivesPage, parse_envelope};
pub use job::{IngestionJob, IngestionReport, IngestionSettings, StopReason};

use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use std::sync::Arc;

/// Errors that abort an ingestion run
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Handler for the manual trigger; runs the scan synchronously
async fn run_now(State(job): State<Arc<IngestionJob>>) -> impl IntoResponse {
    tracing::info!("Manual ingestion run requested");

    match job.run().await {
        Ok(report) => (
            StatusCode::OK,
            format!(
                "Ingestion completed: {} pages, {} channels stored",
                report.pages, report.written
            ),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Manual ingestion run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Ingestion failed".to_string(),
            )
        }
    }
}

/// Create the router for the manual ingestion trigger
pub fn create_router(job: Arc<IngestionJob>) -> Router {
    Router::new()
        .route("/ingest/run", get(run_now).post(run_now))
        .with_state(job)
}
