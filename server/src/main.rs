mod config;

use axum::Router;
use config::{ConfigError, ServerConfig};
use datastore::{InMemoryRepository, JsonFileRepository, Repository};
use feed_service::{FeedService, FeedSettings};
use ingestion_service::{IngestionJob, LivesClient, scheduler};
use recommendation_service::{RecommendationClient, VideoSearchClient};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn open_store(config: &ServerConfig) -> Result<Arc<dyn Repository>, ConfigError> {
    match &config.store_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using JSON file store");
            Ok(Arc::new(JsonFileRepository::open(path)?))
        }
        None => {
            tracing::info!("Using in-memory store");
            Ok(Arc::new(InMemoryRepository::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "server=info,ingestion_service=info,feed_service=info,recommendation_service=info,\
                 control_service=info,datastore=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");

    let repo = open_store(&config)?;

    // Ingestion: scheduled scan plus the manual trigger
    let job = Arc::new(IngestionJob::new(
        LivesClient::new(config.lives.clone())?,
        repo.clone(),
        config.ingestion.clone(),
    ));
    let cancel = CancellationToken::new();
    let schedule = tokio::spawn(scheduler::run(
        job.clone(),
        config.ingest_interval,
        config.ingest_on_startup,
        cancel.clone(),
    ));

    // Read side
    let recommender = Arc::new(RecommendationClient::new(VideoSearchClient::new(
        config.search.clone(),
    )?));
    let feed = Arc::new(FeedService::new(
        repo.clone(),
        recommender,
        FeedSettings {
            collection: config.ingestion.collection.clone(),
            page_size: config.feed_page_size,
            idle_timeout: config.feed_session_idle,
        },
    ));
    let sweeper = tokio::spawn(feed_service::sweep_idle_sessions(
        feed.clone(),
        config.feed_session_idle,
        cancel.clone(),
    ));

    let app = Router::new()
        .merge(ingestion_service::create_router(job))
        .merge(feed_service::create_router(feed))
        .merge(control_service::create_router(repo))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::new(config.host.parse()?, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped accepting connections");
    cancel.cancel();
    if tokio::time::timeout(Duration::from_secs(5), schedule)
        .await
        .is_err()
    {
        tracing::warn!("Ingestion schedule did not stop in time");
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), sweeper).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
