//! Inbound HTTP surface of the relay.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use publisher::Publisher;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("serve: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Clone)]
struct AppState {
    publisher: Arc<Publisher>,
    topic: Arc<str>,
}

/// `POST /` publishes one JSON record to `topic`; `GET /health` and
/// `GET /stats` report liveness and publisher counters.
pub fn router(publisher: Arc<Publisher>, topic: &str, max_body_bytes: usize) -> Router {
    let state = AppState {
        publisher,
        topic: Arc::from(topic),
    };

    Router::new()
        .route("/", post(handlers::handle_ingest))
        .route("/health", get(handlers::handle_health))
        .route("/stats", get(handlers::handle_stats))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Serve `app` on `addr` until `shutdown` is cancelled.
pub async fn run(addr: SocketAddr, app: Router, shutdown: CancellationToken) -> Result<(), HttpError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| HttpError::Bind { addr, source })?;

    tracing::info!(addr = %addr, "http listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(HttpError::Serve)?;

    tracing::info!("http stopped");
    Ok(())
}
