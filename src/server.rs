//! HTTP surface of the service.
//!
//! | route | method | response |
//! |-------|--------|----------|
//! | `/` | POST | conversion envelope, or SVG when `raw` is set |
//! | `/health` | GET | `{"success": true}` |
//! | `/test-error` | GET | 500, exercises the unclassified-error path |
//!
//! Conversion failures are answered with status 200 and
//! `{"success": false, "error": ...}`; only the public message of the
//! classified error leaves the process.

use crate::config::ServiceConfig;
use crate::output::{failure_envelope, success_envelope, Vectorized};
use crate::pipeline::markup::SVG_CONTENT_TYPE;
use crate::storage::MarkupStore;
use crate::vectorize::Vectorizer;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub vectorizer: Arc<Vectorizer>,
}

/// Build the router with a body limit of `max_payload_bytes`.
pub fn build_app(state: AppState, max_payload_bytes: usize) -> Router {
    Router::new()
        .route("/", post(vectorize))
        .route("/health", get(health))
        .route("/test-error", get(test_error))
        .layer(DefaultBodyLimit::max(max_payload_bytes))
        .with_state(state)
}

/// Bind `0.0.0.0:{port}` and serve until Ctrl-C or SIGTERM.
pub async fn serve(
    config: &ServiceConfig,
    client: reqwest::Client,
    store: Arc<dyn MarkupStore>,
    port: u16,
) -> io::Result<()> {
    let vectorizer = Arc::new(Vectorizer::new(config, client, store));
    let app = build_app(AppState { vectorizer }, config.max_payload_bytes);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(
        "Vectorizing server running on port: {}, environment: {}",
        port, config.environment
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn vectorize(State(state): State<AppState>, body: Bytes) -> Response {
    // A body that is not JSON is treated like a missing payload.
    let payload: Value = serde_json::from_slice(&body).unwrap_or_else(|e| {
        debug!("Request body is not valid JSON: {}", e);
        Value::Null
    });

    match state.vectorizer.run(&payload).await {
        Ok(Vectorized::Markup(svg)) => {
            ([(header::CONTENT_TYPE, SVG_CONTENT_TYPE)], svg).into_response()
        }
        Ok(stored) => match success_envelope(&stored) {
            Some(envelope) => Json(envelope).into_response(),
            None => internal_error(),
        },
        Err(e) => Json(failure_envelope(&e)).into_response(),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "success": true }))
}

async fn test_error() -> Response {
    error!("Test Error");
    internal_error()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "Internal server error." })),
    )
        .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
