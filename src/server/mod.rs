//! HTTP and WebSocket front end for the ingestion pipeline.
//!
//! Routes:
//! - `POST /upload` submits one chunk from headers and a raw body
//! - `GET /chunks/{id}` reads a finished record
//! - `GET /sessions/{user_id}` lists finished records by submitter
//! - `GET /stats` reports lifecycle phase, counters and queue depths
//! - `GET /ws` accepts a stream of chunks, acknowledging each one

pub mod error;
pub mod handlers;
pub mod stream;

pub use error::{ApiError, ApiResult};

use crate::pipeline::Pipeline;
use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, max_body_bytes: usize) -> Self {
        Self {
            pipeline,
            max_body_bytes,
        }
    }
}

/// Builds the router. `request_timeout` bounds every HTTP request; upgraded
/// WebSocket connections are not subject to it.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/chunks/{id}", get(handlers::get_chunk))
        .route("/sessions/{user_id}", get(handlers::get_sessions))
        .route("/stats", get(handlers::stats))
        .layer(middleware::from_fn_with_state(
            request_timeout,
            enforce_timeout,
        ))
        .route("/ws", get(stream::upgrade))
        .with_state(state)
}

async fn enforce_timeout(
    State(timeout): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => ApiError::Timeout.into_response(),
    }
}

/// Serves `app` until `shutdown` resolves.
///
/// After the shutdown signal the listener stops accepting and open
/// connections get `grace` to finish before the server returns anyway.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    grace: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (fired_tx, mut fired_rx) = watch::channel(false);
    let signal = async move {
        shutdown.await;
        fired_tx.send_replace(true);
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    tokio::pin!(server);

    let grace_expired = async move {
        let fired = fired_rx.wait_for(|fired| *fired).await.is_ok();
        if fired {
            tokio::time::sleep(grace).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = &mut server => result,
        () = grace_expired => {
            tracing::warn!(grace_secs = grace.as_secs(), "shutdown grace period expired, dropping open connections");
            Ok(())
        }
    }
}
