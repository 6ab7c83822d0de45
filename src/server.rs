//! HTTP surface.
//!
//! | Route | Response |
//! |---|---|
//! | `POST /render` | `{"width", "height", "base64_data"}` or `{"error"}` with 400/500 |
//! | `GET /health` | `ok` |
//!
//! The request body is read as JSON whatever its `Content-Type` says.

use crate::config::ServiceConfig;
use crate::fetch::{HttpPool, PoolError};
use crate::imaging::RustBackend;
use crate::render::{RenderError, render};
use crate::request::{FetchRequest, RenderRequest};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pool: HttpPool,
    backend: Arc<RustBackend>,
    config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(config: ServiceConfig, pool: HttpPool) -> Self {
        let backend = RustBackend::with_max_decode_alloc(config.render.max_decode_alloc);
        Self {
            pool,
            backend: Arc::new(backend),
            config: Arc::new(config),
        }
    }

    /// Build the connection pool from `config` and wrap both.
    pub fn from_config(config: ServiceConfig) -> Result<Self, PoolError> {
        let pool = HttpPool::new(&config.fetch)?;
        Ok(Self::new(config, pool))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenderResponse {
    pub width: u32,
    pub height: u32,
    pub base64_data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_class().as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/render", post(render_handler))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    "ok"
}

async fn render_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RenderResponse>, RenderError> {
    let result = handle_render(&state, &body).await;
    if let Err(err) = &result {
        tracing::warn!(status = err.status_class().as_u16(), error = %err, "render failed");
    }
    result
}

async fn handle_render(state: &AppState, body: &[u8]) -> Result<Json<RenderResponse>, RenderError> {
    let request = RenderRequest::from_json_slice(body, &state.config.render)?;
    let request = FetchRequest::from_render(&request, &state.config.fetch)?;
    let rendered = render(
        &state.pool,
        state.backend.clone(),
        &request,
        state.config.fetch.probe,
    )
    .await?;
    Ok(Json(RenderResponse {
        width: rendered.image.width,
        height: rendered.image.height,
        base64_data: rendered.image.to_base64(),
    }))
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, bind: &str, port: u16) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "imagevault listening, POST JSON to /render");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
