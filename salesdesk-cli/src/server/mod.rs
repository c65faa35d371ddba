//! Gateway HTTP endpoint
//!
//! One POST route speaking the wire protocol, answered either by the
//! local engine or by forwarding to the remote scripting backend through
//! the redirect-hardened client. Business failures stay HTTP 200 with a
//! failure envelope, which is the wire contract; only transport trouble
//! on the proxy leg becomes a 502.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};

use crate::api::models::{ActionRequest, ApiResponse, Health};
use crate::api::ScriptClient;
use crate::engine::Engine;
use crate::sheets::store::XlsxStore;

pub enum GatewayMode {
    /// Answer from the local workbook engine.
    Local(Engine<XlsxStore>),
    /// Forward to the remote scripting backend.
    Proxy(ScriptClient),
}

pub struct AppState {
    pub mode: GatewayMode,
    pub version: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/actions", post(actions))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let mode = match &state.mode {
        GatewayMode::Local(_) => "local engine".to_string(),
        GatewayMode::Proxy(client) => format!("proxy -> {}", client.url()),
    };
    info!("gateway listening on {addr} ({mode})");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Gateway server failed")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to install shutdown handler: {err}");
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health::active(&state.version))
}

async fn actions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ActionRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!("action {}", request.action);
    match &state.mode {
        GatewayMode::Local(engine) => (StatusCode::OK, Json(engine.dispatch(request).await)),
        GatewayMode::Proxy(client) => match client.call(&request).await {
            Ok(response) => (StatusCode::OK, Json(response)),
            Err(err) => {
                error!("proxy leg failed for {}: {err}", request.action);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(ApiResponse::failure(err.to_string())),
                )
            }
        },
    }
}
