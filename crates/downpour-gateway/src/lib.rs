// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP control gateway built on axum.
//!
//! A thin authenticated shim over the controller for scripts and dashboards:
//! queue inspection, progress, and the same control operations the Telegram
//! front end exposes.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use downpour_core::DownpourError;
use downpour_engine::Controller;

use crate::auth::{auth_middleware, AuthConfig};

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token; `None` rejects every API request (fail-closed).
    pub bearer_token: Option<String>,
}

/// Build the gateway router. Split out from [`start_server`] for tests.
pub fn build_router(controller: Arc<Controller>, auth: AuthConfig) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::get_health));

    let api_routes = Router::new()
        .route("/api/queue", get(handlers::get_queue))
        .route("/api/queue", delete(handlers::delete_queue))
        .route("/api/queue/{id}", delete(handlers::delete_item))
        .route("/api/progress", get(handlers::get_progress))
        .route("/api/run", post(handlers::post_run))
        .route("/api/pause", post(handlers::post_pause))
        .route("/api/resume", post(handlers::post_resume))
        .route("/api/retry", post(handlers::post_retry))
        .route("/api/purge", post(handlers::post_purge))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(controller);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process shuts down.
pub async fn start_server(
    config: &ServerConfig,
    controller: Arc<Controller>,
) -> Result<(), DownpourError> {
    let auth = AuthConfig {
        bearer_token: config.bearer_token.clone(),
    };
    let app = build_router(controller, auth);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DownpourError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| DownpourError::Internal(format!("gateway server error: {e}")))
}
