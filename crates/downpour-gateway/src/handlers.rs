// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers: a thin shim over the controller.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use downpour_core::DownpourError;
use downpour_engine::Controller;

pub struct ApiError(DownpourError);

impl From<DownpourError> for ApiError {
    fn from(err: DownpourError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "gateway request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": self.0.to_string()})),
        )
            .into_response()
    }
}

pub async fn get_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn get_queue(
    State(controller): State<Arc<Controller>>,
) -> Result<impl IntoResponse, ApiError> {
    let items = controller.list(100).await?;
    Ok(Json(json!({"items": items})))
}

pub async fn get_progress(
    State(controller): State<Arc<Controller>>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = controller.status().await?;
    Ok(Json(json!({
        "paused": summary.paused,
        "counts": summary
            .counts
            .iter()
            .map(|(status, n)| json!({"status": status, "count": n}))
            .collect::<Vec<_>>(),
        "in_flight": summary.in_flight,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RunParams {
    /// Admit queued items regardless of schedule. Defaults to true; a
    /// manual API run is an explicit "now".
    pub force: Option<bool>,
}

pub async fn post_run(
    State(controller): State<Arc<Controller>>,
    Query(params): Query<RunParams>,
) -> Result<impl IntoResponse, ApiError> {
    let started = controller.run_now(params.force.unwrap_or(true)).await?;
    Ok(Json(json!({"started": started})))
}

pub async fn post_pause(
    State(controller): State<Arc<Controller>>,
) -> Result<impl IntoResponse, ApiError> {
    controller.pause().await?;
    Ok(Json(json!({"paused": true})))
}

pub async fn post_resume(
    State(controller): State<Arc<Controller>>,
) -> Result<impl IntoResponse, ApiError> {
    let requeued = controller.resume().await?;
    Ok(Json(json!({"paused": false, "requeued": requeued})))
}

pub async fn post_retry(
    State(controller): State<Arc<Controller>>,
) -> Result<impl IntoResponse, ApiError> {
    let requeued = controller.retry_errors().await?;
    Ok(Json(json!({"requeued": requeued})))
}

pub async fn post_purge(
    State(controller): State<Arc<Controller>>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = controller.purge_finished().await?;
    Ok(Json(json!({"removed": removed})))
}

pub async fn delete_item(
    State(controller): State<Arc<Controller>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    if controller.cancel(id).await? {
        Ok(Json(json!({"canceled": id})).into_response())
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("item {id} not found or already finished")})),
        )
            .into_response())
    }
}

pub async fn delete_queue(
    State(controller): State<Arc<Controller>>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = controller.clear_all().await?;
    Ok(Json(json!({"removed": removed})))
}
