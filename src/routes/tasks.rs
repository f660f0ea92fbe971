// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Task handler routes.
//!
//! These endpoints are called by a scheduler, not directly by users.

use crate::error::Result;
use crate::routes::VisitResponse;
use crate::AppState;
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Task handler routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/detect-visits", post(detect_visits))
}

/// Payload for a visit detection run.
#[derive(Debug, Deserialize)]
pub struct DetectVisitsPayload {
    pub user_id: u64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct DetectVisitsResponse {
    pub visits_created: usize,
    pub visits: Vec<VisitResponse>,
}

/// Detect visits for a user over a time range.
async fn detect_visits(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DetectVisitsPayload>,
) -> Result<Json<DetectVisitsResponse>> {
    tracing::info!(
        user_id = payload.user_id,
        start_at = %payload.start_at,
        end_at = %payload.end_at,
        "Visit detection task received"
    );

    let visits = state
        .detector
        .detect_visits(payload.user_id, payload.start_at, payload.end_at)
        .await
        .inspect_err(|e| {
            tracing::error!(user_id = payload.user_id, error = %e, "Visit detection failed");
        })?;

    Ok(Json(DetectVisitsResponse {
        visits_created: visits.len(),
        visits: visits.into_iter().map(VisitResponse::from).collect(),
    }))
}
