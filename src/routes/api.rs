// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for reviewing visits.

use crate::error::Result;
use crate::routes::VisitResponse;
use crate::services::visit_actions;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Visit review routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/{user_id}/visits/merge", post(merge_visits))
        .route("/api/users/{user_id}/visits/status", patch(update_status))
}

// ─── Merge ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MergeVisitsRequest {
    #[serde(default)]
    pub visit_ids: Vec<u64>,
}

/// Merge selected visits into one.
async fn merge_visits(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
    Json(request): Json<MergeVisitsRequest>,
) -> Result<Json<VisitResponse>> {
    let visit = visit_actions::merge_visits(&state.db, user_id, &request.visit_ids).await?;
    Ok(Json(visit.into()))
}

// ─── Bulk Status ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub visit_ids: Vec<u64>,
    pub status: String,
}

#[derive(Serialize)]
pub struct UpdateStatusResponse {
    pub count: usize,
    pub visits: Vec<VisitResponse>,
}

/// Confirm or decline several visits at once.
async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>> {
    let result = visit_actions::bulk_update_status(
        &state.db,
        user_id,
        &request.visit_ids,
        &request.status,
    )
    .await?;

    Ok(Json(UpdateStatusResponse {
        count: result.count,
        visits: result.visits.into_iter().map(VisitResponse::from).collect(),
    }))
}
