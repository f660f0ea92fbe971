// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod api;
pub mod tasks;

use crate::models::Visit;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Visit as returned by the API.
#[derive(Serialize, Clone, Debug)]
pub struct VisitResponse {
    pub id: u64,
    pub name: String,
    pub status: String,
    pub started_at: String,
    pub ended_at: String,
    /// Duration in minutes
    pub duration: i64,
    pub area_id: Option<u64>,
    pub place_id: Option<u64>,
}

impl From<Visit> for VisitResponse {
    fn from(visit: Visit) -> Self {
        let (area_id, place_id) = match visit.anchor {
            crate::models::Anchor::Area(id) => (Some(id), None),
            crate::models::Anchor::Place(id) => (None, Some(id)),
            crate::models::Anchor::None => (None, None),
        };
        Self {
            id: visit.id,
            name: visit.name,
            status: visit.status.to_string(),
            started_at: format_utc_rfc3339(visit.started_at),
            ended_at: format_utc_rfc3339(visit.ended_at),
            duration: visit.duration,
            area_id,
            place_id,
        }
    }
}

/// Build the complete router with all routes.
///
/// Authentication is handled in front of this service.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(tasks::routes())
        .merge(api::routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
