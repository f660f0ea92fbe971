// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User-initiated visit changes: manual merge and bulk status updates.

use crate::db::MemoryDb;
use crate::error::AppError;
use crate::models::{duration_minutes, Visit, VisitStatus};
use serde::Serialize;

/// Failures reported back to the user.
#[derive(Debug, thiserror::Error)]
pub enum VisitActionError {
    #[error("At least 2 visits must be selected for merging")]
    TooFewVisits,

    #[error("No visits selected")]
    NoVisitsSelected,

    #[error("Invalid status")]
    InvalidStatus,

    #[error("No matching visits found")]
    NoMatchingVisits,

    #[error("{0}")]
    Persistence(String),
}

impl From<VisitActionError> for AppError {
    fn from(err: VisitActionError) -> Self {
        match err {
            VisitActionError::NoMatchingVisits => AppError::NotFound(err.to_string()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

/// Outcome of a bulk status change.
#[derive(Debug, Clone, Serialize)]
pub struct BulkUpdateResult {
    pub count: usize,
    pub visits: Vec<Visit>,
}

/// Merge the selected visits into the earliest one.
///
/// The result spans from the earliest start to the latest end and owns the
/// points of every merged visit. Either all visits merge or nothing changes.
pub async fn merge_visits(
    db: &MemoryDb,
    user_id: u64,
    visit_ids: &[u64],
) -> Result<Visit, VisitActionError> {
    if visit_ids.len() < 2 {
        return Err(VisitActionError::TooFewVisits);
    }

    let visits = db.visits_by_ids(user_id, visit_ids).await;
    let Some((first, rest)) = visits.split_first() else {
        return Err(VisitActionError::NoMatchingVisits);
    };
    if rest.is_empty() {
        return Err(VisitActionError::NoMatchingVisits);
    }

    let mut base = first.clone();
    for visit in rest {
        base.started_at = base.started_at.min(visit.started_at);
        base.ended_at = base.ended_at.max(visit.ended_at);
    }
    base.duration = duration_minutes(base.started_at, base.ended_at);

    let absorbed: Vec<u64> = rest.iter().map(|v| v.id).collect();
    let merged = db
        .merge_visits_atomic(&base, &absorbed)
        .await
        .map_err(|e| match e {
            AppError::BadRequest(msg) | AppError::NotFound(msg) => {
                VisitActionError::Persistence(msg)
            }
            other => VisitActionError::Persistence(other.to_string()),
        })?;

    tracing::info!(
        user_id,
        visit_id = merged.id,
        absorbed = absorbed.len(),
        "Merged visits"
    );
    Ok(merged)
}

/// Set the status of the selected visits. IDs the user does not own are
/// skipped.
pub async fn bulk_update_status(
    db: &MemoryDb,
    user_id: u64,
    visit_ids: &[u64],
    status: &str,
) -> Result<BulkUpdateResult, VisitActionError> {
    if visit_ids.is_empty() {
        return Err(VisitActionError::NoVisitsSelected);
    }
    let status: VisitStatus = status
        .parse()
        .map_err(|_| VisitActionError::InvalidStatus)?;

    let visits = db.update_visit_statuses(user_id, visit_ids, status).await;
    if visits.is_empty() {
        return Err(VisitActionError::NoMatchingVisits);
    }

    tracing::info!(user_id, count = visits.len(), status = %status, "Updated visit statuses");
    Ok(BulkUpdateResult {
        count: visits.len(),
        visits,
    })
}
