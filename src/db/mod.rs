// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer.
//!
//! `PointStore` is the query surface the detection pipeline reads points
//! through; `MemoryDb` implements it together with the visit, place and area
//! tables the pipeline writes.

pub mod memory;

pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::Point;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Point queries needed by clustering and merging.
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Points of `user_id` in `[start, end]` not yet attached to a visit,
    /// sorted by timestamp.
    async fn unvisited_points(
        &self,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Point>, AppError>;

    /// Resolve point IDs owned by `user_id`. IDs that do not resolve are
    /// left out of the result.
    async fn points_by_ids(&self, user_id: u64, ids: &[u64]) -> Result<Vec<Point>, AppError>;

    /// All points of `user_id` strictly between `after` and `before`, sorted
    /// by timestamp.
    async fn points_between(
        &self,
        user_id: u64,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Point>, AppError>;
}
