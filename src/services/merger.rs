// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Merging of adjacent visit candidates.
//!
//! Consecutive candidates are folded together when the gap between them is
//! short and the user did not travel away in the meantime:
//!
//! | Gap                                   | Decision                          |
//! |---------------------------------------|-----------------------------------|
//! | ≤ maximum visit gap, centers close    | merge                             |
//! | ≤ extended window (or centers moved)  | merge unless travel evidence      |
//! | > extended window                     | never merge                       |

use crate::db::PointStore;
use crate::error::Result;
use crate::geo_utils::{haversine_distance, max_distance_from, path_length};
use crate::models::{VisitCandidate, VisitSettings};
use crate::services::extractor::weighted_center;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Folds a start-sorted candidate list into fewer, longer candidates.
pub struct VisitMerger {
    points: Arc<dyn PointStore>,
    settings: VisitSettings,
}

impl VisitMerger {
    pub fn new(points: Arc<dyn PointStore>, settings: VisitSettings) -> Self {
        Self { points, settings }
    }

    /// Merge candidates; input is sorted by start time first.
    pub async fn merge(
        &self,
        user_id: u64,
        mut candidates: Vec<VisitCandidate>,
    ) -> Result<Vec<VisitCandidate>> {
        candidates.sort_by_key(|c| c.start_time);
        let input_count = candidates.len();

        let mut remaining = candidates.into_iter();
        let Some(mut open) = remaining.next() else {
            return Ok(Vec::new());
        };

        let mut merged = Vec::with_capacity(input_count);
        for next in remaining {
            if self.can_merge(user_id, &open, &next).await? {
                open = absorb(open, next, &self.settings);
            } else {
                merged.push(std::mem::replace(&mut open, next));
            }
        }
        merged.push(open);

        tracing::debug!(
            user_id,
            input = input_count,
            output = merged.len(),
            "Merged visit candidates"
        );
        Ok(merged)
    }

    /// Decide whether `next` should be folded into `open`.
    pub async fn can_merge(
        &self,
        user_id: u64,
        open: &VisitCandidate,
        next: &VisitCandidate,
    ) -> Result<bool> {
        let gap = (next.start_time - open.end_time).max(Duration::zero());

        if gap > self.settings.extended_merge_window() {
            return Ok(false);
        }

        if gap <= self.settings.maximum_visit_gap() {
            let displacement =
                haversine_distance(open.center_lat, open.center_lon, next.center_lat, next.center_lon);
            if displacement <= self.settings.significant_movement_meters {
                return Ok(true);
            }
            tracing::debug!(
                user_id,
                displacement_m = displacement,
                "Significant movement between close candidates, checking travel"
            );
        }

        self.stayed_put(user_id, open.end_time, next.start_time).await
    }

    /// True when the points recorded strictly inside the gap show no more
    /// than `travel_threshold_meters` of movement. No points means no travel.
    async fn stayed_put(
        &self,
        user_id: u64,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<bool> {
        let between = self.points.points_between(user_id, after, before).await?;
        if between.is_empty() {
            return Ok(true);
        }

        let coords: Vec<(f64, f64)> = between.iter().map(|p| (p.latitude, p.longitude)).collect();
        let travelled = path_length(&coords);
        tracing::debug!(
            user_id,
            points = between.len(),
            travelled_m = travelled,
            "Travel during gap"
        );
        Ok(travelled <= self.settings.travel_threshold_meters)
    }
}

/// Extend `open` with everything in `next`.
fn absorb(open: VisitCandidate, next: VisitCandidate, settings: &VisitSettings) -> VisitCandidate {
    let mut points = open.points;
    points.extend(next.points);
    points.sort_by_key(|p| (p.timestamp, p.id));
    points.dedup_by_key(|p| p.id);

    let start_time = open.start_time.min(next.start_time);
    let end_time = open.end_time.max(next.end_time);

    let (center_lat, center_lon) =
        weighted_center(&points, settings).unwrap_or((open.center_lat, open.center_lon));
    let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.latitude, p.longitude)).collect();
    let radius = max_distance_from((center_lat, center_lon), &coords);

    VisitCandidate {
        start_time,
        end_time,
        duration: end_time - start_time,
        center_lat,
        center_lon,
        radius,
        suggested_name: open.suggested_name.or(next.suggested_name),
        points,
    }
}
