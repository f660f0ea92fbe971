// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Turns clusters into visit candidates.

use crate::db::PointStore;
use crate::geo_utils::{accuracy_weight, max_distance_from, weighted_centroid};
use crate::models::{Cluster, Point, VisitCandidate, VisitSettings};
use crate::services::clusterer::ClusterError;
use crate::services::names::NameSuggester;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves cluster members to stored points and summarizes each cluster.
pub struct ClusterExtractor {
    points: Arc<dyn PointStore>,
    names: Arc<dyn NameSuggester>,
    settings: VisitSettings,
}

impl ClusterExtractor {
    pub fn new(
        points: Arc<dyn PointStore>,
        names: Arc<dyn NameSuggester>,
        settings: VisitSettings,
    ) -> Self {
        Self {
            points,
            names,
            settings,
        }
    }

    /// Build one candidate per cluster that still has real points.
    ///
    /// Synthetic members and IDs that no longer resolve are dropped; clusters
    /// left empty are skipped. A storage error fails the whole call so no
    /// partial visit list is produced.
    pub async fn extract(
        &self,
        user_id: u64,
        clusters: &[Cluster],
    ) -> Result<Vec<VisitCandidate>, ClusterError> {
        let ids: Vec<u64> = clusters.iter().flat_map(Cluster::real_point_ids).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = self
            .points
            .points_by_ids(user_id, &ids)
            .await
            .map_err(|e| {
                tracing::warn!(user_id, error = %e, "Failed to resolve cluster points");
                ClusterError::Unavailable(e.to_string())
            })?;
        let by_id: HashMap<u64, Point> = resolved.into_iter().map(|p| (p.id, p)).collect();

        let mut candidates = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            let points: Vec<Point> = cluster
                .real_point_ids()
                .iter()
                .filter_map(|id| by_id.get(id).cloned())
                .collect();

            let dropped = cluster.point_count.saturating_sub(points.len());
            match self.candidate_from_points(points) {
                Some(candidate) => {
                    if dropped > 0 {
                        tracing::debug!(user_id, dropped, "Dropped synthetic or missing points");
                    }
                    candidates.push(candidate);
                }
                None => {
                    tracing::debug!(user_id, "Skipping cluster with no resolvable points");
                }
            }
        }

        Ok(candidates)
    }

    /// Summarize a set of real points; `None` when the set is empty.
    pub fn candidate_from_points(&self, mut points: Vec<Point>) -> Option<VisitCandidate> {
        if points.is_empty() {
            return None;
        }
        points.sort_by_key(|p| (p.timestamp, p.id));

        let (center_lat, center_lon) = weighted_center(&points, &self.settings)?;
        let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.latitude, p.longitude)).collect();
        let radius = max_distance_from((center_lat, center_lon), &coords);

        let start_time = points.first()?.timestamp;
        let end_time = points.last()?.timestamp;

        Some(VisitCandidate {
            start_time,
            end_time,
            duration: end_time - start_time,
            center_lat,
            center_lon,
            radius,
            suggested_name: self.names.suggest(&points),
            points,
        })
    }
}

/// Accuracy-weighted center of the points.
pub fn weighted_center(points: &[Point], settings: &VisitSettings) -> Option<(f64, f64)> {
    let samples: Vec<(f64, f64, f64)> = points
        .iter()
        .map(|p| {
            let weight = accuracy_weight(
                p.accuracy,
                settings.default_accuracy_meters,
                settings.accuracy_weight_exponent,
            );
            (p.latitude, p.longitude, weight)
        })
        .collect();
    weighted_centroid(&samples)
}
