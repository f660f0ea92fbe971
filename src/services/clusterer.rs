// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Density-aware spatial-temporal clustering of unvisited points.
//!
//! Points are neighbours when they are within `cluster_radius_meters` of each
//! other (great-circle) and no more than `time_threshold` apart. Clusters are
//! the connected regions of core points, DBSCAN style, split wherever a point
//! strays more than the radius from the centroid of the part it would join.
//!
//! With density normalization enabled, short GPS silences between nearby
//! points are bridged with synthetic members so a stay interrupted by a
//! sensor gap still forms one cluster.

use crate::db::PointStore;
use crate::geo_utils::{haversine_distance, interpolate};
use crate::models::{Cluster, ClusterMember, Point, VisitSettings};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::Arc;

/// Synthetic members are spaced at most this fraction of the cluster radius
/// apart so the chain stays connected.
const SYNTHETIC_SPACING_RATIO: f64 = 0.9;

/// The density-aware path could not produce a result.
///
/// Distinct from an empty cluster list: callers should switch to the
/// fallback grouping instead of reporting zero visits.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Clustering unavailable: {0}")]
    Unavailable(String),
}

/// Clusters a user's unvisited points within a time window.
pub struct DensityAwareClusterer {
    points: Arc<dyn PointStore>,
    settings: VisitSettings,
}

impl DensityAwareClusterer {
    pub fn new(points: Arc<dyn PointStore>, settings: VisitSettings) -> Self {
        Self { points, settings }
    }

    /// Cluster the user's unvisited points in `[start, end]`.
    ///
    /// Returns `Ok(vec![])` when there is nothing to cluster and
    /// `Err(ClusterError::Unavailable)` when the point query fails or runs
    /// past the configured timeout.
    pub async fn cluster(
        &self,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Cluster>, ClusterError> {
        let query = self.points.unvisited_points(user_id, start, end);
        let points = match tokio::time::timeout(self.settings.query_timeout(), query).await {
            Ok(Ok(points)) => points,
            Ok(Err(e)) => {
                tracing::warn!(user_id, error = %e, "Point query failed during clustering");
                return Err(ClusterError::Unavailable(e.to_string()));
            }
            Err(_) => {
                tracing::warn!(
                    user_id,
                    timeout_secs = self.settings.query_timeout_seconds,
                    "Point query timed out during clustering"
                );
                return Err(ClusterError::Unavailable("point query timed out".to_string()));
            }
        };

        let clusters = cluster_points(&points, &self.settings);
        tracing::debug!(
            user_id,
            points = points.len(),
            clusters = clusters.len(),
            normalized = self.settings.density_normalization,
            "Clustered unvisited points"
        );
        Ok(clusters)
    }
}

/// A clustering input: a real point or a synthetic bridge.
#[derive(Debug, Clone)]
struct Sample {
    member: ClusterMember,
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
}

impl Sample {
    fn real(point: &Point) -> Self {
        Self {
            member: ClusterMember::Real(point.id),
            latitude: point.latitude,
            longitude: point.longitude,
            timestamp: point.timestamp,
        }
    }

    fn synthetic(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            member: ClusterMember::Synthetic {
                latitude,
                longitude,
                timestamp,
            },
            latitude,
            longitude,
            timestamp,
        }
    }
}

/// Cluster points entirely in memory.
///
/// Input order does not matter. Output clusters are ordered by start time and
/// every cluster lasts at least `min_cluster_duration`.
pub fn cluster_points(points: &[Point], settings: &VisitSettings) -> Vec<Cluster> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&Point> = points.iter().collect();
    sorted.sort_by_key(|p| (p.timestamp, p.id));

    let samples = build_samples(&sorted, settings);
    let labels = label_samples(&samples, settings);

    let cluster_count = labels.iter().flatten().max().map_or(0, |max| max + 1);
    let mut grouped: Vec<Vec<&Sample>> = vec![Vec::new(); cluster_count];
    for (sample, label) in samples.iter().zip(&labels) {
        if let Some(label) = label {
            grouped[*label].push(sample);
        }
    }

    let min_duration = settings.min_cluster_duration();
    let min_members = settings.min_points.max(1);
    let mut clusters: Vec<Cluster> = grouped
        .into_iter()
        .flat_map(|members| split_by_spread(members, settings.cluster_radius_meters))
        .filter(|members| members.len() >= min_members)
        .filter_map(|members| {
            // Samples are time-sorted, so the group is too.
            let start_time = members.first()?.timestamp;
            let end_time = members.last()?.timestamp;
            Some(Cluster {
                point_count: members.len(),
                members: members.into_iter().map(|s| s.member.clone()).collect(),
                start_time,
                end_time,
            })
        })
        .filter(|cluster| cluster.duration() >= min_duration)
        .collect();

    clusters.sort_by_key(|c| c.start_time);
    clusters
}

/// Running mean position of the real samples in one leg of a cluster.
#[derive(Default)]
struct Centroid {
    latitude: f64,
    longitude: f64,
    count: usize,
}

impl Centroid {
    fn add(&mut self, sample: &Sample) {
        self.count += 1;
        let n = self.count as f64;
        self.latitude += (sample.latitude - self.latitude) / n;
        self.longitude += (sample.longitude - self.longitude) / n;
    }

    fn distance_to(&self, sample: &Sample) -> Option<f64> {
        (self.count > 0).then(|| {
            haversine_distance(self.latitude, self.longitude, sample.latitude, sample.longitude)
        })
    }
}

/// Split a time-sorted cluster wherever a real sample lies farther than
/// `radius` from the centroid of the leg it would join.
///
/// A run of synthetic members starts a new leg of the same part, so a
/// bridged stay may spread as far as its bridge reaches.
fn split_by_spread(members: Vec<&Sample>, radius: f64) -> Vec<Vec<&Sample>> {
    let mut parts: Vec<Vec<&Sample>> = Vec::new();
    let mut current: Vec<&Sample> = Vec::new();
    let mut leg = Centroid::default();
    let mut after_bridge = false;

    for sample in members {
        if sample.member.is_synthetic() {
            after_bridge = true;
            current.push(sample);
            continue;
        }

        if after_bridge {
            leg = Centroid::default();
            after_bridge = false;
        } else if leg.distance_to(sample).is_some_and(|d| d > radius) {
            parts.push(std::mem::take(&mut current));
            leg = Centroid::default();
        }
        leg.add(sample);
        current.push(sample);
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Turn sorted points into samples, inserting synthetic bridges across
/// qualifying gaps when normalization is enabled.
fn build_samples(sorted: &[&Point], settings: &VisitSettings) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(sorted.len());

    for (index, point) in sorted.iter().enumerate() {
        samples.push(Sample::real(point));

        if !settings.density_normalization {
            continue;
        }
        if let Some(next) = sorted.get(index + 1) {
            samples.extend(bridge_gap(point, next, settings));
        }
    }

    samples
}

/// Synthetic samples between two consecutive points, or nothing if the gap
/// does not need or qualify for bridging.
fn bridge_gap(from: &Point, to: &Point, settings: &VisitSettings) -> Vec<Sample> {
    let gap = to.timestamp - from.timestamp;
    if gap <= settings.time_threshold() || gap > settings.max_normalization_gap() {
        return Vec::new();
    }

    let displacement = haversine_distance(from.latitude, from.longitude, to.latitude, to.longitude);
    if displacement > settings.max_normalization_distance_meters {
        return Vec::new();
    }

    let interval = settings
        .normalization_interval()
        .min(settings.time_threshold())
        .num_seconds()
        .max(1);
    let time_steps = (gap.num_seconds() as f64 / interval as f64).ceil();

    let max_spacing = settings.cluster_radius_meters * SYNTHETIC_SPACING_RATIO;
    let space_steps = if max_spacing > 0.0 {
        (displacement / max_spacing).ceil()
    } else {
        1.0
    };

    let steps = time_steps.max(space_steps).max(1.0) as i64;
    let gap_ms = gap.num_milliseconds();

    (1..steps)
        .map(|k| {
            let fraction = k as f64 / steps as f64;
            let (latitude, longitude) = interpolate(
                (from.latitude, from.longitude),
                (to.latitude, to.longitude),
                fraction,
            );
            let offset = Duration::milliseconds(gap_ms * k / steps);
            Sample::synthetic(latitude, longitude, from.timestamp + offset)
        })
        .collect()
}

/// Assign a cluster label to every sample (`None` for noise).
fn label_samples(samples: &[Sample], settings: &VisitSettings) -> Vec<Option<usize>> {
    let n = samples.len();
    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut next_label = 0;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let neighbours = region_query(samples, i, settings);
        if neighbours.len() < settings.min_points {
            // Noise for now; may still be picked up as a border point.
            continue;
        }

        labels[i] = Some(next_label);
        let mut queue: VecDeque<usize> = neighbours.into();

        while let Some(j) = queue.pop_front() {
            if labels[j].is_none() {
                labels[j] = Some(next_label);
            }
            if visited[j] {
                continue;
            }
            visited[j] = true;

            let expansion = region_query(samples, j, settings);
            if expansion.len() >= settings.min_points {
                queue.extend(expansion);
            }
        }

        next_label += 1;
    }

    labels
}

/// Indices of samples neighbouring sample `i` (itself included).
///
/// Samples are time-sorted, so only the window within `time_threshold` on
/// either side is scanned.
fn region_query(samples: &[Sample], i: usize, settings: &VisitSettings) -> Vec<usize> {
    let threshold = settings.time_threshold();
    let eps = settings.cluster_radius_meters;
    let center = &samples[i];

    let is_near = |other: &Sample| {
        haversine_distance(
            center.latitude,
            center.longitude,
            other.latitude,
            other.longitude,
        ) <= eps
    };

    let mut neighbours = vec![i];

    for j in (0..i).rev() {
        if center.timestamp - samples[j].timestamp > threshold {
            break;
        }
        if is_near(&samples[j]) {
            neighbours.push(j);
        }
    }

    for (j, other) in samples.iter().enumerate().skip(i + 1) {
        if other.timestamp - center.timestamp > threshold {
            break;
        }
        if is_near(other) {
            neighbours.push(j);
        }
    }

    neighbours
}
