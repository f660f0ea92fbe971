// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Grouping used when density-aware clustering is unavailable.
//!
//! Works on a plain time-sorted point list with no store queries: points are
//! first grouped by distance from each group's first point, then neighbouring
//! groups close in time and space are joined.

use crate::geo_utils::haversine_distance;
use crate::models::{Point, VisitSettings};
use chrono::Duration;

pub struct FallbackGrouper {
    settings: VisitSettings,
}

impl FallbackGrouper {
    pub fn new(settings: VisitSettings) -> Self {
        Self { settings }
    }

    /// Split points into groups that each look like a single stay.
    ///
    /// Groups with too few points or too short a span are dropped.
    pub fn group(&self, mut points: Vec<Point>) -> Vec<Vec<Point>> {
        points.sort_by_key(|p| (p.timestamp, p.id));

        let radius = self.settings.fallback_radius_meters;
        let groups = group_by_radius(points, radius);
        let groups = join_adjacent(groups, self.settings.time_threshold(), radius);
        let groups = join_adjacent(groups, self.settings.fallback_merge_threshold(), 2.0 * radius);

        let min_points = self.settings.min_points.max(1);
        let min_duration = self.settings.min_cluster_duration();
        groups
            .into_iter()
            .filter(|group| group.len() >= min_points && span(group) >= min_duration)
            .collect()
    }
}

/// Fold each point into the open group while it stays within `radius` of the
/// group's first point.
fn group_by_radius(points: Vec<Point>, radius: f64) -> Vec<Vec<Point>> {
    let mut groups: Vec<Vec<Point>> = Vec::new();
    for point in points {
        match groups.last_mut() {
            Some(group) if within(&group[0], &point, radius) => group.push(point),
            _ => groups.push(vec![point]),
        }
    }
    groups
}

/// Join consecutive groups separated by less than `max_gap` whose first
/// points lie within `radius` of each other.
fn join_adjacent(groups: Vec<Vec<Point>>, max_gap: Duration, radius: f64) -> Vec<Vec<Point>> {
    let mut joined: Vec<Vec<Point>> = Vec::with_capacity(groups.len());
    for group in groups {
        match joined.last_mut() {
            Some(open) if close_to(open, &group, max_gap, radius) => open.extend(group),
            _ => joined.push(group),
        }
    }
    joined
}

fn close_to(open: &[Point], next: &[Point], max_gap: Duration, radius: f64) -> bool {
    let (Some(open_first), Some(open_last), Some(next_first)) =
        (open.first(), open.last(), next.first())
    else {
        return false;
    };
    next_first.timestamp - open_last.timestamp < max_gap && within(open_first, next_first, radius)
}

fn within(a: &Point, b: &Point, radius: f64) -> bool {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude) <= radius
}

fn span(group: &[Point]) -> Duration {
    match (group.first(), group.last()) {
        (Some(first), Some(last)) => last.timestamp - first.timestamp,
        _ => Duration::zero(),
    }
}
