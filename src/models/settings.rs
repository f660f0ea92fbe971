// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user visit detection thresholds.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Thresholds used by every stage of visit detection.
///
/// Stored per user; users without stored settings get the configured default.
/// Durations are kept in seconds/minutes so the struct serializes cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitSettings {
    // ─── Clustering ──────────────────────────────────────────────
    /// Max great-circle distance between neighbouring points
    pub cluster_radius_meters: f64,
    /// Max time gap between neighbouring points
    pub time_threshold_minutes: i64,
    /// Neighbours (self included) needed for a core point
    pub min_points: usize,
    /// Clusters shorter than this are noise
    pub min_cluster_duration_seconds: i64,
    /// Storage query budget for the clustering input
    pub query_timeout_seconds: u64,

    // ─── Density normalization ───────────────────────────────────
    pub density_normalization: bool,
    pub max_normalization_gap_minutes: i64,
    pub max_normalization_distance_meters: f64,
    pub normalization_interval_minutes: i64,

    // ─── Extraction ──────────────────────────────────────────────
    pub accuracy_weight_exponent: f64,
    /// Used for points without a reported accuracy
    pub default_accuracy_meters: f64,

    // ─── Merging ─────────────────────────────────────────────────
    pub maximum_visit_gap_minutes: i64,
    pub extended_merge_window_minutes: i64,
    pub travel_threshold_meters: f64,
    pub significant_movement_meters: f64,
    pub min_visit_duration_minutes: i64,

    // ─── Place resolution ────────────────────────────────────────
    pub place_search_radius_meters: f64,
    pub place_dedupe_radius_meters: f64,

    // ─── Fallback grouping ───────────────────────────────────────
    pub fallback_radius_meters: f64,
    pub fallback_merge_threshold_minutes: i64,
}

impl Default for VisitSettings {
    fn default() -> Self {
        Self {
            cluster_radius_meters: 50.0,
            time_threshold_minutes: 30,
            min_points: 2,
            min_cluster_duration_seconds: 60,
            query_timeout_seconds: 30,
            density_normalization: false,
            max_normalization_gap_minutes: 12 * 60,
            max_normalization_distance_meters: 500.0,
            normalization_interval_minutes: 5,
            accuracy_weight_exponent: 2.0,
            default_accuracy_meters: 20.0,
            maximum_visit_gap_minutes: 30,
            extended_merge_window_minutes: 120,
            travel_threshold_meters: 200.0,
            significant_movement_meters: 50.0,
            min_visit_duration_minutes: 3,
            place_search_radius_meters: 100.0,
            place_dedupe_radius_meters: 25.0,
            fallback_radius_meters: 50.0,
            fallback_merge_threshold_minutes: 15,
        }
    }
}

impl VisitSettings {
    pub fn time_threshold(&self) -> Duration {
        Duration::minutes(self.time_threshold_minutes)
    }

    pub fn min_cluster_duration(&self) -> Duration {
        Duration::seconds(self.min_cluster_duration_seconds)
    }

    pub fn query_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.query_timeout_seconds)
    }

    pub fn max_normalization_gap(&self) -> Duration {
        Duration::minutes(self.max_normalization_gap_minutes)
    }

    pub fn normalization_interval(&self) -> Duration {
        Duration::minutes(self.normalization_interval_minutes.max(1))
    }

    pub fn maximum_visit_gap(&self) -> Duration {
        Duration::minutes(self.maximum_visit_gap_minutes)
    }

    pub fn extended_merge_window(&self) -> Duration {
        Duration::minutes(self.extended_merge_window_minutes)
    }

    pub fn min_visit_duration(&self) -> Duration {
        Duration::minutes(self.min_visit_duration_minutes)
    }

    pub fn fallback_merge_threshold(&self) -> Duration {
        Duration::minutes(self.fallback_merge_threshold_minutes)
    }
}
