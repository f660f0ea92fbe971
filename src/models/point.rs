// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recorded GPS point model.

use chrono::{DateTime, Utc};
use geojson::Feature;
use serde::{Deserialize, Serialize};

/// A GPS point recorded for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    /// Point ID (assigned by the store)
    pub id: u64,
    /// Owner
    pub user_id: u64,
    /// When the point was recorded
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Reported horizontal error radius in meters
    pub accuracy: Option<f64>,
    /// Reverse-geocode feature attached at import time
    pub geodata: Option<Feature>,
    /// Visit this point belongs to, if any
    pub visit_id: Option<u64>,
}

impl Point {
    /// Build an unsaved point (id 0, no visit).
    pub fn new(user_id: u64, timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: 0,
            user_id,
            timestamp,
            latitude,
            longitude,
            accuracy: None,
            geodata: None,
            visit_id: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_geodata(mut self, geodata: Feature) -> Self {
        self.geodata = Some(geodata);
        self
    }

    /// Whether this point is already attached to a visit.
    pub fn is_visited(&self) -> bool {
        self.visit_id.is_some()
    }
}
