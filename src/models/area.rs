// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User-defined circular area.

use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;

/// A circular geofence drawn by the user (e.g. "Home", "Office").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius in meters
    pub radius: f64,
}

impl Area {
    /// Distance in meters from the area center to a coordinate.
    pub fn distance_to(&self, latitude: f64, longitude: f64) -> f64 {
        haversine_distance(self.latitude, self.longitude, latitude, longitude)
    }

    /// Check if a coordinate falls inside this area.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        self.distance_to(latitude, longitude) <= self.radius
    }
}
