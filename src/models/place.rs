// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Named location model.

use geojson::Feature;
use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;

/// Placeholder name used when no better name is known.
pub const DEFAULT_PLACE_NAME: &str = "Suggested place";

/// Where a place record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceSource {
    /// Created from a visit's suggested name
    Manual,
    /// Returned by the Photon geocoding search
    Photon,
    /// Taken from reverse-geocode data embedded in points
    ReverseGeocoded,
}

/// A named location a visit can be anchored to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: u64,
    /// Owner; `None` for places shared between users
    pub user_id: Option<u64>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub source: PlaceSource,
    pub geodata: Option<Feature>,
}

impl Place {
    /// Build an unsaved place (id 0).
    pub fn new(
        user_id: Option<u64>,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        source: PlaceSource,
    ) -> Self {
        Self {
            id: 0,
            user_id,
            name: name.into(),
            latitude,
            longitude,
            source,
            geodata: None,
        }
    }

    pub fn distance_to(&self, latitude: f64, longitude: f64) -> f64 {
        haversine_distance(self.latitude, self.longitude, latitude, longitude)
    }

    /// Whether a user may see this place.
    pub fn visible_to(&self, user_id: u64) -> bool {
        self.user_id.is_none_or(|owner| owner == user_id)
    }

    pub fn has_default_name(&self) -> bool {
        self.name == DEFAULT_PLACE_NAME
    }
}
