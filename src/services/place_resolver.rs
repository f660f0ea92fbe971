// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resolves where a visit happened.
//!
//! A visit centered inside one of the user's areas is anchored to that area.
//! Otherwise candidate places are gathered from, in order:
//! 1. Existing places near the center
//! 2. Points of interest embedded in the visit's points
//! 3. A reverse geocoding search at the center
//! 4. A manual place named after the visit's suggested name
//!
//! The first source that yields anything provides the main place; all of
//! them contribute to the suggestion list.

use crate::db::MemoryDb;
use crate::error::Result;
use crate::models::{Area, Place, PlaceSource, Point, VisitCandidate, VisitSettings, DEFAULT_PLACE_NAME};
use crate::services::geocoder::{GeocodeResult, Geocoder};
use std::sync::Arc;

/// Coordinates closer than this (degrees) are the same spot.
const SAME_COORDINATE_EPSILON: f64 = 1e-6;

/// Outcome of resolving a visit's location.
#[derive(Debug, Clone)]
pub enum Resolution {
    Area(Area),
    Place(PlaceResolution),
}

/// Main place plus alternatives offered for disambiguation.
#[derive(Debug, Clone)]
pub struct PlaceResolution {
    pub main_place: Place,
    /// Every candidate place, `main_place` included
    pub suggested_places: Vec<Place>,
    /// Places created by this resolution (as opposed to reused)
    pub created_places: Vec<Place>,
}

/// Places gathered so far, unique by ID.
#[derive(Default)]
struct Collected {
    places: Vec<Place>,
    created: Vec<Place>,
}

impl Collected {
    fn push(&mut self, place: Place, created: bool) {
        if self.places.iter().any(|p| p.id == place.id) {
            return;
        }
        if created {
            self.created.push(place.clone());
        }
        self.places.push(place);
    }

    fn has_coordinates(&self, latitude: f64, longitude: f64) -> bool {
        self.places.iter().any(|p| {
            (p.latitude - latitude).abs() < SAME_COORDINATE_EPSILON
                && (p.longitude - longitude).abs() < SAME_COORDINATE_EPSILON
        })
    }
}

pub struct PlaceResolver {
    db: MemoryDb,
    geocoder: Option<Arc<dyn Geocoder>>,
    settings: VisitSettings,
}

impl PlaceResolver {
    pub fn new(db: MemoryDb, geocoder: Option<Arc<dyn Geocoder>>, settings: VisitSettings) -> Self {
        Self {
            db,
            geocoder,
            settings,
        }
    }

    /// Anchor a candidate to an area, or resolve its places.
    pub async fn resolve(&self, user_id: u64, candidate: &VisitCandidate) -> Result<Resolution> {
        if let Some(area) = self
            .find_area(user_id, candidate.center_lat, candidate.center_lon)
            .await
        {
            tracing::debug!(user_id, area_id = area.id, "Visit falls inside area");
            return Ok(Resolution::Area(area));
        }

        Ok(Resolution::Place(
            self.resolve_place(
                user_id,
                candidate.center_lat,
                candidate.center_lon,
                candidate.suggested_name.as_deref(),
                &candidate.points,
            )
            .await?,
        ))
    }

    /// Closest of the user's areas containing the coordinate.
    pub async fn find_area(&self, user_id: u64, latitude: f64, longitude: f64) -> Option<Area> {
        self.db
            .areas_for_user(user_id)
            .await
            .into_iter()
            .filter(|area| area.contains(latitude, longitude))
            .min_by(|a, b| {
                a.distance_to(latitude, longitude)
                    .total_cmp(&b.distance_to(latitude, longitude))
            })
    }

    /// Gather candidate places for a visit center.
    pub async fn resolve_place(
        &self,
        user_id: u64,
        latitude: f64,
        longitude: f64,
        suggested_name: Option<&str>,
        points: &[Point],
    ) -> Result<PlaceResolution> {
        let mut collected = Collected::default();

        // 1. Existing places, closest first
        let existing = self
            .db
            .places_near(
                user_id,
                latitude,
                longitude,
                self.settings.place_search_radius_meters,
            )
            .await;
        let closest_existing = existing.first().map(|(place, _)| place.clone());
        for (place, _) in existing {
            collected.push(place, false);
        }

        // 2. Points of interest from the points' own geodata
        for poi in embedded_pois(points) {
            if collected.has_coordinates(poi.latitude, poi.longitude) {
                continue;
            }
            let Some(name) = poi.name.clone() else {
                continue;
            };
            let mut place = Place::new(
                Some(user_id),
                name,
                poi.latitude,
                poi.longitude,
                PlaceSource::ReverseGeocoded,
            );
            place.geodata = Some(poi.feature);
            let (place, created) = self.store(place).await;
            collected.push(place, created);
        }

        // 3. Reverse geocoding search
        if let Some(geocoder) = &self.geocoder {
            match geocoder.search(latitude, longitude).await {
                Ok(results) => {
                    for result in results {
                        let mut place = Place::new(
                            Some(user_id),
                            result.display_name(),
                            result.latitude,
                            result.longitude,
                            PlaceSource::Photon,
                        );
                        place.geodata = Some(result.feature);
                        let (place, created) = self.store(place).await;
                        collected.push(place, created);
                    }
                }
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Geocoder search failed, continuing");
                }
            }
        }

        // 4. Manual fallback
        if collected.places.is_empty() {
            let name = suggested_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_PLACE_NAME);
            let place = Place::new(Some(user_id), name, latitude, longitude, PlaceSource::Manual);
            let (place, created) = self.store(place).await;
            collected.push(place, created);
        }

        let main_place = match closest_existing {
            Some(place) => place,
            None => collected
                .places
                .iter()
                .min_by(|a, b| {
                    a.distance_to(latitude, longitude)
                        .total_cmp(&b.distance_to(latitude, longitude))
                })
                .cloned()
                .ok_or_else(|| {
                    crate::error::AppError::Internal(anyhow::anyhow!("No place resolved"))
                })?,
        };

        tracing::debug!(
            user_id,
            main_place_id = main_place.id,
            suggestions = collected.places.len(),
            created = collected.created.len(),
            "Resolved place"
        );

        Ok(PlaceResolution {
            main_place,
            suggested_places: collected.places,
            created_places: collected.created,
        })
    }

    async fn store(&self, place: Place) -> (Place, bool) {
        self.db
            .find_or_create_place(place, self.settings.place_dedupe_radius_meters)
            .await
    }
}

/// Named point features found in the points' geodata, in point order.
fn embedded_pois(points: &[Point]) -> Vec<GeocodeResult> {
    points
        .iter()
        .filter_map(|p| p.geodata.as_ref())
        .filter_map(GeocodeResult::from_feature)
        .filter(|poi| poi.name.is_some())
        .collect()
}
