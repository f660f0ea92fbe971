// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reverse geocoding.
//!
//! Handles:
//! - The `Geocoder` seam used by place resolution and the reverse geocoding job
//! - A Photon (`/reverse`) HTTP client
//! - Conversion of GeoJSON features into named results

use crate::models::DEFAULT_PLACE_NAME;
use async_trait::async_trait;
use geojson::{Feature, GeoJson, Value};

/// Results requested per reverse lookup.
const DEFAULT_RESULT_LIMIT: usize = 10;

/// One reverse geocoding hit.
#[derive(Debug, Clone)]
pub struct GeocodeResult {
    pub name: Option<String>,
    pub street: Option<String>,
    pub housenumber: Option<String>,
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// The raw feature, kept as place geodata
    pub feature: Feature,
}

impl GeocodeResult {
    /// Read a result out of a GeoJSON feature.
    ///
    /// Returns `None` unless the feature has a Point geometry.
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        let (longitude, latitude) = match &feature.geometry.as_ref()?.value {
            Value::Point(coords) if coords.len() >= 2 => (coords[0], coords[1]),
            _ => return None,
        };
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }

        Some(Self {
            name: text_property(feature, "name"),
            street: text_property(feature, "street"),
            housenumber: text_property(feature, "housenumber"),
            city: text_property(feature, "city"),
            latitude,
            longitude,
            feature: feature.clone(),
        })
    }

    /// Join `name, street, housenumber, city`, skipping blanks and values
    /// already included. Falls back to the default place name.
    pub fn display_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for component in [&self.name, &self.street, &self.housenumber, &self.city]
            .into_iter()
            .flatten()
        {
            if !parts.contains(&component.as_str()) {
                parts.push(component);
            }
        }

        if parts.is_empty() {
            DEFAULT_PLACE_NAME.to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Non-blank string property, trimmed.
fn text_property(feature: &Feature, key: &str) -> Option<String> {
    feature
        .property(key)?
        .as_str()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Errors from geocoding providers.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Geocoder request failed: {0}")]
    Request(String),

    #[error("Geocoder rate limit hit")]
    RateLimited,

    #[error("Geocoder returned HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Failed to parse geocoder response: {0}")]
    Parse(String),
}

/// Reverse geocoding provider.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Places at or near a coordinate, best match first.
    async fn search(&self, latitude: f64, longitude: f64)
        -> Result<Vec<GeocodeResult>, GeocodeError>;
}

/// Photon reverse geocoding client.
#[derive(Clone)]
pub struct PhotonClient {
    http: reqwest::Client,
    base_url: String,
    limit: usize,
}

impl PhotonClient {
    /// Create a client for a Photon instance, e.g. `https://photon.komoot.io`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limit: DEFAULT_RESULT_LIMIT,
        }
    }
}

#[async_trait]
impl Geocoder for PhotonClient {
    async fn search(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<GeocodeResult>, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("limit", self.limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                tracing::warn!("Photon rate limit hit (429)");
                return Err(GeocodeError::RateLimited);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Status(status.as_u16(), body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;
        parse_feature_collection(&body)
    }
}

/// Parse a GeoJSON FeatureCollection into results, skipping features
/// without a point geometry.
pub fn parse_feature_collection(body: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
    let geojson: GeoJson = body
        .parse()
        .map_err(|e: geojson::Error| GeocodeError::Parse(e.to_string()))?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection
            .features
            .iter()
            .filter_map(GeocodeResult::from_feature)
            .collect()),
        GeoJson::Feature(feature) => Ok(GeocodeResult::from_feature(&feature).into_iter().collect()),
        GeoJson::Geometry(_) => Err(GeocodeError::Parse(
            "expected a FeatureCollection".to_string(),
        )),
    }
}
