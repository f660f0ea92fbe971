// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geographic helpers shared by the detection pipeline.
//!
//! All coordinates are WGS84 degrees; all distances are meters along the
//! Earth's surface.

use geo::{Distance, Haversine, Point};

/// Great-circle distance between two coordinates.
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Haversine.distance(Point::new(lon1, lat1), Point::new(lon2, lat2))
}

/// Sum of great-circle distances between consecutive coordinates.
pub fn path_length(coords: &[(f64, f64)]) -> f64 {
    coords
        .windows(2)
        .map(|w| haversine_distance(w[0].0, w[0].1, w[1].0, w[1].1))
        .sum()
}

/// Centroid weight for a point with the given reported accuracy.
///
/// Smaller error radius means larger weight. Accuracies below 1m are clamped
/// so a bogus zero does not dominate.
pub fn accuracy_weight(accuracy: Option<f64>, default_accuracy: f64, exponent: f64) -> f64 {
    let accuracy = accuracy
        .filter(|a| a.is_finite() && *a > 0.0)
        .unwrap_or(default_accuracy)
        .max(1.0);
    1.0 / accuracy.powf(exponent)
}

/// Weighted centroid of `(latitude, longitude, weight)` samples.
///
/// Averages on the unit sphere so clusters straddling the antimeridian or
/// sitting near a pole still get a sensible center. Returns `None` for empty
/// input or when all weights are zero.
pub fn weighted_centroid(samples: &[(f64, f64, f64)]) -> Option<(f64, f64)> {
    let (mut x, mut y, mut z, mut total) = (0.0, 0.0, 0.0, 0.0);

    for &(lat, lon, weight) in samples {
        let (lat, lon) = (lat.to_radians(), lon.to_radians());
        x += weight * lat.cos() * lon.cos();
        y += weight * lat.cos() * lon.sin();
        z += weight * lat.sin();
        total += weight;
    }

    if total <= 0.0 {
        return None;
    }

    let (x, y, z) = (x / total, y / total, z / total);
    let hyp = (x * x + y * y).sqrt();
    if hyp == 0.0 && z == 0.0 {
        // Antipodal samples cancel out; no meaningful center.
        return None;
    }

    Some((z.atan2(hyp).to_degrees(), y.atan2(x).to_degrees()))
}

/// Largest distance from a center to any of the coordinates.
pub fn max_distance_from(center: (f64, f64), coords: &[(f64, f64)]) -> f64 {
    coords
        .iter()
        .map(|&(lat, lon)| haversine_distance(center.0, center.1, lat, lon))
        .fold(0.0, f64::max)
}

/// Linear interpolation between two coordinates; `fraction` in [0, 1].
///
/// Only used across short gaps (hundreds of meters), where the straight line in
/// degrees is indistinguishable from the great circle.
pub fn interpolate(from: (f64, f64), to: (f64, f64), fraction: f64) -> (f64, f64) {
    (
        from.0 + (to.0 - from.0) * fraction,
        from.1 + (to.1 - from.1) * fraction,
    )
}
