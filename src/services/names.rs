// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visit name suggestions from reverse-geocode data embedded in points.

use crate::models::Point;
use std::collections::HashMap;

/// Suggests a human-readable name for a group of points.
pub trait NameSuggester: Send + Sync {
    fn suggest(&self, points: &[Point]) -> Option<String>;
}

/// Picks the most frequent feature `name` among the points' geodata.
///
/// Ties go to the name seen first. Blank names are ignored.
#[derive(Debug, Default, Clone)]
pub struct GeodataNameSuggester;

impl NameSuggester for GeodataNameSuggester {
    fn suggest(&self, points: &[Point]) -> Option<String> {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

        for (order, name) in points.iter().filter_map(feature_name).enumerate() {
            let entry = counts.entry(name).or_insert((0, order));
            entry.0 += 1;
        }

        counts
            .into_iter()
            .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then_with(|| b.1 .1.cmp(&a.1 .1)))
            .map(|(name, _)| name.to_string())
    }
}

fn feature_name(point: &Point) -> Option<&str> {
    point
        .geodata
        .as_ref()?
        .property("name")?
        .as_str()
        .map(str::trim)
        .filter(|name| !name.is_empty())
}
