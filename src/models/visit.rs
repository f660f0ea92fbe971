// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visit model and the candidates it is built from.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::Point;

/// Review state of a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Suggested,
    Confirmed,
    Declined,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Suggested => "suggested",
            VisitStatus::Confirmed => "confirmed",
            VisitStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown visit status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for VisitStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suggested" => Ok(VisitStatus::Suggested),
            "confirmed" => Ok(VisitStatus::Confirmed),
            "declined" => Ok(VisitStatus::Declined),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// What a visit is attached to. A visit has at most one anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Anchor {
    Area(u64),
    Place(u64),
    None,
}

/// A stay at one location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub id: u64,
    pub user_id: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Duration in minutes
    pub duration: i64,
    pub name: String,
    pub status: VisitStatus,
    pub anchor: Anchor,
}

impl Visit {
    /// Check the record is consistent before it is written.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name can't be blank".to_string());
        }
        if self.ended_at < self.started_at {
            return Err("Ended at must be after started at".to_string());
        }
        if self.duration < 0 {
            return Err("Duration must be greater than or equal to 0".to_string());
        }
        Ok(())
    }
}

/// Duration in whole minutes between two instants.
pub fn duration_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> i64 {
    (ended_at - started_at).num_minutes()
}

/// A visit reconstructed from points but not yet persisted.
#[derive(Debug, Clone)]
pub struct VisitCandidate {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: Duration,
    pub center_lat: f64,
    pub center_lon: f64,
    /// Spread of the points around the center, in meters
    pub radius: f64,
    pub suggested_name: Option<String>,
    /// Real points, sorted by timestamp
    pub points: Vec<Point>,
}
