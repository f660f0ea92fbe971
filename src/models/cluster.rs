// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transient clustering output.

use chrono::{DateTime, Utc};

/// One member of a spatial-temporal cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterMember {
    /// A stored point.
    Real(u64),
    /// An interpolated point bridging a GPS silence. Never persisted.
    Synthetic {
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    },
}

impl ClusterMember {
    /// Point ID for real members.
    pub fn point_id(&self) -> Option<u64> {
        match self {
            ClusterMember::Real(id) => Some(*id),
            ClusterMember::Synthetic { .. } => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, ClusterMember::Synthetic { .. })
    }
}

/// A group of points that are close in both space and time.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub members: Vec<ClusterMember>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Number of members, synthetic ones included
    pub point_count: usize,
}

impl Cluster {
    /// IDs of the real points in this cluster.
    pub fn real_point_ids(&self) -> Vec<u64> {
        self.members.iter().filter_map(ClusterMember::point_id).collect()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }
}
