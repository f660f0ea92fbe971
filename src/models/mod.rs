// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod area;
pub mod cluster;
pub mod notification;
pub mod place;
pub mod point;
pub mod settings;
pub mod visit;

pub use area::Area;
pub use cluster::{Cluster, ClusterMember};
pub use notification::{Notification, NotificationKind};
pub use place::{Place, PlaceSource, DEFAULT_PLACE_NAME};
pub use point::Point;
pub use settings::VisitSettings;
pub use visit::{duration_minutes, Anchor, Visit, VisitCandidate, VisitStatus};
