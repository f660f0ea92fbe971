// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod clusterer;
pub mod detection;
pub mod extractor;
pub mod fallback;
pub mod geocoder;
pub mod jobs;
pub mod merger;
pub mod names;
pub mod notifications;
pub mod place_resolver;
pub mod time_chunker;
pub mod visit_actions;

pub use clusterer::{ClusterError, DensityAwareClusterer};
pub use detection::VisitDetector;
pub use extractor::ClusterExtractor;
pub use fallback::FallbackGrouper;
pub use geocoder::{GeocodeError, GeocodeResult, Geocoder, PhotonClient};
pub use jobs::{ChannelJobQueue, Job, JobQueue, ReverseGeocodeWorker};
pub use merger::VisitMerger;
pub use names::{GeodataNameSuggester, NameSuggester};
pub use notifications::NotificationSink;
pub use place_resolver::{PlaceResolution, PlaceResolver, Resolution};
pub use visit_actions::{BulkUpdateResult, VisitActionError};
