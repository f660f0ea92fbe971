// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visit detection pipeline.
//!
//! For a user and time range:
//! 1. Split the range into calendar-year chunks
//! 2. Cluster each chunk's unvisited points and extract candidates, falling
//!    back to simple grouping when clustering is unavailable
//! 3. Merge adjacent candidates and drop short ones
//! 4. Anchor each candidate to an area or place and persist it as a
//!    suggested visit
//! 5. Notify the user and queue reverse geocoding for new places

use crate::db::{MemoryDb, PointStore};
use crate::error::Result;
use crate::models::{duration_minutes, Anchor, Place, Visit, VisitCandidate, VisitSettings, VisitStatus};
use crate::services::clusterer::{ClusterError, DensityAwareClusterer};
use crate::services::extractor::ClusterExtractor;
use crate::services::fallback::FallbackGrouper;
use crate::services::geocoder::Geocoder;
use crate::services::jobs::{enqueue_all, Job, JobQueue};
use crate::services::merger::VisitMerger;
use crate::services::names::{GeodataNameSuggester, NameSuggester};
use crate::services::notifications::{visits_found_message, NotificationSink};
use crate::services::place_resolver::{PlaceResolver, Resolution};
use crate::services::time_chunker::{year_chunks, TimeChunk};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared per-user detection locks.
pub type DetectionLocks = Arc<DashMap<u64, Arc<Mutex<()>>>>;

const NOTIFICATION_TITLE: &str = "New visits detected";

/// Runs visit detection for one user at a time per user.
///
/// Two detections for the same user are serialized so a point is never
/// claimed by two visits; different users proceed concurrently.
#[derive(Clone)]
pub struct VisitDetector {
    db: MemoryDb,
    points: Arc<dyn PointStore>,
    names: Arc<dyn NameSuggester>,
    geocoder: Option<Arc<dyn Geocoder>>,
    notifier: Arc<dyn NotificationSink>,
    jobs: Arc<dyn JobQueue>,
    default_settings: VisitSettings,
    reverse_geocoding_enabled: bool,
    locks: DetectionLocks,
}

impl VisitDetector {
    /// Create a detector reading points from and notifying through `db`.
    pub fn new(db: MemoryDb, jobs: Arc<dyn JobQueue>, default_settings: VisitSettings) -> Self {
        Self {
            points: Arc::new(db.clone()),
            notifier: Arc::new(db.clone()),
            db,
            names: Arc::new(GeodataNameSuggester),
            geocoder: None,
            jobs,
            default_settings,
            reverse_geocoding_enabled: false,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Read clustering input from a different point store.
    pub fn with_point_store(mut self, points: Arc<dyn PointStore>) -> Self {
        self.points = points;
        self
    }

    pub fn with_name_suggester(mut self, names: Arc<dyn NameSuggester>) -> Self {
        self.names = names;
        self
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Queue reverse geocoding for places created during detection.
    pub fn with_reverse_geocoding(mut self, enabled: bool) -> Self {
        self.reverse_geocoding_enabled = enabled;
        self
    }

    /// Settings for a user: stored overrides, else the defaults.
    pub async fn settings_for(&self, user_id: u64) -> VisitSettings {
        self.db
            .user_settings(user_id)
            .await
            .unwrap_or_else(|| self.default_settings.clone())
    }

    /// Detect and persist visits in `[start, end]`.
    ///
    /// Returns the visits created by this run.
    pub async fn detect_visits(
        &self,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Visit>> {
        let settings = self.settings_for(user_id).await;

        let lock = self
            .locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        tracing::info!(
            user_id,
            start = %start,
            end = %end,
            density_normalization = settings.density_normalization,
            "Detecting visits"
        );

        let mut candidates = Vec::new();
        for chunk in year_chunks(start, end) {
            candidates.extend(self.candidates_for_chunk(user_id, &chunk, &settings).await?);
        }

        let merger = VisitMerger::new(self.points.clone(), settings.clone());
        let min_duration = settings.min_visit_duration();
        let candidates: Vec<VisitCandidate> = merger
            .merge(user_id, candidates)
            .await?
            .into_iter()
            .filter(|c| c.duration >= min_duration)
            .collect();

        let resolver = PlaceResolver::new(self.db.clone(), self.geocoder.clone(), settings.clone());
        let mut visits = Vec::with_capacity(candidates.len());
        let mut new_places: Vec<Place> = Vec::new();
        for candidate in &candidates {
            let (anchor, name, created_places) = match resolver.resolve(user_id, candidate).await? {
                Resolution::Area(area) => (Anchor::Area(area.id), area.name, Vec::new()),
                Resolution::Place(resolution) => (
                    Anchor::Place(resolution.main_place.id),
                    resolution.main_place.name,
                    resolution.created_places,
                ),
            };

            let Some(visit) = self.create_visit(user_id, candidate, anchor, name).await? else {
                continue;
            };
            visits.push(visit);
            for place in created_places {
                if !new_places.iter().any(|p| p.id == place.id) {
                    new_places.push(place);
                }
            }
        }

        tracing::info!(
            user_id,
            candidates = candidates.len(),
            visits = visits.len(),
            new_places = new_places.len(),
            "Visit detection complete"
        );

        if !visits.is_empty() {
            let message = visits_found_message(visits.len());
            if let Err(e) = self.notifier.notify(user_id, NOTIFICATION_TITLE, &message).await {
                tracing::warn!(user_id, error = %e, "Failed to send visit notification");
            }
        }

        if self.reverse_geocoding_enabled && !new_places.is_empty() {
            let jobs = new_places
                .iter()
                .map(|place| Job::ReverseGeocodePlace { place_id: place.id })
                .collect();
            let result = enqueue_all(self.jobs.as_ref(), jobs).await;
            if !result.is_complete_success() {
                tracing::warn!(
                    user_id,
                    queued = result.queued,
                    failed = result.failed,
                    "Some reverse geocoding jobs were not queued"
                );
            }
        }

        Ok(visits)
    }

    /// Candidates for one chunk, via clustering or the fallback grouper.
    async fn candidates_for_chunk(
        &self,
        user_id: u64,
        chunk: &TimeChunk,
        settings: &VisitSettings,
    ) -> Result<Vec<VisitCandidate>> {
        let extractor =
            ClusterExtractor::new(self.points.clone(), self.names.clone(), settings.clone());

        let clustered = match DensityAwareClusterer::new(self.points.clone(), settings.clone())
            .cluster(user_id, chunk.start, chunk.end)
            .await
        {
            Ok(clusters) => extractor.extract(user_id, &clusters).await,
            Err(e) => Err(e),
        };

        match clustered {
            Ok(candidates) => Ok(candidates),
            Err(ClusterError::Unavailable(reason)) => {
                tracing::warn!(
                    user_id,
                    chunk_start = %chunk.start,
                    reason = %reason,
                    "Clustering unavailable, using fallback grouping"
                );
                let points = self.db.unvisited_points(user_id, chunk.start, chunk.end).await?;
                Ok(FallbackGrouper::new(settings.clone())
                    .group(points)
                    .into_iter()
                    .filter_map(|group| extractor.candidate_from_points(group))
                    .collect())
            }
        }
    }

    async fn create_visit(
        &self,
        user_id: u64,
        candidate: &VisitCandidate,
        anchor: Anchor,
        name: String,
    ) -> Result<Option<Visit>> {
        let visit = Visit {
            id: 0,
            user_id,
            started_at: candidate.start_time,
            ended_at: candidate.end_time,
            duration: duration_minutes(candidate.start_time, candidate.end_time),
            name,
            status: VisitStatus::Suggested,
            anchor,
        };
        let point_ids: Vec<u64> = candidate.points.iter().map(|p| p.id).collect();

        let created = self.db.create_visit_with_points(visit, &point_ids).await?;
        if created.is_none() {
            tracing::debug!(
                user_id,
                start = %candidate.start_time,
                "Candidate points already claimed, skipping visit"
            );
        }
        Ok(created)
    }
}
