// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use visit_tracker::config::Config;
use visit_tracker::db::{MemoryDb, PointStore};
use visit_tracker::error::AppError;
use visit_tracker::models::Point;
use visit_tracker::routes::create_router;
use visit_tracker::services::geocoder::parse_feature_collection;
use visit_tracker::services::{GeocodeError, GeocodeResult, Geocoder, Job, JobQueue, VisitDetector};
use visit_tracker::AppState;

/// A fixed UTC instant.
#[allow(dead_code)]
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid test timestamp")
}

/// `count` points for `user_id` at one spot, `every_minutes` apart.
#[allow(dead_code)]
pub fn points_at(
    user_id: u64,
    start: DateTime<Utc>,
    count: usize,
    every_minutes: i64,
    latitude: f64,
    longitude: f64,
) -> Vec<Point> {
    (0..count)
        .map(|i| {
            Point::new(
                user_id,
                start + Duration::minutes(every_minutes * i as i64),
                latitude,
                longitude,
            )
        })
        .collect()
}

/// Point store whose range query always fails, as if the index were down.
/// ID lookups and gap queries still work.
#[allow(dead_code)]
pub struct UnavailablePointStore {
    pub db: MemoryDb,
}

#[async_trait]
impl PointStore for UnavailablePointStore {
    async fn unvisited_points(
        &self,
        _user_id: u64,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<Point>, AppError> {
        Err(AppError::Internal(anyhow::anyhow!("point index unavailable")))
    }

    async fn points_by_ids(&self, user_id: u64, ids: &[u64]) -> Result<Vec<Point>, AppError> {
        self.db.points_by_ids(user_id, ids).await
    }

    async fn points_between(
        &self,
        user_id: u64,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Point>, AppError> {
        self.db.points_between(user_id, after, before).await
    }
}

/// Geocoder answering every search with the same features.
#[allow(dead_code)]
pub struct FakeGeocoder {
    body: String,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeGeocoder {
    /// Answer with one named point feature.
    pub fn named(name: &str, latitude: f64, longitude: f64) -> Self {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [longitude, latitude]},
                "properties": {"name": name}
            }]
        });
        Self {
            body: body.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn search(&self, _: f64, _: f64) -> Result<Vec<GeocodeResult>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        parse_feature_collection(&self.body)
    }
}

/// Job queue that remembers what was enqueued.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingJobQueue {
    pub jobs: Mutex<Vec<Job>>,
}

#[async_trait]
impl JobQueue for RecordingJobQueue {
    async fn enqueue(&self, job: Job) -> Result<(), AppError> {
        self.jobs.lock().await.push(job);
        Ok(())
    }
}

/// Create a test app backed by an empty in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let db = MemoryDb::new();
    let detector = VisitDetector::new(
        db.clone(),
        Arc::new(RecordingJobQueue::default()),
        config.visit_settings.clone(),
    );

    let state = Arc::new(AppState {
        config,
        db,
        detector,
    });

    (create_router(state.clone()), state)
}
