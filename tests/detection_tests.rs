// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end visit detection.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use visit_tracker::db::{MemoryDb, PointStore};
use visit_tracker::error::AppError;
use visit_tracker::models::{Anchor, Area, Point, Visit, VisitSettings, VisitStatus};
use visit_tracker::services::{Job, VisitDetector};

mod common;
use common::{points_at, utc, FakeGeocoder, RecordingJobQueue, UnavailablePointStore};

const OFFICE: (f64, f64) = (51.5074, -0.1278);
const GYM: (f64, f64) = (51.5155, -0.1278);

async fn seed_day(db: &MemoryDb, user_id: u64) {
    // Morning at the office, evening at the gym
    db.insert_points(points_at(user_id, utc(2024, 11, 4, 9, 0), 13, 10, OFFICE.0, OFFICE.1))
        .await;
    db.insert_points(points_at(user_id, utc(2024, 11, 4, 18, 0), 7, 10, GYM.0, GYM.1))
        .await;
}

fn detector(db: &MemoryDb, jobs: Arc<RecordingJobQueue>) -> VisitDetector {
    VisitDetector::new(db.clone(), jobs, VisitSettings::default())
}

#[tokio::test]
async fn test_detects_visits_and_claims_points() {
    let db = MemoryDb::new();
    seed_day(&db, 1).await;
    let jobs = Arc::new(RecordingJobQueue::default());

    let visits = detector(&db, jobs)
        .detect_visits(1, utc(2024, 11, 4, 0, 0), utc(2024, 11, 5, 0, 0))
        .await
        .unwrap();

    assert_eq!(visits.len(), 2);
    assert_eq!(visits[0].started_at, utc(2024, 11, 4, 9, 0));
    assert_eq!(visits[0].ended_at, utc(2024, 11, 4, 11, 0));
    assert_eq!(visits[0].duration, 120);
    assert_eq!(visits[1].duration, 60);
    for visit in &visits {
        assert_eq!(visit.status, VisitStatus::Suggested);
        assert!(matches!(visit.anchor, Anchor::Place(_)));
    }
    assert_eq!(db.points_for_visit(visits[0].id).await.len(), 13);
    assert_eq!(db.points_for_visit(visits[1].id).await.len(), 7);

    let notifications = db.notifications_for_user(1).await;
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].content.starts_with("Found 2 new visits"));
}

#[tokio::test]
async fn test_second_run_finds_nothing_new() {
    let db = MemoryDb::new();
    seed_day(&db, 1).await;
    let detector = detector(&db, Arc::new(RecordingJobQueue::default()));
    let (start, end) = (utc(2024, 11, 4, 0, 0), utc(2024, 11, 5, 0, 0));

    assert_eq!(detector.detect_visits(1, start, end).await.unwrap().len(), 2);
    assert!(detector.detect_visits(1, start, end).await.unwrap().is_empty());
    assert_eq!(db.visits_for_user(1).await.len(), 2);
    assert_eq!(db.notifications_for_user(1).await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_runs_do_not_double_claim() {
    let db = MemoryDb::new();
    seed_day(&db, 1).await;
    let detector = detector(&db, Arc::new(RecordingJobQueue::default()));
    let (start, end) = (utc(2024, 11, 4, 0, 0), utc(2024, 11, 5, 0, 0));

    let (a, b) = tokio::join!(
        detector.detect_visits(1, start, end),
        detector.detect_visits(1, start, end)
    );
    assert_eq!(a.unwrap().len() + b.unwrap().len(), 2);
    assert_eq!(db.visits_for_user(1).await.len(), 2);
}

#[tokio::test]
async fn test_area_anchors_visit() {
    let db = MemoryDb::new();
    seed_day(&db, 1).await;
    let office = db
        .insert_area(Area {
            id: 0,
            user_id: 1,
            name: "Office".to_string(),
            latitude: OFFICE.0,
            longitude: OFFICE.1,
            radius: 150.0,
        })
        .await;

    let visits = detector(&db, Arc::new(RecordingJobQueue::default()))
        .detect_visits(1, utc(2024, 11, 4, 0, 0), utc(2024, 11, 5, 0, 0))
        .await
        .unwrap();

    assert_eq!(visits[0].anchor, Anchor::Area(office.id));
    assert_eq!(visits[0].name, "Office");
    assert!(matches!(visits[1].anchor, Anchor::Place(_)));
}

#[tokio::test]
async fn test_short_stays_are_dropped() {
    let db = MemoryDb::new();
    db.insert_points(points_at(1, utc(2024, 11, 4, 9, 0), 3, 1, OFFICE.0, OFFICE.1))
        .await;

    let visits = detector(&db, Arc::new(RecordingJobQueue::default()))
        .detect_visits(1, utc(2024, 11, 4, 0, 0), utc(2024, 11, 5, 0, 0))
        .await
        .unwrap();

    assert!(visits.is_empty());
    assert!(db.notifications_for_user(1).await.is_empty());
}

#[tokio::test]
async fn test_falls_back_when_clustering_unavailable() {
    let db = MemoryDb::new();
    seed_day(&db, 1).await;
    let detector = detector(&db, Arc::new(RecordingJobQueue::default()))
        .with_point_store(Arc::new(UnavailablePointStore { db: db.clone() }));

    let visits = detector
        .detect_visits(1, utc(2024, 11, 4, 0, 0), utc(2024, 11, 5, 0, 0))
        .await
        .unwrap();

    assert_eq!(visits.len(), 2);
    assert_eq!(visits[0].started_at, utc(2024, 11, 4, 9, 0));
    assert_eq!(visits[1].started_at, utc(2024, 11, 4, 18, 0));
}

#[tokio::test]
async fn test_reverse_geocoding_jobs_for_new_places() {
    let db = MemoryDb::new();
    seed_day(&db, 1).await;
    let jobs = Arc::new(RecordingJobQueue::default());
    let geocoder = Arc::new(FakeGeocoder::named("Somewhere", OFFICE.0, OFFICE.1 + 0.0002));

    let visits = detector(&db, jobs.clone())
        .with_geocoder(geocoder.clone())
        .with_reverse_geocoding(true)
        .detect_visits(1, utc(2024, 11, 4, 0, 0), utc(2024, 11, 5, 0, 0))
        .await
        .unwrap();

    assert_eq!(visits.len(), 2);
    assert_eq!(geocoder.call_count(), 2);
    assert_eq!(visits[0].name, "Somewhere");

    let queued = jobs.jobs.lock().await.clone();
    let places = db.places_count().await;
    assert_eq!(queued.len(), places);
    for job in &queued {
        let Job::ReverseGeocodePlace { place_id } = job;
        assert!(db.get_place(*place_id).await.is_some());
    }
}

#[tokio::test]
async fn test_no_jobs_when_reverse_geocoding_disabled() {
    let db = MemoryDb::new();
    seed_day(&db, 1).await;
    let jobs = Arc::new(RecordingJobQueue::default());

    detector(&db, jobs.clone())
        .detect_visits(1, utc(2024, 11, 4, 0, 0), utc(2024, 11, 5, 0, 0))
        .await
        .unwrap();

    assert!(jobs.jobs.lock().await.is_empty());
}

#[tokio::test]
async fn test_stored_settings_override_defaults() {
    let db = MemoryDb::new();
    seed_day(&db, 1).await;
    db.set_user_settings(
        1,
        VisitSettings {
            min_visit_duration_minutes: 90,
            ..Default::default()
        },
    )
    .await;

    let visits = detector(&db, Arc::new(RecordingJobQueue::default()))
        .detect_visits(1, utc(2024, 11, 4, 0, 0), utc(2024, 11, 5, 0, 0))
        .await
        .unwrap();

    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].ended_at - visits[0].started_at, Duration::minutes(120));
}

#[tokio::test]
async fn test_users_are_isolated() {
    let db = MemoryDb::new();
    seed_day(&db, 1).await;
    seed_day(&db, 2).await;
    let detector = detector(&db, Arc::new(RecordingJobQueue::default()));

    let visits = detector
        .detect_visits(1, utc(2024, 11, 4, 0, 0), utc(2024, 11, 5, 0, 0))
        .await
        .unwrap();

    assert_eq!(visits.len(), 2);
    assert!(db.visits_for_user(2).await.is_empty());
}

#[tokio::test]
async fn test_silent_gap_at_same_spot_is_one_visit_either_way() {
    // 15 points five minutes apart, silence for 40 minutes, then 3 more.
    // With normalization the clusterer bridges the silence; without it the
    // merger joins the two stays because nothing was recorded in between.
    for density_normalization in [true, false] {
        let db = MemoryDb::new();
        let start = utc(2024, 9, 2, 8, 0);
        db.insert_points(points_at(1, start, 15, 5, OFFICE.0, OFFICE.1))
            .await;
        db.insert_points(points_at(
            1,
            start + Duration::minutes(110),
            3,
            5,
            OFFICE.0 + 0.00001,
            OFFICE.1,
        ))
        .await;

        let settings = VisitSettings {
            density_normalization,
            ..Default::default()
        };
        let visits = VisitDetector::new(db.clone(), Arc::new(RecordingJobQueue::default()), settings)
            .detect_visits(1, utc(2024, 9, 2, 0, 0), utc(2024, 9, 3, 0, 0))
            .await
            .unwrap();

        assert_eq!(visits.len(), 1, "normalization {density_normalization}");
        assert_eq!(visits[0].started_at, start);
        assert_eq!(visits[0].ended_at, utc(2024, 9, 2, 10, 0));
        assert_eq!(db.points_for_visit(visits[0].id).await.len(), 18);
    }
}

/// Point index lagging behind the store: still lists points that another
/// visit has claimed.
struct StalePointStore {
    db: MemoryDb,
}

#[async_trait]
impl PointStore for StalePointStore {
    async fn unvisited_points(
        &self,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Point>, AppError> {
        let margin = Duration::milliseconds(1);
        self.db.points_between(user_id, start - margin, end + margin).await
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

#[tokio::test]
async fn test_no_jobs_for_places_of_skipped_visits() {
    let db = MemoryDb::new();
    let points = db
        .insert_points(points_at(1, utc(2024, 11, 4, 9, 0), 13, 10, OFFICE.0, OFFICE.1))
        .await;
    let ids: Vec<u64> = points.iter().map(|p| p.id).collect();
    let existing = Visit {
        id: 0,
        user_id: 1,
        started_at: utc(2024, 11, 4, 9, 0),
        ended_at: utc(2024, 11, 4, 11, 0),
        duration: 120,
        name: "Earlier run".to_string(),
        status: VisitStatus::Confirmed,
        anchor: Anchor::None,
    };
    db.create_visit_with_points(existing, &ids).await.unwrap().unwrap();

    let jobs = Arc::new(RecordingJobQueue::default());
    let visits = detector(&db, jobs.clone())
        .with_point_store(Arc::new(StalePointStore { db: db.clone() }))
        .with_reverse_geocoding(true)
        .detect_visits(1, utc(2024, 11, 4, 0, 0), utc(2024, 11, 5, 0, 0))
        .await
        .unwrap();

    assert!(visits.is_empty());
    assert!(jobs.jobs.lock().await.is_empty());
    assert!(db.notifications_for_user(1).await.is_empty());
}
