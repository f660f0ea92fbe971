// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store with typed operations.
//!
//! Provides high-level operations for:
//! - Points (read-only apart from their visit reference)
//! - Visits (creation, manual merge, status updates)
//! - Places (deduplicated creation)
//! - Areas, notifications and per-user settings
//!
//! Every multi-record write happens under a single write lock, so readers
//! never observe a half-applied change.

use crate::db::PointStore;
use crate::error::AppError;
use crate::models::{
    Area, Notification, NotificationKind, Place, Point, Visit, VisitSettings, VisitStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Places within this many degrees are treated as the same coordinates.
const SAME_COORDINATE_EPSILON: f64 = 1e-6;

#[derive(Default)]
struct Tables {
    next_id: u64,
    points: BTreeMap<u64, Point>,
    visits: BTreeMap<u64, Visit>,
    places: BTreeMap<u64, Place>,
    areas: BTreeMap<u64, Area>,
    notifications: Vec<Notification>,
    settings: HashMap<u64, VisitSettings>,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared in-memory database handle. Cloning is cheap.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Point Operations ────────────────────────────────────────

    /// Store a point, assigning it a fresh ID.
    pub async fn insert_point(&self, mut point: Point) -> Point {
        let mut tables = self.tables.write().await;
        point.id = tables.allocate_id();
        tables.points.insert(point.id, point.clone());
        point
    }

    /// Store several points, preserving input order in the result.
    pub async fn insert_points(&self, points: Vec<Point>) -> Vec<Point> {
        let mut tables = self.tables.write().await;
        points
            .into_iter()
            .map(|mut point| {
                point.id = tables.allocate_id();
                tables.points.insert(point.id, point.clone());
                point
            })
            .collect()
    }

    pub async fn get_point(&self, point_id: u64) -> Option<Point> {
        self.tables.read().await.points.get(&point_id).cloned()
    }

    /// Points attached to a visit, sorted by timestamp.
    pub async fn points_for_visit(&self, visit_id: u64) -> Vec<Point> {
        let tables = self.tables.read().await;
        let mut points: Vec<Point> = tables
            .points
            .values()
            .filter(|p| p.visit_id == Some(visit_id))
            .cloned()
            .collect();
        points.sort_by_key(|p| p.timestamp);
        points
    }

    // ─── Area Operations ─────────────────────────────────────────

    pub async fn insert_area(&self, mut area: Area) -> Area {
        let mut tables = self.tables.write().await;
        area.id = tables.allocate_id();
        tables.areas.insert(area.id, area.clone());
        area
    }

    pub async fn areas_for_user(&self, user_id: u64) -> Vec<Area> {
        self.tables
            .read()
            .await
            .areas
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    // ─── Place Operations ────────────────────────────────────────

    pub async fn get_place(&self, place_id: u64) -> Option<Place> {
        self.tables.read().await.places.get(&place_id).cloned()
    }

    pub async fn places_count(&self) -> usize {
        self.tables.read().await.places.len()
    }

    /// Places visible to a user within `radius` meters of a coordinate,
    /// closest first, paired with their distance.
    pub async fn places_near(
        &self,
        user_id: u64,
        latitude: f64,
        longitude: f64,
        radius: f64,
    ) -> Vec<(Place, f64)> {
        let tables = self.tables.read().await;
        let mut found: Vec<(Place, f64)> = tables
            .places
            .values()
            .filter(|p| p.visible_to(user_id))
            .map(|p| (p.clone(), p.distance_to(latitude, longitude)))
            .filter(|(_, distance)| *distance <= radius)
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found
    }

    /// Insert a place unless an equivalent one already exists.
    ///
    /// A place is equivalent when it is visible to the same owner and either
    /// sits at the same coordinates or has the same name within
    /// `dedupe_radius` meters. Returns the stored place and whether it was
    /// newly created. The check and the insert happen under one lock, so
    /// concurrent resolvers converge on a single record.
    pub async fn find_or_create_place(&self, mut place: Place, dedupe_radius: f64) -> (Place, bool) {
        let mut tables = self.tables.write().await;

        let owner = place.user_id;
        let existing = tables.places.values().find(|p| {
            let same_scope = p.user_id.is_none() || p.user_id == owner;
            let same_coordinates = (p.latitude - place.latitude).abs() < SAME_COORDINATE_EPSILON
                && (p.longitude - place.longitude).abs() < SAME_COORDINATE_EPSILON;
            let same_name_nearby = p.name == place.name
                && p.distance_to(place.latitude, place.longitude) <= dedupe_radius;
            same_scope && (same_coordinates || same_name_nearby)
        });

        if let Some(existing) = existing {
            return (existing.clone(), false);
        }

        place.id = tables.allocate_id();
        tables.places.insert(place.id, place.clone());
        (place, true)
    }

    /// Overwrite a stored place.
    pub async fn update_place(&self, place: &Place) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        match tables.places.get_mut(&place.id) {
            Some(stored) => {
                *stored = place.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Place {} not found", place.id))),
        }
    }

    // ─── Visit Operations ────────────────────────────────────────

    /// Create a visit and attach the given points to it.
    ///
    /// Only points owned by the visit's user and still unattached are
    /// claimed. If none can be claimed the visit is not created and `None`
    /// is returned, so a visit never ends up without points.
    pub async fn create_visit_with_points(
        &self,
        mut visit: Visit,
        point_ids: &[u64],
    ) -> Result<Option<Visit>, AppError> {
        visit.validate().map_err(AppError::BadRequest)?;

        let mut tables = self.tables.write().await;
        let claimable: Vec<u64> = point_ids
            .iter()
            .copied()
            .filter(|id| {
                tables
                    .points
                    .get(id)
                    .is_some_and(|p| p.user_id == visit.user_id && !p.is_visited())
            })
            .collect();

        if claimable.is_empty() {
            return Ok(None);
        }

        visit.id = tables.allocate_id();
        for id in &claimable {
            if let Some(point) = tables.points.get_mut(id) {
                point.visit_id = Some(visit.id);
            }
        }
        tables.visits.insert(visit.id, visit.clone());
        Ok(Some(visit))
    }

    pub async fn get_visit(&self, visit_id: u64) -> Option<Visit> {
        self.tables.read().await.visits.get(&visit_id).cloned()
    }

    /// All visits of a user, ordered by start time.
    pub async fn visits_for_user(&self, user_id: u64) -> Vec<Visit> {
        let tables = self.tables.read().await;
        let mut visits: Vec<Visit> = tables
            .visits
            .values()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        visits.sort_by_key(|v| v.started_at);
        visits
    }

    /// Visits with the given IDs that belong to `user_id`. Foreign and
    /// unknown IDs are skipped.
    pub async fn visits_by_ids(&self, user_id: u64, visit_ids: &[u64]) -> Vec<Visit> {
        let tables = self.tables.read().await;
        let unique: BTreeSet<u64> = visit_ids.iter().copied().collect();
        let mut visits: Vec<Visit> = unique
            .iter()
            .filter_map(|id| tables.visits.get(id))
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        visits.sort_by_key(|v| (v.started_at, v.id));
        visits
    }

    /// Fold `absorbed` visits into `base`: write the updated base, move every
    /// point of the absorbed visits onto it and delete them.
    ///
    /// The updated base is validated first; on failure nothing is written.
    pub async fn merge_visits_atomic(
        &self,
        base: &Visit,
        absorbed: &[u64],
    ) -> Result<Visit, AppError> {
        base.validate().map_err(AppError::BadRequest)?;

        let mut tables = self.tables.write().await;
        if !tables.visits.contains_key(&base.id) {
            return Err(AppError::NotFound(format!("Visit {} not found", base.id)));
        }
        if let Some(missing) = absorbed.iter().find(|id| !tables.visits.contains_key(id)) {
            return Err(AppError::NotFound(format!("Visit {} not found", missing)));
        }

        for point in tables.points.values_mut() {
            if point.visit_id.is_some_and(|id| absorbed.contains(&id)) {
                point.visit_id = Some(base.id);
            }
        }
        for id in absorbed {
            tables.visits.remove(id);
        }
        tables.visits.insert(base.id, base.clone());
        Ok(base.clone())
    }

    /// Set the status of the given visits owned by `user_id`; returns the
    /// updated visits.
    pub async fn update_visit_statuses(
        &self,
        user_id: u64,
        visit_ids: &[u64],
        status: VisitStatus,
    ) -> Vec<Visit> {
        let mut tables = self.tables.write().await;
        let mut updated = Vec::new();
        for id in visit_ids {
            if let Some(visit) = tables.visits.get_mut(id) {
                if visit.user_id == user_id && !updated.iter().any(|v: &Visit| v.id == *id) {
                    visit.status = status;
                    updated.push(visit.clone());
                }
            }
        }
        updated
    }

    // ─── Notification Operations ─────────────────────────────────

    pub async fn insert_notification(
        &self,
        user_id: u64,
        kind: NotificationKind,
        title: &str,
        content: &str,
    ) -> Notification {
        let mut tables = self.tables.write().await;
        let notification = Notification {
            id: tables.allocate_id(),
            user_id,
            kind,
            title: title.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        tables.notifications.push(notification.clone());
        notification
    }

    pub async fn notifications_for_user(&self, user_id: u64) -> Vec<Notification> {
        self.tables
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    // ─── Settings Operations ─────────────────────────────────────

    pub async fn user_settings(&self, user_id: u64) -> Option<VisitSettings> {
        self.tables.read().await.settings.get(&user_id).cloned()
    }

    pub async fn set_user_settings(&self, user_id: u64, settings: VisitSettings) {
        self.tables.write().await.settings.insert(user_id, settings);
    }
}

#[async_trait]
impl PointStore for MemoryDb {
    async fn unvisited_points(
        &self,
        user_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Point>, AppError> {
        let tables = self.tables.read().await;
        let mut points: Vec<Point> = tables
            .points
            .values()
            .filter(|p| {
                p.user_id == user_id
                    && !p.is_visited()
                    && p.timestamp >= start
                    && p.timestamp <= end
            })
            .cloned()
            .collect();
        points.sort_by_key(|p| (p.timestamp, p.id));
        Ok(points)
    }

    async fn points_by_ids(&self, user_id: u64, ids: &[u64]) -> Result<Vec<Point>, AppError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.points.get(id))
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn points_between(
        &self,
        user_id: u64,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Point>, AppError> {
        let tables = self.tables.read().await;
        let mut points: Vec<Point> = tables
            .points
            .values()
            .filter(|p| p.user_id == user_id && p.timestamp > after && p.timestamp < before)
            .cloned()
            .collect();
        points.sort_by_key(|p| (p.timestamp, p.id));
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Anchor, PlaceSource};
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
    }

    fn visit(user_id: u64) -> Visit {
        Visit {
            id: 0,
            user_id,
            started_at: at(0),
            ended_at: at(30),
            duration: 30,
            name: "Cafe".to_string(),
            status: VisitStatus::Suggested,
            anchor: Anchor::None,
        }
    }

    #[tokio::test]
    async fn test_unvisited_points_filters_user_range_and_visit() {
        let db = MemoryDb::new();
        let mine = db.insert_point(Point::new(1, at(5), 10.0, 10.0)).await;
        db.insert_point(Point::new(2, at(5), 10.0, 10.0)).await;
        db.insert_point(Point::new(1, at(50), 10.0, 10.0)).await;
        let mut claimed = Point::new(1, at(6), 10.0, 10.0);
        claimed.visit_id = Some(99);
        db.insert_point(claimed).await;

        let points = db.unvisited_points(1, at(0), at(30)).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, mine.id);
    }

    #[tokio::test]
    async fn test_points_between_is_strict() {
        let db = MemoryDb::new();
        db.insert_point(Point::new(1, at(0), 10.0, 10.0)).await;
        let inside = db.insert_point(Point::new(1, at(10), 10.0, 10.0)).await;
        db.insert_point(Point::new(1, at(20), 10.0, 10.0)).await;

        let points = db.points_between(1, at(0), at(20)).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, inside.id);
    }

    #[tokio::test]
    async fn test_find_or_create_place_reuses_same_name_nearby() {
        let db = MemoryDb::new();
        let place = Place::new(Some(1), "Cafe", 10.0, 10.0, PlaceSource::Manual);
        let (first, created) = db.find_or_create_place(place.clone(), 25.0).await;
        assert!(created);

        // ~11m away, same name
        let nearby = Place::new(Some(1), "Cafe", 10.0001, 10.0, PlaceSource::Manual);
        let (second, created) = db.find_or_create_place(nearby, 25.0).await;
        assert!(!created);
        assert_eq!(second.id, first.id);

        // Same name, far away
        let far = Place::new(Some(1), "Cafe", 10.01, 10.0, PlaceSource::Manual);
        let (_, created) = db.find_or_create_place(far, 25.0).await;
        assert!(created);
        assert_eq!(db.places_count().await, 2);
    }

    #[tokio::test]
    async fn test_find_or_create_place_concurrent_converges() {
        let db = MemoryDb::new();
        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let place = Place::new(None, "Station", 48.0, 11.0, PlaceSource::Photon);
                db.find_or_create_place(place, 25.0).await.0.id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(db.places_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_visit_claims_only_unvisited_owned_points() {
        let db = MemoryDb::new();
        let free = db.insert_point(Point::new(1, at(1), 10.0, 10.0)).await;
        let foreign = db.insert_point(Point::new(2, at(2), 10.0, 10.0)).await;

        let created = db
            .create_visit_with_points(visit(1), &[free.id, foreign.id])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(db.points_for_visit(created.id).await.len(), 1);
        assert_eq!(db.get_point(foreign.id).await.unwrap().visit_id, None);

        // Nothing left to claim for a second visit over the same point.
        let second = db
            .create_visit_with_points(visit(1), &[free.id])
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_merge_visits_atomic_rejects_invalid_base() {
        let db = MemoryDb::new();
        let p1 = db.insert_point(Point::new(1, at(1), 10.0, 10.0)).await;
        let p2 = db.insert_point(Point::new(1, at(40), 10.0, 10.0)).await;
        let a = db.create_visit_with_points(visit(1), &[p1.id]).await.unwrap().unwrap();
        let b = db.create_visit_with_points(visit(1), &[p2.id]).await.unwrap().unwrap();

        let mut broken = a.clone();
        broken.name = "  ".to_string();
        let result = db.merge_visits_atomic(&broken, &[b.id]).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(db.get_visit(b.id).await.is_some());
        assert_eq!(db.get_point(p2.id).await.unwrap().visit_id, Some(b.id));
    }
}
