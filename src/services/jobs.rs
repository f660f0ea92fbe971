// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background job queue for follow-up work.
//!
//! Visit detection enqueues one reverse geocoding job per newly created
//! place. The in-process queue is a tokio channel drained by
//! `ReverseGeocodeWorker`.

use crate::db::MemoryDb;
use crate::error::{AppError, Result};
use crate::services::geocoder::Geocoder;
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

const MAX_CONCURRENT_ENQUEUES: usize = 16;

/// A unit of background work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum Job {
    /// Look up address data for a place created during visit detection.
    ReverseGeocodePlace { place_id: u64 },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::ReverseGeocodePlace { .. } => "reverse_geocode_place",
        }
    }
}

/// Accepts jobs for asynchronous execution.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: Job) -> Result<()>;
}

/// Result of enqueuing a batch of jobs.
#[derive(Debug, Clone, Default)]
pub struct EnqueueResult {
    pub queued: u32,
    pub failed: u32,
    pub failed_jobs: Vec<Job>,
}

impl EnqueueResult {
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

/// Enqueue jobs concurrently; failures are logged and reported, not raised.
pub async fn enqueue_all(queue: &dyn JobQueue, jobs: Vec<Job>) -> EnqueueResult {
    let outcomes: Vec<(Job, Result<()>)> = stream::iter(jobs)
        .map(|job| async move {
            let outcome = queue.enqueue(job.clone()).await;
            (job, outcome)
        })
        .buffer_unordered(MAX_CONCURRENT_ENQUEUES)
        .collect()
        .await;

    let mut result = EnqueueResult::default();
    for (job, outcome) in outcomes {
        match outcome {
            Ok(()) => result.queued += 1,
            Err(e) => {
                tracing::warn!(job = job.name(), error = %e, "Failed to enqueue job");
                result.failed += 1;
                result.failed_jobs.push(job);
            }
        }
    }
    result
}

/// In-process queue backed by an unbounded tokio channel.
#[derive(Clone)]
pub struct ChannelJobQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl ChannelJobQueue {
    /// Create the queue and the receiving end for a worker.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl JobQueue for ChannelJobQueue {
    async fn enqueue(&self, job: Job) -> Result<()> {
        self.sender
            .send(job)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Job queue worker has shut down")))
    }
}

/// Executes reverse geocoding jobs.
pub struct ReverseGeocodeWorker {
    db: MemoryDb,
    geocoder: Arc<dyn Geocoder>,
}

impl ReverseGeocodeWorker {
    pub fn new(db: MemoryDb, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { db, geocoder }
    }

    /// Drain the channel until every sender is dropped.
    pub async fn run(self, mut receiver: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = receiver.recv().await {
            if let Err(e) = self.handle(&job).await {
                tracing::warn!(job = job.name(), error = %e, "Job failed");
            }
        }
        tracing::info!("Job worker stopped");
    }

    /// Run one job.
    pub async fn handle(&self, job: &Job) -> Result<()> {
        match job {
            Job::ReverseGeocodePlace { place_id } => self.reverse_geocode_place(*place_id).await,
        }
    }

    /// Attach the best geocoder hit to a place; default-named places also
    /// take its name.
    async fn reverse_geocode_place(&self, place_id: u64) -> Result<()> {
        let mut place = self
            .db
            .get_place(place_id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Place {} not found", place_id)))?;

        let results = self
            .geocoder
            .search(place.latitude, place.longitude)
            .await
            .map_err(|e| AppError::Geocoding(e.to_string()))?;

        let Some(best) = results.into_iter().next() else {
            tracing::debug!(place_id, "No reverse geocoding result");
            return Ok(());
        };

        if place.has_default_name() {
            place.name = best.display_name();
        }
        place.geodata = Some(best.feature);
        self.db.update_place(&place).await?;

        tracing::info!(place_id, name = %place.name, "Place reverse geocoded");
        Ok(())
    }
}
