// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visit-Tracker API Server
//!
//! Detects visits from a user's location history and exposes endpoints to
//! trigger detection and review the results.

use visit_tracker::{
    config::Config,
    db::MemoryDb,
    services::{ChannelJobQueue, Geocoder, PhotonClient, ReverseGeocodeWorker, VisitDetector},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Visit-Tracker API");

    let db = MemoryDb::new();

    let geocoder: Option<Arc<dyn Geocoder>> = config.photon_api_url.as_ref().map(|url| {
        tracing::info!(url = %url, "Photon geocoder configured");
        Arc::new(PhotonClient::new(url.clone())) as Arc<dyn Geocoder>
    });

    // Background worker for reverse geocoding jobs
    let (job_queue, job_receiver) = ChannelJobQueue::new();
    match &geocoder {
        Some(geocoder) if config.reverse_geocoding_enabled => {
            let worker = ReverseGeocodeWorker::new(db.clone(), geocoder.clone());
            tokio::spawn(worker.run(job_receiver));
            tracing::info!("Reverse geocoding worker started");
        }
        _ => {
            drop(job_receiver);
            tracing::info!("Reverse geocoding disabled");
        }
    }

    let mut detector = VisitDetector::new(
        db.clone(),
        Arc::new(job_queue),
        config.visit_settings.clone(),
    )
    .with_reverse_geocoding(config.reverse_geocoding_enabled && geocoder.is_some());
    if let Some(geocoder) = geocoder {
        detector = detector.with_geocoder(geocoder);
    }

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        detector,
    });

    // Build router
    let app = visit_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("visit_tracker=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
