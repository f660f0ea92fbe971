// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Visit-Tracker: Detect where a user stayed from raw location points
//!
//! This crate provides the visit detection pipeline (clustering, merging,
//! place resolution) and a small HTTP API for triggering detection and
//! reviewing the resulting visits.

pub mod config;
pub mod db;
pub mod error;
pub mod geo_utils;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::MemoryDb;
use services::VisitDetector;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: MemoryDb,
    pub detector: VisitDetector,
}
