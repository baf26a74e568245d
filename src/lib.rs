// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ironman-Tracker: sync training data from Intervals.icu
//!
//! This crate provides the backend that pulls activities, wellness and GPS
//! routes from Intervals.icu, stores canonical records in Firestore and
//! publishes the GeoJSON map the training dashboard draws.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use services::SyncEngine;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub sync_engine: Arc<SyncEngine>,
}
