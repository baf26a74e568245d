// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes: the published map and admin-triggered sync passes.

use crate::error::{AppError, Result};
use crate::models::MapDocument;
use crate::services::{MapSyncReport, SyncReport};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Public routes.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/map", get(get_map))
}

/// Admin routes (require `ADMIN_SECRET`).
/// The admin middleware is applied in routes/mod.rs for these routes.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sync", post(run_sync))
        .route("/api/map/rebuild", post(rebuild_map))
}

// ─── Map ─────────────────────────────────────────────────────

/// The published map document.
async fn get_map(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let doc: MapDocument = state
        .store
        .get_map_document()
        .await?
        .ok_or_else(|| AppError::NotFound("No map has been published yet".to_string()))?;

    Ok(([(header::CACHE_CONTROL, "public, max-age=60")], Json(doc)))
}

// ─── Sync ────────────────────────────────────────────────────

/// Optional overrides for a sync pass.
#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncRequest {
    /// Sync activities from this date instead of the configured start
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub oldest: Option<NaiveDate>,
}

/// Run one full sync pass and return its summary.
async fn run_sync(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Option<Json<SyncRequest>>, JsonRejection>,
) -> Result<Json<SyncReport>> {
    let request = body
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?
        .map(|Json(r)| r)
        .unwrap_or_default();
    tracing::info!(oldest = ?request.oldest, "Admin-triggered sync");

    let report = state.sync_engine.sync(request.oldest).await.inspect_err(|e| {
        tracing::error!(error = %e, stage = ?e.stage(), "Sync failed");
    })?;

    Ok(Json(report))
}

/// Re-check every stored activity's route and republish the map.
async fn rebuild_map(State(state): State<Arc<AppState>>) -> Result<Json<MapSyncReport>> {
    tracing::info!("Admin-triggered map rebuild");

    let report = state.sync_engine.map_sync().await.inspect_err(|e| {
        tracing::error!(error = %e, stage = ?e.stage(), "Map rebuild failed");
    })?;

    Ok(Json(report))
}
