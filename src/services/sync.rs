// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync engine: Intervals.icu → document store, then routes → published map.
//!
//! A full pass:
//! 1. Read every stored activity
//! 2. Fetch activities and wellness from the source
//! 3. Normalize and reconcile against stored records by `externalId`
//! 4. Commit all writes as one batch
//! 5. Fetch routes missing from the map cache; if any were cached, flush
//!    the cache and republish the map
//!
//! Only one pass (full or map-only) runs at a time per engine.

use crate::config::Config;
use crate::db::{generate_document_id, DocumentStore, SyncBatch};
use crate::error::{AppError, SyncStage};
use crate::models::{ActivityRecord, ActivityType, ActivityWrite, StoredActivity};
use crate::services::geojson::build_map_document;
use crate::services::intervals::ActivitySource;
use crate::services::map_cache::{CacheBackend, MapCache};
use crate::services::normalizer::{normalize_activities, normalize_wellness};
use crate::services::route_batcher::{RouteBatchReport, RouteFetchBatcher, RouteRequest};
use crate::time_utils::{days_before, now_rfc3339};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Tunables for sync passes.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub athlete_id: String,
    /// Masked API key for the credential check log line
    pub masked_api_key: String,
    pub activities_oldest: NaiveDate,
    pub activity_limit: u32,
    pub wellness_lookback_days: u32,
    pub route_fetch_interval: Duration,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            athlete_id: config.intervals_athlete_id.clone(),
            masked_api_key: config.masked_api_key(),
            activities_oldest: config.activities_oldest,
            activity_limit: config.activity_limit,
            wellness_lookback_days: config.wellness_lookback_days,
            route_fetch_interval: config.route_fetch_interval,
        }
    }
}

/// Summary of a full sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub wellness_days: usize,
    pub route_candidates: usize,
    pub routes: RouteBatchReport,
    pub map_published: bool,
}

/// Summary of a map-only pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MapSyncReport {
    pub candidates: usize,
    pub fetched: usize,
    pub empty: usize,
    pub failed: usize,
    pub total_paths: usize,
    pub total_points: usize,
}

/// Activity writes planned by reconciliation.
#[derive(Debug, Default)]
struct ActivityPlan {
    writes: Vec<ActivityWrite>,
    added: usize,
    updated: usize,
    unchanged: usize,
}

/// Reconciliation state for one external ID.
struct Known {
    doc_id: String,
    latest: Option<ActivityRecord>,
    created_at: Option<String>,
    is_new: bool,
    seen: bool,
    /// Index into the planned writes
    planned: Option<usize>,
}

/// Match normalized records against stored ones by external ID.
///
/// Existing IDs are updated in place (keeping `createdAt`), or left alone
/// when nothing changed. New IDs are inserted under a fresh document ID.
/// A record listed twice updates the write planned for its first occurrence.
fn plan_activity_writes<F>(
    stored: &[StoredActivity],
    records: Vec<ActivityRecord>,
    now: &str,
    mut new_id: F,
) -> Result<ActivityPlan, AppError>
where
    F: FnMut() -> Result<String, AppError>,
{
    let mut known: HashMap<String, Known> = HashMap::new();
    for s in stored {
        let Some(external_id) = s.external_id.clone() else {
            continue;
        };
        if let Some(existing) = known.get(&external_id) {
            tracing::warn!(
                external_id = %external_id,
                kept = %existing.doc_id,
                ignored = %s.id,
                "Duplicate externalId in store"
            );
            continue;
        }
        known.insert(
            external_id,
            Known {
                doc_id: s.id.clone(),
                latest: s.record.clone(),
                created_at: s.created_at.clone(),
                is_new: false,
                seen: false,
                planned: None,
            },
        );
    }

    let mut writes: Vec<ActivityWrite> = Vec::new();

    for record in records {
        let external_id = record.external_id.clone();

        if let Some(entry) = known.get_mut(&external_id) {
            entry.seen = true;
            if let Some(index) = entry.planned {
                tracing::debug!(external_id = %external_id, "Activity listed twice, keeping last");
                writes[index].record = record.clone();
            } else if entry.latest.as_ref() != Some(&record) {
                entry.planned = Some(writes.len());
                writes.push(ActivityWrite {
                    id: entry.doc_id.clone(),
                    record: record.clone(),
                    created_at: entry.created_at.clone(),
                    updated_at: now.to_string(),
                });
            }
            entry.latest = Some(record);
            continue;
        }

        let doc_id = new_id()?;
        known.insert(
            external_id,
            Known {
                doc_id: doc_id.clone(),
                latest: Some(record.clone()),
                created_at: Some(now.to_string()),
                is_new: true,
                seen: true,
                planned: Some(writes.len()),
            },
        );
        writes.push(ActivityWrite {
            id: doc_id,
            record,
            created_at: Some(now.to_string()),
            updated_at: now.to_string(),
        });
    }

    let mut plan = ActivityPlan {
        writes,
        ..Default::default()
    };
    for entry in known.values().filter(|k| k.seen) {
        match (entry.is_new, entry.planned.is_some()) {
            (true, _) => plan.added += 1,
            (false, true) => plan.updated += 1,
            (false, false) => plan.unchanged += 1,
        }
    }
    Ok(plan)
}

/// Stored activities as they will read after `writes` commit.
fn apply_writes(mut stored: Vec<StoredActivity>, writes: &[ActivityWrite]) -> Vec<StoredActivity> {
    let mut index: HashMap<String, usize> = stored
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.clone(), i))
        .collect();

    for write in writes {
        let updated = StoredActivity::from_document(write.id.clone(), &write.to_document());
        match index.get(&write.id) {
            Some(&i) => stored[i] = updated,
            None => {
                index.insert(write.id.clone(), stored.len());
                stored.push(updated);
            }
        }
    }
    stored
}

/// Mappable activities from `records` with no cache entry, in order, once each.
fn missing_routes<'a, I>(records: I, cache: &MapCache) -> Vec<RouteRequest>
where
    I: IntoIterator<Item = (&'a str, ActivityType)>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|(id, t)| t.is_mappable() && !cache.contains(id))
        .filter(|(id, _)| seen.insert(id.to_string()))
        .map(|(id, t)| RouteRequest {
            external_id: id.to_string(),
            activity_type: t,
        })
        .collect()
}

/// Clears the running flag when a pass ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates sync passes over injected store, source and cache backend.
pub struct SyncEngine {
    store: Arc<dyn DocumentStore>,
    source: Arc<dyn ActivitySource>,
    cache_backend: Arc<dyn CacheBackend>,
    batcher: RouteFetchBatcher,
    settings: SyncSettings,
    running: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        source: Arc<dyn ActivitySource>,
        cache_backend: Arc<dyn CacheBackend>,
        settings: SyncSettings,
    ) -> Self {
        let batcher = RouteFetchBatcher::new(source.clone(), settings.route_fetch_interval);
        Self {
            store,
            source,
            cache_backend,
            batcher,
            settings,
            running: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Whether a pass is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<RunGuard<'_>, AppError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::SyncInProgress)?;
        Ok(RunGuard(&self.running))
    }

    /// Run a full sync pass. `oldest` overrides the configured start date.
    pub async fn sync(&self, oldest: Option<NaiveDate>) -> Result<SyncReport, AppError> {
        let _guard = self.begin()?;

        tracing::info!(
            athlete_id = %self.settings.athlete_id,
            api_key = %self.settings.masked_api_key,
            "Starting sync, credentials check"
        );

        // 1. Existing records, read in full before any write
        let stored = self
            .store
            .load_activities()
            .await
            .map_err(|e| e.at(SyncStage::LoadActivities))?;
        let synced_count = stored.iter().filter(|s| s.external_id.is_some()).count();
        tracing::info!(
            total = stored.len(),
            synced = synced_count,
            "Loaded existing activity records"
        );

        // 2. Source data
        let activities_oldest = oldest.unwrap_or(self.settings.activities_oldest);
        let wellness_oldest = days_before(
            Utc::now().date_naive(),
            self.settings.wellness_lookback_days,
        );

        let activities = self
            .source
            .list_activities(activities_oldest, self.settings.activity_limit)
            .await
            .map_err(|e| e.at(SyncStage::FetchActivities))?;
        let wellness = self
            .source
            .list_wellness(wellness_oldest)
            .await
            .map_err(|e| e.at(SyncStage::FetchWellness))?;

        // 3. Normalize and reconcile
        let now = now_rfc3339();
        let records = normalize_activities(&activities);
        let wellness = normalize_wellness(&wellness, &now);
        tracing::info!(
            fetched = activities.len(),
            kept = records.len(),
            wellness_days = wellness.len(),
            oldest = %activities_oldest,
            "Fetched source data"
        );

        let route_sources: Vec<(String, ActivityType)> = records
            .iter()
            .map(|r| (r.external_id.clone(), r.activity_type))
            .collect();

        let plan = plan_activity_writes(&stored, records, &now, generate_document_id)
            .map_err(|e| e.at(SyncStage::Commit))?;

        let mut report = SyncReport {
            added: plan.added,
            updated: plan.updated,
            unchanged: plan.unchanged,
            wellness_days: wellness.len(),
            ..Default::default()
        };

        // 4. Single commit
        let batch = SyncBatch {
            activities: plan.writes,
            wellness,
        };
        if batch.is_empty() {
            tracing::info!("No new metadata to sync");
        } else {
            self.store
                .commit_sync(&batch)
                .await
                .map_err(|e| e.at(SyncStage::Commit))?;
        }
        tracing::info!(
            added = report.added,
            updated = report.updated,
            unchanged = report.unchanged,
            wellness_days = report.wellness_days,
            "Activity sync committed"
        );

        // 5. Routes
        let mut cache = MapCache::load(self.cache_backend.as_ref())
            .await
            .map_err(|e| e.at(SyncStage::RouteCache))?;
        let candidates = missing_routes(
            route_sources.iter().map(|(id, t)| (id.as_str(), *t)),
            &cache,
        );
        report.route_candidates = candidates.len();

        if candidates.is_empty() {
            tracing::info!("All maps accounted for, skipping route fetch");
            return Ok(report);
        }

        report.routes = self.batcher.run(&candidates, &mut cache).await;

        if report.routes.fetched == 0 {
            tracing::info!("No new routes cached, map left as is");
            return Ok(report);
        }

        cache
            .flush(self.cache_backend.as_ref())
            .await
            .map_err(|e| e.at(SyncStage::RouteCache))?;

        let current = apply_writes(stored, &batch.activities);
        let doc = build_map_document(&current, &cache, &now_rfc3339());
        self.store
            .publish_map(&doc)
            .await
            .map_err(|e| e.at(SyncStage::PublishMap))?;
        report.map_published = true;

        tracing::info!(
            total_paths = doc.total_paths,
            total_points = doc.total_points,
            "Map published"
        );
        Ok(report)
    }

    /// Map-only pass over every stored activity. Always republishes.
    pub async fn map_sync(&self) -> Result<MapSyncReport, AppError> {
        let _guard = self.begin()?;

        let stored = self
            .store
            .load_activities()
            .await
            .map_err(|e| e.at(SyncStage::LoadActivities))?;

        let mut cache = MapCache::load(self.cache_backend.as_ref())
            .await
            .map_err(|e| e.at(SyncStage::RouteCache))?;

        let candidates = missing_routes(
            stored
                .iter()
                .filter_map(|s| Some((s.external_id.as_deref()?, s.activity_type?))),
            &cache,
        );
        tracing::info!(
            records = stored.len(),
            cached = cache.len(),
            missing = candidates.len(),
            "Deep check of map cache"
        );

        let routes = self.batcher.run(&candidates, &mut cache).await;
        cache
            .flush(self.cache_backend.as_ref())
            .await
            .map_err(|e| e.at(SyncStage::RouteCache))?;

        let doc = build_map_document(&stored, &cache, &now_rfc3339());
        self.store
            .publish_map(&doc)
            .await
            .map_err(|e| e.at(SyncStage::PublishMap))?;

        tracing::info!(
            total_paths = doc.total_paths,
            total_points = doc.total_points,
            "Map published"
        );

        Ok(MapSyncReport {
            candidates: candidates.len(),
            fetched: routes.fetched,
            empty: routes.empty,
            failed: routes.failed,
            total_paths: doc.total_paths,
            total_points: doc.total_points,
        })
    }
}
