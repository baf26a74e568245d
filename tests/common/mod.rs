// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::NaiveDate;
use ironman_tracker::config::Config;
use ironman_tracker::db::{DocumentStore, FirestoreDb, MemoryStore};
use ironman_tracker::error::{AppError, SourceAuthError};
use ironman_tracker::routes::create_router;
use ironman_tracker::services::intervals::{
    ActivitySource, IntervalsActivity, IntervalsWellness, RouteFetch,
};
use ironman_tracker::services::{MemoryCacheBackend, SyncEngine, SyncSettings};
use ironman_tracker::AppState;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// A listed source activity.
#[allow(dead_code)]
pub fn activity(id: &str, source_type: &str, meters: f64, seconds: f64) -> IntervalsActivity {
    IntervalsActivity {
        id: id.to_string(),
        activity_type: source_type.to_string(),
        start_date_local: "2025-01-01T08:00:00".to_string(),
        name: Some(format!("{} {}", source_type, id)),
        distance: Some(meters),
        moving_time: Some(seconds),
        ..Default::default()
    }
}

/// Raw `latlngs` with `n` valid points.
#[allow(dead_code)]
pub fn track(n: usize) -> RouteFetch {
    let points: Vec<_> = (0..n)
        .map(|i| json!([37.4 + i as f64 * 0.001, -122.1 - i as f64 * 0.001]))
        .collect();
    RouteFetch::Points(serde_json::Value::Array(points))
}

/// Scriptable stand-in for Intervals.icu.
#[derive(Default)]
pub struct FakeSource {
    pub activities: Mutex<Vec<IntervalsActivity>>,
    pub wellness: Mutex<Vec<IntervalsWellness>>,
    /// Map responses by activity ID; `Err` becomes a fetch error. Missing
    /// IDs answer "no data".
    pub routes: Mutex<HashMap<String, Result<RouteFetch, String>>>,
    /// When set, listing activities fails with this rejection
    pub auth_failure: Mutex<Option<SourceAuthError>>,
    /// Delay before the activity listing returns
    pub list_delay: Mutex<Option<Duration>>,
    pub route_calls: Mutex<Vec<String>>,
    pub list_calls: Mutex<Vec<NaiveDate>>,
}

#[allow(dead_code)]
impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_activities(&self, activities: Vec<IntervalsActivity>) {
        *self.activities.lock().unwrap() = activities;
    }

    pub fn set_wellness(&self, wellness: Vec<IntervalsWellness>) {
        *self.wellness.lock().unwrap() = wellness;
    }

    pub fn set_route(&self, id: &str, fetch: Result<RouteFetch, String>) {
        self.routes.lock().unwrap().insert(id.to_string(), fetch);
    }

    pub fn fail_auth(&self, err: SourceAuthError) {
        *self.auth_failure.lock().unwrap() = Some(err);
    }

    pub fn route_calls(&self) -> Vec<String> {
        self.route_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivitySource for FakeSource {
    async fn list_activities(
        &self,
        oldest: NaiveDate,
        _limit: u32,
    ) -> Result<Vec<IntervalsActivity>, AppError> {
        self.list_calls.lock().unwrap().push(oldest);

        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.auth_failure.lock().unwrap().clone() {
            return Err(AppError::SourceAuth(err));
        }
        Ok(self.activities.lock().unwrap().clone())
    }

    async fn list_wellness(&self, _oldest: NaiveDate) -> Result<Vec<IntervalsWellness>, AppError> {
        Ok(self.wellness.lock().unwrap().clone())
    }

    async fn fetch_route(&self, activity_id: &str) -> Result<RouteFetch, AppError> {
        self.route_calls
            .lock()
            .unwrap()
            .push(activity_id.to_string());

        match self.routes.lock().unwrap().get(activity_id) {
            Some(Ok(fetch)) => Ok(fetch.clone()),
            Some(Err(msg)) => Err(AppError::IntervalsApi(msg.clone())),
            None => Ok(RouteFetch::NoData),
        }
    }
}

/// Engine wired to in-memory fakes, with handles to each.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub source: Arc<FakeSource>,
    pub cache: Arc<MemoryCacheBackend>,
    pub engine: Arc<SyncEngine>,
}

#[allow(dead_code)]
pub fn test_settings() -> SyncSettings {
    SyncSettings::from_config(&Config::test_default())
}

#[allow(dead_code)]
pub fn harness() -> TestHarness {
    harness_with_cache(MemoryCacheBackend::new())
}

#[allow(dead_code)]
pub fn harness_with_cache(cache: MemoryCacheBackend) -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(FakeSource::new());
    let cache = Arc::new(cache);
    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        source.clone(),
        cache.clone(),
        test_settings(),
    ));
    TestHarness {
        store,
        source,
        cache,
        engine,
    }
}

/// Create a test app over in-memory fakes.
/// Returns the router, the shared state and the fakes.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, TestHarness) {
    let h = harness();
    let store: Arc<dyn DocumentStore> = h.store.clone();
    let state = Arc::new(AppState {
        config: Config::test_default(),
        store,
        sync_engine: h.engine.clone(),
    });
    (create_router(state.clone()), state, h)
}
