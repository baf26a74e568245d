// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sequential, paced route fetching into the map cache.

use crate::models::{ActivityType, Route};
use crate::services::coordinates::process_coordinates;
use crate::services::intervals::{ActivitySource, RouteFetch};
use crate::services::map_cache::MapCache;
use crate::services::rate_limit::FixedIntervalLimiter;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One activity whose route should be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub external_id: String,
    pub activity_type: ActivityType,
}

/// What happened to one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Route cached with this many points
    Cached(usize),
    /// The source has no usable GPS data
    Empty,
    /// The fetch failed; the activity is retried on the next pass
    Failed(String),
}

/// Counts for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RouteBatchReport {
    pub fetched: usize,
    pub empty: usize,
    pub failed: usize,
}

impl RouteBatchReport {
    fn record(&mut self, outcome: &RouteOutcome) {
        match outcome {
            RouteOutcome::Cached(_) => self.fetched += 1,
            RouteOutcome::Empty => self.empty += 1,
            RouteOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Fetches routes one at a time through a [`FixedIntervalLimiter`].
pub struct RouteFetchBatcher {
    source: Arc<dyn ActivitySource>,
    limiter: FixedIntervalLimiter,
}

impl RouteFetchBatcher {
    pub fn new(source: Arc<dyn ActivitySource>, interval: Duration) -> Self {
        Self {
            source,
            limiter: FixedIntervalLimiter::new(interval),
        }
    }

    /// Fetch every request in order, caching successes in `cache`.
    ///
    /// Failures never stop the batch. The cache is only changed in memory;
    /// flushing is up to the caller.
    pub async fn run(&self, requests: &[RouteRequest], cache: &mut MapCache) -> RouteBatchReport {
        let mut report = RouteBatchReport::default();

        if requests.is_empty() {
            return report;
        }

        tracing::info!(
            count = requests.len(),
            interval_ms = self.limiter.interval().as_millis() as u64,
            "Fetching missing routes"
        );

        for (index, request) in requests.iter().enumerate() {
            let outcome = match self.fetch_one(request).await {
                Ok(route) => {
                    let points = route.len();
                    tracing::info!(
                        external_id = %request.external_id,
                        activity_type = request.activity_type.as_str(),
                        points,
                        progress = %format!("{}/{}", index + 1, requests.len()),
                        "Route cached"
                    );
                    cache.set_many([(request.external_id.clone(), route)]);
                    RouteOutcome::Cached(points)
                }
                Err(outcome) => outcome,
            };

            report.record(&outcome);
        }

        tracing::info!(
            fetched = report.fetched,
            empty = report.empty,
            failed = report.failed,
            "Route batch complete"
        );
        report
    }

    /// Fetch and process one route. Anything other than a usable route comes
    /// back as the outcome to report.
    async fn fetch_one(&self, request: &RouteRequest) -> Result<Route, RouteOutcome> {
        let id = request.external_id.as_str();
        let fetched = self
            .limiter
            .run(|| self.source.fetch_route(id))
            .await;

        match fetched {
            Ok(RouteFetch::Points(raw)) => {
                let route = process_coordinates(&raw);
                if route.is_empty() {
                    tracing::info!(external_id = %id, "Route data invalid, no usable points");
                    Err(RouteOutcome::Empty)
                } else {
                    Ok(route)
                }
            }
            Ok(RouteFetch::NoData) => {
                tracing::info!(external_id = %id, "No map found for activity");
                Err(RouteOutcome::Empty)
            }
            Err(e) => {
                tracing::warn!(
                    external_id = %id,
                    error = %e,
                    "Route fetch failed, will retry next pass"
                );
                Err(RouteOutcome::Failed(e.to_string()))
            }
        }
    }
}
