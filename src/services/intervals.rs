// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Intervals.icu API client for fetching activities, wellness and routes.
//!
//! Handles:
//! - HTTP Basic authentication (`API_KEY:<key>`)
//! - 401/403 classification (bad key vs. origin not allowed)
//! - Per-item parsing so one odd activity does not sink a whole listing
//! - Map fetches, where "no route" is an answer rather than an error

use crate::config::Config;
use crate::error::{AppError, SourceAuthError};
use crate::models::activity::deserialize_id;
use async_trait::async_trait;
use base64::Engine;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("ironman-tracker-sync/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of activities, wellness and routes.
///
/// Implemented by [`IntervalsClient`]; tests supply fakes.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// List activities on or after `oldest`.
    async fn list_activities(
        &self,
        oldest: NaiveDate,
        limit: u32,
    ) -> Result<Vec<IntervalsActivity>, AppError>;

    /// List daily wellness records on or after `oldest`.
    async fn list_wellness(&self, oldest: NaiveDate) -> Result<Vec<IntervalsWellness>, AppError>;

    /// Fetch the raw GPS track of one activity.
    async fn fetch_route(&self, activity_id: &str) -> Result<RouteFetch, AppError>;
}

/// Outcome of a map request that reached the API.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteFetch {
    /// Raw `latlngs` array, not yet processed.
    Points(serde_json::Value),
    /// The source has no GPS data for this activity (indoor/trainer session).
    NoData,
}

/// Activity as listed by Intervals.icu.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntervalsActivity {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    pub start_date_local: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Meters
    #[serde(default)]
    pub distance: Option<f64>,
    /// Seconds
    #[serde(default)]
    pub moving_time: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub average_speed: Option<f64>,
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
    #[serde(default)]
    pub average_cadence: Option<f64>,
    #[serde(default)]
    pub icu_training_load: Option<f64>,
    #[serde(default)]
    pub icu_intensity: Option<f64>,
    #[serde(default)]
    pub icu_pm_p_max: Option<f64>,
}

/// Daily wellness entry; `id` is the date.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntervalsWellness {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "restingHR", default)]
    pub resting_hr: Option<f64>,
    #[serde(default)]
    pub steps: Option<f64>,
    #[serde(rename = "sleepSecs", default)]
    pub sleep_secs: Option<f64>,
    #[serde(rename = "spO2", default)]
    pub sp_o2: Option<f64>,
    #[serde(default)]
    pub hrv: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Map endpoint response.
#[derive(Debug, Deserialize)]
struct MapApiResponse {
    #[serde(default)]
    latlngs: Option<serde_json::Value>,
}

/// Intervals.icu API client.
#[derive(Clone)]
pub struct IntervalsClient {
    http: reqwest::Client,
    base_url: String,
    athlete_id: String,
    auth_header: String,
}

impl IntervalsClient {
    /// Create a client for one athlete.
    pub fn new(base_url: &str, athlete_id: &str, api_key: &str) -> Result<Self, AppError> {
        let auth = base64::engine::general_purpose::STANDARD.encode(format!("API_KEY:{}", api_key));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::IntervalsApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            athlete_id: athlete_id.to_string(),
            auth_header: format!("Basic {}", auth),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            &config.intervals_base_url,
            &config.intervals_athlete_id,
            &config.intervals_api_key,
        )
    }

    fn athlete_url(&self, path: &str) -> String {
        format!("{}/athlete/{}{}", self.base_url, self.athlete_id, path)
    }

    /// GET a JSON array, parsing each element independently.
    async fn get_list<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
        kind: &'static str,
    ) -> Result<Vec<T>, AppError> {
        tracing::debug!(url, "Requesting Intervals.icu");

        let response = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::IntervalsApi(e.to_string()))?;

        let items: Vec<serde_json::Value> = self.check_response_json(response).await?;
        let total = items.len();
        let parsed: Vec<T> = parse_list(items, kind);

        tracing::debug!(kind, total, parsed = parsed.len(), "Intervals.icu list fetched");
        Ok(parsed)
    }

    /// Check response status and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::IntervalsApi(format!("JSON parse error: {}", e)))
    }
}

/// Parse list elements one by one, skipping any that do not fit `T`.
fn parse_list<T: for<'de> Deserialize<'de>>(
    items: Vec<serde_json::Value>,
    kind: &'static str,
) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(kind, error = %e, "Skipping unparseable Intervals.icu entry");
                None
            }
        })
        .collect()
}

/// Interpret a map endpoint response.
///
/// 429 and 5xx are fetch errors; any other non-2xx, or a body without
/// points, means the activity has no route.
fn map_outcome(activity_id: &str, status: u16, body: &str) -> Result<RouteFetch, AppError> {
    // Throttling and server errors say nothing about the route itself.
    if status == 429 || (500..600).contains(&status) {
        return Err(status_error(status, body));
    }

    if !(200..300).contains(&status) {
        tracing::debug!(activity_id, status, "No map for activity");
        return Ok(RouteFetch::NoData);
    }

    let data: MapApiResponse = serde_json::from_str(body)
        .map_err(|e| AppError::IntervalsApi(format!("JSON parse error: {}", e)))?;

    match data.latlngs {
        Some(points) if points.as_array().is_some_and(|a| !a.is_empty()) => {
            Ok(RouteFetch::Points(points))
        }
        _ => Ok(RouteFetch::NoData),
    }
}

/// Map a non-success status to an error.
fn status_error(status: u16, body: &str) -> AppError {
    match status {
        401 | 403 => {
            let err = SourceAuthError::classify(status, body);
            tracing::error!(status, error = %err, "Intervals.icu rejected the request");
            AppError::SourceAuth(err)
        }
        429 => {
            tracing::warn!("Intervals.icu rate limit hit (429)");
            AppError::IntervalsApi("Rate limited (HTTP 429)".to_string())
        }
        _ => AppError::IntervalsApi(format!("HTTP {}: {}", status, body)),
    }
}

#[async_trait]
impl ActivitySource for IntervalsClient {
    async fn list_activities(
        &self,
        oldest: NaiveDate,
        limit: u32,
    ) -> Result<Vec<IntervalsActivity>, AppError> {
        let url = self.athlete_url("/activities");
        self.get_list(
            &url,
            &[("oldest", oldest.to_string()), ("limit", limit.to_string())],
            "activity",
        )
        .await
    }

    async fn list_wellness(&self, oldest: NaiveDate) -> Result<Vec<IntervalsWellness>, AppError> {
        let url = self.athlete_url("/wellness");
        self.get_list(&url, &[("oldest", oldest.to_string())], "wellness")
            .await
    }

    async fn fetch_route(&self, activity_id: &str) -> Result<RouteFetch, AppError> {
        let url = format!("{}/activity/{}/map", self.base_url, activity_id);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .map_err(|e| AppError::IntervalsApi(e.to_string()))?;

        let status = response.status().as_u16();
        // An unreadable 2xx body fails to parse below.
        let body = response.text().await.unwrap_or_default();

        map_outcome(activity_id, status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_activity_parses_numeric_and_string_ids() {
        let a: IntervalsActivity = serde_json::from_value(json!({
            "id": "i9001",
            "type": "Ride",
            "start_date_local": "2025-01-01T08:00:00",
        }))
        .unwrap();
        assert_eq!(a.id, "i9001");
        assert_eq!(a.activity_type, "Ride");
        assert_eq!(a.distance, None);

        let b: IntervalsActivity = serde_json::from_value(json!({
            "id": 17,
            "type": "Run",
            "start_date_local": "2025-01-01T08:00:00",
            "average_heartrate": 0,
        }))
        .unwrap();
        assert_eq!(b.id, "17");
        assert_eq!(b.average_heartrate, Some(0.0));
    }

    #[test]
    fn test_status_error_classification() {
        assert!(matches!(
            status_error(403, "Access denied from IP 1.2.3.4"),
            AppError::SourceAuth(SourceAuthError::OriginNotAllowed(_))
        ));
        assert!(matches!(
            status_error(403, "Invalid API key"),
            AppError::SourceAuth(SourceAuthError::InvalidCredentials(_))
        ));
        assert!(matches!(
            status_error(401, ""),
            AppError::SourceAuth(SourceAuthError::InvalidCredentials(_))
        ));
        assert!(matches!(status_error(429, ""), AppError::IntervalsApi(_)));
        assert!(matches!(status_error(500, "boom"), AppError::IntervalsApi(_)));
    }

    #[test]
    fn test_map_outcome_statuses() {
        assert!(matches!(map_outcome("1", 404, "Not Found"), Ok(RouteFetch::NoData)));
        assert!(matches!(map_outcome("1", 422, ""), Ok(RouteFetch::NoData)));
        assert!(matches!(
            map_outcome("1", 429, "slow down"),
            Err(AppError::IntervalsApi(_))
        ));
        assert!(matches!(
            map_outcome("1", 503, "unavailable"),
            Err(AppError::IntervalsApi(_))
        ));
    }

    #[test]
    fn test_map_outcome_bodies() {
        assert!(matches!(
            map_outcome("1", 200, r#"{"latlngs":[],"bounds":null}"#),
            Ok(RouteFetch::NoData)
        ));
        assert!(matches!(
            map_outcome("1", 200, r#"{"bounds":[[1,2],[3,4]]}"#),
            Ok(RouteFetch::NoData)
        ));
        assert!(matches!(
            map_outcome("1", 200, r#"{"latlngs":null}"#),
            Ok(RouteFetch::NoData)
        ));
        assert!(matches!(
            map_outcome("1", 200, "<html>"),
            Err(AppError::IntervalsApi(_))
        ));

        match map_outcome("1", 200, r#"{"latlngs":[[37.4,-122.1],[37.5,-122.2]]}"#) {
            Ok(RouteFetch::Points(points)) => {
                assert_eq!(points, json!([[37.4, -122.1], [37.5, -122.2]]))
            }
            other => panic!("expected points, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_skips_bad_entries() {
        let items = vec![
            json!({ "id": 1, "type": "Run", "start_date_local": "2025-01-01T08:00:00" }),
            json!({ "id": 2, "type": 7 }),
            json!("not an object"),
            json!({ "id": "3", "type": "Swim", "start_date_local": "2025-01-02T06:00:00" }),
        ];

        let parsed: Vec<IntervalsActivity> = parse_list(items, "activity");
        let ids: Vec<_> = parsed.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_athlete_url() {
        let client = IntervalsClient::new("https://intervals.icu/api/v1/", "i42", "key").unwrap();
        assert_eq!(
            client.athlete_url("/wellness"),
            "https://intervals.icu/api/v1/athlete/i42/wellness"
        );
        // base64("API_KEY:key")
        assert_eq!(client.auth_header, "Basic QVBJX0tFWTprZXk=");
    }
}
