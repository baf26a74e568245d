// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (the Intervals.icu API key and the admin secret) are injected as
//! environment variables by the deployment, or read from a local `.env` file
//! during development.

use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Delay bounds between route fetches. Intervals.icu asks API clients to
/// stay well under its burst limit.
pub const MIN_ROUTE_FETCH_INTERVAL_MS: u64 = 200;
pub const MAX_ROUTE_FETCH_INTERVAL_MS: u64 = 250;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Intervals.icu ---
    /// Athlete ID whose activities are synced (e.g. "i123456")
    pub intervals_athlete_id: String,
    /// Intervals.icu API key (secret)
    pub intervals_api_key: String,
    /// Base URL of the Intervals.icu API
    pub intervals_base_url: String,

    // --- Sync window ---
    /// Oldest activity date fetched by a sync pass
    pub activities_oldest: NaiveDate,
    /// Maximum number of activities requested per pass
    pub activity_limit: u32,
    /// How many days of wellness data each pass re-reads
    pub wellness_lookback_days: u32,

    // --- Route cache ---
    /// Path of the JSON map cache file
    pub map_cache_path: PathBuf,
    /// Pause between consecutive route fetches
    pub route_fetch_interval: Duration,

    // --- Server ---
    /// Shared secret that unlocks admin actions (secret)
    pub admin_secret: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            intervals_athlete_id: "i0000".to_string(),
            intervals_api_key: "test_api_key".to_string(),
            intervals_base_url: DEFAULT_BASE_URL.to_string(),
            activities_oldest: default_activities_oldest(),
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
            wellness_lookback_days: DEFAULT_WELLNESS_LOOKBACK_DAYS,
            map_cache_path: PathBuf::from(DEFAULT_MAP_CACHE_PATH),
            route_fetch_interval: Duration::from_millis(MAX_ROUTE_FETCH_INTERVAL_MS),
            admin_secret: "test_admin_secret".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let activities_oldest = match optional("SYNC_ACTIVITIES_OLDEST") {
            Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                ConfigError::Invalid {
                    name: "SYNC_ACTIVITIES_OLDEST",
                    value: raw,
                }
            })?,
            None => default_activities_oldest(),
        };

        let interval_ms: u64 = parse_or(
            "ROUTE_FETCH_INTERVAL_MS",
            optional("ROUTE_FETCH_INTERVAL_MS"),
            MAX_ROUTE_FETCH_INTERVAL_MS,
        )?;

        Ok(Self {
            intervals_athlete_id: required("INTERVALS_ATHLETE_ID")?,
            intervals_api_key: required("INTERVALS_API_KEY")?,
            intervals_base_url: optional("INTERVALS_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            activities_oldest,
            activity_limit: parse_or(
                "SYNC_ACTIVITY_LIMIT",
                optional("SYNC_ACTIVITY_LIMIT"),
                DEFAULT_ACTIVITY_LIMIT,
            )?,
            wellness_lookback_days: parse_or(
                "SYNC_WELLNESS_LOOKBACK_DAYS",
                optional("SYNC_WELLNESS_LOOKBACK_DAYS"),
                DEFAULT_WELLNESS_LOOKBACK_DAYS,
            )?,
            map_cache_path: optional("MAP_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MAP_CACHE_PATH)),
            route_fetch_interval: Duration::from_millis(
                interval_ms.clamp(MIN_ROUTE_FETCH_INTERVAL_MS, MAX_ROUTE_FETCH_INTERVAL_MS),
            ),
            admin_secret: required("ADMIN_SECRET")?,
            frontend_url: optional("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            gcp_project_id: optional("GCP_PROJECT_ID").unwrap_or_else(|| "local-dev".to_string()),
            port: parse_or("PORT", optional("PORT"), 8080)?,
        })
    }

    /// The API key with everything but its first and last three characters hidden.
    pub fn masked_api_key(&self) -> String {
        mask_secret(&self.intervals_api_key)
    }
}

const DEFAULT_BASE_URL: &str = "https://intervals.icu/api/v1";
const DEFAULT_ACTIVITY_LIMIT: u32 = 50;
const DEFAULT_WELLNESS_LOOKBACK_DAYS: u32 = 30;
const DEFAULT_MAP_CACHE_PATH: &str = "data/map-cache.json";

/// Activities before the start of the current training block are not synced.
fn default_activities_oldest() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 20).unwrap_or_default()
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 6 {
        return format!("****** (Length: {})", chars.len());
    }
    let start: String = chars[..3].iter().collect();
    let end: String = chars[chars.len() - 3..].iter().collect();
    format!("{}......{} (Length: {})", start, end, chars.len())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
