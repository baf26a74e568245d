// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    SourceAuth(#[from] SourceAuthError),

    #[error("Intervals.icu API error: {0}")]
    IntervalsApi(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("A sync is already running")]
    SyncInProgress,

    /// A failure tagged with the sync stage it happened in.
    #[error("Sync failed during {stage}: {source}")]
    Stage {
        stage: SyncStage,
        #[source]
        source: Box<AppError>,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Authentication/authorization rejections from Intervals.icu.
///
/// The two cases need different fixes (regenerate the key vs. change the
/// account's IP restrictions), so they are never collapsed into one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceAuthError {
    #[error("Intervals.icu rejected the API key: {0}")]
    InvalidCredentials(String),

    #[error("Intervals.icu rejected this deployment's network origin: {0}")]
    OriginNotAllowed(String),
}

impl SourceAuthError {
    /// Classify a 401/403 response body.
    ///
    /// Intervals.icu answers both a bad key and an IP-restricted account with
    /// 403; only the body text tells them apart.
    pub fn classify(status: u16, body: &str) -> Self {
        let detail = if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, body.trim())
        };

        if status == 403 && mentions_origin(body) {
            SourceAuthError::OriginNotAllowed(detail)
        } else {
            SourceAuthError::InvalidCredentials(detail)
        }
    }
}

const ORIGIN_MARKERS: &[&str] = &[
    "ip address",
    "origin",
    "allowlist",
    "allow-list",
    "allowed list",
    "whitelist",
    "not allowed from",
];

fn mentions_origin(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    ORIGIN_MARKERS.iter().any(|m| lower.contains(m))
        || lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word == "ip")
}

/// Stages of a sync pass, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    LoadActivities,
    FetchActivities,
    FetchWellness,
    Commit,
    RouteCache,
    PublishMap,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStage::LoadActivities => "load_activities",
            SyncStage::FetchActivities => "fetch_activities",
            SyncStage::FetchWellness => "fetch_wellness",
            SyncStage::Commit => "commit",
            SyncStage::RouteCache => "route_cache",
            SyncStage::PublishMap => "publish_map",
        }
    }
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    /// Tag this error with the sync stage it came from.
    pub fn at(self, stage: SyncStage) -> Self {
        match self {
            // Keep the innermost stage; it is the one that actually failed.
            AppError::Stage { .. } => self,
            other => AppError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was tagged with, if any.
    pub fn stage(&self) -> Option<SyncStage> {
        match self {
            AppError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error with any stage tag removed.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this is a hard authentication/authorization failure from the source API.
    pub fn is_source_auth_error(&self) -> bool {
        matches!(self.root(), AppError::SourceAuth(_))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let stage = self.stage().map(|s| s.as_str());

        let (status, error, details) = match self.root() {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::SourceAuth(err) => (
                StatusCode::BAD_GATEWAY,
                "intervals_auth_error",
                Some(err.to_string()),
            ),
            AppError::IntervalsApi(msg) => {
                (StatusCode::BAD_GATEWAY, "intervals_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::SyncInProgress => (StatusCode::CONFLICT, "sync_in_progress", None),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            // root() strips stage tags.
            AppError::Stage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None),
        };

        let body = ErrorResponse {
            error: error.to_string(),
            stage,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
