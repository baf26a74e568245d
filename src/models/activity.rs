// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Training activity model for storage and sync.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Provider tag written on every synced record.
pub const SOURCE_INTERVALS: &str = "intervals.icu";

/// Canonical activity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Swim,
    Bike,
    Run,
    Workout,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Swim => "swim",
            ActivityType::Bike => "bike",
            ActivityType::Run => "run",
            ActivityType::Workout => "workout",
        }
    }

    /// Whether activities of this type carry a GPS route.
    pub fn is_mappable(&self) -> bool {
        matches!(
            self,
            ActivityType::Swim | ActivityType::Bike | ActivityType::Run
        )
    }
}

/// Result of looking up a source type string in the type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMapping {
    Canonical(ActivityType),
    Excluded,
}

/// Canonical activity record, as written by sync.
///
/// Field names match the `ironman_logs` documents the web frontend reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// Intervals.icu activity ID (dedup key)
    pub external_id: String,
    pub activity_type: ActivityType,
    /// Kilometers with two decimals, e.g. "20.00"
    pub distance: String,
    /// Moving time in whole minutes
    pub duration: u32,
    /// Local calendar date of the session
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    /// Activity name/title
    pub description: String,
    pub source: String,

    // Biometrics. Absent values stay null; zero is a real measurement.
    #[serde(default)]
    pub avg_heart_rate: Option<f64>,
    #[serde(default)]
    pub max_heart_rate: Option<f64>,
    #[serde(default)]
    pub avg_speed: Option<f64>,
    #[serde(default)]
    pub elevation_gain: Option<f64>,
    #[serde(default)]
    pub avg_cadence: Option<f64>,
    #[serde(default)]
    pub training_load: Option<f64>,
    #[serde(default)]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub max_power: Option<f64>,
}

/// An activity document as read back from the store.
///
/// The collection also holds manually entered logs whose fields the sync
/// never wrote, so only the dedup key and type are read strictly; `record`
/// is populated when the document carries all canonical fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredActivity {
    /// Document ID
    pub id: String,
    pub external_id: Option<String>,
    pub activity_type: Option<ActivityType>,
    pub record: Option<ActivityRecord>,
    /// When sync first inserted this document (RFC 3339)
    pub created_at: Option<String>,
}

impl StoredActivity {
    /// Build from a raw document body.
    pub fn from_document(id: impl Into<String>, doc: &serde_json::Value) -> Self {
        let external_id = doc.get("externalId").and_then(id_string);
        let activity_type = doc
            .get("activityType")
            .and_then(|v| serde_json::from_value::<ActivityType>(v.clone()).ok());
        let record = serde_json::from_value::<ActivityRecord>(doc.clone()).ok();
        let created_at = doc
            .get("createdAt")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Self {
            id: id.into(),
            external_id,
            activity_type,
            record,
            created_at,
        }
    }
}

/// A whole-document activity write produced by sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityWrite {
    /// Target document ID
    #[serde(skip)]
    pub id: String,
    #[serde(flatten)]
    pub record: ActivityRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub updated_at: String,
}

impl ActivityWrite {
    /// The document body as JSON.
    pub fn to_document(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Activity IDs arrive as strings ("i12345") or bare numbers.
pub fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Deserialize an ID that may be a string or a number.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    id_string(&value).ok_or_else(|| serde::de::Error::custom("expected a string or numeric id"))
}
