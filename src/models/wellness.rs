// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily wellness model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One calendar day's biometric summary.
///
/// Stored at `daily_wellness/wellness_{date}`; the date is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessRecord {
    pub date: NaiveDate,
    #[serde(rename = "restingHR")]
    pub resting_hr: Option<f64>,
    pub steps: Option<f64>,
    #[serde(rename = "sleepSecs")]
    pub sleep_secs: Option<f64>,
    #[serde(rename = "spO2")]
    pub sp_o2: Option<f64>,
    pub hrv: Option<f64>,
    pub weight: Option<f64>,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl WellnessRecord {
    /// Document ID for this day.
    pub fn doc_id(&self) -> String {
        format!("wellness_{}", self.date)
    }

    pub fn to_document(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
