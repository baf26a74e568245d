// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Intervals.icu payloads to canonical records.

use crate::models::activity::SOURCE_INTERVALS;
use crate::models::{ActivityRecord, ActivityType, TypeMapping, WellnessRecord};
use crate::services::intervals::{IntervalsActivity, IntervalsWellness};
use chrono::NaiveDate;

/// Source type strings that are synced. Everything else is excluded.
pub const SOURCE_TYPE_TABLE: &[(&str, ActivityType)] = &[
    ("Ride", ActivityType::Bike),
    ("Run", ActivityType::Run),
    ("Swim", ActivityType::Swim),
    ("OpenWaterSwim", ActivityType::Swim),
    ("WeightTraining", ActivityType::Workout),
];

/// Look up a source type. Matching is exact: `VirtualRide` is not `Ride`.
pub fn map_source_type(source_type: &str) -> TypeMapping {
    SOURCE_TYPE_TABLE
        .iter()
        .find(|(name, _)| *name == source_type)
        .map(|(_, t)| TypeMapping::Canonical(*t))
        .unwrap_or(TypeMapping::Excluded)
}

/// Normalize one activity. `None` when the type is excluded or the date
/// cannot be read.
pub fn normalize_activity(activity: &IntervalsActivity) -> Option<ActivityRecord> {
    let TypeMapping::Canonical(activity_type) = map_source_type(&activity.activity_type) else {
        tracing::debug!(
            id = %activity.id,
            source_type = %activity.activity_type,
            "Skipping excluded activity type"
        );
        return None;
    };

    let Some(date) = local_date(&activity.start_date_local) else {
        tracing::warn!(
            id = %activity.id,
            start_date_local = %activity.start_date_local,
            "Skipping activity with unreadable start date"
        );
        return None;
    };

    Some(ActivityRecord {
        external_id: activity.id.clone(),
        activity_type,
        distance: format_km(activity.distance.unwrap_or(0.0)),
        duration: whole_minutes(activity.moving_time.unwrap_or(0.0)),
        date,
        description: activity.name.clone().unwrap_or_default(),
        source: SOURCE_INTERVALS.to_string(),
        avg_heart_rate: activity.average_heartrate,
        max_heart_rate: activity.max_heartrate,
        avg_speed: activity.average_speed,
        elevation_gain: activity.total_elevation_gain,
        avg_cadence: activity.average_cadence,
        training_load: activity.icu_training_load,
        intensity: activity.icu_intensity,
        max_power: activity.icu_pm_p_max,
    })
}

/// Normalize a source listing, dropping excluded and unreadable entries.
pub fn normalize_activities(activities: &[IntervalsActivity]) -> Vec<ActivityRecord> {
    activities.iter().filter_map(normalize_activity).collect()
}

/// Normalize wellness entries. Entries without a readable date ID are skipped.
pub fn normalize_wellness(entries: &[IntervalsWellness], updated_at: &str) -> Vec<WellnessRecord> {
    entries
        .iter()
        .filter_map(|entry| {
            let id = entry.id.as_deref()?;
            let Some(date) = local_date(id) else {
                tracing::warn!(id, "Skipping wellness entry with unreadable date");
                return None;
            };
            Some(WellnessRecord {
                date,
                resting_hr: entry.resting_hr,
                steps: entry.steps,
                sleep_secs: entry.sleep_secs,
                sp_o2: entry.sp_o2,
                hrv: entry.hrv,
                weight: entry.weight,
                updated_at: updated_at.to_string(),
            })
        })
        .collect()
}

/// Date portion of a local timestamp (`2025-01-01T08:00:00` or `2025-01-01`).
fn local_date(timestamp: &str) -> Option<NaiveDate> {
    let day = timestamp.split('T').next()?;
    NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d").ok()
}

fn format_km(meters: f64) -> String {
    format!("{:.2}", meters / 1000.0)
}

fn whole_minutes(seconds: f64) -> u32 {
    let minutes = (seconds / 60.0).round();
    if minutes.is_finite() && minutes > 0.0 {
        minutes as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ride() -> IntervalsActivity {
        IntervalsActivity {
            id: "1".to_string(),
            activity_type: "Ride".to_string(),
            start_date_local: "2025-01-01T08:00:00".to_string(),
            distance: Some(20000.0),
            moving_time: Some(3600.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_type_table() {
        assert_eq!(map_source_type("Ride"), TypeMapping::Canonical(ActivityType::Bike));
        assert_eq!(map_source_type("Run"), TypeMapping::Canonical(ActivityType::Run));
        assert_eq!(map_source_type("Swim"), TypeMapping::Canonical(ActivityType::Swim));
        assert_eq!(
            map_source_type("OpenWaterSwim"),
            TypeMapping::Canonical(ActivityType::Swim)
        );
        assert_eq!(
            map_source_type("WeightTraining"),
            TypeMapping::Canonical(ActivityType::Workout)
        );
        assert_eq!(map_source_type("VirtualRide"), TypeMapping::Excluded);
        assert_eq!(map_source_type("ride"), TypeMapping::Excluded);
        assert_eq!(map_source_type(""), TypeMapping::Excluded);
    }

    #[test]
    fn test_normalize_basic_ride() {
        let record = normalize_activity(&ride()).unwrap();
        assert_eq!(record.external_id, "1");
        assert_eq!(record.activity_type, ActivityType::Bike);
        assert_eq!(record.distance, "20.00");
        assert_eq!(record.duration, 60);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(record.source, "intervals.icu");
    }

    #[test]
    fn test_distance_and_duration_rounding() {
        let mut a = ride();
        a.distance = Some(1234.5);
        a.moving_time = Some(89.0);
        let record = normalize_activity(&a).unwrap();
        assert_eq!(record.distance, "1.23");
        assert_eq!(record.duration, 1);

        a.distance = None;
        a.moving_time = Some(29.0);
        let record = normalize_activity(&a).unwrap();
        assert_eq!(record.distance, "0.00");
        assert_eq!(record.duration, 0);
    }

    #[test]
    fn test_excluded_type_is_dropped() {
        let mut a = ride();
        a.activity_type = "VirtualRide".to_string();
        assert!(normalize_activity(&a).is_none());
    }

    #[test]
    fn test_null_vs_zero_biometrics() {
        let mut a = ride();
        a.max_heartrate = Some(0.0);
        let record = normalize_activity(&a).unwrap();
        assert_eq!(record.avg_heart_rate, None);
        assert_eq!(record.max_heart_rate, Some(0.0));

        let doc = serde_json::to_value(&record).unwrap();
        assert!(doc["avgHeartRate"].is_null());
        assert_eq!(doc["maxHeartRate"], 0.0);
    }

    #[test]
    fn test_date_ignores_time_of_day() {
        let mut a = ride();
        a.start_date_local = "2025-06-30T23:59:59".to_string();
        let record = normalize_activity(&a).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());

        a.start_date_local = "yesterday".to_string();
        assert!(normalize_activity(&a).is_none());
    }

    #[test]
    fn test_normalize_wellness_skips_missing_ids() {
        let entries = vec![
            IntervalsWellness {
                id: Some("2025-01-02".to_string()),
                resting_hr: Some(45.0),
                steps: Some(0.0),
                ..Default::default()
            },
            IntervalsWellness::default(),
        ];
        let records = normalize_wellness(&entries, "2025-01-03T00:00:00Z");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].doc_id(), "wellness_2025-01-02");
        assert_eq!(records[0].steps, Some(0.0));
        assert_eq!(records[0].hrv, None);
        assert_eq!(records[0].updated_at, "2025-01-03T00:00:00Z");
    }
}
