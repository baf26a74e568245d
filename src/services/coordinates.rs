// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route coordinate processing: fixed-stride downsampling and `(lat, lng)` to
//! `(lng, lat)` reprojection.

use crate::models::Route;
use serde_json::Value;

/// Keep every 5th point by original index (0, 5, 10, ...).
pub const DOWNSAMPLE_STRIDE: usize = 5;

/// Downsample and reproject a raw point list into `[lng, lat]` pairs.
///
/// Points may be `[lat, lng, ...]` arrays or `{lat, lng}` / `{lat, lon}`
/// objects. Malformed points are dropped, never defaulted. Anything that is
/// not a list yields an empty route.
pub fn process_coordinates(raw: &Value) -> Route {
    let Some(points) = raw.as_array() else {
        return Vec::new();
    };

    points
        .iter()
        .step_by(DOWNSAMPLE_STRIDE)
        .filter_map(parse_point)
        .collect()
}

/// Parse one source point into `[lng, lat]`.
fn parse_point(point: &Value) -> Option<[f64; 2]> {
    let (lat, lng) = match point {
        Value::Array(items) if items.len() >= 2 => (items[0].as_f64()?, items[1].as_f64()?),
        Value::Object(fields) => {
            let lat = fields.get("lat")?.as_f64()?;
            let lng = fields
                .get("lng")
                .and_then(Value::as_f64)
                .or_else(|| fields.get("lon").and_then(Value::as_f64))?;
            (lat, lng)
        }
        _ => return None,
    };

    is_valid_position(lat, lng).then_some([lng, lat])
}

fn is_valid_position(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}
