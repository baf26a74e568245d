// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route geometry and the published map document.

use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

/// Processed route: `[longitude, latitude]` pairs, already downsampled.
pub type Route = Vec<[f64; 2]>;

/// The single published map document (`mission_data/paths`).
///
/// A derived view over activity records and the route cache; it is rebuilt
/// wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDocument {
    #[serde(rename = "geoJSON")]
    pub geo_json: FeatureCollection,
    /// Number of features
    pub total_paths: usize,
    /// Sum of coordinates across all features
    pub total_points: usize,
    /// When this document was built (RFC 3339)
    pub updated_at: String,
}
