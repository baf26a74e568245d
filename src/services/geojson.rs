// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Published map assembly: stored activity records joined with cached routes.

use crate::models::{MapDocument, Route, StoredActivity};
use crate::services::map_cache::MapCache;
use geo::{BoundingRect, Coord, LineString};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use std::collections::HashSet;

/// Build the FeatureCollection for every stored activity with a cached route.
///
/// Records without an external ID (manual logs), of a type that carries no
/// route, or without a cache entry are left out. Each external ID contributes
/// at most one feature.
pub fn assemble(records: &[StoredActivity], cache: &MapCache) -> FeatureCollection {
    let mut seen = HashSet::new();
    let mut features = Vec::new();
    let mut lines: Vec<LineString<f64>> = Vec::new();

    for stored in records {
        let Some(external_id) = stored.external_id.as_deref() else {
            continue;
        };
        let Some(activity_type) = stored.activity_type.filter(|t| t.is_mappable()) else {
            continue;
        };
        let Some(route) = cache.get(external_id).filter(|r| !r.is_empty()) else {
            continue;
        };
        if !seen.insert(external_id) {
            continue;
        }

        let line = to_line_string(route);

        let mut properties = JsonObject::new();
        properties.insert("type".to_string(), activity_type.as_str().into());
        properties.insert("id".to_string(), external_id.into());

        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&line))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
        lines.push(line);
    }

    FeatureCollection {
        bbox: bounding_box(&lines),
        features,
        foreign_members: None,
    }
}

/// Assemble and wrap with summary counts.
pub fn build_map_document(
    records: &[StoredActivity],
    cache: &MapCache,
    updated_at: &str,
) -> MapDocument {
    let geo_json = assemble(records, cache);
    let total_points = geo_json
        .features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(|g| match &g.value {
            geojson::Value::LineString(points) => points.len(),
            _ => 0,
        })
        .sum();

    MapDocument {
        total_paths: geo_json.features.len(),
        total_points,
        geo_json,
        updated_at: updated_at.to_string(),
    }
}

fn to_line_string(route: &Route) -> LineString<f64> {
    route
        .iter()
        .map(|[lng, lat]| Coord { x: *lng, y: *lat })
        .collect()
}

/// `[west, south, east, north]` over all lines.
fn bounding_box(lines: &[LineString<f64>]) -> Option<Vec<f64>> {
    lines
        .iter()
        .filter_map(|line| line.bounding_rect())
        .reduce(|a, b| {
            geo::Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
        .map(|r| vec![r.min().x, r.min().y, r.max().x, r.max().y])
}
