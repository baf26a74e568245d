// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod coordinates;
pub mod geojson;
pub mod intervals;
pub mod map_cache;
pub mod normalizer;
pub mod rate_limit;
pub mod route_batcher;
pub mod sync;

pub use intervals::{ActivitySource, IntervalsClient};
pub use map_cache::{CacheBackend, JsonFileBackend, MapCache, MemoryCacheBackend};
pub use route_batcher::RouteFetchBatcher;
pub use sync::{MapSyncReport, SyncEngine, SyncReport, SyncSettings};
