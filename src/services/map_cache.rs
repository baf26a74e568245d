// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route cache: `externalId` → processed route.
//!
//! The cache is read fully from its backend once, mutated in memory, and
//! written back wholesale by [`MapCache::flush`] only when something changed.
//! Absence of a key means "not fetched yet"; entries are never removed.

use crate::error::AppError;
use crate::models::Route;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Storage behind a [`MapCache`].
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Read every entry. A backend that has never been written returns an
    /// empty map.
    async fn load(&self) -> Result<HashMap<String, Route>, AppError>;

    /// Replace the stored contents with `entries`.
    async fn store(&self, entries: &HashMap<String, Route>) -> Result<(), AppError>;
}

/// JSON object on disk, `{ "<externalId>": [[lng, lat], ...] }`.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CacheBackend for JsonFileBackend {
    async fn load(&self) -> Result<HashMap<String, Route>, AppError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No map cache yet, starting empty");
                return Ok(HashMap::new());
            }
            Err(e) => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "Failed to read map cache {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Corrupt map cache {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn store(&self, entries: &HashMap<String, Route>) -> Result<(), AppError> {
        let json = serde_json::to_vec(entries)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Serialize map cache: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Internal(anyhow::anyhow!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        // Write then rename; readers never see a partial file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!(path = %self.path.display(), entries = entries.len(), "Map cache written");
        Ok(())
    }
}

/// In-process backend for tests and dry runs.
#[derive(Default)]
pub struct MemoryCacheBackend {
    entries: Mutex<HashMap<String, Route>>,
    stores: Mutex<u32>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate, as if a previous run had written these entries.
    pub fn with_entries(entries: HashMap<String, Route>) -> Self {
        Self {
            entries: Mutex::new(entries),
            stores: Mutex::new(0),
        }
    }

    /// Current stored contents.
    pub fn snapshot(&self) -> HashMap<String, Route> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// How many times `store` has been called.
    pub fn store_count(&self) -> u32 {
        self.stores.lock().map(|n| *n).unwrap_or_default()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn load(&self) -> Result<HashMap<String, Route>, AppError> {
        Ok(self.snapshot())
    }

    async fn store(&self, entries: &HashMap<String, Route>) -> Result<(), AppError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("map cache lock poisoned")))?;
        *guard = entries.clone();
        if let Ok(mut n) = self.stores.lock() {
            *n += 1;
        }
        Ok(())
    }
}

/// Loaded route cache.
pub struct MapCache {
    entries: HashMap<String, Route>,
    dirty: bool,
}

impl MapCache {
    /// Read the whole cache from `backend`.
    pub async fn load(backend: &dyn CacheBackend) -> Result<Self, AppError> {
        let entries = backend.load().await?;
        tracing::debug!(entries = entries.len(), "Map cache loaded");
        Ok(Self {
            entries,
            dirty: false,
        })
    }

    pub fn get(&self, external_id: &str) -> Option<&Route> {
        self.entries.get(external_id)
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.entries.contains_key(external_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace entries in memory.
    pub fn set_many<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, Route)>,
    {
        for (id, route) in entries {
            self.entries.insert(id, route);
            self.dirty = true;
        }
    }

    /// Whether there are in-memory changes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write back to `backend` if anything changed. Returns whether a write
    /// happened.
    pub async fn flush(&mut self, backend: &dyn CacheBackend) -> Result<bool, AppError> {
        if !self.dirty {
            return Ok(false);
        }
        backend.store(&self.entries).await?;
        self.dirty = false;
        Ok(true)
    }
}
