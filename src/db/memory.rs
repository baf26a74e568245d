// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store.

use super::{collections, DocumentStore, SyncBatch};
use crate::error::AppError;
use crate::models::{MapDocument, StoredActivity};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

type Collections = HashMap<String, BTreeMap<String, Value>>;

/// Document store held in process memory.
///
/// Documents are raw JSON, so tests can seed shapes the sync engine never
/// writes (manual logs, legacy fields).
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    commits: Mutex<u32>,
    fail_commits: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, AppError> {
        self.collections
            .lock()
            .map_err(|_| AppError::Database("memory store lock poisoned".to_string()))
    }

    /// Insert or replace a raw document.
    pub fn insert_raw(&self, collection: &str, id: &str, doc: Value) {
        if let Ok(mut cols) = self.lock() {
            cols.entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), doc);
        }
    }

    /// A raw document, if present.
    pub fn get_raw(&self, collection: &str, id: &str) -> Option<Value> {
        self.lock()
            .ok()?
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned()
    }

    /// All documents in a collection, ordered by ID.
    pub fn documents(&self, collection: &str) -> Vec<(String, Value)> {
        self.lock()
            .ok()
            .and_then(|cols| cols.get(collection).cloned())
            .map(|c| c.into_iter().collect())
            .unwrap_or_default()
    }

    /// Number of successful `commit_sync` calls.
    pub fn commit_count(&self) -> u32 {
        self.commits.lock().map(|n| *n).unwrap_or_default()
    }

    /// Make every following `commit_sync` fail.
    pub fn fail_commits(&self, fail: bool) {
        if let Ok(mut f) = self.fail_commits.lock() {
            *f = fail;
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load_activities(&self) -> Result<Vec<StoredActivity>, AppError> {
        Ok(self
            .documents(collections::ACTIVITIES)
            .iter()
            .map(|(id, doc)| StoredActivity::from_document(id.clone(), doc))
            .collect())
    }

    async fn commit_sync(&self, batch: &SyncBatch) -> Result<(), AppError> {
        if self.fail_commits.lock().map(|f| *f).unwrap_or(false) {
            return Err(AppError::Database("commit rejected".to_string()));
        }

        // Build every document first so the batch applies all-or-nothing.
        let mut staged = Vec::with_capacity(batch.len());
        for write in &batch.activities {
            staged.push((collections::ACTIVITIES, write.id.clone(), write.to_document()));
        }
        for record in &batch.wellness {
            staged.push((collections::WELLNESS, record.doc_id(), record.to_document()));
        }

        let mut cols = self.lock()?;
        for (collection, id, doc) in staged {
            cols.entry(collection.to_string()).or_default().insert(id, doc);
        }
        drop(cols);

        if let Ok(mut n) = self.commits.lock() {
            *n += 1;
        }
        Ok(())
    }

    async fn publish_map(&self, doc: &MapDocument) -> Result<(), AppError> {
        let value = serde_json::to_value(doc)
            .map_err(|e| AppError::Database(format!("Serialize map document: {}", e)))?;
        self.insert_raw(collections::MISSION_DATA, collections::MAP_DOC_ID, value);
        Ok(())
    }

    async fn get_map_document(&self) -> Result<Option<MapDocument>, AppError> {
        self.get_raw(collections::MISSION_DATA, collections::MAP_DOC_ID)
            .map(|v| {
                serde_json::from_value(v)
                    .map_err(|e| AppError::Database(format!("Corrupt map document: {}", e)))
            })
            .transpose()
    }
}
