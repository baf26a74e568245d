// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`DocumentStore`] is what the sync engine writes through. [`FirestoreDb`]
//! is the production store; [`MemoryStore`] backs tests and offline runs.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{ActivityWrite, MapDocument, StoredActivity, WellnessRecord};
use async_trait::async_trait;
use ring::rand::{SecureRandom, SystemRandom};

/// Collection names as constants.
pub mod collections {
    /// Activity records, synced and manual
    pub const ACTIVITIES: &str = "ironman_logs";
    /// Daily wellness, keyed `wellness_<date>`
    pub const WELLNESS: &str = "daily_wellness";
    /// Derived documents for the frontend
    pub const MISSION_DATA: &str = "mission_data";
    /// Document ID of the published map within `mission_data`
    pub const MAP_DOC_ID: &str = "paths";
}

const DOCUMENT_ID_LEN: usize = 20;
const DOCUMENT_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// New random document ID, 20 alphanumeric characters.
pub fn generate_document_id() -> Result<String, AppError> {
    let rng = SystemRandom::new();
    let mut id = String::with_capacity(DOCUMENT_ID_LEN);
    let mut buf = [0u8; 32];

    while id.len() < DOCUMENT_ID_LEN {
        rng.fill(&mut buf)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
        // Only bytes below 62 * 4 = 248 are used.
        for b in buf.iter().filter(|b| **b < 248) {
            if id.len() == DOCUMENT_ID_LEN {
                break;
            }
            id.push(DOCUMENT_ID_ALPHABET[(*b % 62) as usize] as char);
        }
    }

    Ok(id)
}

/// All writes produced by one sync pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncBatch {
    pub activities: Vec<ActivityWrite>,
    pub wellness: Vec<WellnessRecord>,
}

impl SyncBatch {
    pub fn len(&self) -> usize {
        self.activities.len() + self.wellness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Persistence used by sync.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read every document in the activities collection.
    async fn load_activities(&self) -> Result<Vec<StoredActivity>, AppError>;

    /// Apply a batch. Each document is replaced whole; the batch is atomic
    /// where the backend allows it.
    async fn commit_sync(&self, batch: &SyncBatch) -> Result<(), AppError>;

    /// Replace the published map document.
    async fn publish_map(&self, doc: &MapDocument) -> Result<(), AppError>;

    /// The currently published map document, if any.
    async fn get_map_document(&self) -> Result<Option<MapDocument>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_ids_are_alphanumeric_and_distinct() {
        let a = generate_document_id().unwrap();
        let b = generate_document_id().unwrap();
        assert_eq!(a.len(), 20);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
