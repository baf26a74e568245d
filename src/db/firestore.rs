// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper.
//!
//! Provides the [`DocumentStore`] operations over:
//! - `ironman_logs` (activity records, synced and manual)
//! - `daily_wellness` (one document per day)
//! - `mission_data/paths` (the published map)

use super::{collections, DocumentStore, SyncBatch};
use crate::error::AppError;
use crate::models::{MapDocument, StoredActivity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Map document as stored in Firestore.
///
/// Firestore rejects arrays nested directly in arrays, which rules out
/// LineString coordinates, so the collection is kept as a JSON string.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMapDocument {
    #[serde(rename = "geoJSON")]
    geo_json: String,
    total_paths: usize,
    total_points: usize,
    updated_at: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns an error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

/// Last path segment of a full document name.
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn load_activities(&self) -> Result<Vec<StoredActivity>, AppError> {
        let docs = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut activities = Vec::with_capacity(docs.len());
        for doc in &docs {
            let id = document_id(&doc.name);
            match firestore::FirestoreDb::deserialize_doc_to::<serde_json::Value>(doc) {
                Ok(body) => activities.push(StoredActivity::from_document(id, &body)),
                Err(e) => {
                    tracing::warn!(doc_id = id, error = %e, "Skipping unreadable activity document");
                }
            }
        }

        tracing::debug!(count = activities.len(), "Loaded activity documents");
        Ok(activities)
    }

    async fn commit_sync(&self, batch: &SyncBatch) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut writes: Vec<(&str, String, serde_json::Value)> = Vec::with_capacity(batch.len());
        for write in &batch.activities {
            writes.push((collections::ACTIVITIES, write.id.clone(), write.to_document()));
        }
        for record in &batch.wellness {
            writes.push((collections::WELLNESS, record.doc_id(), record.to_document()));
        }

        for chunk in writes.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for (collection, doc_id, body) in chunk {
                client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(doc_id)
                    .object(body)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add {} write to transaction: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        }

        tracing::info!(
            activities = batch.activities.len(),
            wellness = batch.wellness.len(),
            "Sync batch committed"
        );
        Ok(())
    }

    async fn publish_map(&self, doc: &MapDocument) -> Result<(), AppError> {
        let stored = StoredMapDocument {
            geo_json: serde_json::to_string(&doc.geo_json)
                .map_err(|e| AppError::Database(format!("Serialize map: {}", e)))?,
            total_paths: doc.total_paths,
            total_points: doc.total_points,
            updated_at: doc.updated_at.clone(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::MISSION_DATA)
            .document_id(collections::MAP_DOC_ID)
            .object(&stored)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_map_document(&self) -> Result<Option<MapDocument>, AppError> {
        let stored: Option<StoredMapDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::MISSION_DATA)
            .obj()
            .one(collections::MAP_DOC_ID)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        stored
            .map(|s| {
                let geo_json = serde_json::from_str(&s.geo_json)
                    .map_err(|e| AppError::Database(format!("Corrupt map document: {}", e)))?;
                Ok(MapDocument {
                    geo_json,
                    total_paths: s.total_paths,
                    total_points: s.total_points,
                    updated_at: s.updated_at,
                })
            })
            .transpose()
    }
}
