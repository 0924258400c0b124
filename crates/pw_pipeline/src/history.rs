use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use pw_core::{BatchStatus, DocumentStore, Error, Result};

use crate::registry::BatchRegistry;

/// A batch as shown in a user's history, annotated with its computed
/// status so callers can observe progress without a separate query.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub update_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: BatchStatus,
}

pub struct HistoryService {
    store: Arc<dyn DocumentStore>,
    registry: BatchRegistry,
}

impl HistoryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let registry = BatchRegistry::new(store.clone());
        Self { store, registry }
    }

    /// A user's batches, newest first.
    pub async fn list_batches(
        &self,
        user_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<(Vec<BatchSummary>, usize)> {
        if page < 1 {
            return Err(Error::invalid_input("page", "must be at least 1"));
        }
        if limit < 1 {
            return Err(Error::invalid_input("limit", "must be at least 1"));
        }

        let (batches, total) = self.store.list_batches(user_id, page, limit).await?;
        let mut items = Vec::with_capacity(batches.len());
        for batch in batches {
            let status = self.registry.compute_status(&batch.update_id).await?;
            items.push(BatchSummary {
                update_id: batch.update_id,
                created_at: batch.created_at,
                updated_at: batch.updated_at,
                status,
            });
        }
        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportCoordinator, NewArticle};
    use pw_storage::MemoryStore;

    #[tokio::test]
    async fn test_history_orders_by_recency_and_annotates_status() {
        let store = Arc::new(MemoryStore::new());
        let importer = ImportCoordinator::new(store.clone() as Arc<dyn DocumentStore>);
        let history = HistoryService::new(store.clone() as Arc<dyn DocumentStore>);

        let first = importer
            .import_batch("u1", vec![NewArticle::from_content("older")], None)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = importer
            .import_batch("u1", vec![NewArticle::from_content("newer")], None)
            .await
            .unwrap();

        let (items, total) = history.list_batches("u1", 1, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(items[0].update_id, second.batch.update_id);
        assert_eq!(items[1].update_id, first.batch.update_id);
        for item in &items {
            assert_eq!(item.status, BatchStatus::Pending);
        }
    }

    #[tokio::test]
    async fn test_history_reflects_in_progress_batches() {
        let store = Arc::new(MemoryStore::new());
        let importer = ImportCoordinator::new(store.clone() as Arc<dyn DocumentStore>);
        let history = HistoryService::new(store.clone() as Arc<dyn DocumentStore>);

        let report = importer
            .import_batch("u1", vec![NewArticle::from_content("busy")], None)
            .await
            .unwrap();
        store
            .try_begin_enrichment("u1", &report.batch.update_id)
            .await
            .unwrap();

        let (items, _) = history.list_batches("u1", 1, 10).await.unwrap();
        assert_eq!(items[0].status, BatchStatus::InProgress);
    }

    #[tokio::test]
    async fn test_history_is_owner_scoped_and_paginated() {
        let store = Arc::new(MemoryStore::new());
        let importer = ImportCoordinator::new(store.clone() as Arc<dyn DocumentStore>);
        let history = HistoryService::new(store.clone() as Arc<dyn DocumentStore>);

        for i in 0..3 {
            importer
                .import_batch("u1", vec![NewArticle::from_content(format!("n{}", i))], None)
                .await
                .unwrap();
        }
        importer
            .import_batch("u2", vec![NewArticle::from_content("other user")], None)
            .await
            .unwrap();

        let (items, total) = history.list_batches("u1", 1, 2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 2);

        let (rest, _) = history.list_batches("u1", 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);

        assert!(matches!(
            history.list_batches("u1", 0, 2).await,
            Err(Error::InvalidInput { .. })
        ));
    }
}
