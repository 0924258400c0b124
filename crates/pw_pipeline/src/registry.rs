use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use pw_core::{Article, Batch, BatchStatus, DocumentStore, Error, Result};

/// Creates and resolves batch identities and derives per-batch status.
#[derive(Clone)]
pub struct BatchRegistry {
    store: Arc<dyn DocumentStore>,
}

impl BatchRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create a batch with status `pending`. A caller-supplied `update_id`
    /// must be free; a generated one is collision-checked against the store.
    pub async fn create_batch(&self, user_id: &str, update_id: Option<&str>) -> Result<Batch> {
        let update_id = match update_id {
            Some(id) => {
                if id.trim().is_empty() {
                    return Err(Error::invalid_input("update_id", "must not be empty"));
                }
                if self.store.get_batch(id).await?.is_some() {
                    return Err(Error::AlreadyExists(format!("batch {}", id)));
                }
                id.to_string()
            }
            None => self.generate_update_id().await?,
        };

        let batch = Batch::new(user_id, &update_id);
        self.store.insert_batch(&batch).await?;
        debug!("created batch {} for user {}", batch.update_id, user_id);
        Ok(batch)
    }

    async fn generate_update_id(&self) -> Result<String> {
        loop {
            let candidate = Uuid::new_v4().simple().to_string();
            if self.store.get_batch(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
    }

    /// Owner-scoped lookup. A batch owned by another user is reported as
    /// absent, so batch identifiers leak nothing across accounts.
    pub async fn get_batch(&self, user_id: &str, update_id: &str) -> Result<Batch> {
        match self.store.get_batch(update_id).await? {
            Some(batch) if batch.user_id == user_id => Ok(batch),
            _ => Err(Error::NotFound(format!("batch {}", update_id))),
        }
    }

    /// Lookup for the enrichment path, which distinguishes a missing batch
    /// from one owned by someone else.
    pub async fn authorize(&self, user_id: &str, update_id: &str) -> Result<Batch> {
        match self.store.get_batch(update_id).await? {
            None => Err(Error::NotFound(format!("batch {}", update_id))),
            Some(batch) if batch.user_id != user_id => {
                Err(Error::Forbidden(format!("batch {}", update_id)))
            }
            Some(batch) => Ok(batch),
        }
    }

    /// Derive the batch status from its articles' enrichment state.
    pub async fn compute_status(&self, update_id: &str) -> Result<BatchStatus> {
        let batch = self
            .store
            .get_batch(update_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("batch {}", update_id)))?;
        let articles = self.store.batch_articles(&batch.user_id, update_id).await?;
        Ok(Self::aggregate(&batch, &articles))
    }

    pub(crate) fn aggregate(batch: &Batch, articles: &[Article]) -> BatchStatus {
        if batch.enriching {
            return BatchStatus::InProgress;
        }
        if articles.is_empty() {
            return BatchStatus::Pending;
        }
        let enriched = articles.iter().filter(|a| a.is_enriched()).count();
        if enriched == articles.len() {
            return BatchStatus::Completed;
        }
        if enriched > 0 {
            return BatchStatus::PartiallyCompleted;
        }
        // Nothing enriched: failed only when every article exhausted its
        // retries in the last run, otherwise the batch is still pending.
        let all_failed = articles
            .iter()
            .all(|a| batch.failed_article_ids.contains(&a.article_id));
        if all_failed {
            BatchStatus::Failed
        } else {
            BatchStatus::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pw_core::{Analysis, PERSONAL_SEARCH_ID};
    use pw_storage::MemoryStore;

    fn article(user_id: &str, article_id: &str, update_id: &str) -> Article {
        let now = Utc::now();
        Article {
            id: Uuid::new_v4(),
            article_id: article_id.to_string(),
            content: "content".to_string(),
            title: String::new(),
            website: String::new(),
            publish_date: now,
            search_id: PERSONAL_SEARCH_ID.to_string(),
            user_id: user_id.to_string(),
            update_id: Some(update_id.to_string()),
            ai_summary: Vec::new(),
            ai_sentiment_label: String::new(),
            ai_sentiment_score: 0.0,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_batch_rejects_duplicates() {
        let store = Arc::new(MemoryStore::new());
        let registry = BatchRegistry::new(store);

        registry.create_batch("u1", Some("b1")).await.unwrap();
        let err = registry.create_batch("u1", Some("b1")).await;
        assert!(matches!(err, Err(Error::AlreadyExists(_))));
        // Identifiers are globally unique, even across users.
        let err = registry.create_batch("u2", Some("b1")).await;
        assert!(matches!(err, Err(Error::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_generated_ids_are_unique() {
        let store = Arc::new(MemoryStore::new());
        let registry = BatchRegistry::new(store);

        let a = registry.create_batch("u1", None).await.unwrap();
        let b = registry.create_batch("u1", None).await.unwrap();
        assert_ne!(a.update_id, b.update_id);
    }

    #[tokio::test]
    async fn test_get_batch_hides_other_owners() {
        let store = Arc::new(MemoryStore::new());
        let registry = BatchRegistry::new(store);
        registry.create_batch("u1", Some("b1")).await.unwrap();

        assert!(registry.get_batch("u1", "b1").await.is_ok());
        assert!(matches!(
            registry.get_batch("u2", "b1").await,
            Err(Error::NotFound(_))
        ));
        // The enrichment path distinguishes ownership from absence.
        assert!(matches!(
            registry.authorize("u2", "b1").await,
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            registry.authorize("u1", "missing").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_aggregation() {
        let store = Arc::new(MemoryStore::new());
        let registry = BatchRegistry::new(store.clone());
        registry.create_batch("u1", Some("b1")).await.unwrap();

        // No articles yet.
        assert_eq!(
            registry.compute_status("b1").await.unwrap(),
            BatchStatus::Pending
        );

        let a1 = article("u1", "a1", "b1");
        let a2 = article("u1", "a2", "b1");
        store.insert_article(&a1).await.unwrap();
        store.insert_article(&a2).await.unwrap();
        assert_eq!(
            registry.compute_status("b1").await.unwrap(),
            BatchStatus::Pending
        );

        // The enriching flag dominates everything else.
        store.try_begin_enrichment("u1", "b1").await.unwrap();
        assert_eq!(
            registry.compute_status("b1").await.unwrap(),
            BatchStatus::InProgress
        );
        store.finish_enrichment("u1", "b1", &[]).await.unwrap();

        let analysis = Analysis {
            summary: vec!["point".to_string()],
            sentiment_label: "neutral".to_string(),
            sentiment_score: 0.5,
        };
        store
            .update_article_enrichment("u1", a1.id, &analysis)
            .await
            .unwrap();
        assert_eq!(
            registry.compute_status("b1").await.unwrap(),
            BatchStatus::PartiallyCompleted
        );

        store
            .update_article_enrichment("u1", a2.id, &analysis)
            .await
            .unwrap();
        assert_eq!(
            registry.compute_status("b1").await.unwrap(),
            BatchStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_status_failed_when_all_articles_exhausted_retries() {
        let store = Arc::new(MemoryStore::new());
        let registry = BatchRegistry::new(store.clone());
        registry.create_batch("u1", Some("b1")).await.unwrap();
        store
            .insert_article(&article("u1", "a1", "b1"))
            .await
            .unwrap();

        store.try_begin_enrichment("u1", "b1").await.unwrap();
        store
            .finish_enrichment("u1", "b1", &["a1".to_string()])
            .await
            .unwrap();

        assert_eq!(
            registry.compute_status("b1").await.unwrap(),
            BatchStatus::Failed
        );
    }
}
