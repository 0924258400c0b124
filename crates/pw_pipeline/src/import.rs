use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use pw_core::{Article, Batch, DocumentStore, Error, Result, PERSONAL_SEARCH_ID};

use crate::registry::BatchRegistry;

/// One inbound item, as handed over by the (upstream-validated) API layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewArticle {
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
    /// Business identifier; generated when absent.
    #[serde(default)]
    pub article_id: Option<String>,
}

impl NewArticle {
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// An item that failed validation during a batch import.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedItem {
    pub index: usize,
    pub field: &'static str,
    pub reason: String,
}

/// Outcome of a batch import. Valid items are persisted even when some
/// siblings are rejected; the rejects are listed here rather than failing
/// the whole call.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub batch: Batch,
    pub imported: Vec<Article>,
    pub rejected: Vec<RejectedItem>,
}

impl ImportReport {
    pub fn is_partial(&self) -> bool {
        !self.rejected.is_empty()
    }
}

/// Accepts raw content, attaches owner and batch identity, and persists
/// Article entities with explicit construction-time defaults.
pub struct ImportCoordinator {
    store: Arc<dyn DocumentStore>,
    registry: BatchRegistry,
}

impl ImportCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let registry = BatchRegistry::new(store.clone());
        Self { store, registry }
    }

    /// Import one article, standalone or appended to an existing batch.
    pub async fn import_single(
        &self,
        user_id: &str,
        item: NewArticle,
        update_id: Option<&str>,
    ) -> Result<Article> {
        if let Some(uid) = update_id {
            // Must exist and belong to the caller.
            self.registry.get_batch(user_id, uid).await?;
        }
        let article = build_article(user_id, item, update_id)?;
        self.store.insert_article(&article).await?;
        info!("📥 Imported article {} for user {}", article.article_id, user_id);
        Ok(article)
    }

    /// Import a group of articles under one batch, creating the batch when
    /// no `update_id` is supplied.
    pub async fn import_batch(
        &self,
        user_id: &str,
        items: Vec<NewArticle>,
        update_id: Option<&str>,
    ) -> Result<ImportReport> {
        if items.is_empty() {
            return Err(Error::invalid_input("items", "must not be empty"));
        }

        let batch = match update_id {
            Some(uid) => self.registry.get_batch(user_id, uid).await?,
            None => self.registry.create_batch(user_id, None).await?,
        };

        let mut imported = Vec::new();
        let mut rejected = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            match build_article(user_id, item, Some(&batch.update_id)) {
                Ok(article) => match self.store.insert_article(&article).await {
                    Ok(()) => imported.push(article),
                    Err(Error::AlreadyExists(reason)) => rejected.push(RejectedItem {
                        index,
                        field: "article_id",
                        reason,
                    }),
                    Err(e) => return Err(e),
                },
                Err(Error::InvalidInput { field, reason }) => {
                    rejected.push(RejectedItem { index, field, reason })
                }
                Err(e) => return Err(e),
            }
        }

        if rejected.is_empty() {
            info!(
                "📥 Imported {} articles into batch {}",
                imported.len(),
                batch.update_id
            );
        } else {
            warn!(
                "📥 Imported {} articles into batch {}, rejected {}",
                imported.len(),
                batch.update_id,
                rejected.len()
            );
        }

        Ok(ImportReport {
            batch,
            imported,
            rejected,
        })
    }
}

fn build_article(user_id: &str, item: NewArticle, update_id: Option<&str>) -> Result<Article> {
    if item.content.trim().is_empty() {
        return Err(Error::invalid_input("content", "must not be empty"));
    }
    if let Some(id) = &item.article_id {
        if id.trim().is_empty() {
            return Err(Error::invalid_input("article_id", "must not be empty when given"));
        }
    }

    let now = Utc::now();
    let id = Uuid::new_v4();
    Ok(Article {
        id,
        article_id: item
            .article_id
            .unwrap_or_else(|| id.simple().to_string()),
        content: item.content,
        title: item.title.unwrap_or_default(),
        website: item.website.unwrap_or_default(),
        publish_date: item.publish_date.unwrap_or(now),
        search_id: PERSONAL_SEARCH_ID.to_string(),
        user_id: user_id.to_string(),
        update_id: update_id.map(str::to_string),
        ai_summary: Vec::new(),
        ai_sentiment_label: String::new(),
        ai_sentiment_score: 0.0,
        created_at: now,
    })
}
