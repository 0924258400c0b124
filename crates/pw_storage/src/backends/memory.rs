use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use pw_core::{Analysis, Article, Batch, DocumentStore, Error, Result};

#[derive(Default)]
struct Inner {
    articles: Vec<Article>,
    batches: HashMap<String, Batch>,
}

/// In-memory document store behind a tokio `RwLock`.
///
/// The write lock gives every mutation, including the enriching-flag
/// compare-and-set, the same atomicity a real store provides per document.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_article(&self, article: &Article) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner
            .articles
            .iter()
            .any(|a| a.user_id == article.user_id && a.article_id == article.article_id)
        {
            return Err(Error::AlreadyExists(format!(
                "article {}",
                article.article_id
            )));
        }
        inner.articles.push(article.clone());
        Ok(())
    }

    async fn get_article(&self, user_id: &str, article_id: &str) -> Result<Option<Article>> {
        let inner = self.inner.read().await;
        Ok(inner
            .articles
            .iter()
            .find(|a| a.user_id == user_id && a.article_id == article_id)
            .cloned())
    }

    async fn get_articles_by_ids(
        &self,
        user_id: &str,
        article_ids: &[String],
    ) -> Result<Vec<Article>> {
        let inner = self.inner.read().await;
        Ok(article_ids
            .iter()
            .filter_map(|id| {
                inner
                    .articles
                    .iter()
                    .find(|a| a.user_id == user_id && &a.article_id == id)
                    .cloned()
            })
            .collect())
    }

    async fn update_article_enrichment(
        &self,
        user_id: &str,
        id: Uuid,
        analysis: &Analysis,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let article = inner
            .articles
            .iter_mut()
            .find(|a| a.user_id == user_id && a.id == id)
            .ok_or_else(|| Error::NotFound(format!("article {}", id)))?;
        article.ai_summary = analysis.summary.clone();
        article.ai_sentiment_label = analysis.sentiment_label.clone();
        article.ai_sentiment_score = analysis.sentiment_score;
        Ok(())
    }

    async fn list_articles(
        &self,
        user_id: &str,
        update_id: Option<&str>,
        page: usize,
        limit: usize,
    ) -> Result<(Vec<Article>, usize)> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Article> = inner
            .articles
            .iter()
            .filter(|a| {
                a.user_id == user_id
                    && match update_id {
                        Some(uid) => a.update_id.as_deref() == Some(uid),
                        None => true,
                    }
            })
            .cloned()
            .collect();
        let total = matches.len();
        sort_newest_first(&mut matches);
        let start = (page - 1).saturating_mul(limit);
        let items = matches.into_iter().skip(start).take(limit).collect();
        Ok((items, total))
    }

    async fn batch_articles(&self, user_id: &str, update_id: &str) -> Result<Vec<Article>> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Article> = inner
            .articles
            .iter()
            .filter(|a| a.user_id == user_id && a.update_id.as_deref() == Some(update_id))
            .cloned()
            .collect();
        sort_newest_first(&mut matches);
        Ok(matches)
    }

    async fn insert_batch(&self, batch: &Batch) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.batches.contains_key(&batch.update_id) {
            return Err(Error::AlreadyExists(format!("batch {}", batch.update_id)));
        }
        inner.batches.insert(batch.update_id.clone(), batch.clone());
        Ok(())
    }

    async fn get_batch(&self, update_id: &str) -> Result<Option<Batch>> {
        let inner = self.inner.read().await;
        Ok(inner.batches.get(update_id).cloned())
    }

    async fn list_batches(
        &self,
        user_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<(Vec<Batch>, usize)> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Batch> = inner
            .batches
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        let total = matches.len();
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.update_id.cmp(&b.update_id))
        });
        let start = (page - 1).saturating_mul(limit);
        let items = matches.into_iter().skip(start).take(limit).collect();
        Ok((items, total))
    }

    async fn try_begin_enrichment(&self, user_id: &str, update_id: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let batch = inner
            .batches
            .get_mut(update_id)
            .filter(|b| b.user_id == user_id)
            .ok_or_else(|| Error::NotFound(format!("batch {}", update_id)))?;
        if batch.enriching {
            return Ok(false);
        }
        batch.enriching = true;
        batch.updated_at = Utc::now();
        Ok(true)
    }

    async fn finish_enrichment(
        &self,
        user_id: &str,
        update_id: &str,
        failed_article_ids: &[String],
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let batch = inner
            .batches
            .get_mut(update_id)
            .filter(|b| b.user_id == user_id)
            .ok_or_else(|| Error::NotFound(format!("batch {}", update_id)))?;
        batch.enriching = false;
        batch.failed_article_ids = failed_article_ids.to_vec();
        batch.updated_at = Utc::now();
        Ok(())
    }
}
