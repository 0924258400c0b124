use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use pw_core::{Article, BatchStatus, DocumentStore, EnrichmentClient, Error, Result};

use crate::registry::BatchRegistry;

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Maximum number of in-flight analysis calls per run.
    pub concurrency: usize,
    /// Extra attempts after the first, for transient failures only.
    pub max_retries: u32,
    /// First backoff delay; doubled on every subsequent retry.
    pub retry_base_delay: Duration,
    /// Wall-clock budget for the run. Once elapsed, no new per-article
    /// work is dispatched; in-flight calls are allowed to finish.
    pub deadline: Option<Duration>,
    /// Re-process articles that are already enriched.
    pub re_enrich: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            max_retries: 2,
            retry_base_delay: Duration::from_millis(200),
            deadline: None,
            re_enrich: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedArticle {
    pub article_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentReport {
    pub update_id: String,
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedArticle>,
    /// Articles never dispatched because the deadline elapsed first.
    pub skipped: Vec<String>,
    pub status: BatchStatus,
}

enum Outcome {
    Succeeded(String),
    Failed(String, String),
    Skipped(String),
}

/// Drives concurrent enrichment of a batch's articles with bounded
/// fan-out, per-article retries, and partial-failure tolerance.
pub struct EnrichmentCoordinator {
    store: Arc<dyn DocumentStore>,
    client: Arc<dyn EnrichmentClient>,
    registry: BatchRegistry,
    options: EnrichOptions,
}

impl EnrichmentCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>, client: Arc<dyn EnrichmentClient>) -> Self {
        let registry = BatchRegistry::new(store.clone());
        Self {
            store,
            client,
            registry,
            options: EnrichOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EnrichOptions) -> Self {
        self.options = options;
        self
    }

    /// Enrich every unenriched article in the batch (or all of them when
    /// re-enrich is requested). At most one run per batch is active at a
    /// time; a concurrent call fails with `Conflict`.
    pub async fn enrich_batch(&self, user_id: &str, update_id: &str) -> Result<EnrichmentReport> {
        self.registry.authorize(user_id, update_id).await?;

        // Store-level compare-and-set acts as the soft lock, so the
        // exclusion holds across service instances, not just this process.
        if !self.store.try_begin_enrichment(user_id, update_id).await? {
            return Err(Error::Conflict(format!(
                "enrichment already in progress for batch {}",
                update_id
            )));
        }

        match self.run(user_id, update_id).await {
            Ok((succeeded, failed, skipped)) => {
                let failed_ids: Vec<String> =
                    failed.iter().map(|f| f.article_id.clone()).collect();
                self.store
                    .finish_enrichment(user_id, update_id, &failed_ids)
                    .await?;
                let status = self.registry.compute_status(update_id).await?;
                info!(
                    "🧠 Batch {} enriched: {} succeeded, {} failed, {} skipped, status {}",
                    update_id,
                    succeeded.len(),
                    failed.len(),
                    skipped.len(),
                    status
                );
                Ok(EnrichmentReport {
                    update_id: update_id.to_string(),
                    succeeded,
                    failed,
                    skipped,
                    status,
                })
            }
            Err(e) => {
                // Release the lock; surface the run's error, not the
                // unlock error.
                if let Err(unlock) = self.store.finish_enrichment(user_id, update_id, &[]).await {
                    warn!(
                        "failed to release enrichment lock for batch {}: {}",
                        update_id, unlock
                    );
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        user_id: &str,
        update_id: &str,
    ) -> Result<(Vec<String>, Vec<FailedArticle>, Vec<String>)> {
        let articles = self.store.batch_articles(user_id, update_id).await?;
        let selected: Vec<Article> = articles
            .into_iter()
            .filter(|a| self.options.re_enrich || !a.is_enriched())
            .collect();
        if selected.is_empty() {
            debug!("batch {} has nothing to enrich", update_id);
            return Ok((Vec::new(), Vec::new(), Vec::new()));
        }
        info!(
            "🧠 Enriching {} articles in batch {} (concurrency {})",
            selected.len(),
            update_id,
            self.options.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let deadline = self.options.deadline.map(|d| Instant::now() + d);

        let tasks: Vec<_> = selected
            .into_iter()
            .map(|article| {
                let semaphore = semaphore.clone();
                let store = self.store.clone();
                let client = self.client.clone();
                let options = self.options.clone();
                let user_id = user_id.to_string();
                async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| Error::External(e.into()))?;
                    // The deadline gates dispatch only; a call that got its
                    // permit in time runs to completion.
                    if let Some(deadline) = deadline {
                        if Instant::now() >= deadline {
                            return Ok::<_, Error>(Outcome::Skipped(article.article_id.clone()));
                        }
                    }
                    enrich_article(&*store, &*client, &options, deadline, &user_id, &article)
                        .await
                }
            })
            .collect();

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut skipped = Vec::new();
        for outcome in join_all(tasks).await {
            match outcome? {
                Outcome::Succeeded(id) => succeeded.push(id),
                Outcome::Failed(id, reason) => failed.push(FailedArticle {
                    article_id: id,
                    reason,
                }),
                Outcome::Skipped(id) => skipped.push(id),
            }
        }
        Ok((succeeded, failed, skipped))
    }
}

/// One article's enrichment attempt, including the retry loop. Client
/// failures become a recorded outcome; store failures are fatal for the
/// whole run.
async fn enrich_article(
    store: &dyn DocumentStore,
    client: &dyn EnrichmentClient,
    options: &EnrichOptions,
    deadline: Option<Instant>,
    user_id: &str,
    article: &Article,
) -> Result<Outcome> {
    let mut attempt = 0u32;
    loop {
        match client.analyze(&article.content).await {
            Ok(mut analysis) => {
                if analysis.sentiment_label.is_empty() {
                    return Ok(Outcome::Failed(
                        article.article_id.clone(),
                        "client returned an empty sentiment label".to_string(),
                    ));
                }
                analysis.sentiment_score = analysis.sentiment_score.clamp(0.0, 1.0);
                store
                    .update_article_enrichment(user_id, article.id, &analysis)
                    .await?;
                debug!("enriched article {}", article.article_id);
                return Ok(Outcome::Succeeded(article.article_id.clone()));
            }
            Err(e)
                if e.is_transient()
                    && attempt < options.max_retries
                    && deadline.map_or(true, |d| Instant::now() < d) =>
            {
                let delay = options.retry_base_delay * 2u32.pow(attempt);
                debug!(
                    "transient failure on article {} (attempt {}): {}; retrying in {:?}",
                    article.article_id,
                    attempt + 1,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("enrichment failed for article {}: {}", article.article_id, e);
                return Ok(Outcome::Failed(article.article_id.clone(), e.to_string()));
            }
        }
    }
}
