use async_trait::async_trait;
use uuid::Uuid;

use crate::types::{Analysis, Article, Batch};
use crate::Result;

/// Abstract document store over the Articles and Batches collections.
///
/// Every article operation is scoped by `user_id`; `update_id` lookups are
/// global because batch identifiers are unique across users, with ownership
/// checks layered on top by the batch registry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_article(&self, article: &Article) -> Result<()>;

    /// Look up one article by its business identifier.
    async fn get_article(&self, user_id: &str, article_id: &str) -> Result<Option<Article>>;

    async fn get_articles_by_ids(
        &self,
        user_id: &str,
        article_ids: &[String],
    ) -> Result<Vec<Article>>;

    /// Atomically set the three enrichment fields on one article.
    async fn update_article_enrichment(
        &self,
        user_id: &str,
        id: Uuid,
        analysis: &Analysis,
    ) -> Result<()>;

    /// Paginated listing ordered by `created_at` descending, ties broken
    /// by `id`, so page boundaries stay stable while enrichment mutates
    /// other fields. Returns the page and the total match count.
    async fn list_articles(
        &self,
        user_id: &str,
        update_id: Option<&str>,
        page: usize,
        limit: usize,
    ) -> Result<(Vec<Article>, usize)>;

    /// All articles belonging to one batch, unpaginated.
    async fn batch_articles(&self, user_id: &str, update_id: &str) -> Result<Vec<Article>>;

    /// Fails with `AlreadyExists` when the `update_id` is taken.
    async fn insert_batch(&self, batch: &Batch) -> Result<()>;

    async fn get_batch(&self, update_id: &str) -> Result<Option<Batch>>;

    /// Paginated listing of a user's batches, newest first.
    async fn list_batches(
        &self,
        user_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<(Vec<Batch>, usize)>;

    /// Compare-and-set the batch's enriching flag. Returns false when an
    /// enrichment run already holds it.
    async fn try_begin_enrichment(&self, user_id: &str, update_id: &str) -> Result<bool>;

    /// Clear the enriching flag, record which articles exhausted their
    /// retries, and touch `updated_at`.
    async fn finish_enrichment(
        &self,
        user_id: &str,
        update_id: &str,
        failed_article_ids: &[String],
    ) -> Result<()>;
}
