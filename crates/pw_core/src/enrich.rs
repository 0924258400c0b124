use async_trait::async_trait;

use crate::types::Analysis;
use crate::Result;

/// External analysis capability invoked once per article.
///
/// Failures must be distinguishable: timeouts and rate limits surface as
/// `Error::Transient` (retried with backoff by the coordinator), anything
/// else as a permanent `Error::Enrichment`.
#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    fn name(&self) -> &str;

    /// Derive summary points and a sentiment classification for `content`.
    async fn analyze(&self, content: &str) -> Result<Analysis>;
}
