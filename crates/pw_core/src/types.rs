use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification tag for user-submitted content, as opposed to the
/// other content domains handled elsewhere in the product.
pub const PERSONAL_SEARCH_ID: &str = "personal";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// System-generated identity.
    pub id: Uuid,
    /// Business identifier (external/source id); unique per user.
    pub article_id: String,
    pub content: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub website: String,
    pub publish_date: DateTime<Utc>,
    pub search_id: String,
    pub user_id: String,
    /// Owning batch; absent for standalone articles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_id: Option<String>,
    #[serde(default)]
    pub ai_summary: Vec<String>,
    /// Empty string means "not yet enriched".
    #[serde(default)]
    pub ai_sentiment_label: String,
    #[serde(default)]
    pub ai_sentiment_score: f32,
    pub created_at: DateTime<Utc>,
}

impl Article {
    pub fn is_enriched(&self) -> bool {
        !self.ai_sentiment_label.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub update_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Persisted in-progress marker; mutated only through the store's
    /// compare-and-set operations so it stays safe across instances.
    #[serde(default)]
    pub enriching: bool,
    /// Article ids that exhausted enrichment retries in the last run.
    #[serde(default)]
    pub failed_article_ids: Vec<String>,
}

impl Batch {
    pub fn new(user_id: impl Into<String>, update_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            update_id: update_id.into(),
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
            enriching: false,
            failed_article_ids: Vec::new(),
        }
    }
}

/// Aggregate enrichment state of a batch, derived on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    InProgress,
    Completed,
    PartiallyCompleted,
    Failed,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatchStatus::Pending => "pending",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Completed => "completed",
            BatchStatus::PartiallyCompleted => "partially_completed",
            BatchStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of analyzing one article's content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub summary: Vec<String>,
    pub sentiment_label: String,
    pub sentiment_score: f32,
}
