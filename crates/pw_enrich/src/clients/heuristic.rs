use async_trait::async_trait;

use pw_core::{Analysis, EnrichmentClient, Error, Result};

const MAX_SUMMARY_POINTS: usize = 3;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "success", "successful", "win", "growth", "improve", "improved",
    "strong", "positive", "record", "breakthrough", "progress",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "poor", "failure", "fail", "failed", "loss", "decline", "crisis", "weak", "negative",
    "drop", "scandal", "collapse", "risk",
];

/// Offline enrichment: leading sentences as summary points and a word-list
/// sentiment score. Deterministic, which makes it the default for tests
/// and local runs.
pub struct HeuristicClient;

impl HeuristicClient {
    pub fn new() -> Self {
        Self
    }

    fn summary_points(content: &str) -> Vec<String> {
        content
            .split(|c| c == '.' || c == '!' || c == '?')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(MAX_SUMMARY_POINTS)
            .map(str::to_string)
            .collect()
    }

    fn sentiment(content: &str) -> (String, f32) {
        let lower = content.to_lowercase();
        let mut positive = 0usize;
        let mut negative = 0usize;
        for word in lower.split(|c: char| !c.is_alphanumeric()) {
            if POSITIVE_WORDS.contains(&word) {
                positive += 1;
            } else if NEGATIVE_WORDS.contains(&word) {
                negative += 1;
            }
        }
        let matched = positive + negative;
        if matched == 0 {
            return ("neutral".to_string(), 0.5);
        }
        let dominant = positive.max(negative) as f32;
        let score = dominant / matched as f32;
        let label = if positive > negative {
            "positive"
        } else if negative > positive {
            "negative"
        } else {
            "neutral"
        };
        (label.to_string(), score.clamp(0.0, 1.0))
    }
}

impl Default for HeuristicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnrichmentClient for HeuristicClient {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn analyze(&self, content: &str) -> Result<Analysis> {
        if content.trim().is_empty() {
            return Err(Error::Enrichment("cannot analyze empty content".to_string()));
        }
        let summary = Self::summary_points(content);
        let (sentiment_label, sentiment_score) = Self::sentiment(content);
        Ok(Analysis {
            summary,
            sentiment_label,
            sentiment_score,
        })
    }
}
