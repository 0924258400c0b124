use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use pw_core::{Analysis, EnrichmentClient, Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    summary: Vec<String>,
    sentiment: Sentiment,
}

#[derive(Deserialize)]
struct Sentiment {
    label: String,
    score: f32,
}

/// Enrichment backed by an HTTP analysis service.
pub struct RemoteClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

impl fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl EnrichmentClient for RemoteClient {
    fn name(&self) -> &str {
        "remote"
    }

    async fn analyze(&self, content: &str) -> Result<Analysis> {
        let mut request = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .json(&AnalyzeRequest { content });
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                Error::Transient(format!("analysis request failed: {}", e))
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(Error::Transient(format!(
                "analysis service returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(Error::Enrichment(format!(
                "analysis service returned {}",
                status
            )));
        }

        let body: AnalyzeResponse = response.json().await?;
        Ok(Analysis {
            summary: body.summary,
            sentiment_label: body.sentiment.label,
            sentiment_score: body.sentiment.score.clamp(0.0, 1.0),
        })
    }
}
