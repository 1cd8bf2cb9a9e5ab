use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::config::{Config, DEFAULT_SERPER_URL};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("search provider returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Something that turns a query into a ranked list of result URLs.
///
/// Implementations never fail: an unreachable or broken provider yields an empty list.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Vec<String>;
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: Option<String>,
}

/// Google search through the Serper API.
#[derive(Clone)]
pub struct SerperClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl SerperClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SearchError> {
        Ok(Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_SERPER_URL.to_string(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SearchError> {
        Ok(Self::new(&config.serper_api_key, config.http_timeout)?.with_endpoint(&config.serper_url))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Organic result links in provider order, capped at `limit`.
    pub async fn try_search(&self, query: &str, limit: usize) -> Result<Vec<String>, SearchError> {
        info!(query, limit, "search: querying serper");

        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&serde_json::json!({ "q": query }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Api { status, body });
        }

        let data: SerperResponse = resp.json().await?;
        let urls = top_links(data, limit);

        info!(query, count = urls.len(), "search: complete");
        Ok(urls)
    }
}

fn top_links(data: SerperResponse, limit: usize) -> Vec<String> {
    data.organic
        .into_iter()
        .take(limit)
        .filter_map(|r| r.link)
        .collect()
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, query: &str, limit: usize) -> Vec<String> {
        match self.try_search(query, limit).await {
            Ok(urls) => urls,
            Err(e) => {
                error!(query, error = %e, "serper search failed");
                Vec::new()
            }
        }
    }
}
