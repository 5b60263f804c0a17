//! Tavily-backed web search.

use super::{SearchHit, SearchProvider, SearchResponse};
use crate::error::ToolError;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub const TAVILY_API_BASE: &str = "https://api.tavily.com";
const MAX_RESULTS: u8 = 5;
/// Upper bound on one search, body included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct TavilyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
}

impl TavilyClient {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: TAVILY_API_BASE.to_string(),
            api_key,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Points the client at a different API host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_error(&self, err: reqwest::Error) -> ToolError {
        if err.is_timeout() {
            ToolError::Search(format!(
                "Tavily request timed out after {}s",
                self.timeout.as_secs_f64()
            ))
        } else {
            ToolError::from(err)
        }
    }
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: u8,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    url: String,
}

#[async_trait]
impl SearchProvider for TavilyClient {
    #[instrument(name = "tavily_search", skip(self))]
    async fn search(&self, query: &str) -> Result<SearchResponse, ToolError> {
        let body = TavilyRequest {
            api_key: self.api_key.expose_secret(),
            query,
            search_depth: "basic",
            max_results: MAX_RESULTS,
        };
        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Search(format!(
                "Tavily API error: {}",
                status.as_u16()
            )));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| self.request_error(e))?;
        debug!(results = parsed.results.len(), "Tavily search completed");
        Ok(SearchResponse {
            answer: parsed.answer,
            hits: parsed
                .results
                .into_iter()
                .map(|r| SearchHit {
                    title: r.title,
                    content: r.content,
                    url: r.url,
                })
                .collect(),
        })
    }
}
