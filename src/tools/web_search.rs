//! Web search (`web_searcher`) backed by the Tavily search API.

use crate::error::OrchestrationError;
use crate::models::ToolKind;
use crate::tools::Tool;
use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: u32 = 3;

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

pub struct WebSearchTool {
    client: Client,
    api_key: Option<String>,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    async fn search(&self, api_key: &str, query: &str) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .post(TAVILY_SEARCH_URL)
            .json(&json!({
                "api_key": api_key,
                "query": query,
                "max_results": MAX_RESULTS,
            }))
            .send()
            .await
            .map_err(|e| OrchestrationError::ToolError(format!("Web search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrchestrationError::ToolError(format!(
                "Web search returned {}: {}",
                status, body
            )));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| OrchestrationError::ToolError(format!("Invalid search response: {}", e)))?;

        Ok(parsed.results)
    }
}

/// Render hits as numbered plain-text evidence.
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "검색 결과가 없습니다.".to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "{}. {}\n   출처: {}\n   {}",
                i + 1,
                hit.title.trim(),
                hit.url,
                hit.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WebSearcher
    }

    async fn invoke(&self, query: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            OrchestrationError::ToolError("TAVILY_API_KEY is not configured".to_string())
        })?;

        if query.trim().is_empty() {
            return Err(OrchestrationError::InvalidToolInput(
                "search query is empty".to_string(),
            ));
        }

        info!(query = %query, "Web search");
        let hits = self.search(api_key, query).await?;
        Ok(format_hits(&hits))
    }
}
