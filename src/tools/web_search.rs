//! Tavily web search client
//!
//! Used for questions the local knowledge base cannot answer: market prices,
//! news, recent advisories. Returns ranked results and, when Tavily provides
//! one, a short synthesized answer.

use crate::tools::{Tool, ToolInput, ToolKind, ToolOutput};
use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

const TAVILY_API_BASE: &str = "https://api.tavily.com";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Tavily API key not configured")]
    NoApiKey,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse search results: {0}")]
    ParseError(String),

    #[error("No results found for query")]
    NoResults,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct SearchResults {
    /// Tavily's own synthesized answer, when requested and available.
    pub answer: Option<String>,
    pub results: Vec<WebResult>,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    include_answer: bool,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<WebResult>,
}

pub struct TavilyClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_results: usize,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>, max_results: usize) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: TAVILY_API_BASE.to_string(),
            max_results,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn search(&self, query: &str) -> Result<SearchResults, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::NoApiKey);
        }

        info!(query = %query, "Searching the web via Tavily");

        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results: self.max_results,
            include_answer: true,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SearchError::RequestFailed(format!("{status}: {text}")));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        if parsed.results.is_empty() && parsed.answer.is_none() {
            return Err(SearchError::NoResults);
        }

        let mut results = parsed.results;
        results.truncate(self.max_results);

        info!(count = results.len(), "Web search completed");

        Ok(SearchResults {
            answer: parsed.answer,
            results,
        })
    }
}

pub struct WebSearchTool {
    client: TavilyClient,
}

impl WebSearchTool {
    pub fn new(client: TavilyClient) -> Self {
        Self { client }
    }
}

/// Render search results as a context block for the synthesis prompt.
fn format_results(results: &SearchResults) -> String {
    let mut output = String::new();

    if let Some(answer) = &results.answer {
        output.push_str(&format!("Summary: {answer}\n\n"));
    }

    for (i, result) in results.results.iter().enumerate() {
        output.push_str(&format!(
            "{}. {} ({})\n   {}\n",
            i + 1,
            result.title,
            result.url,
            truncate(&result.content, 300)
        ));
    }

    if output.is_empty() {
        output.push_str("No web results found.");
    }

    output
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WebSearch
    }

    fn description(&self) -> &'static str {
        "Searches the web for current information: market prices, news, recent advisories"
    }

    async fn run(&self, input: &ToolInput) -> AppResult<ToolOutput> {
        let results = self
            .client
            .search(&input.query)
            .await
            .map_err(|e| AppError::Tool {
                tool: "web_search",
                message: e.to_string(),
            })?;

        Ok(ToolOutput {
            tool: self.kind(),
            content: format_results(&results),
            data: Some(serde_json::json!({
                "answer": results.answer,
                "results": results.results,
            })),
        })
    }
}
