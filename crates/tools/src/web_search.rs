//! Web search tool: Google Programmable Search (Custom Search JSON API).
//!
//! Requires an API key and a search engine id (`cx`). Without them the
//! registry installs an [`UnavailableTool`](crate::unavailable::UnavailableTool)
//! under the same name instead.

use async_trait::async_trait;
use intellicore_config::SearchConfig;
use intellicore_core::error::ToolError;
use intellicore_core::tool::Tool;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const SEARCH_TOOL_NAME: &str = "search";
pub const SEARCH_DESCRIPTION: &str =
    "Useful for when you need to answer questions about current events or find information \
     on the web. Input should be a search query.";
pub const NO_RESULTS: &str = "No good Google Search Result was found";

pub struct WebSearchTool {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    cse_id: String,
    results: u32,
}

impl WebSearchTool {
    pub fn new(api_key: impl Into<String>, cse_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: "https://www.googleapis.com/customsearch/v1".into(),
            api_key: api_key.into(),
            cse_id: cse_id.into(),
            results: 5,
        }
    }

    /// Build from config, or `None` when credentials are missing.
    pub fn from_config(config: &SearchConfig) -> Option<Self> {
        let api_key = config.google_api_key.as_ref()?;
        let cse_id = config.google_cse_id.as_ref()?;
        Some(
            Self::new(api_key.clone(), cse_id.clone())
                .with_endpoint(config.endpoint.clone())
                .with_results(config.results),
        )
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Results per query (the API caps this at 10).
    pub fn with_results(mut self, results: u32) -> Self {
        self.results = results.clamp(1, 10);
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        SEARCH_DESCRIPTION
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("search query is empty".into()));
        }

        let num = self.results.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Failed(format!(
                "search API returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Failed(format!("invalid search response: {e}")))?;

        let output = format_results(&body);
        debug!(query, chars = output.len(), "Search completed");
        Ok(output)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Render a Custom Search response as `title\nsnippet\nlink` blocks.
fn format_results(body: &SearchResponse) -> String {
    if body.items.is_empty() {
        return NO_RESULTS.to_string();
    }

    body.items
        .iter()
        .map(|item| {
            let snippet = item.snippet.replace('\n', " ");
            format!("{}\n{}\n{}", item.title.trim(), snippet.trim(), item.link)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: serde_json::Value) -> SearchResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn formats_items_in_order() {
        let body = json!({
            "items": [
                {"title": "Arctic sea ice", "link": "https://a.example", "snippet": "Ice extent is\nshrinking."},
                {"title": "Polar bears", "link": "https://b.example", "snippet": "Bears depend on ice."}
            ]
        });
        let out = format_results(&parse(body));
        assert_eq!(
            out,
            "Arctic sea ice\nIce extent is shrinking.\nhttps://a.example\n\n\
             Polar bears\nBears depend on ice.\nhttps://b.example"
        );
    }

    #[test]
    fn missing_items_means_no_results() {
        let out = format_results(&parse(json!({"searchInformation": {"totalResults": "0"}})));
        assert_eq!(out, NO_RESULTS);
    }

    #[test]
    fn from_config_requires_both_credentials() {
        let mut config = SearchConfig::default();
        assert!(WebSearchTool::from_config(&config).is_none());

        config.google_api_key = Some("key".into());
        assert!(WebSearchTool::from_config(&config).is_none());

        config.google_cse_id = Some("cx".into());
        let tool = WebSearchTool::from_config(&config).unwrap();
        assert_eq!(tool.name(), "search");
        assert_eq!(tool.results, 5);
    }

    #[test]
    fn results_are_clamped_to_api_limit() {
        assert_eq!(WebSearchTool::new("k", "c").with_results(50).results, 10);
        assert_eq!(WebSearchTool::new("k", "c").with_results(0).results, 1);
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let err = WebSearchTool::new("k", "c").invoke("   ").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_tool_failure() {
        let tool = WebSearchTool::new("k", "c").with_endpoint("http://127.0.0.1:1/search");
        let err = tool.invoke("rust").await.unwrap_err();
        assert!(matches!(err, ToolError::Failed(_)));
    }
}
