//! Google Custom Search implementation of the `web_search` tool.

use akasha_core::{config::SearchConfig, message::SearchResult, traits::SearchTool};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

const SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Google Custom Search client.
///
/// Any failure (missing config, HTTP error, parse error) degrades to an
/// empty result list so replies still go out without sources.
pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: String,
    engine_id: String,
}

impl GoogleSearch {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            engine_id: config.engine_id.clone(),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchTool for GoogleSearch {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        if self.api_key.is_empty() || self.engine_id.is_empty() {
            warn!("google search not configured, returning empty results");
            return Vec::new();
        }

        let num = max_results.min(10).to_string();
        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                error!("web search failed: {e}");
                return Vec::new();
            }
        };

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("google search API error: {status} - {text}");
            return Vec::new();
        }

        let parsed: SearchResponse = match resp.json().await {
            Ok(p) => p,
            Err(e) => {
                error!("google search: failed to parse response: {e}");
                return Vec::new();
            }
        };

        let results: Vec<SearchResult> = parsed
            .items
            .into_iter()
            .map(|item| SearchResult {
                title: item.title,
                link: item.link,
                snippet: item.snippet,
            })
            .collect();

        info!("search for '{query}' returned {} results", results.len());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_search_returns_empty() {
        let tool = GoogleSearch::from_config(&SearchConfig::default());
        let results = tool.search("anything", 5).await;
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_response_parsing() {
        let json = r#"{
            "items": [
                {"title": "A", "link": "https://a.example", "snippet": "first"},
                {"title": "B", "link": "https://b.example", "snippet": "second"}
            ]
        }"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.items.len(), 2);
        assert_eq!(resp.items[0].link, "https://a.example");
    }

    #[test]
    fn test_search_response_without_items() {
        let resp: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.items.is_empty());
    }
}
