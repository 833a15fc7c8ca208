//! Web search clients.
//!
//! Both clients flatten their hits into one text blob; the pipeline never
//! needs structured fields.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::capability::WebSearch;
use crate::error::{ConfigurationError, SearchError};

pub const DUCKDUCKGO_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
pub const DEFAULT_MAX_RESULTS: usize = 5;

const USER_AGENT: &str = concat!("insightchain/", env!("CARGO_PKG_VERSION"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));

static SNIPPET_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".result__snippet").expect("invalid snippet selector"));

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn http_client(timeout: Duration) -> Result<Client, ConfigurationError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(ConfigurationError::HttpClient)
}

async fn read_success_body(response: reqwest::Response) -> Result<String, SearchError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SearchError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.text().await?)
}

/// Extract result snippets from a DuckDuckGo HTML results page.
fn extract_snippets(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&SNIPPET_SELECTOR)
        .map(|node| collapse_whitespace(&node.text().collect::<String>()))
        .filter(|snippet| !snippet.is_empty())
        .take(limit)
        .collect()
}

/// DuckDuckGo search via the keyless HTML endpoint.
pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration, max_results: usize) -> Result<Self, ConfigurationError> {
        Self::with_endpoint(DUCKDUCKGO_HTML_ENDPOINT, timeout, max_results)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint.into(),
            max_results,
        })
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    #[instrument(name = "search.duckduckgo", skip(self), fields(query_len = query.len()))]
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?;
        let html = read_success_body(response).await?;

        let snippets = extract_snippets(&html, self.max_results);
        debug!(snippets = snippets.len(), "duckduckgo results parsed");

        if snippets.is_empty() {
            return Err(SearchError::NoResults {
                query: query.to_string(),
            });
        }
        Ok(snippets.join(" "))
    }
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

/// Search through a self-hosted SearXNG instance's JSON API.
pub struct SearxngSearch {
    client: Client,
    endpoint: String,
    max_results: usize,
}

impl SearxngSearch {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint.into(),
            max_results,
        })
    }
}

#[async_trait]
impl WebSearch for SearxngSearch {
    #[instrument(name = "search.searxng", skip(self), fields(endpoint = %self.endpoint))]
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        let url = format!("{}/search", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await?;
        let body = read_success_body(response).await?;

        let parsed: SearxngResponse = serde_json::from_str(&body)
            .map_err(|err| SearchError::MalformedResponse(err.to_string()))?;

        let lines: Vec<String> = parsed
            .results
            .into_iter()
            .map(|hit| {
                let title = collapse_whitespace(&hit.title);
                let content = collapse_whitespace(&hit.content);
                match (title.is_empty(), content.is_empty()) {
                    (false, false) => format!("{title}: {content}"),
                    (false, true) => title,
                    _ => content,
                }
            })
            .filter(|line| !line.is_empty())
            .take(self.max_results)
            .collect();

        if lines.is_empty() {
            return Err(SearchError::NoResults {
                query: query.to_string(),
            });
        }
        Ok(lines.join("\n"))
    }
}
