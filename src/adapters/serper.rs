use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::SearchClient;
use crate::config::{RequestConfig, SearchConfig};
use crate::error::{AdapterError, AdapterResult};
use crate::schema::SearchResult;

/// Client for the Serper web search API
#[derive(Clone)]
pub struct SerperClient {
    client: Client,
    base_url: String,
    api_key: String,
    country: String,
    language: String,
    timeout_ms: u64,
}

impl SerperClient {
    /// Create a new Serper client
    pub fn new(
        api_key: impl Into<String>,
        config: &SearchConfig,
        request_config: &RequestConfig,
    ) -> AdapterResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(AdapterError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            country: config.country.clone(),
            language: config.language.clone(),
            timeout_ms: request_config.timeout_ms,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl SearchClient for SerperClient {
    async fn search(&self, query: &str, max_results: usize) -> AdapterResult<Vec<SearchResult>> {
        let url = format!("{}/search", self.base_url);

        // Serper caps a single request at 10 results
        let body = SerperRequest {
            q: query,
            num: max_results.min(10) as u32,
            gl: &self.country,
            hl: &self.language,
        };

        debug!(query = %query, num = body.num, "Issuing Serper search");

        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AdapterError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    AdapterError::Http(e)
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Auth {
                message: error_body,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let parsed: SerperResponse =
            response
                .json()
                .await
                .map_err(|e| AdapterError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        let results: Vec<SearchResult> = parsed
            .organic
            .into_iter()
            .take(max_results)
            .map(|entry| SearchResult {
                query: query.to_string(),
                url: entry.link,
                title: entry.title,
                snippet: entry.snippet.unwrap_or_default(),
            })
            .collect();

        info!(
            query = %query,
            results = results.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Serper search succeeded"
        );

        Ok(results)
    }

    async fn ping(&self) -> AdapterResult<()> {
        self.search("connectivity check", 1).await.map(|_| ())
    }
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: u32,
    gl: &'a str,
    hl: &'a str,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicEntry>,
}

#[derive(Debug, Deserialize)]
struct OrganicEntry {
    title: String,
    link: String,
    snippet: Option<String>,
}

/// Deterministic search backend used when no Serper key is configured.
///
/// Satisfies the same contract as the live client so the orchestrator
/// cannot tell the difference.
pub struct SimulatedSearchClient {
    slug_re: Regex,
}

/// (title, url path prefix, snippet) templates, highest relevance first.
const RESULT_TEMPLATES: &[(&str, &str, &str)] = &[
    (
        "{query} - Comprehensive Guide and Analysis",
        "https://research-institute.org/{slug}",
        "Comprehensive analysis of {query} including latest research findings, methodologies, and practical applications.",
    ),
    (
        "Latest News and Updates on {query}",
        "https://news-source.com/{slug}-updates",
        "Breaking news and recent developments in {query}. Expert analysis, market trends, and industry insights.",
    ),
    (
        "Research Study: {query} - Methodology and Results",
        "https://academic-journal.org/studies/{slug}",
        "Peer-reviewed research study on {query} presenting methodology, data analysis, and conclusions.",
    ),
    (
        "Government Report on {query} - Official Data",
        "https://government-reports.gov/{slug}-report",
        "Official report on {query} with statistical data, policy implications, and regulatory considerations.",
    ),
    (
        "{query} - Industry Best Practices and Case Studies",
        "https://industry-hub.com/{slug}-practices",
        "Industry best practices for {query} with real-world case studies and implementation strategies.",
    ),
    (
        "Technical Implementation of {query} - Developer Guide",
        "https://tech-docs.com/{slug}-implementation",
        "Technical guide to implementing {query} with architecture patterns and performance considerations.",
    ),
];

impl SimulatedSearchClient {
    /// Create a simulated search backend
    pub fn new() -> Self {
        Self {
            slug_re: Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"),
        }
    }

    fn slugify(&self, query: &str) -> String {
        self.slug_re
            .replace_all(&query.to_lowercase(), "-")
            .trim_matches('-')
            .to_string()
    }
}

impl Default for SimulatedSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SearchClient for SimulatedSearchClient {
    async fn search(&self, query: &str, max_results: usize) -> AdapterResult<Vec<SearchResult>> {
        let slug = self.slugify(query);

        let results = RESULT_TEMPLATES
            .iter()
            .take(max_results)
            .map(|(title, url, snippet)| SearchResult {
                query: query.to_string(),
                url: url.replace("{slug}", &slug),
                title: title.replace("{query}", query),
                snippet: snippet.replace("{query}", query),
            })
            .collect();

        Ok(results)
    }

    async fn ping(&self) -> AdapterResult<()> {
        Ok(())
    }
}
