use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::ContentFetcher;
use crate::error::{AdapterError, AdapterResult};

const USER_AGENT: &str = "research-brief/0.1 (+https://github.com/quanticsoul4772/research-brief)";

/// Default cap on extracted text length, in characters.
///
/// Keeps per-source prompts within the model's input budget.
const DEFAULT_MAX_CONTENT_LEN: usize = 4000;

/// HTTP content fetcher with plain-text extraction
pub struct HttpFetcher {
    client: Client,
    timeout_ms: u64,
    max_content_len: usize,
    block_re: Regex,
    tag_re: Regex,
    ws_re: Regex,
}

impl HttpFetcher {
    /// Create a fetcher with the given per-URL timeout
    pub fn new(timeout_ms: u64) -> AdapterResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(USER_AGENT)
            .build()
            .map_err(AdapterError::Http)?;

        Ok(Self {
            client,
            timeout_ms,
            max_content_len: DEFAULT_MAX_CONTENT_LEN,
            block_re: Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
                .expect("block pattern is valid"),
            tag_re: Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"),
            ws_re: Regex::new(r"\s+").expect("whitespace pattern is valid"),
        })
    }

    /// Override the extracted-text length cap
    pub fn with_max_content_len(mut self, max_len: usize) -> Self {
        self.max_content_len = max_len;
        self
    }

    /// Strip markup and collapse whitespace, bounded to the length cap.
    fn extract_text(&self, html: &str) -> String {
        let without_blocks = self.block_re.replace_all(html, " ");
        let without_tags = self.tag_re.replace_all(&without_blocks, " ");

        let decoded = without_tags
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'");

        let collapsed = self.ws_re.replace_all(decoded.trim(), " ").to_string();

        if collapsed.chars().count() > self.max_content_len {
            let truncated: String = collapsed.chars().take(self.max_content_len).collect();
            format!("{}...", truncated)
        } else {
            collapsed
        }
    }
}

#[async_trait::async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> AdapterResult<String> {
        debug!(url = %url, "Fetching source content");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                AdapterError::Http(e)
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            return Err(AdapterError::Api {
                status: status.as_u16(),
                message: format!("fetch failed for {}", url),
            });
        }

        let body = response.text().await.map_err(AdapterError::Http)?;
        let text = self.extract_text(&body);

        if text.is_empty() {
            return Err(AdapterError::InvalidResponse {
                message: format!("no text content extracted from {}", url),
            });
        }

        Ok(text)
    }
}
