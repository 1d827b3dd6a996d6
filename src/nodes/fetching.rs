use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use super::parse_json_payload;
use crate::adapters::{ContentFetcher, LanguageModel, Prompt};
use crate::error::{NodeError, NodeResult};
use crate::prompts::SOURCE_SUMMARY_PROMPT;
use crate::schema::{SearchResult, SourceSummary};

/// What the fetching node hands downstream: the summaries it managed to
/// produce plus a limitation entry per dropped URL.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// One summary per successfully fetched and summarized URL.
    pub summaries: Vec<SourceSummary>,
    /// Limitation entries for URLs that were dropped.
    pub limitations: Vec<String>,
}

/// Content fetching node.
///
/// Fetches the top-ranked results and summarizes each through the model.
/// Per-URL failures drop the URL and record a limitation; the node is
/// only retryable when it produces zero summaries.
pub struct FetchingNode {
    fetcher: Arc<dyn ContentFetcher>,
    model: Arc<dyn LanguageModel>,
    max_sources: usize,
    max_concurrent: usize,
}

/// Shape the model is asked to produce per source.
#[derive(Debug, Deserialize)]
struct SourcePayload {
    summary: String,
    #[serde(default)]
    relevance_score: f64,
    #[serde(default)]
    key_points: Vec<String>,
}

impl FetchingNode {
    /// Create the node over fetcher and model handles
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        model: Arc<dyn LanguageModel>,
        max_sources: usize,
        max_concurrent: usize,
    ) -> Self {
        Self {
            fetcher,
            model,
            max_sources,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run the node. Output order follows input order, not completion order.
    pub async fn run(&self, topic: &str, results: &[SearchResult]) -> NodeResult<FetchOutcome> {
        let targets: Vec<SearchResult> = results.iter().take(self.max_sources).cloned().collect();
        if targets.is_empty() {
            return Ok(FetchOutcome::default());
        }
        let attempted = targets.len();

        let outcomes: Vec<(SearchResult, Result<SourceSummary, String>)> =
            stream::iter(targets)
                .map(|result| {
                    let fetcher = Arc::clone(&self.fetcher);
                    let model = Arc::clone(&self.model);
                    let topic = topic.to_string();
                    async move {
                        let outcome = process_source(&*fetcher, &*model, &topic, &result).await;
                        (result, outcome)
                    }
                })
                .buffered(self.max_concurrent)
                .collect()
                .await;

        let mut summaries = Vec::new();
        let mut limitations = Vec::new();
        for (result, outcome) in outcomes {
            match outcome {
                Ok(summary) => summaries.push(summary),
                Err(reason) => {
                    warn!(url = %result.url, reason = %reason, "Dropping source");
                    limitations.push(format!(
                        "Source could not be processed: {} ({})",
                        result.url, reason
                    ));
                }
            }
        }

        if summaries.is_empty() {
            return Err(NodeError::retryable(format!(
                "no sources fetched successfully out of {} attempted",
                attempted
            )));
        }

        info!(
            fetched = summaries.len(),
            dropped = limitations.len(),
            "Source processing complete"
        );

        Ok(FetchOutcome {
            summaries,
            limitations,
        })
    }
}

/// Fetch one URL and summarize it. Errors are per-URL drop reasons.
async fn process_source(
    fetcher: &dyn ContentFetcher,
    model: &dyn LanguageModel,
    topic: &str,
    result: &SearchResult,
) -> Result<SourceSummary, String> {
    let text = fetcher.fetch(&result.url).await.map_err(|e| e.to_string())?;

    let prompt = Prompt::new(
        SOURCE_SUMMARY_PROMPT,
        format!(
            "Research topic: {}\n\nSource title: {}\nSource URL: {}\n\nSource text:\n{}",
            topic, result.title, result.url, text
        ),
    )
    .with_json_output();

    let completion = model.complete(&prompt).await.map_err(|e| e.to_string())?;

    let payload: SourcePayload = parse_json_payload(&completion)
        .map_err(|e| format!("source summary payload is not valid JSON: {}", e))?;

    Ok(SourceSummary {
        url: result.url.clone(),
        title: result.title.clone(),
        summary: payload.summary,
        relevance_score: payload.relevance_score.clamp(0.0, 1.0),
        key_points: payload.key_points,
    })
}
