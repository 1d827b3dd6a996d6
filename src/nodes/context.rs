use std::sync::Arc;

use tracing::{debug, info};

use crate::adapters::{LanguageModel, Prompt};
use crate::error::{NodeError, NodeResult};
use crate::prompts::CONTEXT_SUMMARY_PROMPT;
use crate::schema::{FinalBrief, PriorContextSummary};

/// Cap on the condensed context narrative, in characters.
const MAX_SUMMARY_CHARS: usize = 1200;

/// Key findings quoted per prior brief when building the model input.
const FINDINGS_PER_BRIEF: usize = 3;

/// Context summarization node.
///
/// Condenses the user's prior briefs into a bounded narrative for the
/// planner. An empty history short-circuits to the explicit "no context"
/// marker without touching the model, whatever the follow-up flag says.
pub struct ContextNode {
    model: Arc<dyn LanguageModel>,
}

impl ContextNode {
    /// Create the node over a language model handle
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Run the node. `history` is ordered most-recent-first.
    pub async fn run(
        &self,
        topic: &str,
        history: &[FinalBrief],
    ) -> NodeResult<PriorContextSummary> {
        if history.is_empty() {
            debug!("No prior briefs; emitting empty context marker");
            return Ok(PriorContextSummary::empty());
        }

        let mut digest = String::new();
        for brief in history {
            digest.push_str(&format!(
                "Topic: {}\nSummary: {}\n",
                brief.topic, brief.executive_summary
            ));
            for finding in brief.key_findings.iter().take(FINDINGS_PER_BRIEF) {
                digest.push_str(&format!("- {}\n", finding));
            }
            digest.push('\n');
        }

        let prompt = Prompt::new(
            CONTEXT_SUMMARY_PROMPT,
            format!("New research topic: {}\n\nPrevious briefs:\n{}", topic, digest),
        );

        // No fatal outcomes at this stage: absence of history is not an
        // error, and a malformed completion just retries.
        let completion = self
            .model
            .complete(&prompt)
            .await
            .map_err(|e| NodeError::retryable(e.to_string()))?;

        let mut summary = completion.trim().to_string();
        if summary.is_empty() {
            return Err(NodeError::retryable("context summary was empty"));
        }
        if summary.chars().count() > MAX_SUMMARY_CHARS {
            summary = summary.chars().take(MAX_SUMMARY_CHARS).collect();
        }

        info!(prior_briefs = history.len(), "Context summarized");

        Ok(PriorContextSummary {
            summary,
            derived_from: history.iter().map(|b| b.id.clone()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AdapterError, AdapterResult};
    use chrono::Utc;

    struct StubModel {
        response: AdapterResult<String>,
    }

    #[async_trait::async_trait]
    impl LanguageModel for StubModel {
        async fn complete(&self, _prompt: &Prompt) -> AdapterResult<String> {
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(AdapterError::Timeout { timeout_ms: 1 }),
            }
        }

        async fn ping(&self) -> AdapterResult<()> {
            Ok(())
        }
    }

    fn brief(id: &str, topic: &str) -> FinalBrief {
        FinalBrief {
            id: id.to_string(),
            topic: topic.to_string(),
            executive_summary: "summary".to_string(),
            key_findings: vec!["finding".to_string()],
            detailed_analysis: "analysis".to_string(),
            recommendations: vec!["recommendation".to_string()],
            sources: vec![],
            research_steps: vec![],
            limitations: vec![],
            confidence_score: 0.7,
            generated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_empty_history_yields_empty_marker_without_model_call() {
        // The stub would fail if called; short-circuit must avoid it
        let node = ContextNode::new(Arc::new(StubModel {
            response: Err(AdapterError::Timeout { timeout_ms: 1 }),
        }));

        let ctx = node.run("Renewable Energy Trends", &[]).await.unwrap();
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn test_summary_derived_from_prior_brief_ids() {
        let node = ContextNode::new(Arc::new(StubModel {
            response: Ok("Prior work covered solar adoption.".to_string()),
        }));

        let history = vec![brief("b2", "Solar Adoption"), brief("b1", "Wind Power")];
        let ctx = node.run("Renewable Energy Trends", &history).await.unwrap();

        assert_eq!(ctx.summary, "Prior work covered solar adoption.");
        assert_eq!(ctx.derived_from, vec!["b2".to_string(), "b1".to_string()]);
    }

    #[tokio::test]
    async fn test_adapter_failure_is_retryable() {
        let node = ContextNode::new(Arc::new(StubModel {
            response: Err(AdapterError::Timeout { timeout_ms: 1 }),
        }));

        let err = node
            .run("Renewable Energy Trends", &[brief("b1", "Wind Power")])
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
