use chrono::Utc;
use tracing::{debug, info};

use crate::error::{NodeError, NodeResult};
use crate::schema::{FinalBrief, ResearchStep, SourceSummary, SynthesisDraft};

/// Everything the orchestrator has accumulated for the terminal brief.
#[derive(Debug)]
pub struct BriefCandidate {
    /// Topic from the original request.
    pub topic: String,
    /// Brief body produced by synthesis.
    pub draft: SynthesisDraft,
    /// Source summaries in fetch order.
    pub sources: Vec<SourceSummary>,
    /// Audit trail accumulated across all node executions.
    pub steps: Vec<ResearchStep>,
    /// Limitations accrued outside synthesis (dropped URLs, degraded
    /// fetching).
    pub extra_limitations: Vec<String>,
}

/// Post-processing node.
///
/// Pure function over the candidate: clamps the confidence score,
/// applies the relevance threshold, merges limitations, attaches the
/// audit trail, and stamps `generated_at` exactly once. An empty
/// required field here means an upstream contract was violated.
pub struct PostProcessNode {
    min_relevance: Option<f64>,
}

impl PostProcessNode {
    /// Create the node; `min_relevance` of `None` strips nothing.
    pub fn new(min_relevance: Option<f64>) -> Self {
        Self { min_relevance }
    }

    /// Run the node.
    pub fn run(&self, candidate: BriefCandidate) -> NodeResult<FinalBrief> {
        let BriefCandidate {
            topic,
            draft,
            sources,
            steps,
            extra_limitations,
        } = candidate;

        if topic.trim().is_empty() {
            return Err(NodeError::consistency("topic is empty at post-processing"));
        }
        if draft.executive_summary.trim().is_empty() {
            return Err(NodeError::consistency(
                "executive summary is empty at post-processing",
            ));
        }

        let sources = match self.min_relevance {
            Some(threshold) => {
                let before = sources.len();
                let kept: Vec<SourceSummary> = sources
                    .into_iter()
                    .filter(|s| s.relevance_score >= threshold)
                    .collect();
                if kept.len() < before {
                    debug!(
                        stripped = before - kept.len(),
                        threshold, "Stripped low-relevance sources"
                    );
                }
                kept
            }
            None => sources,
        };

        let mut limitations = draft.limitations;
        for limitation in extra_limitations {
            if !limitations.contains(&limitation) {
                limitations.push(limitation);
            }
        }

        let brief = FinalBrief {
            id: FinalBrief::new_id(),
            topic,
            executive_summary: draft.executive_summary,
            key_findings: draft.key_findings,
            detailed_analysis: draft.detailed_analysis,
            recommendations: draft.recommendations,
            sources,
            research_steps: steps,
            limitations,
            confidence_score: draft.confidence_score.clamp(0.0, 1.0),
            generated_at: Utc::now(),
        };

        brief
            .validate()
            .map_err(|e| NodeError::consistency(e.to_string()))?;

        info!(
            brief_id = %brief.id,
            sources = brief.sources.len(),
            steps = brief.research_steps.len(),
            confidence = brief.confidence_score,
            "Brief finalized"
        );

        Ok(brief)
    }
}
