use std::sync::Arc;

use tracing::info;

use super::parse_json_payload;
use crate::adapters::{LanguageModel, Prompt};
use crate::error::{NodeError, NodeResult};
use crate::prompts::SYNTHESIS_PROMPT;
use crate::schema::{PriorContextSummary, ResearchPlan, SourceSummary, SynthesisDraft};

/// Limitation recorded when synthesis runs without any sources.
pub const NO_SOURCES_LIMITATION: &str = "No sources were retrieved for this brief";

/// Synthesis node.
///
/// Produces the brief body from the plan and source summaries. Zero
/// sources is not a failure: the node still asks for a best-effort draft
/// and guarantees the missing sources are stated as a limitation.
pub struct SynthesisNode {
    model: Arc<dyn LanguageModel>,
}

impl SynthesisNode {
    /// Create the node over a language model handle
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Run the node.
    pub async fn run(
        &self,
        topic: &str,
        depth: u8,
        plan: &ResearchPlan,
        context: &PriorContextSummary,
        sources: &[SourceSummary],
    ) -> NodeResult<SynthesisDraft> {
        let mut user = format!(
            "Research topic: {}\nResearch depth level: {}\n\nResearch questions:\n",
            topic, depth
        );
        for question in &plan.research_questions {
            user.push_str(&format!("- {}\n", question));
        }

        if !context.is_empty() {
            user.push_str(&format!(
                "\nPrevious research context to consider:\n{}\n",
                context.summary
            ));
        }

        if sources.is_empty() {
            user.push_str(
                "\nNo sources could be retrieved. Produce a best-effort brief from \
                 general knowledge of the topic and state that limitation explicitly.\n",
            );
        } else {
            user.push_str("\nSource material:\n");
            for source in sources {
                user.push_str(&format!(
                    "\nSource: {}\nURL: {}\nSummary: {}\nKey points: {}\n",
                    source.title,
                    source.url,
                    source.summary,
                    source.key_points.join("; ")
                ));
            }
        }

        let prompt = Prompt::new(SYNTHESIS_PROMPT, user).with_json_output();

        let completion = self.model.complete(&prompt).await.map_err(NodeError::from)?;

        let mut draft: SynthesisDraft = parse_json_payload(&completion)
            .map_err(|e| NodeError::fatal(format!("synthesis payload is not valid JSON: {}", e)))?;

        draft.confidence_score = draft.confidence_score.clamp(0.0, 1.0);

        if sources.is_empty()
            && !draft
                .limitations
                .iter()
                .any(|l| l.to_lowercase().contains("no sources"))
        {
            draft.limitations.push(NO_SOURCES_LIMITATION.to_string());
        }

        draft.validate(sources.len())?;

        info!(
            findings = draft.key_findings.len(),
            recommendations = draft.recommendations.len(),
            sources = sources.len(),
            "Synthesis complete"
        );

        Ok(draft)
    }
}
