use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::parse_json_payload;
use crate::adapters::{LanguageModel, Prompt};
use crate::error::{NodeError, NodeResult};
use crate::prompts::PLANNING_PROMPT;
use crate::schema::{query_bounds, PriorContextSummary, ResearchPlan};

/// Planning node.
///
/// Derives research questions and search queries from the topic, scoped
/// by the depth table. The model proposes; the node forces the topic and
/// depth, truncates oversized query lists, and validates the rest.
pub struct PlanningNode {
    model: Arc<dyn LanguageModel>,
}

/// Shape the model is asked to produce.
#[derive(Debug, Deserialize)]
struct PlanPayload {
    #[serde(default)]
    research_questions: Vec<String>,
    #[serde(default)]
    search_queries: Vec<String>,
    #[serde(default)]
    expected_sources: Vec<String>,
}

impl PlanningNode {
    /// Create the node over a language model handle
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Run the node.
    pub async fn run(
        &self,
        topic: &str,
        depth: u8,
        context: &PriorContextSummary,
    ) -> NodeResult<ResearchPlan> {
        let (min_queries, max_queries) = query_bounds(depth);

        let mut user = format!(
            "Research topic: {}\nResearch depth level: {} (1=basic, 5=comprehensive)\n\
             Produce between {} and {} search queries.\n",
            topic, depth, min_queries, max_queries
        );
        if !context.is_empty() {
            user.push_str(&format!(
                "\nPrevious research context (avoid duplicating it):\n{}\n",
                context.summary
            ));
        }

        let prompt = Prompt::new(PLANNING_PROMPT, user).with_json_output();

        let completion = self.model.complete(&prompt).await.map_err(NodeError::from)?;

        // Structured boundary: a payload that does not parse is fatal,
        // never coerced.
        let payload: PlanPayload = parse_json_payload(&completion)
            .map_err(|e| NodeError::fatal(format!("plan payload is not valid JSON: {}", e)))?;

        let mut search_queries: Vec<String> = payload
            .search_queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        search_queries.truncate(max_queries);

        let plan = ResearchPlan {
            topic: topic.to_string(),
            research_questions: payload
                .research_questions
                .into_iter()
                .map(|q| q.trim().to_string())
                .collect(),
            search_queries,
            expected_sources: payload.expected_sources,
            depth_level: depth,
        };

        plan.validate()?;

        info!(
            questions = plan.research_questions.len(),
            queries = plan.search_queries.len(),
            depth,
            "Research plan created"
        );

        Ok(plan)
    }
}
