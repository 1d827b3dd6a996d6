//! Structured record shapes flowing through the workflow.
//!
//! Every record carries an explicit `validate()` where the workflow
//! enforces an invariant at a node boundary; model output is parsed into
//! these shapes and rejected on mismatch rather than coerced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Minimum topic length in characters, after trimming.
pub const MIN_TOPIC_LEN: usize = 10;
/// Maximum topic length in characters.
pub const MAX_TOPIC_LEN: usize = 500;

/// Inclusive (min, max) bound on planned search queries for a depth level.
///
/// Upper bounds are non-decreasing in depth; the planning node truncates
/// model output to the upper bound and validation rejects empty plans.
pub fn query_bounds(depth: u8) -> (usize, usize) {
    match depth {
        1 => (1, 2),
        2 => (3, 4),
        3 => (5, 7),
        4 => (8, 10),
        _ => (10, 15),
    }
}

/// A caller's request for a research brief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// Free-text research topic.
    pub topic: String,
    /// Research depth level, 1 (basic) to 5 (comprehensive).
    pub depth: u8,
    /// Whether prior briefs for this user should inform the run.
    pub follow_up: bool,
    /// User identifier for history scoping.
    pub user_id: String,
}

impl ResearchRequest {
    /// Create a request with the default depth of 3.
    pub fn new(topic: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            depth: 3,
            follow_up: false,
            user_id: user_id.into(),
        }
    }

    /// Set the depth level
    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    /// Mark as a follow-up request
    pub fn with_follow_up(mut self, follow_up: bool) -> Self {
        self.follow_up = follow_up;
        self
    }

    /// Validate the request before any node runs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let topic_len = self.topic.trim().chars().count();
        if topic_len < MIN_TOPIC_LEN {
            return Err(ValidationError::new(
                "topic",
                format!("must be at least {} characters", MIN_TOPIC_LEN),
            ));
        }
        if topic_len > MAX_TOPIC_LEN {
            return Err(ValidationError::new(
                "topic",
                format!("must be at most {} characters", MAX_TOPIC_LEN),
            ));
        }
        if !(1..=5).contains(&self.depth) {
            return Err(ValidationError::new("depth", "must be between 1 and 5"));
        }
        if self.follow_up && self.user_id.trim().is_empty() {
            return Err(ValidationError::new(
                "user_id",
                "required for follow-up requests",
            ));
        }
        Ok(())
    }
}

/// Condensed context from a user's prior briefs.
///
/// The empty value is the explicit "no context" marker produced when no
/// usable history exists, whatever the follow-up flag says.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorContextSummary {
    /// Bounded-length narrative over the prior briefs.
    pub summary: String,
    /// Identifiers of the briefs the summary was derived from, in order.
    pub derived_from: Vec<String>,
}

impl PriorContextSummary {
    /// The explicit "no context" marker.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this is the "no context" marker.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.derived_from.is_empty()
    }
}

/// The planning node's output: questions to answer and queries to issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// Main research topic, as requested.
    pub topic: String,
    /// Key questions the research should answer.
    pub research_questions: Vec<String>,
    /// Search queries to execute, bounded by the depth table.
    pub search_queries: Vec<String>,
    /// Types of sources expected to be found.
    #[serde(default)]
    pub expected_sources: Vec<String>,
    /// Depth level the plan was built for.
    pub depth_level: u8,
}

impl ResearchPlan {
    /// Validate the plan against the depth table and question invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=5).contains(&self.depth_level) {
            return Err(ValidationError::new(
                "depth_level",
                "must be between 1 and 5",
            ));
        }
        if self.research_questions.is_empty() {
            return Err(ValidationError::new(
                "research_questions",
                "must not be empty",
            ));
        }
        if self
            .research_questions
            .iter()
            .any(|q| q.trim().is_empty())
        {
            return Err(ValidationError::new(
                "research_questions",
                "must not contain empty entries",
            ));
        }
        for (i, q) in self.research_questions.iter().enumerate() {
            if self.research_questions[..i].contains(q) {
                return Err(ValidationError::new(
                    "research_questions",
                    "must be pairwise distinct",
                ));
            }
        }
        if self.search_queries.is_empty() {
            return Err(ValidationError::new("search_queries", "must not be empty"));
        }
        let (_, max) = query_bounds(self.depth_level);
        if self.search_queries.len() > max {
            return Err(ValidationError::new(
                "search_queries",
                format!("must not exceed {} for depth {}", max, self.depth_level),
            ));
        }
        Ok(())
    }
}

/// A single ranked result returned for one search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Query that produced this result.
    pub query: String,
    /// Result URL; aggregation de-duplicates on this.
    pub url: String,
    /// Result title.
    pub title: String,
    /// Content snippet from the result.
    pub snippet: String,
}

/// A fetched and summarized source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Source URL.
    pub url: String,
    /// Source title.
    pub title: String,
    /// Summary of the source content.
    pub summary: String,
    /// Relevance to the research questions, 0.0 to 1.0.
    pub relevance_score: f64,
    /// Key points extracted from the source.
    pub key_points: Vec<String>,
}

impl SourceSummary {
    /// Clamp the relevance score into [0, 1].
    pub fn with_relevance(mut self, score: f64) -> Self {
        self.relevance_score = score.clamp(0.0, 1.0);
        self
    }
}

/// One audit trail entry per node execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchStep {
    /// Strictly increasing step counter, starting at 1.
    pub step_number: u32,
    /// Description of the action taken.
    pub action: String,
    /// Key findings from this step, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_findings: Option<String>,
}

impl ResearchStep {
    /// Create a step entry
    pub fn new(step_number: u32, action: impl Into<String>) -> Self {
        Self {
            step_number,
            action: action.into(),
            key_findings: None,
        }
    }

    /// Attach key findings
    pub fn with_findings(mut self, findings: impl Into<String>) -> Self {
        self.key_findings = Some(findings.into());
        self
    }
}

/// The synthesis node's output: the brief body without sources, audit
/// trail, or timestamp, which the orchestrator supplies downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisDraft {
    /// Executive summary of findings.
    pub executive_summary: String,
    /// Key findings with evidence.
    pub key_findings: Vec<String>,
    /// Detailed analysis synthesizing all sources.
    pub detailed_analysis: String,
    /// Actionable recommendations.
    pub recommendations: Vec<String>,
    /// Known limitations of the research.
    #[serde(default)]
    pub limitations: Vec<String>,
    /// Overall confidence in the findings, 0.0 to 1.0.
    pub confidence_score: f64,
}

impl SynthesisDraft {
    /// Validate the draft given how many sources backed it.
    ///
    /// With at least one source the findings and recommendations must be
    /// non-empty; a sourceless best-effort draft is exempt.
    pub fn validate(&self, source_count: usize) -> Result<(), ValidationError> {
        if self.executive_summary.trim().is_empty() {
            return Err(ValidationError::new(
                "executive_summary",
                "must not be empty",
            ));
        }
        if source_count > 0 {
            if self.key_findings.is_empty() {
                return Err(ValidationError::new("key_findings", "must not be empty"));
            }
            if self.recommendations.is_empty() {
                return Err(ValidationError::new("recommendations", "must not be empty"));
            }
        }
        Ok(())
    }
}

/// The terminal research brief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalBrief {
    /// Unique brief identifier.
    pub id: String,
    /// Research topic.
    pub topic: String,
    /// Executive summary of findings.
    pub executive_summary: String,
    /// Key findings.
    pub key_findings: Vec<String>,
    /// Detailed analysis section.
    pub detailed_analysis: String,
    /// Actionable recommendations.
    pub recommendations: Vec<String>,
    /// Sources used in the research.
    pub sources: Vec<SourceSummary>,
    /// Audit trail of node executions.
    pub research_steps: Vec<ResearchStep>,
    /// Limitations of the research.
    pub limitations: Vec<String>,
    /// Overall confidence in the findings, 0.0 to 1.0.
    pub confidence_score: f64,
    /// Set once, when post-processing succeeds.
    pub generated_at: DateTime<Utc>,
}

impl FinalBrief {
    /// Assign a fresh brief identifier.
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Validate the finished brief.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(ValidationError::new("topic", "must not be empty"));
        }
        if self.executive_summary.trim().is_empty() {
            return Err(ValidationError::new(
                "executive_summary",
                "must not be empty",
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(ValidationError::new(
                "confidence_score",
                "must be within [0, 1]",
            ));
        }
        Ok(())
    }
}
