//! The six processing units of the workflow.
//!
//! Each node is a pure function of (topic, accumulated state, config) to
//! an immutable state increment or a classified [`NodeError`]. Nodes hold
//! adapter handles but no mutable state; retry is the orchestrator's job.

mod context;
mod fetching;
mod planning;
mod post_process;
mod search;
mod synthesis;

pub use context::ContextNode;
pub use fetching::{FetchOutcome, FetchingNode};
pub use planning::PlanningNode;
pub use post_process::{BriefCandidate, PostProcessNode};
pub use search::SearchNode;
pub use synthesis::SynthesisNode;

use serde::de::DeserializeOwned;

/// Parse a model completion as a JSON payload.
///
/// Models constrained to JSON still occasionally wrap the payload in a
/// markdown fence; strip it before parsing.
pub(crate) fn parse_json_payload<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.strip_suffix("```").unwrap_or(rest))
        .unwrap_or(trimmed);
    serde_json::from_str(inner.trim())
}
