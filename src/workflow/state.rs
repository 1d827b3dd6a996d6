use serde::{Deserialize, Serialize};

use crate::schema::ResearchStep;

/// The six workflow nodes, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeName {
    /// Condenses the user's prior briefs into context.
    ContextSummarization,
    /// Derives research questions and search queries.
    Planning,
    /// Executes the planned search queries.
    Search,
    /// Fetches and summarizes source content.
    ContentFetching,
    /// Synthesizes sources into the brief body.
    Synthesis,
    /// Validates and finalizes the brief.
    PostProcessing,
}

/// All nodes in execution order.
pub const NODE_ORDER: [NodeName; 6] = [
    NodeName::ContextSummarization,
    NodeName::Planning,
    NodeName::Search,
    NodeName::ContentFetching,
    NodeName::Synthesis,
    NodeName::PostProcessing,
];

impl std::fmt::Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeName::ContextSummarization => write!(f, "context_summarization"),
            NodeName::Planning => write!(f, "planning"),
            NodeName::Search => write!(f, "search"),
            NodeName::ContentFetching => write!(f, "content_fetching"),
            NodeName::Synthesis => write!(f, "synthesis"),
            NodeName::PostProcessing => write!(f, "post_processing"),
        }
    }
}

impl std::str::FromStr for NodeName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "context_summarization" => Ok(NodeName::ContextSummarization),
            "planning" => Ok(NodeName::Planning),
            "search" => Ok(NodeName::Search),
            "content_fetching" => Ok(NodeName::ContentFetching),
            "synthesis" => Ok(NodeName::Synthesis),
            "post_processing" => Ok(NodeName::PostProcessing),
            _ => Err(format!("Unknown node name: {}", s)),
        }
    }
}

/// Execution state of one node, driven by the orchestrator.
///
/// Legal transitions: Pending → Running, Running → Succeeded,
/// Running → RetryableFailed, RetryableFailed → Running,
/// Running → FatalFailed. Succeeded and FatalFailed are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Not started yet.
    #[default]
    Pending,
    /// Currently executing an attempt.
    Running,
    /// Completed successfully.
    Succeeded,
    /// Failed transiently; eligible for another attempt.
    RetryableFailed,
    /// Failed terminally.
    FatalFailed,
}

impl NodeStatus {
    /// Whether the state machine accepts a transition to `next`.
    pub fn may_transition_to(self, next: NodeStatus) -> bool {
        matches!(
            (self, next),
            (NodeStatus::Pending, NodeStatus::Running)
                | (NodeStatus::Running, NodeStatus::Succeeded)
                | (NodeStatus::Running, NodeStatus::RetryableFailed)
                | (NodeStatus::Running, NodeStatus::FatalFailed)
                | (NodeStatus::RetryableFailed, NodeStatus::Running)
        )
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeStatus::Succeeded | NodeStatus::FatalFailed)
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Pending => write!(f, "pending"),
            NodeStatus::Running => write!(f, "running"),
            NodeStatus::Succeeded => write!(f, "succeeded"),
            NodeStatus::RetryableFailed => write!(f, "retryable_failed"),
            NodeStatus::FatalFailed => write!(f, "fatal_failed"),
        }
    }
}

/// Append-only audit trail with a strictly increasing step counter.
#[derive(Debug, Default)]
pub struct StepLog {
    steps: Vec<ResearchStep>,
}

impl StepLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one node execution attempt.
    pub fn record(&mut self, action: impl Into<String>, key_findings: Option<String>) {
        let step_number = self.steps.len() as u32 + 1;
        let mut step = ResearchStep::new(step_number, action);
        step.key_findings = key_findings;
        self.steps.push(step);
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// View the recorded steps.
    pub fn steps(&self) -> &[ResearchStep] {
        &self.steps
    }

    /// Consume the log, yielding the ordered steps.
    pub fn into_steps(self) -> Vec<ResearchStep> {
        self.steps
    }
}
