//! The workflow orchestrator.
//!
//! Sequences the six nodes in fixed total order, drives the per-node
//! retry state machine, carries the append-only state forward, and
//! produces either a complete [`FinalBrief`] or a single
//! [`WorkflowError`]. Nodes never see each other; all carry-over flows
//! through the typed outputs the orchestrator hands downstream.

mod state;

pub use state::{NodeName, NodeStatus, StepLog, NODE_ORDER};

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapters::{ContentFetcher, HistoryStore, LanguageModel, SearchClient};
use crate::config::WorkflowConfig;
use crate::error::{NodeError, WorkflowError};
use crate::nodes::{
    BriefCandidate, ContextNode, FetchOutcome, FetchingNode, PlanningNode, PostProcessNode,
    SearchNode, SynthesisNode,
};
use crate::schema::{FinalBrief, PriorContextSummary, ResearchRequest, SearchResult};

/// Reachability of one external collaborator.
#[derive(Debug, Clone)]
pub struct ComponentHealth {
    /// Whether the ping succeeded.
    pub healthy: bool,
    /// Failure detail when unhealthy.
    pub detail: Option<String>,
}

impl ComponentHealth {
    fn from_result<E: std::fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                healthy: true,
                detail: None,
            },
            Err(e) => Self {
                healthy: false,
                detail: Some(e.to_string()),
            },
        }
    }
}

/// Adapter reachability report produced without running the pipeline.
///
/// The content fetcher has no fixed endpoint to probe, so it is not part
/// of the report.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Language model backend.
    pub model: ComponentHealth,
    /// Search backend.
    pub search: ComponentHealth,
    /// Brief history store.
    pub history: ComponentHealth,
}

impl HealthReport {
    /// Whether every probed collaborator is reachable.
    pub fn healthy(&self) -> bool {
        self.model.healthy && self.search.healthy && self.history.healthy
    }
}

/// The research brief workflow orchestrator.
pub struct BriefWorkflow {
    model: Arc<dyn LanguageModel>,
    search: Arc<dyn SearchClient>,
    history: Arc<dyn HistoryStore>,
    context_node: ContextNode,
    planning_node: PlanningNode,
    search_node: SearchNode,
    fetching_node: FetchingNode,
    synthesis_node: SynthesisNode,
    post_node: PostProcessNode,
    config: WorkflowConfig,
}

impl BriefWorkflow {
    /// Wire the orchestrator over its four collaborators.
    pub fn new(
        model: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchClient>,
        fetcher: Arc<dyn ContentFetcher>,
        history: Arc<dyn HistoryStore>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            context_node: ContextNode::new(Arc::clone(&model)),
            planning_node: PlanningNode::new(Arc::clone(&model)),
            search_node: SearchNode::new(
                Arc::clone(&search),
                config.max_search_results,
                config.max_concurrent_requests,
            ),
            fetching_node: FetchingNode::new(
                fetcher,
                Arc::clone(&model),
                config.max_sources,
                config.max_concurrent_requests,
            ),
            synthesis_node: SynthesisNode::new(Arc::clone(&model)),
            post_node: PostProcessNode::new(config.min_relevance),
            model,
            search,
            history,
            config,
        }
    }

    /// Generate a brief, loading and appending history for the user.
    pub async fn generate_brief(&self, request: ResearchRequest) -> Result<FinalBrief, WorkflowError> {
        self.generate_brief_with_cancel(request, CancellationToken::new())
            .await
    }

    /// [`generate_brief`](Self::generate_brief) with an external
    /// cancellation signal.
    pub async fn generate_brief_with_cancel(
        &self,
        request: ResearchRequest,
        cancel: CancellationToken,
    ) -> Result<FinalBrief, WorkflowError> {
        let history = if request.follow_up && !request.user_id.trim().is_empty() {
            match self.history.list(&request.user_id).await {
                Ok(briefs) if briefs.is_empty() => {
                    debug!(user_id = %request.user_id, "No prior briefs; proceeding as a fresh run");
                    None
                }
                Ok(briefs) => Some(briefs),
                Err(e) => {
                    warn!(error = %e, user_id = %request.user_id, "History read failed; proceeding as a fresh run");
                    None
                }
            }
        } else {
            None
        };

        let user_id = request.user_id.clone();
        let brief = self.run_with_cancel(request, history, cancel).await?;

        if let Err(e) = self.history.append(&user_id, &brief).await {
            warn!(error = %e, user_id = %user_id, "Failed to append brief to history");
        }

        Ok(brief)
    }

    /// Run the pipeline with an explicitly supplied history.
    pub async fn run(
        &self,
        request: ResearchRequest,
        history: Option<Vec<FinalBrief>>,
    ) -> Result<FinalBrief, WorkflowError> {
        self.run_with_cancel(request, history, CancellationToken::new())
            .await
    }

    /// [`run`](Self::run) with an external cancellation signal.
    ///
    /// A fired token aborts the in-flight node and the whole run; partial
    /// state is discarded.
    pub async fn run_with_cancel(
        &self,
        request: ResearchRequest,
        history: Option<Vec<FinalBrief>>,
        cancel: CancellationToken,
    ) -> Result<FinalBrief, WorkflowError> {
        // Rejected requests leave zero audit trail entries
        request
            .validate()
            .map_err(|e| WorkflowError::InvalidRequest {
                message: e.to_string(),
            })?;

        info!(
            topic = %request.topic,
            depth = request.depth,
            follow_up = request.follow_up,
            user_id = %request.user_id,
            "Starting research brief workflow"
        );

        let mut steps = StepLog::new();
        let prior = history.unwrap_or_default();

        let context = self
            .drive(
                NodeName::ContextSummarization,
                &cancel,
                &mut steps,
                "Summarized prior research context",
                || self.context_node.run(&request.topic, &prior),
                |ctx: &PriorContextSummary| {
                    if ctx.is_empty() {
                        Some("no prior context".to_string())
                    } else {
                        Some(format!("condensed {} prior briefs", ctx.derived_from.len()))
                    }
                },
            )
            .await?;

        let plan = self
            .drive(
                NodeName::Planning,
                &cancel,
                &mut steps,
                "Planned the research",
                || {
                    self.planning_node
                        .run(&request.topic, request.depth, &context)
                },
                |plan: &crate::schema::ResearchPlan| {
                    Some(format!(
                        "{} research questions, {} search queries",
                        plan.research_questions.len(),
                        plan.search_queries.len()
                    ))
                },
            )
            .await?;

        let results = self
            .drive(
                NodeName::Search,
                &cancel,
                &mut steps,
                "Executed planned search queries",
                || self.search_node.run(&plan),
                |results: &Vec<SearchResult>| Some(format!("{} unique results", results.len())),
            )
            .await?;

        let fetched = match self
            .drive(
                NodeName::ContentFetching,
                &cancel,
                &mut steps,
                "Fetched and summarized sources",
                || self.fetching_node.run(&request.topic, &results),
                |outcome: &FetchOutcome| {
                    Some(format!(
                        "{} sources summarized, {} dropped",
                        outcome.summaries.len(),
                        outcome.limitations.len()
                    ))
                },
            )
            .await
        {
            Ok(outcome) => outcome,
            // Exhausted fetching degrades instead of halting: synthesis
            // still runs and the brief carries the limitation.
            Err(WorkflowError::RetriesExhausted { node, attempts, message }) => {
                warn!(%node, attempts, %message, "Continuing without sources");
                FetchOutcome {
                    summaries: Vec::new(),
                    limitations: vec![
                        "No sources could be retrieved; the brief is not source-backed"
                            .to_string(),
                    ],
                }
            }
            Err(e) => return Err(e),
        };

        let draft = self
            .drive(
                NodeName::Synthesis,
                &cancel,
                &mut steps,
                "Synthesized findings into a draft brief",
                || {
                    self.synthesis_node.run(
                        &request.topic,
                        request.depth,
                        &plan,
                        &context,
                        &fetched.summaries,
                    )
                },
                |draft: &crate::schema::SynthesisDraft| {
                    Some(format!("{} key findings", draft.key_findings.len()))
                },
            )
            .await?;

        // Post-processing executes exactly once; its failures are
        // terminal by definition, so no retry arc exists for it. Its
        // audit entry is recorded first because the node receives the
        // completed trail inside the candidate.
        steps.record("Validated and finalized the brief", None);

        if cancel.is_cancelled() {
            return Err(WorkflowError::Cancelled {
                node: NodeName::PostProcessing,
            });
        }

        let candidate = BriefCandidate {
            topic: request.topic.clone(),
            draft,
            sources: fetched.summaries,
            steps: steps.into_steps(),
            extra_limitations: fetched.limitations,
        };

        let brief = self.post_node.run(candidate).map_err(|e| match e {
            NodeError::Consistency { message } => WorkflowError::InternalConsistency {
                node: NodeName::PostProcessing,
                message,
            },
            NodeError::Fatal { message } | NodeError::Retryable { message } => {
                WorkflowError::Fatal {
                    node: NodeName::PostProcessing,
                    message,
                }
            }
        })?;

        info!(
            brief_id = %brief.id,
            sources = brief.sources.len(),
            steps = brief.research_steps.len(),
            "Workflow complete"
        );

        Ok(brief)
    }

    /// Verify adapter reachability without running the pipeline.
    pub async fn health_check(&self) -> HealthReport {
        let (model, search, history) = tokio::join!(
            self.model.ping(),
            self.search.ping(),
            self.history.ping()
        );

        let report = HealthReport {
            model: ComponentHealth::from_result(model),
            search: ComponentHealth::from_result(search),
            history: ComponentHealth::from_result(history),
        };

        if !report.healthy() {
            warn!(
                model = report.model.healthy,
                search = report.search.healthy,
                history = report.history.healthy,
                "One or more collaborators are unreachable"
            );
        }

        report
    }

    /// Drive one node through the retry state machine.
    ///
    /// Each attempt re-executes the node from its own input. One audit
    /// entry is recorded per attempt. Exhausting the retry budget
    /// escalates to [`WorkflowError::RetriesExhausted`] with the retry
    /// count; fatal and consistency failures halt immediately.
    async fn drive<T, Fut>(
        &self,
        node: NodeName,
        cancel: &CancellationToken,
        steps: &mut StepLog,
        action: &str,
        mut attempt: impl FnMut() -> Fut,
        describe: impl Fn(&T) -> Option<String>,
    ) -> Result<T, WorkflowError>
    where
        Fut: Future<Output = Result<T, NodeError>>,
    {
        let mut status = NodeStatus::Pending;
        let mut retries: u32 = 0;

        loop {
            debug_assert!(status.may_transition_to(NodeStatus::Running));
            status = NodeStatus::Running;
            let attempt_no = retries + 1;
            debug!(node = %node, attempt = attempt_no, status = %status, "Executing node");

            let started = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(node = %node, "Cancellation requested; aborting run");
                    return Err(WorkflowError::Cancelled { node });
                }
                outcome = attempt() => outcome,
            };
            let latency_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(value) => {
                    status = NodeStatus::Succeeded;
                    info!(node = %node, attempt = attempt_no, latency_ms, status = %status, "Node succeeded");
                    steps.record(action, describe(&value));
                    return Ok(value);
                }
                Err(NodeError::Retryable { message }) => {
                    status = NodeStatus::RetryableFailed;
                    debug!(node = %node, status = %status, "Node attempt failed");
                    steps.record(
                        format!("{} (attempt {} failed)", action, attempt_no),
                        Some(message.clone()),
                    );

                    if retries >= self.config.max_retries {
                        error!(node = %node, retries, message = %message, "Retry budget exhausted");
                        return Err(WorkflowError::RetriesExhausted {
                            node,
                            attempts: retries,
                            message,
                        });
                    }

                    retries += 1;
                    let delay = Duration::from_millis(
                        self.config
                            .retry_delay_ms
                            .saturating_mul(2u64.saturating_pow(retries - 1)),
                    );
                    warn!(
                        node = %node,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        message = %message,
                        "Retrying node"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            return Err(WorkflowError::Cancelled { node });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(NodeError::Fatal { message }) => {
                    status = NodeStatus::FatalFailed;
                    steps.record(
                        format!("{} (attempt {} failed)", action, attempt_no),
                        Some(message.clone()),
                    );
                    error!(node = %node, status = %status, message = %message, "Node failed fatally");
                    return Err(WorkflowError::Fatal { node, message });
                }
                Err(NodeError::Consistency { message }) => {
                    error!(node = %node, message = %message, "Internal consistency violation");
                    return Err(WorkflowError::InternalConsistency { node, message });
                }
            }
        }
    }
}
