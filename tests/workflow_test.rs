//! End-to-end orchestrator tests over scripted adapter fakes.
//!
//! The fakes route on the node prompts so one model double serves the
//! whole pipeline; failure-injection doubles cover the retry, degrade,
//! and cancellation paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use research_brief::adapters::{
    ContentFetcher, HistoryStore, LanguageModel, Prompt, SearchClient,
};
use research_brief::config::WorkflowConfig;
use research_brief::error::{AdapterError, AdapterResult, StoreResult, WorkflowErrorKind};
use research_brief::prompts;
use research_brief::schema::{FinalBrief, ResearchRequest, SearchResult};
use research_brief::workflow::{BriefWorkflow, NodeName};

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

/// Answers each node with a canned payload, routed on the system prompt.
struct RoutedModel {
    calls: AtomicUsize,
}

impl RoutedModel {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

fn plan_json() -> String {
    r#"{"research_questions": ["What are current adoption rates?",
                               "Which technologies are growing fastest?"],
        "search_queries": ["renewable adoption 2026", "solar growth statistics",
                           "wind capacity forecast", "grid storage technology",
                           "renewable energy policy"],
        "expected_sources": ["academic", "news"]}"#
        .to_string()
}

fn source_json() -> String {
    r#"{"summary": "The source reports sustained growth in renewable capacity.",
        "relevance_score": 0.85,
        "key_points": ["capacity grew", "costs fell"]}"#
        .to_string()
}

fn synthesis_json() -> String {
    r#"{"executive_summary": "Renewable energy adoption keeps accelerating.",
        "key_findings": ["Capacity additions set a record", "Storage is the bottleneck"],
        "detailed_analysis": "Across the retrieved sources, growth is broad-based.",
        "recommendations": ["Track storage deployment", "Watch policy changes"],
        "limitations": [],
        "confidence_score": 0.82}"#
        .to_string()
}

#[async_trait::async_trait]
impl LanguageModel for RoutedModel {
    async fn complete(&self, prompt: &Prompt) -> AdapterResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.system == prompts::PLANNING_PROMPT {
            Ok(plan_json())
        } else if prompt.system == prompts::SOURCE_SUMMARY_PROMPT {
            Ok(source_json())
        } else if prompt.system == prompts::SYNTHESIS_PROMPT {
            Ok(synthesis_json())
        } else {
            Ok("Earlier briefs covered adjacent renewable topics.".to_string())
        }
    }

    async fn ping(&self) -> AdapterResult<()> {
        Ok(())
    }
}

/// Always fails with a transient API error.
struct UnavailableModel;

#[async_trait::async_trait]
impl LanguageModel for UnavailableModel {
    async fn complete(&self, _prompt: &Prompt) -> AdapterResult<String> {
        Err(AdapterError::Api {
            status: 503,
            message: "overloaded".to_string(),
        })
    }

    async fn ping(&self) -> AdapterResult<()> {
        Ok(())
    }
}

/// Returns one distinct result per query.
struct OnePerQuerySearch;

#[async_trait::async_trait]
impl SearchClient for OnePerQuerySearch {
    async fn search(&self, query: &str, _max_results: usize) -> AdapterResult<Vec<SearchResult>> {
        let slug: String = query
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        Ok(vec![SearchResult {
            query: query.to_string(),
            url: format!("https://results.example/{}", slug),
            title: format!("Result for {}", query),
            snippet: "snippet".to_string(),
        }])
    }

    async fn ping(&self) -> AdapterResult<()> {
        Ok(())
    }
}

/// Returns the same URL for every query.
struct SameUrlSearch;

#[async_trait::async_trait]
impl SearchClient for SameUrlSearch {
    async fn search(&self, query: &str, _max_results: usize) -> AdapterResult<Vec<SearchResult>> {
        Ok(vec![SearchResult {
            query: query.to_string(),
            url: "https://results.example/only".to_string(),
            title: "The only result".to_string(),
            snippet: "snippet".to_string(),
        }])
    }

    async fn ping(&self) -> AdapterResult<()> {
        Ok(())
    }
}

struct OkFetcher;

#[async_trait::async_trait]
impl ContentFetcher for OkFetcher {
    async fn fetch(&self, url: &str) -> AdapterResult<String> {
        Ok(format!("extracted text from {}", url))
    }
}

struct DownFetcher;

#[async_trait::async_trait]
impl ContentFetcher for DownFetcher {
    async fn fetch(&self, _url: &str) -> AdapterResult<String> {
        Err(AdapterError::Timeout { timeout_ms: 1 })
    }
}

/// Append-only in-memory history, most-recent-first on list.
#[derive(Default)]
struct InMemoryHistory {
    briefs: Mutex<HashMap<String, Vec<FinalBrief>>>,
}

impl InMemoryHistory {
    fn with_brief(user_id: &str, brief: FinalBrief) -> Self {
        let store = Self::default();
        store
            .briefs
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(brief);
        store
    }

    fn count(&self, user_id: &str) -> usize {
        self.briefs
            .lock()
            .unwrap()
            .get(user_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistory {
    async fn list(&self, user_id: &str) -> StoreResult<Vec<FinalBrief>> {
        let briefs = self.briefs.lock().unwrap();
        let mut entries = briefs.get(user_id).cloned().unwrap_or_default();
        entries.reverse();
        Ok(entries)
    }

    async fn append(&self, user_id: &str, brief: &FinalBrief) -> StoreResult<()> {
        self.briefs
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(brief.clone());
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fast_config() -> WorkflowConfig {
    WorkflowConfig {
        retry_delay_ms: 1,
        ..WorkflowConfig::default()
    }
}

fn request() -> ResearchRequest {
    ResearchRequest::new("Renewable Energy Trends", "u1")
}

fn seeded_brief(id: &str, topic: &str) -> FinalBrief {
    FinalBrief {
        id: id.to_string(),
        topic: topic.to_string(),
        executive_summary: "Earlier summary".to_string(),
        key_findings: vec!["earlier finding".to_string()],
        detailed_analysis: "Earlier analysis".to_string(),
        recommendations: vec!["earlier recommendation".to_string()],
        sources: vec![],
        research_steps: vec![],
        limitations: vec![],
        confidence_score: 0.7,
        generated_at: chrono::Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_happy_path_yields_complete_brief_with_five_sources() {
    let history = Arc::new(InMemoryHistory::default());
    let workflow = BriefWorkflow::new(
        Arc::new(RoutedModel::new()),
        Arc::new(OnePerQuerySearch),
        Arc::new(OkFetcher),
        Arc::clone(&history) as Arc<dyn HistoryStore>,
        fast_config(),
    );

    let brief = workflow.generate_brief(request()).await.unwrap();

    // 5 planned queries, one distinct url each, all fetched
    assert_eq!(brief.sources.len(), 5);
    assert!((0.0..=1.0).contains(&brief.confidence_score));
    assert!(brief.research_steps.len() >= 6);
    assert!(!brief.executive_summary.is_empty());
    assert!(!brief.key_findings.is_empty());
    assert_eq!(brief.topic, "Renewable Energy Trends");

    // Steps are numbered 1..=n with no gaps
    for (i, step) in brief.research_steps.iter().enumerate() {
        assert_eq!(step.step_number, i as u32 + 1);
    }

    // The finished brief was appended to the user's history
    assert_eq!(history.count("u1"), 1);
}

#[tokio::test]
async fn test_duplicate_urls_collapse_into_one_source() {
    let workflow = BriefWorkflow::new(
        Arc::new(RoutedModel::new()),
        Arc::new(SameUrlSearch),
        Arc::new(OkFetcher),
        Arc::new(InMemoryHistory::default()),
        fast_config(),
    );

    let brief = workflow.generate_brief(request()).await.unwrap();

    assert_eq!(brief.sources.len(), 1);
    assert_eq!(brief.sources[0].url, "https://results.example/only");
}

#[tokio::test]
async fn test_retry_exhaustion_names_node_and_attempts() {
    let config = WorkflowConfig {
        max_retries: 2,
        retry_delay_ms: 1,
        ..WorkflowConfig::default()
    };
    // Context is skipped on empty history, so planning fails first
    let workflow = BriefWorkflow::new(
        Arc::new(UnavailableModel),
        Arc::new(OnePerQuerySearch),
        Arc::new(OkFetcher),
        Arc::new(InMemoryHistory::default()),
        config,
    );

    let err = workflow.generate_brief(request()).await.unwrap_err();

    assert_eq!(err.kind(), WorkflowErrorKind::RetriesExhausted);
    assert_eq!(err.node(), Some(NodeName::Planning));
    match err {
        research_brief::WorkflowError::RetriesExhausted { attempts, .. } => {
            assert_eq!(attempts, 2)
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_depth_rejected_before_any_node_runs() {
    let model = Arc::new(RoutedModel::new());
    let history = Arc::new(InMemoryHistory::default());
    let workflow = BriefWorkflow::new(
        Arc::clone(&model) as Arc<dyn LanguageModel>,
        Arc::new(OnePerQuerySearch),
        Arc::new(OkFetcher),
        Arc::clone(&history) as Arc<dyn HistoryStore>,
        fast_config(),
    );

    let err = workflow
        .generate_brief(request().with_depth(6))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), WorkflowErrorKind::InvalidRequest);
    // No adapter was touched and nothing was persisted
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert_eq!(history.count("u1"), 0);
}

#[tokio::test]
async fn test_zero_fetches_degrade_to_sourceless_brief_with_limitation() {
    let config = WorkflowConfig {
        max_retries: 1,
        retry_delay_ms: 1,
        ..WorkflowConfig::default()
    };
    let workflow = BriefWorkflow::new(
        Arc::new(RoutedModel::new()),
        Arc::new(OnePerQuerySearch),
        Arc::new(DownFetcher),
        Arc::new(InMemoryHistory::default()),
        config,
    );

    let brief = workflow.generate_brief(request()).await.unwrap();

    assert!(brief.sources.is_empty());
    assert!(brief
        .limitations
        .iter()
        .any(|l| l.contains("No sources")));
    // Synthesis still produced a best-effort body
    assert!(!brief.executive_summary.is_empty());
}

#[tokio::test]
async fn test_follow_up_with_empty_history_is_a_fresh_run() {
    let workflow = BriefWorkflow::new(
        Arc::new(RoutedModel::new()),
        Arc::new(OnePerQuerySearch),
        Arc::new(OkFetcher),
        Arc::new(InMemoryHistory::default()),
        fast_config(),
    );

    let brief = workflow
        .generate_brief(request().with_follow_up(true))
        .await
        .unwrap();

    // The context node ran, emitted the empty marker, and recorded it
    let first = &brief.research_steps[0];
    assert!(first.action.contains("context"));
    assert_eq!(first.key_findings.as_deref(), Some("no prior context"));
}

#[tokio::test]
async fn test_follow_up_condenses_prior_briefs() {
    let history = Arc::new(InMemoryHistory::with_brief(
        "u1",
        seeded_brief("b1", "Solar Adoption"),
    ));
    let workflow = BriefWorkflow::new(
        Arc::new(RoutedModel::new()),
        Arc::new(OnePerQuerySearch),
        Arc::new(OkFetcher),
        Arc::clone(&history) as Arc<dyn HistoryStore>,
        fast_config(),
    );

    let brief = workflow
        .generate_brief(request().with_follow_up(true))
        .await
        .unwrap();

    let first = &brief.research_steps[0];
    assert_eq!(
        first.key_findings.as_deref(),
        Some("condensed 1 prior briefs")
    );
    // Prior brief plus the new one
    assert_eq!(history.count("u1"), 2);
}

#[tokio::test]
async fn test_cancellation_aborts_run_naming_in_flight_node() {
    let workflow = BriefWorkflow::new(
        Arc::new(RoutedModel::new()),
        Arc::new(OnePerQuerySearch),
        Arc::new(OkFetcher),
        Arc::new(InMemoryHistory::default()),
        fast_config(),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = workflow
        .run_with_cancel(request(), None, cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), WorkflowErrorKind::Cancelled);
    assert_eq!(err.node(), Some(NodeName::ContextSummarization));
}

// ---------------------------------------------------------------------------
// Health check over mockall doubles
// ---------------------------------------------------------------------------

mod health {
    use super::*;
    use mockall::mock;

    mock! {
        pub ModelAdapter {}

        #[async_trait::async_trait]
        impl LanguageModel for ModelAdapter {
            async fn complete(&self, prompt: &Prompt) -> AdapterResult<String>;
            async fn ping(&self) -> AdapterResult<()>;
        }
    }

    mock! {
        pub SearchAdapter {}

        #[async_trait::async_trait]
        impl SearchClient for SearchAdapter {
            async fn search(&self, query: &str, max_results: usize) -> AdapterResult<Vec<SearchResult>>;
            async fn ping(&self) -> AdapterResult<()>;
        }
    }

    #[tokio::test]
    async fn test_health_check_reports_all_reachable() {
        let mut model = MockModelAdapter::new();
        model.expect_ping().times(1).returning(|| Ok(()));
        let mut search = MockSearchAdapter::new();
        search.expect_ping().times(1).returning(|| Ok(()));

        let workflow = BriefWorkflow::new(
            Arc::new(model),
            Arc::new(search),
            Arc::new(OkFetcher),
            Arc::new(InMemoryHistory::default()),
            fast_config(),
        );

        let report = workflow.health_check().await;
        assert!(report.healthy());
    }

    #[tokio::test]
    async fn test_health_check_flags_unreachable_model() {
        let mut model = MockModelAdapter::new();
        model.expect_ping().times(1).returning(|| {
            Err(AdapterError::Auth {
                message: "bad key".to_string(),
            })
        });
        let mut search = MockSearchAdapter::new();
        search.expect_ping().times(1).returning(|| Ok(()));

        let workflow = BriefWorkflow::new(
            Arc::new(model),
            Arc::new(search),
            Arc::new(OkFetcher),
            Arc::new(InMemoryHistory::default()),
            fast_config(),
        );

        let report = workflow.health_check().await;
        assert!(!report.healthy());
        assert!(!report.model.healthy);
        assert!(report.search.healthy);
        assert!(report.history.healthy);
        assert!(report.model.detail.as_deref().unwrap().contains("bad key"));
    }
}
