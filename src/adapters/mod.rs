//! External collaborator boundaries the workflow consumes.
//!
//! Each adapter is a trait the orchestrator and nodes call through; the
//! concrete clients in this module are the shipped implementations. The
//! backing implementation is invisible to callers: the simulated search
//! client satisfies the same contract as the live one.

mod fetcher;
mod gemini;
mod history;
mod serper;

pub use fetcher::HttpFetcher;
pub use gemini::GeminiClient;
pub use history::SqliteHistoryStore;
pub use serper::{SerperClient, SimulatedSearchClient};

use async_trait::async_trait;

use crate::error::{AdapterResult, StoreResult};
use crate::schema::{FinalBrief, SearchResult};

/// A single completion request for the language model.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// System instruction framing the task.
    pub system: String,
    /// User content for this call.
    pub user: String,
    /// Whether the model should be constrained to JSON output.
    pub json_output: bool,
}

impl Prompt {
    /// Create a free-text prompt
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            json_output: false,
        }
    }

    /// Constrain the response to JSON
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Generative language model boundary.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion and return the raw response text.
    ///
    /// Callers parse and validate structured output themselves; the
    /// adapter only reports transport-level failures.
    async fn complete(&self, prompt: &Prompt) -> AdapterResult<String>;

    /// Verify the backend is reachable without running a completion.
    async fn ping(&self) -> AdapterResult<()>;
}

/// Web search boundary.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Issue one query and return up to `max_results` ranked results.
    async fn search(&self, query: &str, max_results: usize) -> AdapterResult<Vec<SearchResult>>;

    /// Verify the backend is reachable.
    async fn ping(&self) -> AdapterResult<()>;
}

/// Per-URL content retrieval boundary.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch one URL and return extracted text.
    ///
    /// Failures here are per-URL: the fetching node drops the URL and
    /// records a limitation instead of failing.
    async fn fetch(&self, url: &str) -> AdapterResult<String>;
}

/// Per-user brief history boundary.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// List a user's prior briefs, most recent first.
    async fn list(&self, user_id: &str) -> StoreResult<Vec<FinalBrief>>;

    /// Append a finished brief to the user's history.
    async fn append(&self, user_id: &str, brief: &FinalBrief) -> StoreResult<()>;

    /// Verify the store is reachable.
    async fn ping(&self) -> StoreResult<()>;
}
