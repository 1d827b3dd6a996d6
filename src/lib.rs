//! # Research Brief Generator
//!
//! Generates a structured research brief from a free-text topic by
//! running a fixed six-node workflow: context summarization, planning,
//! web search, content fetching, synthesis, and post-processing. Each
//! node is retried per a configurable policy, intermediate state is
//! validated at every boundary, and prior briefs carry context into
//! follow-up runs for the same user.
//!
//! ## Architecture
//!
//! ```text
//! Caller → BriefWorkflow → Gemini / Serper / HTTP fetch (adapters)
//!               ↓
//!          SQLite (brief history)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use research_brief::adapters::{GeminiClient, HttpFetcher, SerperClient, SqliteHistoryStore};
//! use research_brief::schema::ResearchRequest;
//! use research_brief::{BriefWorkflow, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let model = Arc::new(GeminiClient::new(&config.model, &config.request)?);
//!     let search = Arc::new(SerperClient::new("key", &config.search, &config.request)?);
//!     let fetcher = Arc::new(HttpFetcher::new(config.workflow.fetch_timeout_ms)?);
//!     let history = Arc::new(SqliteHistoryStore::new(&config.history).await?);
//!
//!     let workflow = BriefWorkflow::new(model, search, fetcher, history, config.workflow);
//!     let request = ResearchRequest::new("Renewable Energy Trends", "u1").with_depth(3);
//!     let brief = workflow.generate_brief(request).await?;
//!     println!("{}", brief.executive_summary);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// External collaborator traits and their shipped implementations.
pub mod adapters;
/// Configuration management loaded from the environment.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// The six workflow step nodes.
pub mod nodes;
/// System prompts for the language model.
pub mod prompts;
/// Structured record shapes and their validation.
pub mod schema;
/// Workflow orchestration, retry state machine, and health checks.
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult, WorkflowError, WorkflowErrorKind};
pub use schema::{FinalBrief, ResearchRequest};
pub use workflow::{BriefWorkflow, HealthReport};
