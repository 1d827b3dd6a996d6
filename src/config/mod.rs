use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelConfig,
    pub search: SearchConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub workflow: WorkflowConfig,
}

/// Language model API configuration
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: Option<u32>,
}

/// Web search API configuration
///
/// `api_key` is optional: without one the simulated search backend is
/// wired in instead of the live client.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub country: String,
    pub language: String,
}

/// Brief history database configuration
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration shared by the adapter clients
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
}

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Retries per node after the initial attempt.
    pub max_retries: u32,
    /// Base delay between retries; doubles per attempt.
    pub retry_delay_ms: u64,
    /// Aggregate cap on search results across all queries.
    pub max_search_results: usize,
    /// How many top-ranked results the fetching node processes.
    pub max_sources: usize,
    /// Per-URL fetch timeout.
    pub fetch_timeout_ms: u64,
    /// Bounded fan-out inside the search and fetching nodes.
    pub max_concurrent_requests: usize,
    /// Sources below this relevance score are stripped at post-processing.
    /// Unset means nothing is stripped.
    pub min_relevance: Option<f64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let model = ModelConfig {
            api_key: env::var("GEMINI_API_KEY").map_err(|_| AppError::Config {
                message: "GEMINI_API_KEY is required".to_string(),
            })?,
            base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            temperature: env::var("MODEL_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.7),
            max_output_tokens: env::var("MODEL_MAX_OUTPUT_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok()),
        };

        let search = SearchConfig {
            api_key: env::var("SERPER_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: env::var("SERPER_BASE_URL")
                .unwrap_or_else(|_| "https://google.serper.dev".to_string()),
            country: env::var("SERPER_GL").unwrap_or_else(|_| "us".to_string()),
            language: env::var("SERPER_HL").unwrap_or_else(|_| "en".to_string()),
        };

        let history = HistoryConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/briefs.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
        };

        let workflow = WorkflowConfig {
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            max_search_results: env::var("MAX_SEARCH_RESULTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            max_sources: env::var("MAX_SOURCES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            fetch_timeout_ms: env::var("FETCH_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_concurrent_requests: env::var("MAX_CONCURRENT_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            min_relevance: env::var("MIN_RELEVANCE").ok().and_then(|s| s.parse().ok()),
        };

        Ok(Config {
            model,
            search,
            history,
            logging,
            request,
            workflow,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            max_search_results: 10,
            max_sources: 5,
            fetch_timeout_ms: 30000,
            max_concurrent_requests: 4,
            min_relevance: None,
        }
    }
}
