use std::env;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use research_brief::{
    adapters::{
        GeminiClient, HttpFetcher, SearchClient, SerperClient, SimulatedSearchClient,
        SqliteHistoryStore,
    },
    config::Config,
    schema::ResearchRequest,
    workflow::BriefWorkflow,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Research brief generator starting..."
    );

    // The run itself is driven by environment variables; argument
    // parsing belongs to outer adapters, not this binary.
    let topic = match env::var("BRIEF_TOPIC") {
        Ok(t) => t,
        Err(_) => {
            eprintln!("BRIEF_TOPIC is required (10-500 characters)");
            std::process::exit(1);
        }
    };
    let depth: u8 = env::var("BRIEF_DEPTH")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3);
    let follow_up = env::var("BRIEF_FOLLOW_UP")
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let user_id = env::var("BRIEF_USER").unwrap_or_else(|_| "default".to_string());

    // Initialize the history store
    let history = match SqliteHistoryStore::new(&config.history).await {
        Ok(s) => {
            info!(path = %config.history.path.display(), "History database initialized");
            Arc::new(s)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize history database");
            return Err(e.into());
        }
    };

    // Initialize the model client
    let model = match GeminiClient::new(&config.model, &config.request) {
        Ok(c) => {
            info!(base_url = %config.model.base_url, model = %config.model.model, "Model client initialized");
            Arc::new(c)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize model client");
            return Err(e.into());
        }
    };

    // Pick the search backend: live when a key is configured, simulated
    // otherwise. Both satisfy the same contract.
    let search: Arc<dyn SearchClient> = match &config.search.api_key {
        Some(key) => {
            info!(base_url = %config.search.base_url, "Using live search backend");
            Arc::new(SerperClient::new(key.clone(), &config.search, &config.request)?)
        }
        None => {
            warn!("SERPER_API_KEY not set; using simulated search backend");
            Arc::new(SimulatedSearchClient::new())
        }
    };

    let fetcher = Arc::new(HttpFetcher::new(config.workflow.fetch_timeout_ms)?);

    let workflow = BriefWorkflow::new(model, search, fetcher, history, config.workflow);

    let health = workflow.health_check().await;
    if !health.healthy() {
        warn!("Proceeding despite degraded collaborators");
    }

    let request = ResearchRequest::new(topic, user_id)
        .with_depth(depth)
        .with_follow_up(follow_up);

    match workflow.generate_brief(request).await {
        Ok(brief) => {
            info!(brief_id = %brief.id, "Brief generated");
            println!("{}", serde_json::to_string_pretty(&brief)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Workflow failed");
            Err(e.into())
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        research_brief::config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        research_brief::config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
