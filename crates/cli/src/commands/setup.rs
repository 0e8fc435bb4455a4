//! Shared setup for the commands: config, dataset, provider, agent.
//!
//! Every failure here is a setup error and aborts before any task runs.

use quarry_agent::{AgentLoop, AgentSettings};
use quarry_config::AppConfig;
use quarry_core::event::{DomainEvent, EventBus};
use quarry_store::SqliteStore;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

type SetupResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Load config from `path` or the default location, with env overrides.
pub fn load_config(path: Option<&Path>) -> SetupResult<AppConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    };
    AppConfig::load_with_env(&path).map_err(|e| format!("Failed to load config: {e}").into())
}

/// Open the database and load the configured CSV into it.
pub async fn open_dataset(config: &AppConfig) -> SetupResult<Arc<SqliteStore>> {
    let dataset = &config.dataset;
    let store = SqliteStore::open(&dataset.database_path).await?;
    let rows = store
        .load_csv(&dataset.csv_path, &dataset.table_name, &dataset.datetime_columns)
        .await
        .map_err(|e| format!("Failed to load dataset: {e}"))?;
    info!(
        table = %dataset.table_name,
        rows,
        "Dataset ready from {}",
        dataset.csv_path.display()
    );
    Ok(Arc::new(store))
}

/// Build the provider, load the dataset and wire up an agent.
pub async fn build_agent(config: &AppConfig, max_steps: Option<u32>) -> SetupResult<AgentLoop> {
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    QUARRY_API_KEY=sk-...        (takes precedence)");
        eprintln!("    SILICONFLOW_API_KEY=sk-...");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }
    let provider = quarry_providers::build_from_config(config)?;

    let store = open_dataset(config).await?;
    let tools = Arc::new(quarry_tools::default_registry(store, &config.prompts)?);

    let event_bus = Arc::new(EventBus::default());
    spawn_progress_reporter(&event_bus);

    let mut agent = AgentLoop::new(provider, tools, AgentSettings::from_config(config))
        .with_event_bus(event_bus);
    if let Some(max) = max_steps {
        agent = agent.with_max_steps(max.max(1));
    }
    Ok(agent)
}

/// Log run progress from domain events.
fn spawn_progress_reporter(bus: &EventBus) {
    tokio::spawn(report_progress(bus.subscribe()));
}

/// Report events until the bus closes. Returns how many were reported.
async fn report_progress(mut rx: broadcast::Receiver<Arc<DomainEvent>>) -> usize {
    let mut reported = 0;
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Progress reporter fell behind");
                continue;
            }
            Err(RecvError::Closed) => return reported,
        };
        reported += 1;
        match event.as_ref() {
            DomainEvent::ToolExecuted {
                tool_name,
                success,
                duration_ms,
                ..
            } => {
                let status = if *success { "ok" } else { "failed" };
                info!("Tool {tool_name} {status} ({duration_ms} ms)");
            }
            DomainEvent::ResponseGenerated {
                step, tokens_used, ..
            } => {
                debug!(step, tokens_used, "Model responded");
            }
            DomainEvent::RunStarted { .. } | DomainEvent::RunFinished { .. } => {}
        }
    }
}
