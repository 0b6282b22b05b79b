//! Wiring shared by the commands: config, stores, tools, pipeline.

use anyhow::{Context, bail};
use intellicore_config::{AppConfig, CheckpointBackend};
use intellicore_core::checkpoint::CheckpointStore;
use intellicore_core::event::{DomainEvent, EventBus};
use intellicore_core::knowledge::VectorIndex;
use intellicore_memory::{FileCheckpointStore, FileVectorIndex, InMemoryCheckpointStore};
use intellicore_workflow::{PipelineOptions, ResearchPipeline};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

pub fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().context("Failed to load config")
}

/// Open the configured checkpoint backend.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CheckpointStore>> {
    let path = config.checkpoint_path();
    let store: Arc<dyn CheckpointStore> = match config.checkpoint.backend {
        CheckpointBackend::Memory => Arc::new(InMemoryCheckpointStore::new()),
        CheckpointBackend::File => Arc::new(FileCheckpointStore::new(path)),
        #[cfg(feature = "sqlite")]
        CheckpointBackend::Sqlite => Arc::new(
            intellicore_memory::SqliteCheckpointStore::new(&path)
                .await
                .with_context(|| format!("Failed to open checkpoint database {}", path.display()))?,
        ),
        #[cfg(not(feature = "sqlite"))]
        CheckpointBackend::Sqlite => {
            bail!("checkpoint backend 'sqlite' requires the `sqlite` feature")
        }
    };
    Ok(store)
}

pub fn open_index(config: &AppConfig) -> Arc<dyn VectorIndex> {
    Arc::new(FileVectorIndex::open(config.knowledge_base_path()))
}

/// Everything `run` and `resume` need.
pub async fn build_pipeline(config: &AppConfig) -> anyhow::Result<ResearchPipeline> {
    if !config.has_api_key() {
        bail!(
            "No API key configured. Set INTELLICORE_API_KEY or OPENAI_API_KEY, \
             or add api_key to {}",
            AppConfig::config_dir().join("config.toml").display()
        );
    }

    let backends = intellicore_providers::build_from_config(config);
    let tools = intellicore_tools::research_registry(config, backends.embedder, open_index(config))
        .context("Failed to build research tools")?;
    let store = open_store(config).await?;

    let event_bus = Arc::new(EventBus::default());
    spawn_event_logger(&event_bus);

    let options = PipelineOptions::from_config(config)
        .with_event_bus(event_bus)
        .with_research_model(backends.research_model);
    ResearchPipeline::new(backends.model, Arc::new(tools), store, options)
        .context("Failed to build research pipeline")
}

/// Mirror tool and model activity into the debug log.
fn spawn_event_logger(bus: &EventBus) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            match event.as_ref() {
                DomainEvent::ToolExecuted {
                    tool_name,
                    success,
                    duration_ms,
                    ..
                } => debug!(tool = %tool_name, success, duration_ms, "Tool executed"),
                DomainEvent::ModelCalled {
                    iteration,
                    completion_chars,
                    duration_ms,
                    ..
                } => debug!(iteration, completion_chars, duration_ms, "Model called"),
                _ => {}
            }
        }
    });
}
