//! The research pipeline: decompose → research → write over a checkpointed
//! stage graph.

use intellicore_config::{AppConfig, ResearchFailureMode};
use intellicore_core::checkpoint::CheckpointStore;
use intellicore_core::event::EventBus;
use intellicore_core::model::LanguageModel;
use intellicore_core::state::WorkflowState;
use intellicore_core::tool::ToolRegistry;
use std::sync::Arc;

use crate::engine::{GraphEngine, WorkflowRun};
use crate::error::GraphError;
use crate::graph::StageGraph;
use crate::stages::{DecomposeStage, REPORT, REQUEST, ResearchStage, WriteStage};

/// Knobs for [`ResearchPipeline`].
#[derive(Clone)]
pub struct PipelineOptions {
    pub max_iterations: usize,
    pub on_failure: ResearchFailureMode,
    pub max_concurrency: usize,
    pub event_bus: Option<Arc<EventBus>>,
    /// Model for the reasoning loop; the shared model when unset.
    pub research_model: Option<Arc<dyn LanguageModel>>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            on_failure: ResearchFailureMode::Placeholder,
            max_concurrency: 4,
            event_bus: None,
            research_model: None,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_iterations: config.research.max_iterations,
            on_failure: config.research.on_failure,
            max_concurrency: config.workflow.max_concurrency,
            event_bus: None,
            research_model: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_research_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.research_model = Some(model);
        self
    }
}

pub struct ResearchPipeline {
    engine: GraphEngine,
}

impl ResearchPipeline {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        tools: Arc<ToolRegistry>,
        store: Arc<dyn CheckpointStore>,
        options: PipelineOptions,
    ) -> Result<Self, GraphError> {
        let research_model = options.research_model.clone().unwrap_or_else(|| model.clone());
        let mut research = ResearchStage::new(research_model, tools)
            .with_max_iterations(options.max_iterations)
            .with_failure_mode(options.on_failure);
        if let Some(bus) = &options.event_bus {
            research = research.with_event_bus(bus.clone());
        }

        let graph = StageGraph::builder()
            .initial_field(REQUEST)
            .stage(Arc::new(DecomposeStage::new(model.clone())), &[])
            .stage(Arc::new(research), &[DecomposeStage::NAME])
            .stage(Arc::new(WriteStage::new(model)), &[ResearchStage::NAME])
            .max_concurrency(options.max_concurrency)
            .build()?;

        let mut engine = GraphEngine::new(graph, store);
        if let Some(bus) = options.event_bus {
            engine = engine.with_event_bus(bus);
        }
        Ok(Self { engine })
    }

    fn initial_state(request: &str) -> WorkflowState {
        WorkflowState::new().with(REQUEST, request)
    }

    /// Run all three stages for `request`, checkpointing under `session_key`.
    pub async fn submit_request(
        &self,
        request: &str,
        session_key: &str,
    ) -> Result<WorkflowState, GraphError> {
        self.engine
            .execute(Self::initial_state(request), session_key)
            .await
    }

    pub fn submit_request_stream(&self, request: &str, session_key: &str) -> WorkflowRun {
        self.engine
            .execute_stream(Self::initial_state(request), session_key)
    }

    pub async fn resume(&self, session_key: &str) -> Result<WorkflowState, GraphError> {
        self.engine.resume(session_key).await
    }

    pub fn resume_stream(&self, session_key: &str) -> WorkflowRun {
        self.engine.resume_stream(session_key)
    }

    /// The report field of a finished state.
    pub fn report(state: &WorkflowState) -> Option<&str> {
        state.get_str(REPORT)
    }

    pub fn engine(&self) -> &GraphEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use crate::stages::test_support::ScriptedModel;
    use crate::stages::{FINDINGS, TOPIC};
    use async_trait::async_trait;
    use intellicore_core::error::{ProviderError, ToolError};
    use intellicore_core::tool::Tool;
    use intellicore_memory::{FileCheckpointStore, InMemoryCheckpointStore};

    struct Search;

    #[async_trait]
    impl Tool for Search {
        fn name(&self) -> &str {
            "search"
        }
        fn description(&self) -> &str {
            "web search"
        }
        async fn invoke(&self, input: &str) -> Result<String, ToolError> {
            Ok(format!("{input}: declining 13% per decade"))
        }
    }

    fn tools() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(Search)).unwrap();
        Arc::new(registry)
    }

    const SCENARIO: [&str; 4] = [
        "\"arctic sea ice\"",
        "Thought: I should search.\nAction: search\nAction Input: arctic sea ice",
        "Thought: I have gathered enough information.\nFinal Answer: Arctic sea ice is declining 13% per decade.",
        "# Arctic Sea Ice\nSea ice is declining 13% per decade.",
    ];

    #[tokio::test]
    async fn submit_request_runs_all_three_stages() {
        let model = Arc::new(ScriptedModel::new(SCENARIO.to_vec()));
        let store = Arc::new(InMemoryCheckpointStore::new());
        let pipeline =
            ResearchPipeline::new(model.clone(), tools(), store.clone(), PipelineOptions::default())
                .unwrap();

        let state = pipeline
            .submit_request("Research arctic sea ice and write a report", "s1")
            .await
            .unwrap();

        assert_eq!(state.get_str(TOPIC), Some("arctic sea ice"));
        assert_eq!(state.get_str(FINDINGS), Some("Arctic sea ice is declining 13% per decade."));
        assert_eq!(
            ResearchPipeline::report(&state),
            Some("# Arctic Sea Ice\nSea ice is declining 13% per decade.")
        );
        assert_eq!(model.prompts().len(), 4);
        assert_eq!(store.get("s1").await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn research_stage_uses_its_own_model() {
        let shared = Arc::new(ScriptedModel::new(vec![SCENARIO[0], SCENARIO[3]]));
        let research = Arc::new(ScriptedModel::new(vec![SCENARIO[1], SCENARIO[2]]));
        let options = PipelineOptions::default().with_research_model(research.clone());
        let pipeline = ResearchPipeline::new(
            shared.clone(),
            tools(),
            Arc::new(InMemoryCheckpointStore::new()),
            options,
        )
        .unwrap();

        let state = pipeline
            .submit_request("Research arctic sea ice", "split")
            .await
            .unwrap();

        assert_eq!(shared.prompts().len(), 2);
        assert_eq!(research.prompts().len(), 2);
        assert!(research.prompts()[0].contains("arctic sea ice"));
        assert_eq!(state.get_str(FINDINGS), Some("Arctic sea ice is declining 13% per decade."));
    }

    #[tokio::test]
    async fn stream_reports_each_stage() {
        let model = Arc::new(ScriptedModel::new(SCENARIO.to_vec()));
        let pipeline = ResearchPipeline::new(
            model,
            tools(),
            Arc::new(InMemoryCheckpointStore::new()),
            PipelineOptions::default(),
        )
        .unwrap();

        let mut run = pipeline.submit_request_stream("Research arctic sea ice", "s");
        let mut nodes = Vec::new();
        while let Some(event) = run.events.recv().await {
            nodes.push(event.node);
        }
        let state = run.finish().await.unwrap();

        assert_eq!(nodes, vec!["decompose", "research", "write"]);
        assert!(ResearchPipeline::report(&state).is_some());
    }

    #[tokio::test]
    async fn resume_after_research_failure_reenters_at_research() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path()));
        let abort = PipelineOptions {
            on_failure: ResearchFailureMode::Abort,
            ..PipelineOptions::default()
        };

        let failing = Arc::new(ScriptedModel::with_results(vec![
            Ok("arctic sea ice".to_string()),
            Err(ProviderError::Network("connection reset".into())),
        ]));
        let pipeline = ResearchPipeline::new(failing, tools(), store.clone(), abort.clone()).unwrap();
        let err = pipeline
            .submit_request("Research arctic sea ice", "s")
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some("research"));
        assert!(matches!(err, GraphError::StageFailed { source: StageError::Agent(_), .. }));

        // A fresh process: new store handle on the same directory.
        let reopened: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path()));
        let recovered = Arc::new(ScriptedModel::new(SCENARIO[1..].to_vec()));
        let pipeline = ResearchPipeline::new(recovered.clone(), tools(), reopened, abort).unwrap();
        let state = pipeline.resume("s").await.unwrap();

        // Decompose did not run again: its prompt would have been first.
        let prompts = recovered.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("Question: arctic sea ice"));
        assert_eq!(state.get_str(TOPIC), Some("arctic sea ice"));
        assert!(ResearchPipeline::report(&state).is_some());
    }

    #[tokio::test]
    async fn options_follow_config() {
        let mut config = AppConfig::default();
        config.research.max_iterations = 3;
        config.research.on_failure = ResearchFailureMode::Abort;
        config.workflow.max_concurrency = 2;

        let options = PipelineOptions::from_config(&config);
        assert_eq!(options.max_iterations, 3);
        assert_eq!(options.on_failure, ResearchFailureMode::Abort);
        assert_eq!(options.max_concurrency, 2);
        assert!(options.event_bus.is_none());

        let pipeline = ResearchPipeline::new(
            Arc::new(ScriptedModel::new(vec![])),
            tools(),
            Arc::new(InMemoryCheckpointStore::new()),
            options,
        )
        .unwrap();
        assert_eq!(pipeline.engine().graph().stage_names(), vec!["decompose", "research", "write"]);
        assert_eq!(pipeline.engine().graph().max_concurrency(), 2);
    }
}
