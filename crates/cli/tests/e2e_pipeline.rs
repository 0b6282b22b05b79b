//! End-to-end tests for the IntelliCore research pipeline.
//!
//! These tests run the full decompose → research → write graph with
//! scripted model completions, the real research toolset, and on-disk
//! checkpoint stores.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use intellicore_config::{AppConfig, ResearchFailureMode};
use intellicore_core::checkpoint::CheckpointStore;
use intellicore_core::error::{ProviderError, ToolError};
use intellicore_core::event::{DomainEvent, EventBus};
use intellicore_core::knowledge::{Document, VectorIndex};
use intellicore_core::model::{Embedder, LanguageModel};
use intellicore_core::state::WorkflowState;
use intellicore_core::tool::{Tool, ToolRegistry};
use intellicore_memory::{FileCheckpointStore, FileVectorIndex, SqliteCheckpointStore, split_text};
use intellicore_workflow::{GraphError, PipelineOptions, ResearchPipeline, StageError};

// ── Scripted backends ────────────────────────────────────────────────────

/// Returns scripted completions in order and records every prompt.
struct ScriptedModel {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(responses: &[&str]) -> Arc<Self> {
        Self::with_results(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    fn with_results(responses: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!("ScriptedModel exhausted at call #{call}");
        }
        responses.remove(0)
    }
}

/// Two-topic bag-of-words embedding: [ice, bees, bias].
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let lower = text.to_lowercase();
        Ok(vec![
            lower.matches("ice").count() as f32,
            lower.matches("bee").count() as f32,
            0.1,
        ])
    }
}

/// A search tool whose backend is rate limited.
struct RateLimitedSearch;

#[async_trait]
impl Tool for RateLimitedSearch {
    fn name(&self) -> &str {
        "search"
    }
    fn description(&self) -> &str {
        "web search"
    }
    async fn invoke(&self, _input: &str) -> Result<String, ToolError> {
        Err(ToolError::Failed("rate limited".into()))
    }
}

async fn seeded_index() -> Arc<FileVectorIndex> {
    let index = Arc::new(FileVectorIndex::in_memory());
    let docs = [
        Document::new("Arctic sea ice extent has declined about 13% per decade since 1979.")
            .with_metadata("source", "ice.txt"),
        Document::new("Honey bees pollinate roughly a third of global crops.")
            .with_metadata("source", "bees.txt"),
    ];

    let mut embedded = Vec::new();
    for doc in &docs {
        for chunk in split_text(doc, 1000, 200).unwrap() {
            let vector = KeywordEmbedder.embed(&chunk.content).await.unwrap();
            embedded.push(chunk.with_embedding(vector));
        }
    }
    index.add(embedded).await.unwrap();
    index
}

async fn research_tools(config: &AppConfig) -> Arc<ToolRegistry> {
    let index: Arc<dyn VectorIndex> = seeded_index().await;
    let registry =
        intellicore_tools::research_registry(config, Some(Arc::new(KeywordEmbedder)), index)
            .unwrap();
    Arc::new(registry)
}

const REQUEST: &str = "Research the decline of arctic sea ice and write a short report.";

const HAPPY_PATH: [&str; 4] = [
    "\"the decline of arctic sea ice\"",
    "Thought: I should check the knowledge base.\nAction: knowledge_base\nAction Input: arctic sea ice",
    "Thought: I have gathered enough information.\nFinal Answer: Arctic sea ice has declined about 13% per decade since 1979.",
    "# Arctic Sea Ice\n\nArctic sea ice has declined about 13% per decade since 1979.",
];

// ── E2E: full pipeline ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_request_to_report_with_knowledge_base() {
    let config = AppConfig::default();
    let model = ScriptedModel::new(&HAPPY_PATH);
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path()));

    let pipeline = ResearchPipeline::new(
        model.clone(),
        research_tools(&config).await,
        store.clone(),
        PipelineOptions::from_config(&config),
    )
    .unwrap();

    let state = pipeline.submit_request(REQUEST, "e2e-1").await.unwrap();

    assert_eq!(state.get_str("topic"), Some("the decline of arctic sea ice"));
    assert_eq!(
        state.get_str("findings"),
        Some("Arctic sea ice has declined about 13% per decade since 1979.")
    );
    assert!(ResearchPipeline::report(&state).unwrap().starts_with("# Arctic Sea Ice"));

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 4);
    // Research prompt lists both tools and carries the original request.
    assert!(prompts[1].contains("should be one of [search, knowledge_base]"));
    assert!(prompts[1].contains(&format!("Context: Original request: {REQUEST}")));
    // The knowledge-base observation feeds the second research iteration.
    assert!(prompts[2].contains("Observation: Source: ice.txt\nArctic sea ice extent"));
    // The writer sees only the findings.
    assert!(prompts[3].contains("---\nArctic sea ice has declined about 13% per decade since 1979.\n---"));

    let saved = store.get("e2e-1").await.unwrap().unwrap();
    assert_eq!(saved, state);
}

#[tokio::test]
async fn e2e_unconfigured_search_and_rate_limits_become_observations() {
    // Search credentials absent: the tool exists but answers with a fixed message.
    let config = AppConfig::default();
    let model = ScriptedModel::new(&[
        "arctic sea ice",
        "Thought: search the web\nAction: search\nAction Input: arctic sea ice",
        "Thought: try a tool that does not exist\nAction: browse\nAction Input: x",
        "Thought: done\nFinal Answer: Little could be found.",
        "Little could be found.",
    ]);
    let pipeline = ResearchPipeline::new(
        model.clone(),
        research_tools(&config).await,
        Arc::new(intellicore_memory::InMemoryCheckpointStore::new()),
        PipelineOptions::default(),
    )
    .unwrap();

    pipeline.submit_request(REQUEST, "s").await.unwrap();
    let prompts = model.prompts();
    assert!(prompts[2].contains("Observation: Search tool is not configured.\n"));
    assert!(prompts[3].contains(
        "Observation: browse is not a valid tool, try one of [search, knowledge_base].\n"
    ));

    // A failing tool's error text reaches the model verbatim.
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(RateLimitedSearch)).unwrap();
    let model = ScriptedModel::new(&[
        "arctic sea ice",
        "Action: search\nAction Input: arctic sea ice",
        "Final Answer: nothing",
        "report",
    ]);
    let pipeline = ResearchPipeline::new(
        model.clone(),
        Arc::new(registry),
        Arc::new(intellicore_memory::InMemoryCheckpointStore::new()),
        PipelineOptions::default(),
    )
    .unwrap();
    pipeline.submit_request(REQUEST, "s").await.unwrap();
    assert!(model.prompts()[2].contains("Observation: rate limited\n"));
}

#[tokio::test]
async fn e2e_exhausted_research_writes_placeholder_findings() {
    let mut config = AppConfig::default();
    config.research.max_iterations = 2;
    let model = ScriptedModel::new(&[
        "arctic sea ice",
        "I am not following the format",
        "Still not following it",
        "A report based on missing research.",
    ]);
    let pipeline = ResearchPipeline::new(
        model.clone(),
        research_tools(&config).await,
        Arc::new(intellicore_memory::InMemoryCheckpointStore::new()),
        PipelineOptions::from_config(&config),
    )
    .unwrap();

    let state = pipeline.submit_request(REQUEST, "s").await.unwrap();
    let findings = state.get_str("findings").unwrap();
    assert!(findings.starts_with("Research could not be completed for 'arctic sea ice'"));
    assert!(model.prompts()[2].contains("Observation: Invalid Format: Missing 'Action:' after 'Thought:'"));
    assert!(model.prompts()[3].contains(findings));
}

#[tokio::test]
async fn e2e_crash_after_decompose_resumes_at_research_from_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("checkpoints.db");
    let config = AppConfig::default();
    let abort = PipelineOptions {
        on_failure: ResearchFailureMode::Abort,
        ..PipelineOptions::from_config(&config)
    };

    {
        let store: Arc<dyn CheckpointStore> = Arc::new(SqliteCheckpointStore::new(&db).await.unwrap());
        let model = ScriptedModel::with_results(vec![
            Ok("the decline of arctic sea ice".into()),
            Err(ProviderError::Network("connection reset by peer".into())),
        ]);
        let pipeline =
            ResearchPipeline::new(model, research_tools(&config).await, store.clone(), abort.clone())
                .unwrap();

        let err = pipeline.submit_request(REQUEST, "crash").await.unwrap_err();
        assert_eq!(err.stage(), Some("research"));
        assert!(matches!(err, GraphError::StageFailed { source: StageError::Agent(_), .. }));

        let saved = store.get("crash").await.unwrap().unwrap();
        assert_eq!(saved.get_str("topic"), Some("the decline of arctic sea ice"));
        assert!(!saved.contains("findings"));
    }

    // New process, same database.
    let store: Arc<dyn CheckpointStore> = Arc::new(SqliteCheckpointStore::new(&db).await.unwrap());
    let model = ScriptedModel::new(&HAPPY_PATH[1..]);
    let pipeline =
        ResearchPipeline::new(model.clone(), research_tools(&config).await, store.clone(), abort)
            .unwrap();

    let mut run = pipeline.resume_stream("crash");
    let mut nodes = Vec::new();
    while let Some(event) = run.events.recv().await {
        nodes.push(event.node);
    }
    let state = run.finish().await.unwrap();

    assert_eq!(nodes, vec!["research", "write"]);
    assert!(model.prompts()[0].contains("Question: the decline of arctic sea ice"));
    assert_eq!(state.get_str("request"), Some(REQUEST));
    assert!(ResearchPipeline::report(&state).is_some());
    assert_eq!(store.get("crash").await.unwrap(), Some(state));
}

#[tokio::test]
async fn e2e_checkpoints_only_grow() {
    let config = AppConfig::default();
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path()));
    let pipeline = ResearchPipeline::new(
        ScriptedModel::new(&HAPPY_PATH),
        research_tools(&config).await,
        store.clone(),
        PipelineOptions::default(),
    )
    .unwrap();

    let mut run = pipeline.submit_request_stream(REQUEST, "grow");
    let mut previous = WorkflowState::new().with("request", REQUEST);
    while let Some(event) = run.events.recv().await {
        let current = store.get("grow").await.unwrap().unwrap();
        for field in previous.field_names() {
            assert!(current.contains(field), "field '{field}' vanished after {}", event.node);
        }
        assert!(current.len() > previous.len());
        previous = current;
    }
    run.finish().await.unwrap();
    assert_eq!(previous.len(), 4);
}

#[tokio::test]
async fn e2e_bus_sees_stage_tool_and_model_events() {
    let config = AppConfig::default();
    let bus = Arc::new(EventBus::new(64));
    let mut rx = bus.subscribe();

    let pipeline = ResearchPipeline::new(
        ScriptedModel::new(&HAPPY_PATH),
        research_tools(&config).await,
        Arc::new(intellicore_memory::InMemoryCheckpointStore::new()),
        PipelineOptions::default().with_event_bus(bus),
    )
    .unwrap();
    pipeline.submit_request(REQUEST, "bus").await.unwrap();

    let mut completed = Vec::new();
    let mut tools = Vec::new();
    let mut model_calls = 0;
    while let Ok(event) = rx.try_recv() {
        match event.as_ref() {
            DomainEvent::StageCompleted { stage, .. } => completed.push(stage.clone()),
            DomainEvent::ToolExecuted { tool_name, success, .. } => {
                assert!(*success);
                tools.push(tool_name.clone());
            }
            DomainEvent::ModelCalled { .. } => model_calls += 1,
            _ => {}
        }
    }

    assert_eq!(completed, vec!["decompose", "research", "write"]);
    assert_eq!(tools, vec!["knowledge_base"]);
    // Only the reasoning loop reports model calls.
    assert_eq!(model_calls, 2);
}
