//! Runs the tool-using reasoning loop on the extracted topic.

use async_trait::async_trait;
use intellicore_agent::{AgentFailure, ReactAgent};
use intellicore_config::ResearchFailureMode;
use intellicore_core::event::EventBus;
use intellicore_core::model::LanguageModel;
use intellicore_core::state::{StateUpdate, WorkflowState};
use intellicore_core::tool::ToolRegistry;
use std::sync::Arc;
use tracing::{info, warn};

use super::{FINDINGS, REQUEST, TOPIC, require};
use crate::error::StageError;
use crate::graph::Stage;

pub struct ResearchStage {
    agent: ReactAgent,
    max_iterations: usize,
    on_failure: ResearchFailureMode,
}

impl ResearchStage {
    pub const NAME: &'static str = "research";

    pub fn new(model: Arc<dyn LanguageModel>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            agent: ReactAgent::new(model, tools),
            max_iterations: 8,
            on_failure: ResearchFailureMode::default(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_failure_mode(mut self, on_failure: ResearchFailureMode) -> Self {
        self.on_failure = on_failure;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.agent = self.agent.with_event_bus(event_bus);
        self
    }

    fn placeholder(topic: &str, reason: &str) -> String {
        format!("Research could not be completed for '{topic}': {reason}")
    }
}

#[async_trait]
impl Stage for ResearchStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn reads(&self) -> Vec<&str> {
        vec![TOPIC, REQUEST]
    }

    fn writes(&self) -> Vec<&str> {
        vec![FINDINGS]
    }

    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate, StageError> {
        let topic = require(state, TOPIC)?;
        let context = match state.get_str(REQUEST) {
            Some(request) if !request.trim().is_empty() => format!("Original request: {}", request.trim()),
            _ => String::new(),
        };

        info!(stage = Self::NAME, topic = %topic, "Invoking researcher");

        let failure = match self.agent.run(topic, self.max_iterations, &context).await {
            Ok(outcome) if !outcome.answer.trim().is_empty() => {
                info!(
                    stage = Self::NAME,
                    iterations = outcome.iterations,
                    findings_chars = outcome.answer.len(),
                    "Research complete"
                );
                return Ok(StateUpdate::new().set(FINDINGS, outcome.answer.trim()));
            }
            Ok(outcome) => {
                warn!(stage = Self::NAME, iterations = outcome.iterations, "Researcher returned an empty answer");
                None
            }
            Err(failure) => Some(failure),
        };

        let reason = failure
            .as_ref()
            .map(AgentFailure::to_string)
            .unwrap_or_else(|| "the researcher returned an empty answer".to_string());

        match (self.on_failure, failure) {
            (ResearchFailureMode::Abort, Some(failure)) => Err(StageError::Agent(failure)),
            (ResearchFailureMode::Abort, None) => Err(StageError::EmptyOutput(FINDINGS.to_string())),
            (ResearchFailureMode::Placeholder, _) => {
                warn!(stage = Self::NAME, reason = %reason, "Writing placeholder findings");
                Ok(StateUpdate::new().set(FINDINGS, Self::placeholder(topic, &reason)))
            }
        }
    }
}
