//! Extracts the core research topic from a free-form request.

use async_trait::async_trait;
use intellicore_core::model::LanguageModel;
use intellicore_core::state::{StateUpdate, WorkflowState};
use std::sync::Arc;
use tracing::info;

use super::{REQUEST, TOPIC, require, strip_reasoning};
use crate::error::StageError;
use crate::graph::Stage;

const DECOMPOSE_PROMPT: &str = r#"You are a task analysis assistant. Your role is to extract the core research topic
from a user's request. The user might ask for a complex task involving multiple steps,
like research and writing. You should only identify the main subject of the research.

For example:
User Request: "Can you research the impact of climate change on polar bears and then write a short summary?"
Core Topic: "the impact of climate change on polar bears"

User Request: "Tell me everything you can find about the history of the Roman Empire."
Core Topic: "the history of the Roman Empire"

User Request: "write a report about the latest advancements in quantum computing"
Core Topic: "the latest advancements in quantum computing"

Now, analyze the following user request and extract the core research topic.
Your output should ONLY be the topic itself, with no preamble or explanation.

User Request: "{request}"
Core Topic:"#;

pub struct DecomposeStage {
    model: Arc<dyn LanguageModel>,
}

impl DecomposeStage {
    pub const NAME: &'static str = "decompose";

    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub(crate) fn prompt(request: &str) -> String {
        DECOMPOSE_PROMPT.replace("{request}", request.trim())
    }
}

/// First non-empty line, minus any "Core Topic:" label and wrapping quotes.
pub(crate) fn clean_topic(completion: &str) -> String {
    let text = strip_reasoning(completion);
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();

    let line = match line.get(..11) {
        Some(prefix) if prefix.eq_ignore_ascii_case("core topic:") => line[11..].trim(),
        _ => line,
    };

    line.trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '`'))
        .trim()
        .to_string()
}

#[async_trait]
impl Stage for DecomposeStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn reads(&self) -> Vec<&str> {
        vec![REQUEST]
    }

    fn writes(&self) -> Vec<&str> {
        vec![TOPIC]
    }

    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate, StageError> {
        let request = require(state, REQUEST)?;
        info!(stage = Self::NAME, request = %request, "Decomposing request");

        let completion = self.model.complete(&Self::prompt(request)).await?;
        let topic = clean_topic(&completion);
        if topic.is_empty() {
            return Err(StageError::EmptyOutput(TOPIC.to_string()));
        }

        info!(stage = Self::NAME, topic = %topic, "Extracted topic");
        Ok(StateUpdate::new().set(TOPIC, topic))
    }
}
