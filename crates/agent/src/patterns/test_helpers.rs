//! Shared test helpers for pattern tests.

use async_trait::async_trait;
use intellicore_core::error::{ProviderError, ToolError};
use intellicore_core::model::LanguageModel;
use intellicore_core::tool::Tool;
use std::sync::Mutex;

/// A mock model that returns a sequence of scripted completions.
///
/// Each call to `complete` returns the next entry and records the prompt.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockModel {
    responses: Vec<Result<String, ProviderError>>,
    prompts: Mutex<Vec<String>>,
}

impl SequentialMockModel {
    pub fn new(responses: Vec<&str>) -> Self {
        Self::with_results(responses.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_results(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for SequentialMockModel {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        let call = prompts.len();
        if call >= self.responses.len() {
            panic!(
                "SequentialMockModel: no more responses (call #{}, have {})",
                call,
                self.responses.len()
            );
        }
        prompts.push(prompt.to_string());
        self.responses[call].clone()
    }
}

/// A tool that returns a fixed result and counts invocations.
pub struct ScriptedTool {
    pub name: &'static str,
    pub result: Result<String, ToolError>,
    pub inputs: Mutex<Vec<String>>,
}

impl ScriptedTool {
    pub fn ok(name: &'static str, output: &str) -> Self {
        Self {
            name,
            result: Ok(output.to_string()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &'static str, error: ToolError) -> Self {
        Self {
            name,
            result: Err(error),
            inputs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "scripted test tool"
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        self.inputs.lock().unwrap().push(input.to_string());
        self.result.clone()
    }
}
