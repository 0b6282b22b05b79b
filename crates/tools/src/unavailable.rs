//! A placeholder tool for capabilities that are not configured.
//!
//! Keeps the tool's name and description in the prompt, so the agent's view
//! of the toolset is stable, and answers every invocation with a fixed
//! observation instead of failing.

use async_trait::async_trait;
use intellicore_core::error::ToolError;
use intellicore_core::tool::Tool;

pub struct UnavailableTool {
    name: String,
    description: String,
    message: String,
}

impl UnavailableTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Tool for UnavailableTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, _input: &str) -> Result<String, ToolError> {
        Ok(self.message.clone())
    }
}
