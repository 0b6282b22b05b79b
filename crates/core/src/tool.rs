//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are text-in/text-out: the reasoning loop hands each tool the raw
//! `Action Input` string and feeds the returned text back to the model as an
//! observation.

use async_trait::async_trait;
use std::collections::HashMap;
use crate::error::ToolError;

/// The core Tool trait.
///
/// Each tool (search, knowledge base, calculator) implements this trait.
/// Tools are registered in the [`ToolRegistry`] and made available to the
/// reasoning loop.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "search", "calculator").
    fn name(&self) -> &str;

    /// A description of what this tool does (rendered into the prompt).
    fn description(&self) -> &str;

    /// Invoke the tool with the model-supplied input.
    async fn invoke(&self, input: &str) -> std::result::Result<String, ToolError>;
}

/// An ordered registry of available tools.
///
/// Registration order is preserved so prompts render identically across
/// runs. Agents hold the registry behind an `Arc`, which freezes it.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Fails if a tool with the same name already exists.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::DuplicateName(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> std::result::Result<&dyn Tool, ToolError> {
        self.index
            .get(name)
            .map(|&i| self.tools[i].as_ref())
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// All tools in registration order.
    pub fn list(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// One `name: description` line per tool, in registration order.
    pub fn render_descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description().trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool(&'static str);

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        async fn invoke(&self, input: &str) -> std::result::Result<String, ToolError> {
            Ok(input.to_string())
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool("echo"))).unwrap();
        assert!(registry.get("echo").is_ok());
        assert_eq!(
            registry.get("nonexistent").err(),
            Some(ToolError::NotFound("nonexistent".into()))
        );
    }

    #[test]
    fn duplicate_registration_fails_and_keeps_original() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool("echo"))).unwrap();
        let err = registry.register(Box::new(EchoTool("echo"))).unwrap_err();
        assert_eq!(err, ToolError::DuplicateName("echo".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(Box::new(EchoTool(name))).unwrap();
        }
        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
        let listed: Vec<&str> = registry.list().map(|t| t.name()).collect();
        assert_eq!(listed, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn render_descriptions_is_deterministic() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool("b"))).unwrap();
        registry.register(Box::new(EchoTool("a"))).unwrap();
        let rendered = registry.render_descriptions();
        assert_eq!(rendered, "b: Echoes back the input\na: Echoes back the input");
        assert_eq!(rendered, registry.render_descriptions());
    }

    #[tokio::test]
    async fn invoke_through_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool("echo"))).unwrap();
        let out = registry.get("echo").unwrap().invoke("hello world").await.unwrap();
        assert_eq!(out, "hello world");
    }
}
