//! Research tool implementations for IntelliCore.
//!
//! Tools give the research agent its view of the world: the web (Google
//! Custom Search), the local knowledge base, and arithmetic. Tools whose
//! backend is not configured are replaced by an [`UnavailableTool`] that
//! keeps the same name and answers with a fixed observation.

pub mod calculator;
pub mod knowledge_base;
pub mod unavailable;
pub mod web_search;

use intellicore_config::AppConfig;
use intellicore_core::error::ToolError;
use intellicore_core::knowledge::VectorIndex;
use intellicore_core::model::Embedder;
use intellicore_core::tool::ToolRegistry;
use std::sync::Arc;
use tracing::warn;

pub use calculator::CalculatorTool;
pub use knowledge_base::KnowledgeBaseTool;
pub use unavailable::UnavailableTool;
pub use web_search::WebSearchTool;

pub const SEARCH_NOT_CONFIGURED: &str = "Search tool is not configured.";

/// Build the research agent's toolset: `search`, then `knowledge_base`,
/// then `calculator` when `[research] calculator = true`.
///
/// Search needs Google credentials; the knowledge base needs an embedder.
/// A missing backend degrades to an [`UnavailableTool`] rather than an error.
pub fn research_registry(
    config: &AppConfig,
    embedder: Option<Arc<dyn Embedder>>,
    index: Arc<dyn VectorIndex>,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();

    match WebSearchTool::from_config(&config.search) {
        Some(tool) => registry.register(Box::new(tool))?,
        None => {
            warn!("Google search credentials missing; search tool disabled");
            registry.register(Box::new(UnavailableTool::new(
                web_search::SEARCH_TOOL_NAME,
                web_search::SEARCH_DESCRIPTION,
                SEARCH_NOT_CONFIGURED,
            )))?;
        }
    }

    match embedder {
        Some(embedder) => registry.register(Box::new(
            KnowledgeBaseTool::new(embedder, index).with_top_k(config.knowledge_base.top_k),
        ))?,
        None => {
            warn!("No embedding backend; knowledge base tool disabled");
            registry.register(Box::new(UnavailableTool::new(
                knowledge_base::KNOWLEDGE_BASE_TOOL_NAME,
                knowledge_base::KNOWLEDGE_BASE_DESCRIPTION,
                knowledge_base::NOT_INITIALIZED,
            )))?;
        }
    }

    if config.research.calculator {
        registry.register(Box::new(CalculatorTool))?;
    }

    Ok(registry)
}
