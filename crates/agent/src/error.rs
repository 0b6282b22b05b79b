//! Loop-terminal failures.

use intellicore_core::error::ProviderError;

use crate::scratchpad::AgentStep;

/// Why a reasoning loop ended without a final answer.
///
/// Both variants carry the partial trace so the cause stays inspectable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentFailure {
    #[error("Reasoning loop exhausted {max_iterations} iterations without a final answer")]
    IterationsExhausted {
        max_iterations: usize,
        trace: Vec<AgentStep>,
    },

    #[error("Model backend failed: {source}")]
    Model {
        source: ProviderError,
        trace: Vec<AgentStep>,
    },
}

impl AgentFailure {
    pub fn trace(&self) -> &[AgentStep] {
        match self {
            Self::IterationsExhausted { trace, .. } | Self::Model { trace, .. } => trace,
        }
    }
}
