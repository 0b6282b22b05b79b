//! Graph construction and execution errors.

use intellicore_agent::AgentFailure;
use intellicore_core::error::{CheckpointError, ProviderError};
use thiserror::Error;

/// A stage function's own failure.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Model call failed: {0}")]
    Model(#[from] ProviderError),

    #[error("Research agent failed: {0}")]
    Agent(#[from] AgentFailure),

    #[error("Required field '{0}' is missing from state")]
    MissingField(String),

    #[error("Model returned empty output for '{0}'")]
    EmptyOutput(String),

    #[error("Stage panicked: {0}")]
    Panicked(String),
}

/// Errors from building or running a [`StageGraph`](crate::graph::StageGraph).
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Duplicate stage name: {0}")]
    DuplicateStage(String),

    #[error("Stage '{stage}' depends on unknown stage '{predecessor}'")]
    UnknownPredecessor { stage: String, predecessor: String },

    #[error("Stage graph contains a cycle through: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("Field '{field}' has invalid ownership: {reason}")]
    FieldOwnership { field: String, reason: String },

    #[error("Stage '{stage}' reads '{field}', which no predecessor writes")]
    UnreachableRead { stage: String, field: String },

    #[error("Initial state is missing field '{0}'")]
    MissingInitialField(String),

    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: StageError,
    },

    #[error("Stage '{stage}' wrote undeclared field '{field}'")]
    UndeclaredWrite { stage: String, field: String },

    #[error("Stage '{stage}' wrote null to '{field}'")]
    NullWrite { stage: String, field: String },

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("No checkpoint for session '{0}'")]
    NoCheckpoint(String),

    #[error("Workflow run was interrupted: {0}")]
    Interrupted(String),
}

impl GraphError {
    /// The stage this error is attributed to, if any.
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::StageFailed { stage, .. }
            | Self::UndeclaredWrite { stage, .. }
            | Self::NullWrite { stage, .. }
            | Self::UnknownPredecessor { stage, .. }
            | Self::UnreachableRead { stage, .. } => Some(stage),
            Self::DuplicateStage(stage) => Some(stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_failure_names_the_stage() {
        let err = GraphError::StageFailed {
            stage: "decompose".into(),
            source: StageError::Model(ProviderError::Network("connection refused".into())),
        };
        assert_eq!(err.stage(), Some("decompose"));
        let msg = err.to_string();
        assert!(msg.contains("decompose"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn cycle_lists_members() {
        let err = GraphError::Cycle(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Stage graph contains a cycle through: a, b");
        assert_eq!(err.stage(), None);
    }
}
