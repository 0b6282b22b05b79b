//! In-process checkpoint store.
//!
//! Not durable. Used by tests and by `checkpoint.backend = "memory"`.

use async_trait::async_trait;
use intellicore_core::checkpoint::CheckpointStore;
use intellicore_core::error::CheckpointError;
use intellicore_core::state::WorkflowState;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A checkpoint store backed by a `HashMap` behind an async `RwLock`.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: Arc<RwLock<HashMap<String, WorkflowState>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, session_key: &str, state: &WorkflowState) -> Result<(), CheckpointError> {
        self.checkpoints
            .write()
            .await
            .insert(session_key.to_string(), state.clone());
        Ok(())
    }

    async fn get(&self, session_key: &str) -> Result<Option<WorkflowState>, CheckpointError> {
        Ok(self.checkpoints.read().await.get(session_key).cloned())
    }

    async fn delete(&self, session_key: &str) -> Result<bool, CheckpointError> {
        Ok(self.checkpoints.write().await.remove(session_key).is_some())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, CheckpointError> {
        let mut keys: Vec<String> = self.checkpoints.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
