//! Checkpoint store trait: durable keyed workflow state.
//!
//! The graph engine writes one checkpoint per session key after every
//! completed stage and reads it back on resume. Implementations live in
//! `intellicore-memory` (in-memory, JSON file, SQLite).

use async_trait::async_trait;
use crate::error::CheckpointError;
use crate::state::WorkflowState;

/// Key-value persistence for workflow state.
///
/// Required semantics: last write wins per key, and a `get` after a `put` on
/// the same key observes that write. Writes to one key are serialized; writes
/// to distinct keys may proceed concurrently.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Backend name (for logging).
    fn name(&self) -> &str;

    /// Store (or overwrite) the snapshot for a session.
    async fn put(&self, session_key: &str, state: &WorkflowState) -> std::result::Result<(), CheckpointError>;

    /// Load the latest snapshot for a session.
    async fn get(&self, session_key: &str) -> std::result::Result<Option<WorkflowState>, CheckpointError>;

    /// Remove a session's checkpoint. Returns whether one existed.
    async fn delete(&self, session_key: &str) -> std::result::Result<bool, CheckpointError>;

    /// All session keys with a stored checkpoint, sorted.
    async fn list_sessions(&self) -> std::result::Result<Vec<String>, CheckpointError>;
}
