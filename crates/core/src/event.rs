//! Domain event system: decoupled communication between bounded contexts.
//!
//! Events are published when a stage starts or finishes, when a tool runs,
//! and when a model call completes. Subscribers observe; they never steer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A graph stage was scheduled
    StageStarted {
        session_key: String,
        stage: String,
        timestamp: DateTime<Utc>,
    },

    /// A graph stage finished and its update was checkpointed
    StageCompleted {
        session_key: String,
        stage: String,
        fields: Vec<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A graph stage failed and halted the run
    StageFailed {
        session_key: String,
        stage: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was invoked by the reasoning loop
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The reasoning loop received a completion
    ModelCalled {
        iteration: usize,
        completion_chars: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Publishing never
/// waits on subscribers; slow subscribers lag and drop events instead.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
