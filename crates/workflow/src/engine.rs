//! Graph engine: runs a [`StageGraph`] against a checkpoint store.
//!
//! Ready stages (all predecessors complete) are spawned on a `JoinSet`, up
//! to the graph's concurrency limit, each with a snapshot of the state. As
//! each one finishes, the engine task alone validates its update, merges
//! it, checkpoints the merged state, and only then emits the step event and
//! schedules successors. A crash therefore loses at most the stages that
//! were in flight.

use chrono::Utc;
use intellicore_core::checkpoint::CheckpointStore;
use intellicore_core::event::{DomainEvent, EventBus};
use intellicore_core::state::{StateUpdate, WorkflowState};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::error::{GraphError, StageError};
use crate::graph::{StageGraph, StageNode};

/// Emitted after a stage's update has been merged and checkpointed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEvent {
    pub session_key: String,
    pub node: String,
    pub updated_fields: Vec<String>,
}

/// A run in progress: step events as they happen, and the final result.
pub struct WorkflowRun {
    pub events: mpsc::UnboundedReceiver<StageEvent>,
    pub handle: JoinHandle<Result<WorkflowState, GraphError>>,
}

impl WorkflowRun {
    /// Wait for the run to finish, discarding any unread events.
    pub async fn finish(self) -> Result<WorkflowState, GraphError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(GraphError::Interrupted(e.to_string())),
        }
    }
}

type StageOutcome = (usize, Result<StateUpdate, StageError>, Duration);

#[derive(Clone)]
pub struct GraphEngine {
    graph: Arc<StageGraph>,
    store: Arc<dyn CheckpointStore>,
    event_bus: Option<Arc<EventBus>>,
}

impl GraphEngine {
    pub fn new(graph: StageGraph, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            graph: Arc::new(graph),
            store,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Run every stage from `initial`, checkpointing under `session_key`.
    ///
    /// The initial state is checkpointed before the first stage runs.
    pub async fn execute(
        &self,
        initial: WorkflowState,
        session_key: &str,
    ) -> Result<WorkflowState, GraphError> {
        self.execute_inner(initial, session_key, None).await
    }

    /// Continue a session from its last checkpoint.
    ///
    /// Stages whose declared outputs are all present are treated as done;
    /// the run re-enters at the first stage that is not. A session with
    /// nothing left to do returns its checkpointed state unchanged.
    pub async fn resume(&self, session_key: &str) -> Result<WorkflowState, GraphError> {
        self.resume_inner(session_key, None).await
    }

    /// [`execute`](Self::execute) on a background task, streaming step events.
    pub fn execute_stream(&self, initial: WorkflowState, session_key: &str) -> WorkflowRun {
        let engine = self.clone();
        let session_key = session_key.to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            engine.execute_inner(initial, &session_key, Some(&tx)).await
        });
        WorkflowRun { events: rx, handle }
    }

    /// [`resume`](Self::resume) on a background task, streaming step events.
    pub fn resume_stream(&self, session_key: &str) -> WorkflowRun {
        let engine = self.clone();
        let session_key = session_key.to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle =
            tokio::spawn(async move { engine.resume_inner(&session_key, Some(&tx)).await });
        WorkflowRun { events: rx, handle }
    }

    async fn execute_inner(
        &self,
        initial: WorkflowState,
        session_key: &str,
        events: Option<&mpsc::UnboundedSender<StageEvent>>,
    ) -> Result<WorkflowState, GraphError> {
        if let Some(field) = self.graph.missing_initial_field(&initial) {
            return Err(GraphError::MissingInitialField(field.to_string()));
        }

        info!(session = %session_key, stages = self.graph.nodes.len(), "Workflow starting");
        self.store.put(session_key, &initial).await?;
        self.drive(initial, session_key, HashSet::new(), events).await
    }

    async fn resume_inner(
        &self,
        session_key: &str,
        events: Option<&mpsc::UnboundedSender<StageEvent>>,
    ) -> Result<WorkflowState, GraphError> {
        let state = self
            .store
            .get(session_key)
            .await?
            .ok_or_else(|| GraphError::NoCheckpoint(session_key.to_string()))?;

        if let Some(field) = self.graph.missing_initial_field(&state) {
            return Err(GraphError::MissingInitialField(field.to_string()));
        }

        let done: HashSet<usize> = self
            .graph
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_complete_in(&state))
            .map(|(i, _)| i)
            .collect();

        let pending: Vec<&str> = self
            .graph
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| !done.contains(i))
            .map(|(_, n)| n.name())
            .collect();
        info!(session = %session_key, ?pending, "Workflow resuming");

        self.drive(state, session_key, done, events).await
    }

    /// The scheduling loop.
    async fn drive(
        &self,
        mut state: WorkflowState,
        session_key: &str,
        mut done: HashSet<usize>,
        events: Option<&mpsc::UnboundedSender<StageEvent>>,
    ) -> Result<WorkflowState, GraphError> {
        let nodes = &self.graph.nodes;
        let mut running: HashSet<usize> = HashSet::new();
        let mut task_ids: HashMap<tokio::task::Id, usize> = HashMap::new();
        let mut join_set: JoinSet<StageOutcome> = JoinSet::new();

        loop {
            // ── Schedule ready stages ──
            for (i, node) in nodes.iter().enumerate() {
                if join_set.len() >= self.graph.max_concurrency {
                    break;
                }
                if done.contains(&i) || running.contains(&i) {
                    continue;
                }
                if !node.predecessors.iter().all(|p| done.contains(p)) {
                    continue;
                }

                let stage = node.stage.clone();
                let snapshot = state.clone();
                let handle = join_set.spawn(async move {
                    let start = Instant::now();
                    let result = stage.run(&snapshot).await;
                    (i, result, start.elapsed())
                });
                task_ids.insert(handle.id(), i);
                running.insert(i);

                debug!(session = %session_key, stage = %node.name, "Stage scheduled");
                self.publish(DomainEvent::StageStarted {
                    session_key: session_key.to_string(),
                    stage: node.name.clone(),
                    timestamp: Utc::now(),
                });
            }

            let Some(joined) = join_set.join_next().await else {
                break;
            };

            // ── Collect one result ──
            let (i, result, elapsed) = match joined {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    let i = task_ids.get(&join_err.id()).copied().unwrap_or_default();
                    let reason = if join_err.is_panic() {
                        panic_message(join_err.into_panic())
                    } else {
                        join_err.to_string()
                    };
                    (i, Err(StageError::Panicked(reason)), Duration::ZERO)
                }
            };
            running.remove(&i);
            let node = &nodes[i];

            let update = match result {
                Ok(update) => update,
                Err(source) => {
                    join_set.shutdown().await;
                    error!(session = %session_key, stage = %node.name, error = %source, "Stage failed");
                    self.publish(DomainEvent::StageFailed {
                        session_key: session_key.to_string(),
                        stage: node.name.clone(),
                        error_message: source.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(GraphError::StageFailed {
                        stage: node.name.clone(),
                        source,
                    });
                }
            };

            if let Err(e) = validate_update(node, &update) {
                join_set.shutdown().await;
                error!(session = %session_key, stage = %node.name, error = %e, "Stage update rejected");
                self.publish(DomainEvent::StageFailed {
                    session_key: session_key.to_string(),
                    stage: node.name.clone(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e);
            }

            // ── Merge, then checkpoint, then notify ──
            let updated_fields = state.merge(update);
            if let Err(e) = self.store.put(session_key, &state).await {
                join_set.shutdown().await;
                error!(session = %session_key, stage = %node.name, error = %e, "Checkpoint failed");
                return Err(GraphError::Checkpoint(e));
            }
            done.insert(i);

            let duration_ms = elapsed.as_millis() as u64;
            info!(
                session = %session_key,
                stage = %node.name,
                fields = ?updated_fields,
                duration_ms,
                "Stage completed"
            );

            if let Some(tx) = events {
                let event = StageEvent {
                    session_key: session_key.to_string(),
                    node: node.name.clone(),
                    updated_fields: updated_fields.clone(),
                };
                if tx.send(event).is_err() {
                    debug!(session = %session_key, "Step event receiver dropped");
                }
            }
            self.publish(DomainEvent::StageCompleted {
                session_key: session_key.to_string(),
                stage: node.name.clone(),
                fields: updated_fields,
                duration_ms,
                timestamp: Utc::now(),
            });
        }

        if done.len() < nodes.len() {
            warn!(session = %session_key, "Workflow ended with unscheduled stages");
        }
        info!(session = %session_key, "Workflow finished");
        Ok(state)
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

/// Only declared outputs, and never null.
fn validate_update(node: &StageNode, update: &StateUpdate) -> Result<(), GraphError> {
    for (field, value) in update.fields() {
        if !node.writes.iter().any(|w| w == field) {
            return Err(GraphError::UndeclaredWrite {
                stage: node.name.clone(),
                field: field.to_string(),
            });
        }
        if value.is_null() {
            return Err(GraphError::NullWrite {
                stage: node.name.clone(),
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
