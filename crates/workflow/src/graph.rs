//! Stage graph: a validated DAG of state-transforming stages.
//!
//! Each [`Stage`] declares the fields it reads and writes plus the stages it
//! depends on. [`StageGraphBuilder::build`] checks the declarations once, up
//! front, so the engine never discovers a wiring mistake mid-run:
//!
//! - stage names are unique and every predecessor exists
//! - the dependency graph is acyclic
//! - every field has exactly one owner (a stage, or the caller's initial state)
//! - every field a stage reads is initial or written by one of its ancestors

use async_trait::async_trait;
use intellicore_core::state::{StateUpdate, WorkflowState};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::error::{GraphError, StageError};

/// One unit of work in the graph.
///
/// A stage receives a snapshot of the state and returns only the fields it
/// owns. Stages may be re-run after a resume, so they must not depend on
/// having run before.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Unique name within a graph.
    fn name(&self) -> &str;

    /// Fields this stage requires.
    fn reads(&self) -> Vec<&str>;

    /// Fields this stage owns.
    fn writes(&self) -> Vec<&str>;

    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate, StageError>;
}

/// A stage plus its resolved wiring.
pub struct StageNode {
    pub(crate) stage: Arc<dyn Stage>,
    pub(crate) name: String,
    pub(crate) predecessors: Vec<usize>,
    pub(crate) writes: Vec<String>,
}

impl StageNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    /// Whether every declared output is present (non-null) in `state`.
    pub fn is_complete_in(&self, state: &WorkflowState) -> bool {
        self.writes.iter().all(|f| state.contains(f))
    }
}

/// A validated stage DAG, stored in deterministic topological order.
pub struct StageGraph {
    pub(crate) nodes: Vec<StageNode>,
    pub(crate) initial_fields: Vec<String>,
    pub(crate) max_concurrency: usize,
}

impl std::fmt::Debug for StageGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageGraph")
            .field("stages", &self.stage_names())
            .field("initial_fields", &self.initial_fields)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl StageGraph {
    pub fn builder() -> StageGraphBuilder {
        StageGraphBuilder::default()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn nodes(&self) -> &[StageNode] {
        &self.nodes
    }

    pub fn initial_fields(&self) -> &[String] {
        &self.initial_fields
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// The first initial field absent from `state`, if any.
    pub(crate) fn missing_initial_field(&self, state: &WorkflowState) -> Option<&str> {
        self.initial_fields
            .iter()
            .find(|f| !state.contains(f))
            .map(String::as_str)
    }
}

pub struct StageGraphBuilder {
    initial_fields: Vec<String>,
    entries: Vec<(Arc<dyn Stage>, Vec<String>)>,
    max_concurrency: usize,
}

impl Default for StageGraphBuilder {
    fn default() -> Self {
        Self {
            initial_fields: Vec::new(),
            entries: Vec::new(),
            max_concurrency: 4,
        }
    }
}

impl StageGraphBuilder {
    /// Declare a field the caller supplies in the initial state.
    pub fn initial_field(mut self, field: impl Into<String>) -> Self {
        self.initial_fields.push(field.into());
        self
    }

    /// Add a stage that runs after all of `predecessors` complete.
    pub fn stage(mut self, stage: Arc<dyn Stage>, predecessors: &[&str]) -> Self {
        let preds = predecessors.iter().map(|p| p.to_string()).collect();
        self.entries.push((stage, preds));
        self
    }

    /// Upper bound on stages running at once (minimum 1).
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn build(self) -> Result<StageGraph, GraphError> {
        // ── Names ──
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, (stage, _)) in self.entries.iter().enumerate() {
            let name = stage.name().to_string();
            if index.insert(name.clone(), i).is_some() {
                return Err(GraphError::DuplicateStage(name));
            }
        }

        // ── Predecessors ──
        let mut preds: Vec<Vec<usize>> = Vec::with_capacity(self.entries.len());
        for (stage, names) in &self.entries {
            let mut resolved = Vec::with_capacity(names.len());
            for p in names {
                let Some(&j) = index.get(p) else {
                    return Err(GraphError::UnknownPredecessor {
                        stage: stage.name().to_string(),
                        predecessor: p.clone(),
                    });
                };
                if !resolved.contains(&j) {
                    resolved.push(j);
                }
            }
            preds.push(resolved);
        }

        let order = topological_order(&preds).map_err(|stuck| {
            GraphError::Cycle(
                stuck
                    .into_iter()
                    .map(|i| self.entries[i].0.name().to_string())
                    .collect(),
            )
        })?;

        // ── Field ownership ──
        let initial: HashSet<&str> = self.initial_fields.iter().map(String::as_str).collect();
        let mut owner: HashMap<String, usize> = HashMap::new();
        for (i, (stage, _)) in self.entries.iter().enumerate() {
            for field in stage.writes() {
                if initial.contains(field) {
                    return Err(GraphError::FieldOwnership {
                        field: field.to_string(),
                        reason: format!(
                            "initial field is also written by stage '{}'",
                            stage.name()
                        ),
                    });
                }
                if let Some(&other) = owner.get(field) {
                    if other != i {
                        return Err(GraphError::FieldOwnership {
                            field: field.to_string(),
                            reason: format!(
                                "written by both '{}' and '{}'",
                                self.entries[other].0.name(),
                                stage.name()
                            ),
                        });
                    }
                }
                owner.insert(field.to_string(), i);
            }
        }

        // ── Reads reachable through ancestors ──
        let mut ancestors: Vec<HashSet<usize>> = vec![HashSet::new(); self.entries.len()];
        for &i in &order {
            let mut acc = HashSet::new();
            for &p in &preds[i] {
                acc.insert(p);
                acc.extend(ancestors[p].iter().copied());
            }
            ancestors[i] = acc;
        }
        for (i, (stage, _)) in self.entries.iter().enumerate() {
            for field in stage.reads() {
                if initial.contains(field) {
                    continue;
                }
                let reachable = owner.get(field).is_some_and(|o| ancestors[i].contains(o));
                if !reachable {
                    return Err(GraphError::UnreachableRead {
                        stage: stage.name().to_string(),
                        field: field.to_string(),
                    });
                }
            }
        }

        // ── Re-index into execution order ──
        let mut position = vec![0usize; self.entries.len()];
        for (pos, &i) in order.iter().enumerate() {
            position[i] = pos;
        }
        let mut slots: Vec<Option<(Arc<dyn Stage>, Vec<String>)>> =
            self.entries.into_iter().map(Some).collect();
        let mut nodes = Vec::with_capacity(order.len());
        for &i in &order {
            let Some((stage, _)) = slots[i].take() else {
                continue;
            };
            let name = stage.name().to_string();
            let writes = stage.writes().iter().map(|f| f.to_string()).collect();
            let mut predecessors: Vec<usize> = preds[i].iter().map(|&p| position[p]).collect();
            predecessors.sort_unstable();
            nodes.push(StageNode {
                stage,
                name,
                predecessors,
                writes,
            });
        }

        Ok(StageGraph {
            nodes,
            initial_fields: self.initial_fields,
            max_concurrency: self.max_concurrency,
        })
    }
}

/// Kahn's algorithm; ties break on declaration order.
///
/// On a cycle, returns the indices that could not be ordered.
fn topological_order(preds: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let n = preds.len();
    let mut in_degree: Vec<usize> = preds.iter().map(Vec::len).collect();
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, ps) in preds.iter().enumerate() {
        for &p in ps {
            successors[p].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &s in &successors[i] {
            in_degree[s] -= 1;
            if in_degree[s] == 0 {
                ready.insert(s);
            }
        }
    }

    if order.len() == n {
        Ok(order)
    } else {
        Err((0..n).filter(|&i| in_degree[i] > 0).collect())
    }
}
