//! Workflow engine: a checkpointed stage graph and the research pipeline
//! built on it.
//!
//! A [`StageGraph`] is a validated DAG of [`Stage`]s that read and write
//! named fields of a shared [`WorkflowState`](intellicore_core::WorkflowState).
//! The [`GraphEngine`] runs it: independent stages concurrently, every merged
//! update checkpointed before the next step is observable, and interrupted
//! sessions resumable from their last checkpoint.
//!
//! [`ResearchPipeline`] wires the three research stages into such a graph:
//!
//! ```text
//! request ─► decompose ─► topic ─► research ─► findings ─► write ─► report
//! ```

pub mod engine;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod stages;

pub use engine::{GraphEngine, StageEvent, WorkflowRun};
pub use error::{GraphError, StageError};
pub use graph::{Stage, StageGraph, StageGraphBuilder, StageNode};
pub use pipeline::{PipelineOptions, ResearchPipeline};
pub use stages::{DecomposeStage, ResearchStage, WriteStage};
