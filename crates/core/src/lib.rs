//! # IntelliCore Core
//!
//! Domain types, traits, and error definitions for the IntelliCore research
//! orchestrator. This crate has **no framework dependencies**; it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is a trait here: [`Provider`], [`LanguageModel`], [`Embedder`],
//! [`Tool`], [`VectorIndex`], [`CheckpointStore`]. Implementations live in
//! their respective crates, so tests swap in scripted stubs.

pub mod error;
pub mod message;
pub mod provider;
pub mod model;
pub mod tool;
pub mod state;
pub mod checkpoint;
pub mod knowledge;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{CheckpointError, IndexError, ProviderError, ToolError};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use model::{Embedder, LanguageModel, ProviderEmbedder, ProviderModel};
pub use tool::{Tool, ToolRegistry};
pub use state::{StateUpdate, WorkflowState};
pub use checkpoint::CheckpointStore;
pub use knowledge::{Document, ScoredDocument, VectorIndex};
pub use event::{DomainEvent, EventBus};
