//! Agent patterns: structured reasoning strategies.
//!
//! **ReAct**: Thought → Action → Observation, repeated until the model
//! emits a final answer or the iteration budget runs out.

pub mod react;

pub use react::{AgentOutcome, AgentResult, ReactAgent};

#[cfg(test)]
pub(crate) mod test_helpers;
