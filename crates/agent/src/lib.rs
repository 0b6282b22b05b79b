//! The reasoning loop: the research agent's engine.
//!
//! The agent follows a **Thought → Action → Observation** cycle:
//!
//! 1. **Render** a prompt: instructions, tool list, task, prior steps
//! 2. **Complete** it with the injected [`LanguageModel`](intellicore_core::LanguageModel)
//! 3. **Parse** the completion into a final answer, an action, or a format error
//! 4. **Act**: run the named tool and record its output as the observation
//!
//! The loop continues until the model emits a final answer or the
//! iteration budget is spent. Recoverable problems (unknown tools, tool
//! failures, malformed text) never end the loop early.

pub mod error;
pub mod parser;
pub mod patterns;
pub mod prompt;
pub mod scratchpad;

pub use error::AgentFailure;
pub use parser::{OutputParser, ParsedOutput, ReActParser};
pub use patterns::{AgentOutcome, AgentResult, ReactAgent};
pub use scratchpad::{AgentStep, Scratchpad};
