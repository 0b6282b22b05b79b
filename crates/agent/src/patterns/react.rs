//! ReAct pattern: Thought → Action → Observation loop.
//!
//! The agent reasons step-by-step, choosing tools to gather information,
//! then synthesizes a final answer. All reasoning steps are recorded in the
//! [`Scratchpad`] and are fully inspectable.
//!
//! # Trace Format
//!
//! Each iteration records one [`AgentStep`]:
//! - **Thought**: the model's reasoning before its action
//! - **Action** / **Action Input**: which tool was called with what text
//! - **Observation**: the tool output, or a synthesized error string
//!
//! Malformed completions, unknown tools, and tool failures all become
//! observations and consume one iteration. The loop ends on a final answer,
//! on an exhausted budget, or when the model backend itself fails.

use chrono::Utc;
use intellicore_core::event::{DomainEvent, EventBus};
use intellicore_core::model::LanguageModel;
use intellicore_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::AgentFailure;
use crate::parser::{OutputParser, ParsedOutput, ReActParser};
use crate::prompt::{self, DEFAULT_INSTRUCTIONS, PromptInput};
use crate::scratchpad::{AgentStep, Scratchpad};

/// A tool-using reasoning agent.
///
/// The model and registry are injected; the registry is frozen for the
/// agent's lifetime.
pub struct ReactAgent {
    model: Arc<dyn LanguageModel>,
    tools: Arc<ToolRegistry>,
    instructions: String,
    parser: Box<dyn OutputParser>,
    event_bus: Option<Arc<EventBus>>,
}

/// A successful loop run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// The final answer text.
    pub answer: String,
    /// Complete reasoning trace, including the final-answer step.
    pub trace: Vec<AgentStep>,
    /// Number of iterations used.
    pub iterations: usize,
}

pub type AgentResult = Result<AgentOutcome, AgentFailure>;

impl ReactAgent {
    pub fn new(model: Arc<dyn LanguageModel>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            tools,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            parser: Box::new(ReActParser),
            event_bus: None,
        }
    }

    /// Replace the role instructions at the top of the prompt.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Swap the completion parser.
    pub fn with_parser(mut self, parser: Box<dyn OutputParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Execute the ReAct loop for `task`, with `context` rendered above it.
    pub async fn run(&self, task: &str, max_iterations: usize, context: &str) -> AgentResult {
        let mut pad = Scratchpad::new(max_iterations);

        info!(
            max_iterations,
            tools = self.tools.len(),
            "ReAct loop starting"
        );

        while pad.tick() {
            let iteration = pad.iterations();
            debug!(iteration, "ReAct iteration");

            let scratchpad = pad.render();
            let prompt = prompt::render(&PromptInput {
                instructions: &self.instructions,
                tools: &self.tools,
                context,
                task,
                scratchpad: &scratchpad,
            });

            // ── Call the model ──
            let start = Instant::now();
            let completion = match self.model.complete(&prompt).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(iteration, error = %e, "ReAct loop aborted by model failure");
                    return Err(AgentFailure::Model {
                        source: e,
                        trace: pad.into_steps(),
                    });
                }
            };
            self.publish(DomainEvent::ModelCalled {
                iteration,
                completion_chars: completion.len(),
                duration_ms: start.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            });

            // ── Parse and act ──
            match self.parser.parse(&completion) {
                ParsedOutput::FinalAnswer { thought, answer } => {
                    pad.push(AgentStep {
                        index: iteration,
                        thought,
                        action: None,
                        action_input: None,
                        observation: None,
                    });
                    info!(iterations = iteration, "ReAct loop completed");
                    return Ok(AgentOutcome {
                        answer,
                        iterations: iteration,
                        trace: pad.into_steps(),
                    });
                }
                ParsedOutput::Action {
                    thought,
                    tool,
                    input,
                } => {
                    let observation = self.invoke_tool(&tool, &input).await;
                    pad.push(AgentStep {
                        index: iteration,
                        thought,
                        action: Some(tool),
                        action_input: Some(input),
                        observation: Some(observation),
                    });
                }
                ParsedOutput::Malformed { reason } => {
                    debug!(iteration, %reason, "Malformed completion");
                    pad.push(AgentStep {
                        index: iteration,
                        thought: Some(completion.trim().to_string()),
                        action: None,
                        action_input: None,
                        observation: Some(reason),
                    });
                }
            }
        }

        warn!(max_iterations, "ReAct: max iterations reached");
        Err(AgentFailure::IterationsExhausted {
            max_iterations,
            trace: pad.into_steps(),
        })
    }

    /// Resolve and run a tool. Every outcome becomes observation text.
    async fn invoke_tool(&self, name: &str, input: &str) -> String {
        let tool = match self.tools.get(name) {
            Ok(tool) => tool,
            Err(_) => {
                debug!(tool = %name, "Unknown tool requested");
                return format!(
                    "{} is not a valid tool, try one of [{}].",
                    name,
                    self.tools.names().join(", ")
                );
            }
        };

        let start = Instant::now();
        let result = tool.invoke(input).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        self.publish(DomainEvent::ToolExecuted {
            tool_name: name.to_string(),
            success: result.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        match result {
            Ok(output) => output,
            Err(e) => {
                debug!(tool = %name, error = %e, "Tool invocation failed");
                e.to_string()
            }
        }
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
