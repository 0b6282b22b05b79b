//! The reasoning trace for a single loop run.
//!
//! Every iteration appends one [`AgentStep`]. The scratchpad renders the
//! steps back into the prompt verbatim, in order, and counts iterations
//! against the loop's budget.

use serde::{Deserialize, Serialize};

/// One Thought → Action → Observation record.
///
/// Malformed completions record the raw text as `thought` and the format
/// violation as `observation`. The final-answer iteration records only
/// its thought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    /// 1-based iteration number.
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

impl AgentStep {
    /// Whether this step invoked (or tried to invoke) a tool.
    pub fn is_action(&self) -> bool {
        self.action.is_some()
    }

    fn render_into(&self, out: &mut String) {
        if let Some(thought) = &self.thought {
            out.push_str("Thought: ");
            out.push_str(thought);
            out.push('\n');
        }
        if let Some(action) = &self.action {
            out.push_str("Action: ");
            out.push_str(action);
            out.push('\n');
            out.push_str("Action Input: ");
            out.push_str(self.action_input.as_deref().unwrap_or_default());
            out.push('\n');
        }
        if let Some(observation) = &self.observation {
            out.push_str("Observation: ");
            out.push_str(observation);
            out.push('\n');
        }
    }
}

/// Iteration counter plus the accumulated trace.
#[derive(Debug, Clone, Default)]
pub struct Scratchpad {
    steps: Vec<AgentStep>,
    iterations: usize,
    max_iterations: usize,
}

impl Scratchpad {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            steps: Vec::new(),
            iterations: 0,
            max_iterations,
        }
    }

    /// Start the next iteration. Returns `false` once the budget is spent.
    pub fn tick(&mut self) -> bool {
        if self.iterations >= self.max_iterations {
            return false;
        }
        self.iterations += 1;
        true
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn push(&mut self, step: AgentStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[AgentStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<AgentStep> {
        self.steps
    }

    /// All prior steps in prompt form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            step.render_into(&mut out);
        }
        out
    }
}
