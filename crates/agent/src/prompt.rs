//! Prompt rendering for the reasoning loop.

use intellicore_core::tool::ToolRegistry;

pub const DEFAULT_INSTRUCTIONS: &str = "You are a master researcher. Your goal is to gather information on a given topic.\n\
You must use your available tools to find the most relevant and up-to-date information.\n\
Provide a concise and comprehensive summary of your findings.";

/// Everything that goes into one iteration's prompt.
pub struct PromptInput<'a> {
    pub instructions: &'a str,
    pub tools: &'a ToolRegistry,
    pub context: &'a str,
    pub task: &'a str,
    pub scratchpad: &'a str,
}

/// Render the ReAct prompt.
///
/// Deterministic: the same registry, task, and scratchpad always produce
/// the same text.
pub fn render(input: &PromptInput<'_>) -> String {
    let mut prompt = String::with_capacity(1024 + input.scratchpad.len());

    prompt.push_str(input.instructions.trim());
    prompt.push_str("\n\nYou have access to the following tools:\n");
    prompt.push_str(&input.tools.render_descriptions());
    prompt.push_str("\n\nUse the following format:\n\n");
    prompt.push_str("Question: the input question you must answer\n");
    prompt.push_str("Thought: you should always think about what to do\n");
    prompt.push_str("Action: the action to take, should be one of [");
    prompt.push_str(&input.tools.names().join(", "));
    prompt.push_str("]\n");
    prompt.push_str("Action Input: the input to the action\n");
    prompt.push_str("Observation: the result of the action\n");
    prompt.push_str("... (this Thought/Action/Action Input/Observation can repeat N times)\n");
    prompt.push_str("Thought: I have gathered enough information.\n");
    prompt.push_str("Final Answer: the final answer to the original input question\n\n");
    prompt.push_str("Begin!\n\n");

    let context = input.context.trim();
    if !context.is_empty() {
        prompt.push_str("Context: ");
        prompt.push_str(context);
        prompt.push('\n');
    }

    prompt.push_str("Question: ");
    prompt.push_str(input.task.trim());
    prompt.push('\n');
    prompt.push_str(input.scratchpad);
    prompt.push_str("Thought:");
    prompt
}
