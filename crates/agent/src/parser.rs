//! Completion parsing: turns raw model text into a loop decision.
//!
//! The loop only ever sees a [`ParsedOutput`]; the text format lives here,
//! behind [`OutputParser`], so a structured-output parser can replace it
//! without touching the loop.

use regex_lite::Regex;
use std::sync::LazyLock;

pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";
pub const OBSERVATION_MARKER: &str = "Observation:";

pub const MISSING_ACTION: &str = "Invalid Format: Missing 'Action:' after 'Thought:'";
pub const MISSING_ACTION_INPUT: &str = "Invalid Format: Missing 'Action Input:' after 'Action:'";
pub const EMPTY_ACTION: &str = "Invalid Format: 'Action:' must name a tool";
pub const AMBIGUOUS_OUTPUT: &str =
    "Invalid Format: Output contains both a final answer and an action; respond with exactly one";

static ACTION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)").ok()
});
static ACTION_ONLY_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)").ok());

/// The three ways a completion can be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOutput {
    FinalAnswer {
        thought: Option<String>,
        answer: String,
    },
    Action {
        thought: Option<String>,
        tool: String,
        input: String,
    },
    /// Neither pattern was recognized; `reason` becomes the observation.
    Malformed { reason: String },
}

/// Strategy for reading model completions.
pub trait OutputParser: Send + Sync {
    fn parse(&self, text: &str) -> ParsedOutput;
}

/// Parser for the `Thought / Action / Action Input / Final Answer` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReActParser;

impl OutputParser for ReActParser {
    fn parse(&self, text: &str) -> ParsedOutput {
        let text = truncate_at_observation(text);
        let final_at = text.find(FINAL_ANSWER_MARKER);
        let action = ACTION_RE.as_ref().and_then(|re| re.captures(text));

        match (action, final_at) {
            (Some(_), Some(_)) => ParsedOutput::Malformed {
                reason: AMBIGUOUS_OUTPUT.into(),
            },
            (Some(caps), None) => {
                let (Some(whole), Some(tool), Some(input)) = (caps.get(0), caps.get(1), caps.get(2))
                else {
                    return ParsedOutput::Malformed {
                        reason: MISSING_ACTION.into(),
                    };
                };

                let tool = tool.as_str().trim();
                if tool.is_empty() {
                    return ParsedOutput::Malformed {
                        reason: EMPTY_ACTION.into(),
                    };
                }

                ParsedOutput::Action {
                    thought: extract_thought(&text[..whole.start()]),
                    tool: tool.to_string(),
                    input: clean_action_input(input.as_str()),
                }
            }
            (None, Some(at)) => ParsedOutput::FinalAnswer {
                thought: extract_thought(&text[..at]),
                answer: text[at + FINAL_ANSWER_MARKER.len()..].trim().to_string(),
            },
            (None, None) => {
                let has_action = ACTION_ONLY_RE
                    .as_ref()
                    .is_some_and(|re| re.is_match(text));
                ParsedOutput::Malformed {
                    reason: if has_action {
                        MISSING_ACTION_INPUT.into()
                    } else {
                        MISSING_ACTION.into()
                    },
                }
            }
        }
    }
}

/// Everything the model wrote after its first `Observation:` line is invented;
/// observations only ever come from tools.
fn truncate_at_observation(text: &str) -> &str {
    let cut = if text.starts_with(OBSERVATION_MARKER) {
        Some(0)
    } else {
        text.find(&format!("\n{OBSERVATION_MARKER}"))
    };
    cut.map_or(text, |i| &text[..i])
}

/// The reasoning text before a marker, without a leading `Thought:` label.
fn extract_thought(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim();
    let trimmed = trimmed.strip_prefix("Thought:").unwrap_or(trimmed).trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trim, cut at a hallucinated observation, and drop surrounding quotes.
fn clean_action_input(raw: &str) -> String {
    let cut = raw.find(OBSERVATION_MARKER).map_or(raw, |i| &raw[..i]);
    cut.trim().trim_matches('"').trim().to_string()
}
