//! The research stages: decompose → research → write.

pub mod decompose;
pub mod research;
pub mod write;

pub use decompose::DecomposeStage;
pub use research::ResearchStage;
pub use write::WriteStage;

use intellicore_core::state::WorkflowState;

use crate::error::StageError;

/// The user's original request. Supplied by the caller.
pub const REQUEST: &str = "request";
/// The core research topic extracted from the request.
pub const TOPIC: &str = "topic";
/// The researcher's summary.
pub const FINDINGS: &str = "findings";
/// The final written report.
pub const REPORT: &str = "report";

/// A non-empty string field, or `MissingField`.
pub(crate) fn require<'a>(state: &'a WorkflowState, field: &str) -> Result<&'a str, StageError> {
    state
        .get_str(field)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StageError::MissingField(field.to_string()))
}

/// Drop `<think>…</think>` blocks that reasoning models prepend.
///
/// An unterminated block swallows the rest of the text.
pub(crate) fn strip_reasoning(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}
