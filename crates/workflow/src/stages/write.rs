//! Turns research findings into the final report.

use async_trait::async_trait;
use intellicore_core::model::LanguageModel;
use intellicore_core::state::{StateUpdate, WorkflowState};
use std::sync::Arc;
use tracing::info;

use super::{FINDINGS, REPORT, TOPIC, require, strip_reasoning};
use crate::error::StageError;
use crate::graph::Stage;

pub struct WriteStage {
    model: Arc<dyn LanguageModel>,
}

impl WriteStage {
    pub const NAME: &'static str = "write";

    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub(crate) fn prompt(topic: &str, findings: &str) -> String {
        format!(
            "You are a professional writer. Your task is to take the provided research findings\n\
             and write a clear, concise, and well-structured report.\n\
             Do not add any information that is not present in the research findings.\n\
             Your final output should be only the report, without any extra commentary.\n\
             \n\
             Research Findings:\n\
             ---\n\
             {findings}\n\
             ---\n\
             \n\
             Based on the findings, write a report on the topic: {topic}",
            findings = findings.trim(),
            topic = topic.trim(),
        )
    }
}

#[async_trait]
impl Stage for WriteStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn reads(&self) -> Vec<&str> {
        vec![TOPIC, FINDINGS]
    }

    fn writes(&self) -> Vec<&str> {
        vec![REPORT]
    }

    async fn run(&self, state: &WorkflowState) -> Result<StateUpdate, StageError> {
        let topic = require(state, TOPIC)?;
        let findings = require(state, FINDINGS)?;
        info!(stage = Self::NAME, topic = %topic, "Invoking writer");

        let completion = self.model.complete(&Self::prompt(topic, findings)).await?;
        let report = strip_reasoning(&completion).trim().to_string();
        if report.is_empty() {
            return Err(StageError::EmptyOutput(REPORT.to_string()));
        }

        info!(stage = Self::NAME, report_chars = report.len(), "Writing complete");
        Ok(StateUpdate::new().set(REPORT, report))
    }
}
