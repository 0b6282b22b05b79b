//! `intellicore run` and `intellicore resume`.

use anyhow::Context;
use intellicore_core::state::WorkflowState;
use intellicore_workflow::{GraphError, ResearchPipeline, WorkflowRun};
use tracing::info;

use super::runtime;

pub async fn run(request: &str, session: Option<String>, stream: bool) -> anyhow::Result<()> {
    let config = runtime::load_config()?;
    let pipeline = runtime::build_pipeline(&config).await?;
    let session = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    println!("🔬 IntelliCore — session {session}");
    println!("   Request: {request}\n");
    info!(session = %session, "Submitting request");

    let result = if stream {
        print_stream(pipeline.submit_request_stream(request, &session)).await
    } else {
        pipeline.submit_request(request, &session).await
    };
    finish(result, &session)
}

pub async fn resume(session: &str, stream: bool) -> anyhow::Result<()> {
    let config = runtime::load_config()?;
    let pipeline = runtime::build_pipeline(&config).await?;

    println!("🔬 IntelliCore — resuming session {session}\n");

    let result = if stream {
        print_stream(pipeline.resume_stream(session)).await
    } else {
        pipeline.resume(session).await
    };
    finish(result, session)
}

async fn print_stream(mut run: WorkflowRun) -> Result<WorkflowState, GraphError> {
    while let Some(event) = run.events.recv().await {
        println!(
            "--- Finished step: {} (updated: {}) ---",
            event.node,
            event.updated_fields.join(", ")
        );
    }
    run.finish().await
}

fn finish(result: Result<WorkflowState, GraphError>, session: &str) -> anyhow::Result<()> {
    let state = result.with_context(|| {
        format!("Session '{session}' did not complete; run `intellicore resume {session}` to retry")
    })?;

    match ResearchPipeline::report(&state) {
        Some(report) => {
            println!("\n--- Final Report ---\n");
            println!("{report}");
        }
        None => println!("\n⚠️  Session finished without a report."),
    }
    Ok(())
}
