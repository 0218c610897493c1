//! Appointment agent - terminal booking assistant
//!
//! A turn-based dialogue engine that books appointments and hands any
//! other question to a completion service.

mod config;
mod extract;
mod llm;
mod runtime;
mod state_machine;

use config::AssistantConfig;
use llm::{LlmService, LoggingService, OpenAIService};
use runtime::{ProductionRuntime, ServiceLlmClient, SessionOutcome, TerminalChannel};
use state_machine::DialogueGraph;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "appointment_agent=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = AssistantConfig::from_env()?;
    let graph = Arc::new(DialogueGraph::appointment()?);

    let service: Arc<dyn LlmService> = Arc::new(OpenAIService::new(
        config.openai_api_key.clone(),
        config.model,
        config.endpoint.as_deref(),
        config.timeout,
    )?);
    let llm = ServiceLlmClient::new(Arc::new(LoggingService::new(service)));
    tracing::info!(model = %config.model.api_name(), "Completion service configured");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted");
                cancel.cancel();
            }
        }
    });

    let runtime = ProductionRuntime::new(graph, TerminalChannel::stdio(), llm)
        .with_completion(config.completion)
        .with_cancellation(cancel);

    let summary = runtime.run().await?;
    let context = serde_json::to_string(&summary.context)?;
    match summary.outcome {
        SessionOutcome::Completed => tracing::info!(
            session_id = %summary.session_id,
            nodes = summary.visited.len(),
            %context,
            "Session finished"
        ),
        SessionOutcome::Abandoned => {
            tracing::info!(
                session_id = %summary.session_id,
                last_node = %summary.last_node,
                nodes = summary.visited.len(),
                %context,
                "Session ended before completion"
            );
            // A blocked stdin read would otherwise hold runtime shutdown open
            std::process::exit(0);
        }
    }

    Ok(())
}
