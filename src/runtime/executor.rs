//! Session runtime: drives dialogue nodes against the collaborators

use super::traits::{Channel, LlmClient};
use super::{SessionError, SessionOutcome, SessionSummary};
use crate::config::CompletionSettings;
use crate::llm::{LlmError, LlmRequest};
use crate::state_machine::{
    ConversationContext, DialogueGraph, Next, NodeEvent, NodeId, Outcome, Phase,
};
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Source of "now" for date validation
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// How one node execution ended
enum NodeRun {
    Finished(Next),
    Abandoned,
}

/// Orchestrator for a single conversation session
///
/// Owns the session's context and current-node pointer; nothing is shared
/// with other sessions except the immutable graph.
pub struct SessionRuntime<C, L>
where
    C: Channel,
    L: LlmClient,
{
    session_id: String,
    graph: Arc<DialogueGraph>,
    context: ConversationContext,
    current: NodeId,
    visited: Vec<NodeId>,
    channel: C,
    llm: L,
    completion: CompletionSettings,
    cancel: CancellationToken,
    clock: Clock,
}

impl<C, L> SessionRuntime<C, L>
where
    C: Channel,
    L: LlmClient,
{
    pub fn new(graph: Arc<DialogueGraph>, channel: C, llm: L) -> Self {
        let current = graph.entry();
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            graph,
            context: ConversationContext::new(),
            current,
            visited: Vec::new(),
            channel,
            llm,
            completion: CompletionSettings::default(),
            cancel: CancellationToken::new(),
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }

    /// Seed the context before the first node runs
    #[must_use]
    pub fn with_context(mut self, context: ConversationContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_completion(mut self, completion: CompletionSettings) -> Self {
        self.completion = completion;
        self
    }

    /// Abandon the session when `cancel` fires
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run nodes until one terminates the session, the human goes away, or
    /// a fatal error occurs.
    pub async fn run(mut self) -> Result<SessionSummary, SessionError> {
        tracing::info!(
            session_id = %self.session_id,
            entry = %self.current,
            model = %self.llm.model_id(),
            "Starting session"
        );
        if !self.context.is_empty() {
            tracing::debug!(
                session_id = %self.session_id,
                keys = ?self.context.keys().collect::<Vec<_>>(),
                "Context seeded before first node"
            );
        }

        loop {
            let node = self.current;
            self.visited.push(node);
            tracing::debug!(session_id = %self.session_id, %node, "Entering node");

            let next = match self.run_node(node).await {
                Ok(NodeRun::Finished(next)) => next,
                Ok(NodeRun::Abandoned) => {
                    tracing::info!(session_id = %self.session_id, %node, "Session abandoned");
                    return Ok(self.into_summary(SessionOutcome::Abandoned));
                }
                Err(e) => {
                    tracing::error!(
                        session_id = %self.session_id,
                        %node,
                        error = %e,
                        "Session failed"
                    );
                    return Err(e);
                }
            };

            match next {
                Next::Goto(to) => {
                    tracing::debug!(session_id = %self.session_id, from = %node, %to, "Transition");
                    self.current = to;
                }
                Next::Terminate => {
                    tracing::info!(
                        session_id = %self.session_id,
                        nodes = self.visited.len(),
                        "Session completed"
                    );
                    return Ok(self.into_summary(SessionOutcome::Completed));
                }
            }
        }
    }

    /// Execute one node to completion, suspending at each prompt until
    /// exactly one reply has been received.
    async fn run_node(&mut self, id: NodeId) -> Result<NodeRun, SessionError> {
        let graph = Arc::clone(&self.graph);
        let node = graph.lookup(id)?;

        let mut phase = Phase::Entered;
        let mut event = NodeEvent::Enter;
        let mut emitted = 0;

        loop {
            let step = node.step(phase, event, &mut self.context, (self.clock)())?;
            emitted += step.outbound_count();

            for message in &step.messages {
                self.channel.emit(message).await?;
            }

            match step.outcome {
                Outcome::AwaitReply {
                    prompt,
                    phase: resume,
                } => {
                    self.channel.emit(&prompt).await?;
                    let Some(reply) = self.await_reply().await? else {
                        return Ok(NodeRun::Abandoned);
                    };
                    phase = resume;
                    event = NodeEvent::Reply(reply);
                }
                Outcome::AwaitCompletion {
                    prompt,
                    phase: resume,
                } => {
                    let Some(result) = self.await_completion(prompt).await else {
                        return Ok(NodeRun::Abandoned);
                    };
                    phase = resume;
                    event = match result {
                        Ok(answer) => NodeEvent::Completion(answer),
                        Err(e) => NodeEvent::CompletionFailed {
                            retryable: e.is_retryable(),
                            message: e.to_string(),
                        },
                    };
                }
                Outcome::Finish(next) => {
                    if emitted == 0 {
                        return Err(SessionError::SilentNode(id));
                    }
                    return Ok(NodeRun::Finished(next));
                }
            }
        }
    }

    async fn await_reply(&mut self) -> Result<Option<String>, SessionError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Ok(None),
            reply = self.channel.request_reply() => Ok(reply?),
        }
    }

    async fn await_completion(&self, prompt: String) -> Option<Result<String, LlmError>> {
        let mut request = LlmRequest::new(prompt).with_max_tokens(self.completion.max_tokens);
        if let Some(system) = &self.completion.system_prompt {
            request = request.with_system(system.clone());
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            result = self.llm.complete(&request) => Some(result.map(|r| r.text)),
        }
    }

    fn into_summary(self, outcome: SessionOutcome) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            outcome,
            last_node: self.current,
            visited: self.visited,
            context: self.context,
        }
    }
}
