//! Mock implementations for testing
//!
//! These mocks let whole sessions run without a terminal or network.

use super::traits::*;
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Scripted Channel
// ============================================================================

/// One line of a recorded conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Assistant(String),
    User(String),
}

impl Line {
    pub fn assistant(text: impl Into<String>) -> Self {
        Line::Assistant(text.into())
    }

    pub fn user(text: impl Into<String>) -> Self {
        Line::User(text.into())
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Line::User(_))
    }
}

/// Shared view of everything said on a [`ScriptedChannel`]
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Arc<Mutex<Vec<Line>>>,
}

impl Transcript {
    pub fn lines(&self) -> Vec<Line> {
        self.lines.lock().unwrap().clone()
    }

    fn push(&self, line: Line) {
        self.lines.lock().unwrap().push(line);
    }
}

/// Channel that answers prompts from a fixed script
///
/// Once the script runs out it reports end of input, or, with
/// [`ScriptedChannel::cancel_when_exhausted`], fires the token and blocks
/// as a human who never answers would.
pub struct ScriptedChannel {
    replies: VecDeque<String>,
    transcript: Transcript,
    cancel_on_exhaustion: Option<CancellationToken>,
}

impl ScriptedChannel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            transcript: Transcript::default(),
            cancel_on_exhaustion: None,
        }
    }

    pub fn cancel_when_exhausted(mut self, token: CancellationToken) -> Self {
        self.cancel_on_exhaustion = Some(token);
        self
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn emit(&mut self, message: &str) -> Result<(), ChannelError> {
        self.transcript.push(Line::assistant(message));
        Ok(())
    }

    async fn request_reply(&mut self) -> Result<Option<String>, ChannelError> {
        if let Some(reply) = self.replies.pop_front() {
            self.transcript.push(Line::user(reply.clone()));
            return Ok(Some(reply));
        }
        match &self.cancel_on_exhaustion {
            Some(token) => {
                token.cancel();
                std::future::pending().await
            }
            None => Ok(None),
        }
    }
}
