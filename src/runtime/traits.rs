//! Trait abstractions for the session's collaborators
//!
//! The runtime only talks to the human and to the completion service
//! through these traits, so tests can drive whole conversations with mocks.

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Duplex plain-text channel to the human
#[async_trait]
pub trait Channel: Send {
    /// Show one outbound message
    async fn emit(&mut self, message: &str) -> Result<(), ChannelError>;

    /// Wait for exactly one reply. `None` means the human has gone away.
    async fn request_reply(&mut self) -> Result<Option<String>, ChannelError>;
}

/// Client for completion requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use any [`LlmService`] as the session's `LlmClient`
pub struct ServiceLlmClient {
    service: Arc<dyn LlmService>,
}

impl ServiceLlmClient {
    pub fn new(service: Arc<dyn LlmService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LlmClient for ServiceLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.service.complete(request).await
    }

    fn model_id(&self) -> &str {
        self.service.model_id()
    }
}

/// Line-oriented terminal: `AI: ` for outbound lines, `You: ` before a reply
pub struct TerminalChannel<R, W> {
    lines: Lines<BufReader<R>>,
    output: W,
}

impl TerminalChannel<tokio::io::Stdin, tokio::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> TerminalChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            lines: BufReader::new(input).lines(),
            output,
        }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

#[async_trait]
impl<R, W> Channel for TerminalChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn emit(&mut self, message: &str) -> Result<(), ChannelError> {
        self.output
            .write_all(format!("AI: {message}\n").as_bytes())
            .await?;
        self.output.flush().await?;
        Ok(())
    }

    async fn request_reply(&mut self) -> Result<Option<String>, ChannelError> {
        self.output.write_all(b"You: ").await?;
        self.output.flush().await?;
        let line = self.lines.next_line().await?;
        Ok(line.map(|l| l.trim_end_matches('\r').to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_terminal_channel_formats_lines() {
        let input: &[u8] = b"tomorrow at 10am\r\nvideo\n";
        let mut channel = TerminalChannel::new(input, Vec::new());

        channel.emit("Hello! How can I help you today?").await.unwrap();
        assert_eq!(
            channel.request_reply().await.unwrap().as_deref(),
            Some("tomorrow at 10am")
        );
        assert_eq!(channel.request_reply().await.unwrap().as_deref(), Some("video"));
        assert_eq!(channel.request_reply().await.unwrap(), None);

        let output = String::from_utf8(channel.into_output()).unwrap();
        assert_eq!(
            output,
            "AI: Hello! How can I help you today?\nYou: You: You: "
        );
    }
}
