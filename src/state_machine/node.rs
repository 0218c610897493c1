//! Dialogue node contract
//!
//! A node never blocks. It is driven by [`DialogueNode::step`], a pure
//! function of its resumption [`Phase`], the event that resumed it, and the
//! session context. Each step hands back the messages to emit and an
//! [`Outcome`]: suspend for a reply, suspend for a completion, or finish
//! with the name of the next node.

use super::context::ConversationContext;
use chrono::NaiveDateTime;
use std::fmt;
use thiserror::Error;

/// Name of a node in the dialogue graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Start,
    GeneralQuery,
    AskDateTime,
    AskAppointmentMode,
    CompleteBooking,
    End,
}

impl NodeId {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeId::Start => "Start",
            NodeId::GeneralQuery => "GeneralQuery",
            NodeId::AskDateTime => "AskDateTime",
            NodeId::AskAppointmentMode => "AskAppointmentMode",
            NodeId::CompleteBooking => "CompleteBooking",
            NodeId::End => "End",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a finished node sends the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Goto(NodeId),
    /// End of session; no further node runs
    Terminate,
}

/// Resumption state of an in-progress node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Just activated, nothing emitted yet
    Entered,
    /// Waiting on the answer to the node's main question
    Asked,
    /// Waiting on the answer to a clarification after a rejected reply
    Clarifying,
    /// Waiting on the completion service
    Completing { attempt: u32 },
}

/// What resumes a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    Enter,
    Reply(String),
    Completion(String),
    CompletionFailed { message: String, retryable: bool },
}

impl NodeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NodeEvent::Enter => "enter",
            NodeEvent::Reply(_) => "reply",
            NodeEvent::Completion(_) => "completion",
            NodeEvent::CompletionFailed { .. } => "completion_failed",
        }
    }
}

/// How a step ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Emit `prompt`, then suspend until exactly one reply arrives
    AwaitReply { prompt: String, phase: Phase },
    /// Send `prompt` to the completion service, resume with its answer
    AwaitCompletion { prompt: String, phase: Phase },
    Finish(Next),
}

/// Result of running a node up to its next suspension point or completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStep {
    /// Emitted before the outcome, without waiting for a reply
    pub messages: Vec<String>,
    pub outcome: Outcome,
}

impl NodeStep {
    pub fn ask(prompt: impl Into<String>, phase: Phase) -> Self {
        Self {
            messages: vec![],
            outcome: Outcome::AwaitReply {
                prompt: prompt.into(),
                phase,
            },
        }
    }

    pub fn complete(prompt: impl Into<String>, phase: Phase) -> Self {
        Self {
            messages: vec![],
            outcome: Outcome::AwaitCompletion {
                prompt: prompt.into(),
                phase,
            },
        }
    }

    pub fn finish(next: Next) -> Self {
        Self {
            messages: vec![],
            outcome: Outcome::Finish(next),
        }
    }

    pub fn goto(node: NodeId) -> Self {
        Self::finish(Next::Goto(node))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    /// Number of outbound messages this step produces, prompt included
    pub fn outbound_count(&self) -> usize {
        let prompt = usize::from(matches!(self.outcome, Outcome::AwaitReply { .. }));
        self.messages.len() + prompt
    }
}

/// Fatal node failures. Recoverable problems (unparseable replies, failed
/// completions) are handled inside the node and never surface here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeError {
    #[error("{node} requires context key {key:?}, which is not set")]
    MissingContext { node: NodeId, key: &'static str },
    #[error("{node} cannot handle a {event} event while {phase:?}")]
    UnexpectedEvent {
        node: NodeId,
        phase: Phase,
        event: &'static str,
    },
}

impl NodeError {
    pub fn unexpected(node: NodeId, phase: Phase, event: &NodeEvent) -> Self {
        NodeError::UnexpectedEvent {
            node,
            phase,
            event: event.name(),
        }
    }
}

/// A named unit of conversational behavior
pub trait DialogueNode: Send + Sync {
    fn id(&self) -> NodeId;

    /// Every node this one can name as `Next::Goto`, used to validate the
    /// graph before a session starts
    fn targets(&self) -> &'static [NodeId];

    /// Advance the node. Context is only written from here, and only after
    /// the event that resumed the node has actually arrived.
    fn step(
        &self,
        phase: Phase,
        event: NodeEvent,
        ctx: &mut ConversationContext,
        now: NaiveDateTime,
    ) -> Result<NodeStep, NodeError>;
}
