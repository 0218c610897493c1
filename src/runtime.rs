//! Runtime for executing conversation sessions
//!
//! One [`SessionRuntime`] per human. It owns the session's context and
//! current-node pointer and performs all I/O on the nodes' behalf.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::state_machine::{ConversationContext, GraphError, NodeError, NodeId};
use thiserror::Error;

/// Type alias for the runtime wired to the terminal and a real completion service
pub type ProductionRuntime =
    SessionRuntime<TerminalChannel<tokio::io::Stdin, tokio::io::Stdout>, ServiceLlmClient>;

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A node terminated the session
    Completed,
    /// The human went away (end of input or cancellation)
    Abandoned,
}

/// Final state of a session, handed back by [`SessionRuntime::run`]
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: String,
    pub outcome: SessionOutcome,
    /// Node that was running when the session ended
    pub last_node: NodeId,
    /// Every node execution in order, re-entries included
    pub visited: Vec<NodeId>,
    pub context: ConversationContext,
}

/// Fatal session errors. Unparseable replies and failed completions are
/// handled inside the nodes and never end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("Node {0} finished without emitting any message")]
    SilentNode(NodeId),
}
