//! Dialogue state machine
//!
//! Nodes are pure step functions over an explicit resumption phase; the
//! runtime performs every side effect they ask for.

pub mod context;
pub mod graph;
pub mod node;
pub mod nodes;

#[cfg(test)]
mod proptests;

pub use context::{keys, ConversationContext};
pub use graph::{DialogueGraph, GraphError};
pub use node::{DialogueNode, Next, NodeError, NodeEvent, NodeId, NodeStep, Outcome, Phase};
