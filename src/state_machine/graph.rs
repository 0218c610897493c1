//! Dialogue graph: a validated registry of nodes

use super::node::{DialogueNode, NodeId};
use super::nodes::{
    AskAppointmentModeNode, AskDateTimeNode, CompleteBookingNode, EndNode, GeneralQueryNode,
    StartNode,
};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown node: {name}")]
    UnknownNode { name: String },
    #[error("Node {0} registered twice")]
    DuplicateNode(NodeId),
    #[error("Entry node {0} is not registered")]
    MissingEntry(NodeId),
    #[error("Node {from} can transition to {to}, which is not registered")]
    DanglingTransition { from: NodeId, to: NodeId },
}

/// Collects nodes and checks the graph's structure before handing it out
pub struct GraphBuilder {
    entry: NodeId,
    nodes: HashMap<NodeId, Box<dyn DialogueNode>>,
    duplicates: Vec<NodeId>,
}

impl GraphBuilder {
    /// Register a node under its own name
    #[must_use]
    pub fn register(mut self, node: impl DialogueNode + 'static) -> Self {
        let id = node.id();
        if self.nodes.insert(id, Box::new(node)).is_some() {
            self.duplicates.push(id);
        }
        self
    }

    /// Validate that the entry and every static transition target exist
    pub fn build(self) -> Result<DialogueGraph, GraphError> {
        if let Some(id) = self.duplicates.first() {
            return Err(GraphError::DuplicateNode(*id));
        }
        if !self.nodes.contains_key(&self.entry) {
            return Err(GraphError::MissingEntry(self.entry));
        }

        // Sorted so the reported error does not depend on hash order
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_by_key(|id| id.as_str());
        for from in ids {
            for to in self.nodes[&from].targets() {
                if !self.nodes.contains_key(to) {
                    return Err(GraphError::DanglingTransition { from, to: *to });
                }
            }
        }

        Ok(DialogueGraph {
            entry: self.entry,
            nodes: self.nodes,
        })
    }
}

/// Registry resolving node names to behavior
pub struct DialogueGraph {
    entry: NodeId,
    nodes: HashMap<NodeId, Box<dyn DialogueNode>>,
}

impl std::fmt::Debug for DialogueGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueGraph")
            .field("entry", &self.entry)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DialogueGraph {
    pub fn builder(entry: NodeId) -> GraphBuilder {
        GraphBuilder {
            entry,
            nodes: HashMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// The appointment-booking conversation, entered at Start
    pub fn appointment() -> Result<Self, GraphError> {
        Self::builder(NodeId::Start)
            .register(StartNode)
            .register(GeneralQueryNode)
            .register(AskDateTimeNode)
            .register(AskAppointmentModeNode)
            .register(CompleteBookingNode)
            .register(EndNode)
            .build()
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn lookup(&self, id: NodeId) -> Result<&dyn DialogueNode, GraphError> {
        match self.nodes.get(&id) {
            Some(node) => Ok(node.as_ref()),
            None => Err(GraphError::UnknownNode {
                name: id.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appointment_graph_is_valid() {
        let graph = DialogueGraph::appointment().unwrap();
        assert_eq!(graph.entry(), NodeId::Start);
        for id in [
            NodeId::Start,
            NodeId::GeneralQuery,
            NodeId::AskDateTime,
            NodeId::AskAppointmentMode,
            NodeId::CompleteBooking,
            NodeId::End,
        ] {
            assert_eq!(graph.lookup(id).unwrap().id(), id);
        }
    }

    #[test]
    fn test_lookup_unregistered_node() {
        let graph = DialogueGraph::builder(NodeId::End)
            .register(EndNode)
            .build()
            .unwrap();
        let Err(err) = graph.lookup(NodeId::Start) else {
            panic!("Start is not registered");
        };
        assert_eq!(
            err,
            GraphError::UnknownNode {
                name: "Start".to_string()
            }
        );
        assert_eq!(err.to_string(), "Unknown node: Start");
    }

    #[test]
    fn test_dangling_transition_rejected() {
        let err = DialogueGraph::builder(NodeId::CompleteBooking)
            .register(CompleteBookingNode)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::DanglingTransition {
                from: NodeId::CompleteBooking,
                to: NodeId::End
            }
        );
    }

    #[test]
    fn test_missing_entry_rejected() {
        let err = DialogueGraph::builder(NodeId::Start)
            .register(EndNode)
            .build()
            .unwrap_err();
        assert_eq!(err, GraphError::MissingEntry(NodeId::Start));
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = DialogueGraph::builder(NodeId::End)
            .register(EndNode)
            .register(EndNode)
            .build()
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateNode(NodeId::End));
    }
}
