//! In-memory graph storage implementation
//!
//! Node and edge identifiers are dense and assigned in creation order,
//! starting at zero. Nothing is ever deleted: the store only grows for the
//! lifetime of a load.

use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, Label, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("Recovered {kind} id {found} does not match expected id {expected}")]
    IdMismatch {
        kind: &'static str,
        expected: u64,
        found: u64,
    },
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Uniqueness constraint on one property of one label
///
/// Constraints are deferred: they are recorded at declaration time and only
/// evaluated on request, never on insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub label: Label,
    pub property: String,
}

impl fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(:{}).{} IS UNIQUE", self.label, self.property)
    }
}

/// A group of nodes sharing a value that a constraint declares unique
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintViolation {
    pub constraint: UniqueConstraint,
    pub value: PropertyValue,
    pub nodes: Vec<NodeId>,
}

/// Per-label and per-type counts, used for reporting
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub label_counts: HashMap<String, usize>,
    pub edge_type_counts: HashMap<String, usize>,
}

/// In-memory graph storage
///
/// - nodes / edges: dense arenas indexed by id
/// - outgoing / incoming: adjacency lists
/// - label_index / edge_type_index: creation-ordered id lists
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    label_index: HashMap<Label, Vec<NodeId>>,
    edge_type_index: HashMap<EdgeType, Vec<EdgeId>>,
    constraints: Vec<UniqueConstraint>,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            nodes: Vec::with_capacity(1024),
            edges: Vec::with_capacity(4096),
            outgoing: Vec::with_capacity(1024),
            incoming: Vec::with_capacity(1024),
            label_index: HashMap::new(),
            edge_type_index: HashMap::new(),
            constraints: Vec::new(),
        }
    }

    /// Create a node with any number of labels and properties
    pub fn create_node_with_properties(&mut self, labels: Vec<Label>, properties: PropertyMap) -> NodeId {
        let node_id = NodeId::new(self.nodes.len() as u64);

        for label in &labels {
            self.label_index.entry(label.clone()).or_default().push(node_id);
        }

        self.nodes.push(Node::new_with_properties(node_id, labels, properties));
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        node_id
    }

    /// Create an edge with properties
    pub fn create_edge_with_properties(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        if !self.has_node(source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !self.has_node(target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        let edge_id = EdgeId::new(self.edges.len() as u64);
        let edge_type = edge_type.into();

        self.outgoing[source.as_u64() as usize].push(edge_id);
        self.incoming[target.as_u64() as usize].push(edge_id);
        self.edge_type_index.entry(edge_type.clone()).or_default().push(edge_id);

        self.edges
            .push(Edge::new_with_properties(edge_id, source, target, edge_type, properties));
        Ok(edge_id)
    }

    /// Re-insert a node read back from a batch log. The id must be the next
    /// one this store would assign.
    pub fn insert_recovered_node(&mut self, node: Node) -> GraphResult<()> {
        let expected = self.nodes.len() as u64;
        if node.id.as_u64() != expected {
            return Err(GraphError::IdMismatch {
                kind: "node",
                expected,
                found: node.id.as_u64(),
            });
        }
        let labels = node.labels.into_iter().collect();
        self.create_node_with_properties(labels, node.properties);
        Ok(())
    }

    /// Re-insert an edge read back from a batch log
    pub fn insert_recovered_edge(&mut self, edge: Edge) -> GraphResult<()> {
        let expected = self.edges.len() as u64;
        if edge.id.as_u64() != expected {
            return Err(GraphError::IdMismatch {
                kind: "edge",
                expected,
                found: edge.id.as_u64(),
            });
        }
        self.create_edge_with_properties(edge.source, edge.target, edge.edge_type, edge.properties)?;
        Ok(())
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.as_u64() as usize)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.as_u64() as usize)
    }

    /// Get all outgoing edges from a node
    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.outgoing
            .get(node_id.as_u64() as usize)
            .map(|edge_ids| edge_ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Get all incoming edges to a node
    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.incoming
            .get(node_id.as_u64() as usize)
            .map(|edge_ids| edge_ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Get all nodes with a specific label, in creation order
    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        self.label_index
            .get(label)
            .map(|node_ids| node_ids.iter().filter_map(|&id| self.get_node(id)).collect())
            .unwrap_or_default()
    }

    /// Get all edges of a specific type, in creation order
    pub fn get_edges_by_type(&self, edge_type: &EdgeType) -> Vec<&Edge> {
        self.edge_type_index
            .get(edge_type)
            .map(|edge_ids| edge_ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Nodes with `label` whose `key` property equals `value`
    pub fn find_nodes_by_property(&self, label: &Label, key: &str, value: &PropertyValue) -> Vec<&Node> {
        self.get_nodes_by_label(label)
            .into_iter()
            .filter(|node| node.get_property(key) == Some(value))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Declare a deferred uniqueness constraint. Declaring the same
    /// constraint twice is a no-op.
    pub fn create_unique_constraint(&mut self, label: impl Into<Label>, property: impl Into<String>) {
        let constraint = UniqueConstraint {
            label: label.into(),
            property: property.into(),
        };
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
    }

    pub fn constraints(&self) -> &[UniqueConstraint] {
        &self.constraints
    }

    /// Evaluate every declared constraint against the current contents
    pub fn constraint_violations(&self) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for constraint in &self.constraints {
            // PropertyValue holds f64 and is not Hash; group on the rendered value.
            let mut groups: Vec<(String, PropertyValue, Vec<NodeId>)> = Vec::new();
            let mut positions: HashMap<String, usize> = HashMap::new();

            for node in self.get_nodes_by_label(&constraint.label) {
                let Some(value) = node.get_property(&constraint.property) else {
                    continue;
                };
                let key = format!("{}:{}", value.type_name(), value);
                match positions.get(&key) {
                    Some(&pos) => groups[pos].2.push(node.id),
                    None => {
                        positions.insert(key.clone(), groups.len());
                        groups.push((key, value.clone(), vec![node.id]));
                    }
                }
            }

            violations.extend(groups.into_iter().filter(|(_, _, nodes)| nodes.len() > 1).map(
                |(_, value, nodes)| ConstraintViolation {
                    constraint: constraint.clone(),
                    value,
                    nodes,
                },
            ));
        }

        violations
    }

    /// Node and edge counts per label and type
    pub fn statistics(&self) -> GraphStatistics {
        GraphStatistics {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            label_counts: self
                .label_index
                .iter()
                .map(|(label, ids)| (label.as_str().to_string(), ids.len()))
                .collect(),
            edge_type_counts: self
                .edge_type_index
                .iter()
                .map(|(edge_type, ids)| (edge_type.as_str().to_string(), ids.len()))
                .collect(),
        }
    }
}
