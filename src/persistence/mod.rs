//! Bulk insertion handle for the output graph
//!
//! A [`BatchInserter`] owns the in-memory [`GraphStore`] for the duration of a
//! load and, when opened on a directory, mirrors every write to a
//! [`BatchLog`] so the result survives the process.

pub mod batch_log;

pub use batch_log::{BatchLog, BatchLogError, BatchLogResult, LogEntry, LOG_FILE_NAME};

use crate::graph::{
    Edge, EdgeId, EdgeType, GraphError, GraphStore, Label, Node, NodeId, PropertyMap,
};
use std::path::Path;
use tracing::info;

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Batch log error: {0}")]
    Log(#[from] BatchLogError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Exclusive write handle over a graph store
///
/// The reference node (id 0, no labels) always exists: it is created when
/// the inserter starts on an empty store and reused when an existing log is
/// reopened.
pub struct BatchInserter {
    store: GraphStore,
    log: Option<BatchLog>,
    reference_node: NodeId,
}

impl BatchInserter {
    /// Inserter with no on-disk mirror
    pub fn in_memory() -> PersistenceResult<Self> {
        Self::start(GraphStore::new(), None)
    }

    /// Open an inserter on `dir`. Any existing log there is replayed first and
    /// new writes are appended after it.
    pub fn open(dir: impl AsRef<Path>) -> PersistenceResult<Self> {
        let dir = dir.as_ref();
        let store = if dir.join(LOG_FILE_NAME).exists() {
            recover(dir)?
        } else {
            GraphStore::new()
        };
        let log = BatchLog::open(dir)?;
        Self::start(store, Some(log))
    }

    fn start(store: GraphStore, log: Option<BatchLog>) -> PersistenceResult<Self> {
        let mut inserter = Self {
            store,
            log,
            reference_node: NodeId::new(0),
        };
        if inserter.store.node_count() == 0 {
            inserter.reference_node = inserter.create_node(PropertyMap::new(), Vec::new())?;
        } else {
            info!(
                "Resuming store with {} nodes and {} edges",
                inserter.store.node_count(),
                inserter.store.edge_count()
            );
        }
        Ok(inserter)
    }

    /// The designated root node catalog and root edges hang from
    pub fn root_node(&self) -> NodeId {
        self.reference_node
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn create_node(&mut self, properties: PropertyMap, labels: Vec<Label>) -> PersistenceResult<NodeId> {
        if let Some(log) = self.log.as_mut() {
            log.append(LogEntry::CreateNode {
                node_id: self.store.node_count() as u64,
                labels: labels.iter().map(|l| l.as_str().to_string()).collect(),
                properties: properties.clone(),
            })?;
        }
        Ok(self.store.create_node_with_properties(labels, properties))
    }

    pub fn create_relationship(
        &mut self,
        from: NodeId,
        to: NodeId,
        edge_type: &EdgeType,
        properties: PropertyMap,
    ) -> PersistenceResult<EdgeId> {
        // Validate before logging so the log never holds a dangling edge.
        let edge_id = self
            .store
            .create_edge_with_properties(from, to, edge_type.clone(), properties.clone())?;
        if let Some(log) = self.log.as_mut() {
            log.append(LogEntry::CreateEdge {
                edge_id: edge_id.as_u64(),
                source: from.as_u64(),
                target: to.as_u64(),
                edge_type: edge_type.as_str().to_string(),
                properties,
            })?;
        }
        Ok(edge_id)
    }

    /// Declare a uniqueness constraint that is checked later, not on insert
    pub fn create_deferred_constraint(&mut self, label: &Label, property: &str) -> PersistenceResult<()> {
        if let Some(log) = self.log.as_mut() {
            log.append(LogEntry::DeclareConstraint {
                label: label.as_str().to_string(),
                property: property.to_string(),
            })?;
        }
        self.store.create_unique_constraint(label.clone(), property);
        Ok(())
    }

    /// Flush and close the log, handing back the finished store
    pub fn shutdown(self) -> PersistenceResult<GraphStore> {
        if let Some(log) = self.log {
            let path = log.path().to_path_buf();
            let sequence = log.close()?;
            info!("Batch log {:?} closed at sequence {}", path, sequence);
        }
        info!(
            "Graph store shut down with {} nodes and {} edges",
            self.store.node_count(),
            self.store.edge_count()
        );
        Ok(self.store)
    }
}

/// Rebuild a store from the batch log in `dir`
pub fn recover(dir: impl AsRef<Path>) -> PersistenceResult<GraphStore> {
    let dir = dir.as_ref();
    info!("Starting recovery from {:?}", dir);

    let mut store = GraphStore::new();
    let mut failure: Option<GraphError> = None;

    BatchLog::replay(dir, |entry| {
        if failure.is_some() {
            return Ok(());
        }
        let applied = match entry {
            LogEntry::CreateNode {
                node_id,
                labels,
                properties,
            } => store.insert_recovered_node(Node::new_with_properties(
                NodeId::new(*node_id),
                labels.iter().map(Label::new).collect(),
                properties.clone(),
            )),
            LogEntry::CreateEdge {
                edge_id,
                source,
                target,
                edge_type,
                properties,
            } => store.insert_recovered_edge(Edge::new_with_properties(
                EdgeId::new(*edge_id),
                NodeId::new(*source),
                NodeId::new(*target),
                edge_type.as_str(),
                properties.clone(),
            )),
            LogEntry::DeclareConstraint { label, property } => {
                store.create_unique_constraint(label.as_str(), property.as_str());
                Ok(())
            }
            LogEntry::Shutdown { .. } => Ok(()),
        };
        failure = applied.err();
        Ok(())
    })?;

    if let Some(err) = failure {
        return Err(err.into());
    }

    info!(
        "Recovered {} nodes and {} edges",
        store.node_count(),
        store.edge_count()
    );
    Ok(store)
}
