//! Exact-match OID index
//!
//! Maps each object identifier to the graph node created for it. Entries are
//! append-only and an OID may be registered at most once.

use crate::graph::NodeId;
use crate::model::Oid;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum IndexError {
    #[error("OID {oid} already registered in index '{index}' (node {existing})")]
    DuplicateOid {
        index: String,
        oid: Oid,
        existing: NodeId,
    },
}

pub type IndexResult<T> = Result<T, IndexError>;

/// Index over one key space (the global one, or a single class)
#[derive(Debug, Clone)]
pub struct IdentityIndex {
    name: String,
    entries: BTreeMap<Oid, NodeId>,
}

impl IdentityIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, oid: Oid, node: NodeId) -> IndexResult<()> {
        if let Some(&existing) = self.entries.get(&oid) {
            return Err(IndexError::DuplicateOid {
                index: self.name.clone(),
                oid,
                existing,
            });
        }
        self.entries.insert(oid, node);
        Ok(())
    }

    pub fn get(&self, oid: Oid) -> Option<NodeId> {
        self.entries.get(&oid).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending OID order
    pub fn iter(&self) -> impl Iterator<Item = (Oid, NodeId)> + '_ {
        self.entries.iter().map(|(&oid, &node)| (oid, node))
    }
}
