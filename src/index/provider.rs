//! Owner of the global and per-class identity indexes

use super::identity::{IdentityIndex, IndexResult};
use crate::graph::NodeId;
use crate::model::Oid;
use indexmap::IndexMap;
use tracing::{debug, info};

/// Name of the index that spans every class
pub const GLOBAL_INDEX: &str = "oid";

/// Summary returned when the provider is shut down
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSummary {
    pub global_entries: usize,
    pub class_entries: IndexMap<String, usize>,
}

/// Identity indexes for one migration run
///
/// The provider is the only writer: [`IndexProvider::register`] inserts into the
/// class index and the global index together, so the two never disagree.
#[derive(Debug)]
pub struct IndexProvider {
    global: IdentityIndex,
    per_class: IndexMap<String, IdentityIndex>,
}

impl IndexProvider {
    pub fn new() -> Self {
        Self {
            global: IdentityIndex::new(GLOBAL_INDEX),
            per_class: IndexMap::new(),
        }
    }

    /// Create (or fetch) the index for a class
    pub fn node_index(&mut self, class_name: &str) -> &IdentityIndex {
        self.per_class
            .entry(class_name.to_string())
            .or_insert_with(|| IdentityIndex::new(class_name))
    }

    /// Register a freshly created object node
    pub fn register(&mut self, class_name: &str, oid: Oid, node: NodeId) -> IndexResult<()> {
        // Global first: a duplicate across classes must leave both indexes untouched.
        self.global.add(oid, node)?;
        let class_index = self
            .per_class
            .entry(class_name.to_string())
            .or_insert_with(|| IdentityIndex::new(class_name));
        class_index.add(oid, node)
    }

    /// Exact-match lookup in the global index
    pub fn lookup(&self, oid: Oid) -> Option<NodeId> {
        self.global.get(oid)
    }

    pub fn global(&self) -> &IdentityIndex {
        &self.global
    }

    pub fn class_index(&self, class_name: &str) -> Option<&IdentityIndex> {
        self.per_class.get(class_name)
    }

    /// Release the indexes, returning their sizes
    pub fn shutdown(self) -> IndexSummary {
        let summary = IndexSummary {
            global_entries: self.global.len(),
            class_entries: self
                .per_class
                .iter()
                .map(|(name, index)| (name.clone(), index.len()))
                .collect(),
        };
        for (name, entries) in &summary.class_entries {
            debug!("Index {} closed with {} entries", name, entries);
        }
        info!("Identity index closed with {} entries", summary.global_entries);
        summary
    }
}

impl Default for IndexProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexError;

    #[test]
    fn test_register_updates_both_indexes() {
        let mut provider = IndexProvider::new();
        provider.node_index("a.Person");
        provider.register("a.Person", Oid::new(1), NodeId::new(5)).unwrap();

        assert_eq!(provider.lookup(Oid::new(1)), Some(NodeId::new(5)));
        assert_eq!(
            provider.class_index("a.Person").unwrap().get(Oid::new(1)),
            Some(NodeId::new(5))
        );
    }

    #[test]
    fn test_duplicate_across_classes_rejected() {
        let mut provider = IndexProvider::new();
        provider.register("a.Person", Oid::new(1), NodeId::new(5)).unwrap();

        let err = provider.register("a.Pet", Oid::new(1), NodeId::new(6)).unwrap_err();
        assert!(matches!(err, IndexError::DuplicateOid { .. }));
        assert!(provider.class_index("a.Pet").is_none());
        assert_eq!(provider.lookup(Oid::new(1)), Some(NodeId::new(5)));
    }

    #[test]
    fn test_shutdown_summary() {
        let mut provider = IndexProvider::new();
        provider.node_index("a.Empty");
        provider.register("a.Person", Oid::new(1), NodeId::new(1)).unwrap();
        provider.register("a.Person", Oid::new(2), NodeId::new(2)).unwrap();

        let summary = provider.shutdown();
        assert_eq!(summary.global_entries, 2);
        assert_eq!(summary.class_entries.get("a.Person"), Some(&2));
        assert_eq!(summary.class_entries.get("a.Empty"), Some(&0));
    }
}
