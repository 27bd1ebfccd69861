//! Relgraph
//!
//! One-shot bulk migration of a relational object store, described by a domain
//! metamodel, into a labeled property graph.
//!
//! # Architecture
//!
//! - [`naming`]: logical names to table / column names
//! - [`model`]: classes, slots, relations and roles, loaded from YAML
//! - [`source`]: relational source trait and its SQLite implementation
//! - [`index`]: OID to node identity indexes
//! - [`graph`]: in-memory property graph with deferred unique constraints
//! - [`persistence`]: batch inserter and its replayable on-disk log
//! - [`migration`]: class catalog, object and relation loaders, orchestration
//!
//! ## Example Usage
//!
//! ```rust
//! use relgraph::{BatchInserter, DomainModel, Migrator, SqliteSource};
//!
//! let model = DomainModel::from_yaml_str(r#"
//! classes:
//!   - name: org.example.Person
//!     slots: [{ name: name, type: String }]
//! "#).unwrap();
//!
//! let source = SqliteSource::in_memory().unwrap();
//! source.execute_batch(
//!     "CREATE TABLE `FF$DOMAIN_CLASS_INFO` (DOMAIN_CLASS_NAME TEXT, DOMAIN_CLASS_ID INTEGER);
//!      INSERT INTO `FF$DOMAIN_CLASS_INFO` VALUES ('org.example.Person', 0);
//!      CREATE TABLE PERSON (OID INTEGER, NAME TEXT);
//!      INSERT INTO PERSON VALUES (1, 'Alice');",
//! ).unwrap();
//!
//! let migrator = Migrator::new(model, source, BatchInserter::in_memory().unwrap());
//! let outcome = migrator.migrate().unwrap();
//!
//! // Root node, one catalog node, one object node
//! assert_eq!(outcome.store.node_count(), 3);
//! assert_eq!(outcome.report.objects["org.example.Person"], 1);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod migration;
pub mod model;
pub mod naming;
pub mod persistence;
pub mod source;

pub use config::{ConfigError, MigrationConfig};
pub use error::{ErrorCategory, MigrationError, MigrationResult};
pub use graph::{Edge, EdgeId, EdgeType, GraphStore, Label, Node, NodeId, PropertyMap, PropertyValue};
pub use index::{IdentityIndex, IndexProvider};
pub use migration::{
    MigrationOptions, MigrationOutcome, MigrationPhase, MigrationReport, Migrator, RelationPlan,
};
pub use model::{DomainClass, DomainModel, DomainRelation, Multiplicity, Oid, Role, Slot};
pub use persistence::{recover, BatchInserter};
pub use source::{RelationalSource, Row, SqlValue, SqliteSource};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
