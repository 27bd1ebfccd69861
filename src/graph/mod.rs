//! Property graph data model
//!
//! Labeled nodes, typed directed edges, scalar properties and deferred
//! uniqueness constraints, held in memory for the duration of a load.

pub mod edge;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use store::{
    ConstraintViolation, GraphError, GraphResult, GraphStatistics, GraphStore, UniqueConstraint,
};
pub use types::{EdgeId, EdgeType, Label, NodeId};
