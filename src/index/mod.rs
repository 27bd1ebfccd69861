//! Identity indexing
//!
//! Exact-match OID → node lookups built during object loading and read during
//! relation loading.

pub mod identity;
pub mod provider;

pub use identity::{IdentityIndex, IndexError, IndexResult};
pub use provider::{IndexProvider, IndexSummary, GLOBAL_INDEX};
