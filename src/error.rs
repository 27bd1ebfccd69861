//! Migration errors and their categories

use crate::graph::GraphError;
use crate::index::IndexError;
use crate::model::{ModelError, Oid};
use crate::persistence::PersistenceError;
use crate::source::SourceError;
use std::fmt;
use thiserror::Error;

/// Broad classes of migration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The metamodel disagrees with itself or with the catalog
    MetadataInconsistency,
    /// Rows disagree with the metamodel or with each other
    SourceDataInconsistency,
    /// A required object is absent
    PreconditionViolation,
    /// A collaborator (database driver, graph store) failed
    Collaborator,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::MetadataInconsistency => "metadata inconsistency",
            ErrorCategory::SourceDataInconsistency => "source data inconsistency",
            ErrorCategory::PreconditionViolation => "precondition violation",
            ErrorCategory::Collaborator => "collaborator failure",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Invalid domain model: {0}")]
    Model(#[from] ModelError),

    #[error("No row for class '{class}' in catalog table {table}")]
    MissingClassMetadata { class: String, table: String },

    #[error("Relation '{relation}': class '{class}' has a superclass outside the domain model")]
    UnknownSuperclass { relation: String, class: String },

    #[error("Relation '{relation}': role type '{class}' is not a domain class")]
    UnknownRoleType { relation: String, class: String },

    #[error("Relation '{relation}': join columns collide on '{column}' and the role names cannot separate them")]
    AmbiguousJoinColumns { relation: String, column: String },

    #[error("Relation '{relation}': foreign key role has no name")]
    AnonymousForeignKeyRole { relation: String },

    #[error("Relation '{relation}': OID {oid} does not identify a loaded object")]
    UnresolvedOid { relation: String, oid: Oid },

    #[error("Table {table} has no column {column}")]
    MissingColumn { table: String, column: String },

    #[error("Duplicate object: {0}")]
    DuplicateOid(#[from] IndexError),

    #[error("Domain root object with OID {oid} was not loaded")]
    MissingDomainRoot { oid: i64 },

    #[error("Relational source error: {0}")]
    Source(#[from] SourceError),

    #[error("Graph store error: {0}")]
    Graph(#[from] GraphError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl MigrationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MigrationError::Model(_)
            | MigrationError::MissingClassMetadata { .. }
            | MigrationError::UnknownSuperclass { .. }
            | MigrationError::UnknownRoleType { .. }
            | MigrationError::AmbiguousJoinColumns { .. }
            | MigrationError::AnonymousForeignKeyRole { .. } => ErrorCategory::MetadataInconsistency,

            MigrationError::UnresolvedOid { .. }
            | MigrationError::MissingColumn { .. }
            | MigrationError::DuplicateOid(_) => ErrorCategory::SourceDataInconsistency,

            MigrationError::Source(SourceError::Sqlite(_)) => ErrorCategory::Collaborator,
            MigrationError::Source(_) => ErrorCategory::SourceDataInconsistency,

            MigrationError::MissingDomainRoot { .. } => ErrorCategory::PreconditionViolation,

            MigrationError::Graph(_) | MigrationError::Persistence(_) => ErrorCategory::Collaborator,
        }
    }

    /// Attribute a column the source rejected to `table`
    pub fn in_table(self, table: &str) -> Self {
        match self {
            MigrationError::Source(SourceError::UnknownColumn { column }) => MigrationError::MissingColumn {
                table: table.to_string(),
                column,
            },
            other => other,
        }
    }
}

pub type MigrationResult<T> = Result<T, MigrationError>;
