//! Relational source abstraction
//!
//! Loaders only issue straight `SELECT`s built from translated names and
//! consume the rows one at a time through a visitor.

pub mod row;
pub mod sqlite;
pub mod value;

pub use row::Row;
pub use sqlite::SqliteSource;
pub use value::{SourceError, SourceResult, SqlValue};

use crate::error::MigrationResult;

/// Read-only access to the relational database being migrated
pub trait RelationalSource {
    /// Run `sql` and hand every row to `visitor`, in result order
    ///
    /// The first error returned by `visitor` stops the scan and is passed
    /// through unchanged. Returns the number of rows visited.
    fn query(&self, sql: &str, visitor: &mut dyn FnMut(&Row) -> MigrationResult<()>) -> MigrationResult<u64>;
}

/// Quote a table name for use in a `FROM` clause
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
