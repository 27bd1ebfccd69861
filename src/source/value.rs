//! Typed column values read from the relational source

use crate::graph::PropertyValue;
use crate::model::Oid;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Column {column}: unsupported {kind} value")]
    UnsupportedValue { column: String, kind: &'static str },

    #[error("No such column: {column}")]
    UnknownColumn { column: String },
}

pub type SourceResult<T> = Result<T, SourceError>;

/// One cell of a result row
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "NULL",
            SqlValue::Integer(_) => "INTEGER",
            SqlValue::Real(_) => "REAL",
            SqlValue::Text(_) => "TEXT",
            SqlValue::Boolean(_) => "BOOLEAN",
            SqlValue::Timestamp(_) => "TIMESTAMP",
            SqlValue::Blob(_) => "BLOB",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Convert to a graph property. `Null` has no property representation.
    pub fn to_property(&self, column: &str) -> SourceResult<Option<PropertyValue>> {
        let value = match self {
            SqlValue::Null => return Ok(None),
            SqlValue::Integer(i) => PropertyValue::Integer(*i),
            SqlValue::Real(f) => PropertyValue::Float(*f),
            SqlValue::Text(s) => PropertyValue::String(s.clone()),
            SqlValue::Boolean(b) => PropertyValue::Boolean(*b),
            SqlValue::Timestamp(ts) => PropertyValue::Integer(ts.timestamp_millis()),
            SqlValue::Blob(_) => {
                return Err(SourceError::UnsupportedValue {
                    column: column.to_string(),
                    kind: self.kind(),
                })
            }
        };
        Ok(Some(value))
    }

    /// Read an object identifier; `Null` yields `None`
    pub fn to_oid(&self, column: &str) -> SourceResult<Option<Oid>> {
        match self {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(i) => Ok(Some(Oid::new(*i))),
            other => Err(SourceError::TypeMismatch {
                column: column.to_string(),
                expected: "INTEGER",
                found: other.kind(),
            }),
        }
    }

    pub fn to_i64(&self, column: &str) -> SourceResult<i64> {
        match self {
            SqlValue::Integer(i) => Ok(*i),
            other => Err(SourceError::TypeMismatch {
                column: column.to_string(),
                expected: "INTEGER",
                found: other.kind(),
            }),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(s) => write!(f, "'{}'", s),
            SqlValue::Boolean(b) => write!(f, "{}", b),
            SqlValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            SqlValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}
