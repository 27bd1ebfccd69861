//! SQLite-backed relational source

use super::row::Row;
use super::value::{SourceError, SourceResult, SqlValue};
use super::RelationalSource;
use crate::error::MigrationResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// How a column's declared type asks for its values to be read
#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Plain,
    Temporal,
    Boolean,
}

impl ColumnKind {
    fn from_decl_type(decl: Option<&str>) -> Self {
        let Some(decl) = decl else {
            return ColumnKind::Plain;
        };
        let decl = decl.to_ascii_uppercase();
        // Bare TIME holds a time of day, not an instant.
        if decl.contains("DATE") || decl.contains("TIMESTAMP") {
            ColumnKind::Temporal
        } else if decl.contains("BOOL") {
            ColumnKind::Boolean
        } else {
            ColumnKind::Plain
        }
    }
}

/// Relational source over a SQLite database
///
/// Columns declared `DATE`, `DATETIME` or `TIMESTAMP` are decoded as
/// timestamps: integers as epoch milliseconds, text as RFC 3339,
/// `YYYY-MM-DD HH:MM:SS[.fff]` or `YYYY-MM-DD` (all UTC). Values that do not
/// read as an instant are kept as they are. `BOOL*` columns holding integers
/// become booleans.
pub struct SqliteSource {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteSource {
    /// Open an existing database read-only
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        info!("Opened relational source {:?}", path);
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    pub fn in_memory() -> SourceResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run one or more statements that return no rows
    pub fn execute_batch(&self, sql: &str) -> SourceResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn decode(column: &str, kind: ColumnKind, value: ValueRef<'_>) -> SqlValue {
        match (kind, value) {
            (_, ValueRef::Null) => SqlValue::Null,
            (ColumnKind::Temporal, ValueRef::Integer(millis)) => match Utc.timestamp_millis_opt(millis).single() {
                Some(ts) => SqlValue::Timestamp(ts),
                None => SqlValue::Integer(millis),
            },
            (ColumnKind::Temporal, ValueRef::Text(bytes)) => {
                let text = String::from_utf8_lossy(bytes);
                match parse_timestamp(&text) {
                    Some(ts) => SqlValue::Timestamp(ts),
                    None => {
                        debug!("Column {}: '{}' is not a timestamp, keeping text", column, text);
                        SqlValue::Text(text.into_owned())
                    }
                }
            }
            (ColumnKind::Boolean, ValueRef::Integer(i)) => SqlValue::Boolean(i != 0),
            (_, ValueRef::Integer(i)) => SqlValue::Integer(i),
            (_, ValueRef::Real(f)) => SqlValue::Real(f),
            (_, ValueRef::Text(bytes)) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            (_, ValueRef::Blob(bytes)) => SqlValue::Blob(bytes.to_vec()),
        }
    }
}

/// Statement errors naming an unknown column become `UnknownColumn`
fn prepare_error(err: rusqlite::Error) -> SourceError {
    if let rusqlite::Error::SqliteFailure(_, Some(message)) = &err {
        if let Some(column) = message.strip_prefix("no such column: ") {
            return SourceError::UnknownColumn {
                column: column.to_string(),
            };
        }
    }
    SourceError::Sqlite(err)
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl RelationalSource for SqliteSource {
    fn query(&self, sql: &str, visitor: &mut dyn FnMut(&Row) -> MigrationResult<()>) -> MigrationResult<u64> {
        debug!("Executing: {}", sql);
        let mut stmt = self.conn.prepare(sql).map_err(prepare_error)?;

        let kinds: Vec<ColumnKind> = stmt
            .columns()
            .iter()
            .map(|c| ColumnKind::from_decl_type(c.decl_type()))
            .collect();
        let names: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
            .into();

        let mut rows = stmt.query([]).map_err(SourceError::from)?;
        let mut count = 0u64;
        while let Some(raw) = rows.next().map_err(SourceError::from)? {
            let mut values = Vec::with_capacity(names.len());
            for (i, (name, kind)) in names.iter().zip(&kinds).enumerate() {
                let value = raw.get_ref(i).map_err(SourceError::from)?;
                values.push(Self::decode(name, *kind, value));
            }
            visitor(&Row::new(Arc::clone(&names), values))?;
            count += 1;
        }
        Ok(count)
    }
}
