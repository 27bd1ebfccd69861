//! Class-identifier catalog
//!
//! Every concrete class has a numeric id recorded in the catalog table; it is
//! also the high half of every OID of that class.

use crate::error::{MigrationError, MigrationResult};
use crate::model::DomainModel;
use crate::source::{quote_identifier, quote_literal, RelationalSource, SourceError};
use indexmap::IndexMap;
use tracing::{debug, warn};

pub const DEFAULT_CATALOG_TABLE: &str = "FF$DOMAIN_CLASS_INFO";
pub const CLASS_NAME_COLUMN: &str = "DOMAIN_CLASS_NAME";
pub const CLASS_ID_COLUMN: &str = "DOMAIN_CLASS_ID";

/// Class ids for every class of a model, in model order
#[derive(Debug, Clone)]
pub struct ClassCatalog {
    table: String,
    ids: IndexMap<String, i32>,
}

impl ClassCatalog {
    /// Look up every class of `model` in `table`
    ///
    /// A class without a catalog row is fatal.
    pub fn load(model: &DomainModel, source: &dyn RelationalSource, table: &str) -> MigrationResult<Self> {
        let mut ids = IndexMap::with_capacity(model.class_count());
        for class in model.domain_classes() {
            let id = lookup_class_id(source, table, class.full_name())?;
            debug!("Class {} has id {}", class.full_name(), id);
            ids.insert(class.full_name().to_string(), id);
        }
        Ok(Self {
            table: table.to_string(),
            ids,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn class_id(&self, class_name: &str) -> Option<i32> {
        self.ids.get(class_name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.ids.iter().map(|(name, &id)| (name.as_str(), id))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn lookup_class_id(source: &dyn RelationalSource, table: &str, class_name: &str) -> MigrationResult<i32> {
    let sql = format!(
        "SELECT * FROM {} WHERE {} = {}",
        quote_identifier(table),
        CLASS_NAME_COLUMN,
        quote_literal(class_name)
    );

    let mut found: Option<i32> = None;
    source.query(&sql, &mut |row| {
        let value = row.get(CLASS_ID_COLUMN).ok_or_else(|| MigrationError::MissingColumn {
            table: table.to_string(),
            column: CLASS_ID_COLUMN.to_string(),
        })?;
        let raw = value.to_i64(CLASS_ID_COLUMN)?;
        let id = i32::try_from(raw).map_err(|_| SourceError::TypeMismatch {
            column: CLASS_ID_COLUMN.to_string(),
            expected: "32-bit INTEGER",
            found: "64-bit INTEGER",
        })?;
        match found {
            None => found = Some(id),
            Some(first) => warn!(
                "Class {} has several catalog rows, keeping id {} and ignoring {}",
                class_name, first, id
            ),
        }
        Ok(())
    })
    .map_err(|e| e.in_table(table))?;

    found.ok_or_else(|| MigrationError::MissingClassMetadata {
        class: class_name.to_string(),
        table: table.to_string(),
    })
}
