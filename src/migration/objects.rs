//! Object loading
//!
//! One graph node per row of each class, with inherited slots flattened into
//! the node's properties and every node registered in the identity index.

use super::catalog::ClassCatalog;
use super::OID_PROPERTY;
use crate::error::{MigrationError, MigrationResult};
use crate::graph::{Label, PropertyMap, PropertyValue};
use crate::index::IndexProvider;
use crate::model::{DomainClass, DomainModel, Oid};
use crate::naming::{column_name, expected_table_name};
use crate::persistence::BatchInserter;
use crate::source::{quote_identifier, RelationalSource, Row, SourceError};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

pub const OID_COLUMN: &str = "OID";

/// Load the rows of every class
///
/// Returns the number of objects imported per class, in model order. Classes
/// whose table cannot be resolved are skipped and absent from the result.
pub fn load_objects(
    model: &DomainModel,
    catalog: &ClassCatalog,
    source: &dyn RelationalSource,
    inserter: &mut BatchInserter,
    index: &mut IndexProvider,
) -> MigrationResult<IndexMap<String, u64>> {
    let mut counts = IndexMap::new();
    for class in model.domain_classes() {
        index.node_index(class.full_name());

        let Some(table) = expected_table_name(class, model) else {
            warn!(
                "Skipping {}: superclass chain leaves the domain model",
                class.full_name()
            );
            continue;
        };
        let class_id = catalog
            .class_id(class.full_name())
            .ok_or_else(|| MigrationError::MissingClassMetadata {
                class: class.full_name().to_string(),
                table: catalog.table().to_string(),
            })?;

        let count = load_class(model, class, class_id, &table, source, inserter, index)?;
        info!("Imported {} objects of {}", count, class.full_name());
        counts.insert(class.full_name().to_string(), count);
    }
    Ok(counts)
}

fn load_class(
    model: &DomainModel,
    class: &DomainClass,
    class_id: i32,
    table: &str,
    source: &dyn RelationalSource,
    inserter: &mut BatchInserter,
    index: &mut IndexProvider,
) -> MigrationResult<u64> {
    let sql = format!(
        "SELECT * FROM {} WHERE {} >> 32 = {}",
        quote_identifier(table),
        OID_COLUMN,
        class_id
    );
    let label = Label::for_class(class.full_name());

    source.query(&sql, &mut |row| {
        let oid = row_oid(row, table)?;
        let mut properties = flatten_slots(model, class, row, table)?;
        properties.insert(OID_PROPERTY.to_string(), PropertyValue::Integer(oid.as_i64()));

        let node = inserter.create_node(properties, vec![label.clone()])?;
        index.register(class.full_name(), oid, node)?;
        debug!("Object {} -> {}", oid, node);
        Ok(())
    })
    .map_err(|e| e.in_table(table))
}

/// Read every slot of `class` and its ancestors from `row`
fn flatten_slots(model: &DomainModel, class: &DomainClass, row: &Row, table: &str) -> MigrationResult<PropertyMap> {
    let mut properties = PropertyMap::new();
    for ancestor in model.ancestry(class) {
        for slot in ancestor.slots() {
            let column = column_name(&slot.name);
            let value = row.get(&column).ok_or_else(|| MigrationError::MissingColumn {
                table: table.to_string(),
                column: column.clone(),
            })?;
            if let Some(property) = value.to_property(&column)? {
                properties.insert(slot.name.clone(), property);
            }
        }
    }
    Ok(properties)
}

fn row_oid(row: &Row, table: &str) -> MigrationResult<Oid> {
    let value = row.get(OID_COLUMN).ok_or_else(|| MigrationError::MissingColumn {
        table: table.to_string(),
        column: OID_COLUMN.to_string(),
    })?;
    value.to_oid(OID_COLUMN)?.ok_or_else(|| {
        SourceError::TypeMismatch {
            column: OID_COLUMN.to_string(),
            expected: "INTEGER",
            found: "NULL",
        }
        .into()
    })
}
