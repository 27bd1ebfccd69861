//! Catalog nodes for the class hierarchy

use super::catalog::ClassCatalog;
use super::{CLASS_ID_PROPERTY, DOMAIN_CLASS_EDGE, DOMAIN_CLASS_LABEL, DOMAIN_CLASS_PROPERTY};
use crate::error::MigrationResult;
use crate::graph::{EdgeType, Label, PropertyMap, PropertyValue};
use crate::persistence::BatchInserter;
use tracing::{debug, info};

/// Create one catalog node per class and hang it off the root node
///
/// Returns the number of catalog nodes created.
pub fn load_class_hierarchy(catalog: &ClassCatalog, inserter: &mut BatchInserter) -> MigrationResult<usize> {
    let label = Label::new(DOMAIN_CLASS_LABEL);
    let edge_type = EdgeType::new(DOMAIN_CLASS_EDGE);
    let root = inserter.root_node();

    for (class_name, class_id) in catalog.iter() {
        let mut properties = PropertyMap::new();
        properties.insert(DOMAIN_CLASS_PROPERTY.to_string(), PropertyValue::from(class_name));
        properties.insert(CLASS_ID_PROPERTY.to_string(), PropertyValue::Integer(class_id as i64));

        let node = inserter.create_node(properties, vec![label.clone()])?;
        inserter.create_relationship(root, node, &edge_type, PropertyMap::new())?;
        debug!("Catalog node {} for {} (id {})", node, class_name, class_id);
    }

    info!("Loaded {} domain classes", catalog.len());
    Ok(catalog.len())
}
