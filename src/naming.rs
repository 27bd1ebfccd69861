//! Logical-to-physical name translation
//!
//! One fixed convention maps class, slot, role and relation names to table
//! and column names: every uppercase character after the first gets a `_` in
//! front of it, then the whole name is uppercased.

use crate::model::{DomainClass, DomainModel};

/// `personContact` -> `PERSON_CONTACT`
pub fn table_name(logical: &str) -> String {
    convert_to_db_style(logical)
}

/// `birthDate` -> `BIRTH_DATE`
pub fn column_name(field: &str) -> String {
    convert_to_db_style(field)
}

/// Column holding the OID of the object playing `role`
pub fn foreign_key_column(role: &str) -> String {
    format!("OID_{}", column_name(role))
}

/// The shared underscore/uppercase transform
pub fn convert_to_db_style(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            out.push('_');
        }
        out.extend(c.to_uppercase());
    }
    out
}

/// Table backing `class`: the one named after its root ancestor
///
/// Returns `None` when some superclass on the way up is not a class of
/// `model`.
pub fn expected_table_name(class: &DomainClass, model: &DomainModel) -> Option<String> {
    let mut current = class;
    while let Some(parent) = current.superclass() {
        current = model.class(parent)?;
    }
    Some(table_name(current.short_name()))
}
