//! Domain metamodel
//!
//! Classes with single inheritance and typed slots, plus bidirectional
//! relations between them. Models are described in YAML and validated on load.

pub mod class;
pub mod oid;
pub mod relation;

pub use class::{DomainClass, Slot};
pub use oid::Oid;
pub use relation::{DomainRelation, Multiplicity, RelationShape, Role, RoleSide};

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read model: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Class '{0}' is declared more than once")]
    DuplicateClass(String),

    #[error("Invalid identifier '{identifier}' in {context}")]
    InvalidIdentifier { identifier: String, context: String },

    #[error("Inheritance cycle through class '{0}'")]
    InheritanceCycle(String),
}

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Deserialize)]
struct ModelDocument {
    #[serde(default)]
    classes: Vec<DomainClass>,
    #[serde(default)]
    relations: Vec<DomainRelation>,
}

/// Validated, ordered set of classes and relations
#[derive(Debug, Clone)]
pub struct DomainModel {
    classes: IndexMap<String, DomainClass>,
    relations: Vec<DomainRelation>,
}

impl DomainModel {
    /// Build a model, checking identifiers, uniqueness and acyclicity
    ///
    /// Superclass and role references to classes outside the model are
    /// accepted here; the loaders decide how to treat them.
    pub fn new(classes: Vec<DomainClass>, relations: Vec<DomainRelation>) -> ModelResult<Self> {
        let mut by_name = IndexMap::with_capacity(classes.len());
        for class in classes {
            validate_qualified(&class.full_name, "class name")?;
            for slot in &class.slots {
                validate_identifier(&slot.name, &format!("slot of {}", class.full_name))?;
            }
            if by_name.contains_key(&class.full_name) {
                return Err(ModelError::DuplicateClass(class.full_name));
            }
            by_name.insert(class.full_name.clone(), class);
        }

        for relation in &relations {
            validate_identifier(&relation.name, "relation name")?;
            for role in [&relation.first, &relation.second] {
                if let Some(name) = role.name() {
                    validate_identifier(name, &format!("role of {}", relation.name))?;
                }
            }
        }

        let model = Self {
            classes: by_name,
            relations,
        };
        model.check_acyclic()?;
        Ok(model)
    }

    pub fn from_yaml_str(yaml: &str) -> ModelResult<Self> {
        let doc: ModelDocument = serde_yaml::from_str(yaml)?;
        Self::new(doc.classes, doc.relations)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ModelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Classes in declaration order
    pub fn domain_classes(&self) -> impl Iterator<Item = &DomainClass> {
        self.classes.values()
    }

    /// Relations in declaration order
    pub fn domain_relations(&self) -> &[DomainRelation] {
        &self.relations
    }

    pub fn class(&self, full_name: &str) -> Option<&DomainClass> {
        self.classes.get(full_name)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Direct superclass, if it is a class of this model
    pub fn superclass_of(&self, class: &DomainClass) -> Option<&DomainClass> {
        class.superclass().and_then(|name| self.class(name))
    }

    /// The class itself followed by every resolvable ancestor
    pub fn ancestry<'a>(&'a self, class: &'a DomainClass) -> Ancestry<'a> {
        Ancestry {
            model: self,
            next: Some(class),
        }
    }

    fn check_acyclic(&self) -> ModelResult<()> {
        for class in self.classes.values() {
            let mut seen = HashSet::new();
            let mut current = Some(class);
            while let Some(c) = current {
                if !seen.insert(c.full_name.as_str()) {
                    return Err(ModelError::InheritanceCycle(class.full_name.clone()));
                }
                current = self.superclass_of(c);
            }
        }
        Ok(())
    }
}

/// Iterator over a class and its ancestors, nearest first
pub struct Ancestry<'a> {
    model: &'a DomainModel,
    next: Option<&'a DomainClass>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a DomainClass;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.model.superclass_of(current);
        Some(current)
    }
}

fn validate_identifier(identifier: &str, context: &str) -> ModelResult<()> {
    let mut chars = identifier.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ModelError::InvalidIdentifier {
            identifier: identifier.to_string(),
            context: context.to_string(),
        })
    }
}

fn validate_qualified(name: &str, context: &str) -> ModelResult<()> {
    for segment in name.split('.') {
        validate_identifier(segment, context).map_err(|_| ModelError::InvalidIdentifier {
            identifier: name.to_string(),
            context: context.to_string(),
        })?;
    }
    Ok(())
}
