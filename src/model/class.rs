//! Domain classes and their slots

use serde::{Deserialize, Serialize};

/// A field declared directly on a domain class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    /// Declared type, informational only; row values carry their own type
    #[serde(rename = "type", default)]
    pub slot_type: String,
}

impl Slot {
    pub fn new(name: impl Into<String>, slot_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot_type: slot_type.into(),
        }
    }
}

/// A logical entity type with at most one direct superclass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainClass {
    /// Fully-qualified name, e.g. `org.example.Person`
    #[serde(rename = "name")]
    pub full_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,

    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl DomainClass {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            superclass: None,
            slots: Vec::new(),
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn with_slot(mut self, name: impl Into<String>, slot_type: impl Into<String>) -> Self {
        self.slots.push(Slot::new(name, slot_type));
        self
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Name without its package prefix
    pub fn short_name(&self) -> &str {
        self.full_name
            .rsplit_once('.')
            .map_or(self.full_name.as_str(), |(_, short)| short)
    }

    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}
