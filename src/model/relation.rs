//! Bidirectional relations between domain classes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of a role's multiplicity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    #[serde(alias = "1")]
    One,
    #[serde(alias = "*")]
    Many,
}

/// Which end of a relation a role sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSide {
    First,
    Second,
}

impl RoleSide {
    pub fn opposite(self) -> Self {
        match self {
            RoleSide::First => RoleSide::Second,
            RoleSide::Second => RoleSide::First,
        }
    }
}

/// One end of a relation
///
/// `multiplicity` is how many counterpart objects one instance of `class`
/// links to through this relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Fully-qualified name of the class playing this role
    #[serde(rename = "type")]
    pub class: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub multiplicity: Multiplicity,
}

impl Role {
    pub fn new(class: impl Into<String>, multiplicity: Multiplicity) -> Self {
        Self {
            class: class.into(),
            name: None,
            multiplicity,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_many(&self) -> bool {
        self.multiplicity == Multiplicity::Many
    }
}

/// Cardinality shape of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelationShape {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl fmt::Display for RelationShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            RelationShape::OneToOne => "one-to-one",
            RelationShape::OneToMany => "one-to-many",
            RelationShape::ManyToMany => "many-to-many",
        })
    }
}

/// A named association between exactly two roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRelation {
    pub name: String,
    pub first: Role,
    pub second: Role,
}

impl DomainRelation {
    pub fn new(name: impl Into<String>, first: Role, second: Role) -> Self {
        Self {
            name: name.into(),
            first,
            second,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self, side: RoleSide) -> &Role {
        match side {
            RoleSide::First => &self.first,
            RoleSide::Second => &self.second,
        }
    }

    /// The role paired with the one on `side`
    pub fn other(&self, side: RoleSide) -> &Role {
        self.role(side.opposite())
    }

    pub fn shape(&self) -> RelationShape {
        match (self.first.is_many(), self.second.is_many()) {
            (true, true) => RelationShape::ManyToMany,
            (false, false) => RelationShape::OneToOne,
            _ => RelationShape::OneToMany,
        }
    }
}
