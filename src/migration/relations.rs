//! Relation loading
//!
//! Each relation is first planned (shape, table, columns, direction) from the
//! metamodel alone, then the planned table is scanned and every row becomes
//! one edge between already-loaded object nodes.

use super::objects::OID_COLUMN;
use crate::error::{MigrationError, MigrationResult};
use crate::graph::{EdgeType, NodeId, PropertyMap};
use crate::index::IndexProvider;
use crate::model::{DomainClass, DomainModel, DomainRelation, Oid, RelationShape, RoleSide};
use crate::naming::{convert_to_db_style, expected_table_name, foreign_key_column, table_name};
use crate::persistence::BatchInserter;
use crate::source::{quote_identifier, RelationalSource, Row, SourceError};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

/// Where the pairs of a relation are stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JoinStrategy {
    /// A dedicated table with one row per pair
    JoinTable,
    /// A nullable column on the rows of one side
    ForeignKey { column: String },
}

/// How a relation will be read, resolved without touching data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationPlan {
    pub relation: String,
    pub shape: RelationShape,
    pub strategy: JoinStrategy,
    pub table: String,
    /// Column holding the OID of each edge's source
    pub source_column: String,
    /// Column holding the OID of each edge's target
    pub target_column: String,
}

impl RelationPlan {
    pub fn sql(&self) -> String {
        match &self.strategy {
            JoinStrategy::JoinTable => format!("SELECT * FROM {}", quote_identifier(&self.table)),
            JoinStrategy::ForeignKey { column } => format!(
                "SELECT {}, {} FROM {} WHERE {} IS NOT NULL",
                OID_COLUMN,
                column,
                quote_identifier(&self.table),
                column
            ),
        }
    }
}

/// Classify `relation` and resolve its table and columns
pub fn plan_relation(relation: &DomainRelation, model: &DomainModel) -> MigrationResult<RelationPlan> {
    let first = role_class(relation, RoleSide::First, model)?;
    let second = role_class(relation, RoleSide::Second, model)?;

    let shape = relation.shape();
    match shape {
        RelationShape::ManyToMany => {
            let (source_column, target_column) = join_columns(relation, first, second)?;
            Ok(RelationPlan {
                relation: relation.name().to_string(),
                shape,
                strategy: JoinStrategy::JoinTable,
                table: table_name(relation.name()),
                source_column,
                target_column,
            })
        }
        RelationShape::OneToOne | RelationShape::OneToMany => {
            let picked = if shape == RelationShape::OneToOne {
                if relation.first.name().is_none() {
                    RoleSide::First
                } else {
                    RoleSide::Second
                }
            } else if relation.first.is_many() {
                RoleSide::Second
            } else {
                RoleSide::First
            };
            foreign_key_plan(relation, shape, picked, model)
        }
    }
}

/// Plan every relation of `model`, in model order
pub fn plan_relations(model: &DomainModel) -> MigrationResult<Vec<RelationPlan>> {
    model
        .domain_relations()
        .iter()
        .map(|relation| plan_relation(relation, model))
        .collect()
}

fn role_class<'m>(
    relation: &DomainRelation,
    side: RoleSide,
    model: &'m DomainModel,
) -> MigrationResult<&'m DomainClass> {
    let role = relation.role(side);
    model.class(&role.class).ok_or_else(|| MigrationError::UnknownRoleType {
        relation: relation.name().to_string(),
        class: role.class.clone(),
    })
}

fn join_columns(
    relation: &DomainRelation,
    first: &DomainClass,
    second: &DomainClass,
) -> MigrationResult<(String, String)> {
    let first_column = foreign_key_column(first.short_name());
    let second_column = foreign_key_column(second.short_name());
    if first_column != second_column {
        return Ok((first_column, second_column));
    }

    let ambiguous = || MigrationError::AmbiguousJoinColumns {
        relation: relation.name().to_string(),
        column: first_column.clone(),
    };
    let (Some(first_role), Some(second_role)) = (relation.first.name(), relation.second.name()) else {
        return Err(ambiguous());
    };
    let first_suffixed = format!("{}_{}", first_column, convert_to_db_style(first_role));
    let second_suffixed = format!("{}_{}", second_column, convert_to_db_style(second_role));
    if first_suffixed == second_suffixed {
        return Err(ambiguous());
    }
    Ok((first_suffixed, second_suffixed))
}

fn foreign_key_plan(
    relation: &DomainRelation,
    shape: RelationShape,
    picked: RoleSide,
    model: &DomainModel,
) -> MigrationResult<RelationPlan> {
    let picked_class = role_class(relation, picked, model)?;
    let table = expected_table_name(picked_class, model).ok_or_else(|| MigrationError::UnknownSuperclass {
        relation: relation.name().to_string(),
        class: picked_class.full_name().to_string(),
    })?;
    let other_name = relation
        .other(picked)
        .name()
        .ok_or_else(|| MigrationError::AnonymousForeignKeyRole {
            relation: relation.name().to_string(),
        })?;
    let column = foreign_key_column(other_name);

    // Rows of the picked side's table point at the other side.
    let (source_column, target_column) = match picked {
        RoleSide::Second => (OID_COLUMN.to_string(), column.clone()),
        RoleSide::First => (column.clone(), OID_COLUMN.to_string()),
    };

    Ok(RelationPlan {
        relation: relation.name().to_string(),
        shape,
        strategy: JoinStrategy::ForeignKey { column },
        table,
        source_column,
        target_column,
    })
}

/// Create the edges of every relation
///
/// Returns the number of edges created per relation, in model order.
pub fn load_relations(
    model: &DomainModel,
    source: &dyn RelationalSource,
    index: &IndexProvider,
    inserter: &mut BatchInserter,
) -> MigrationResult<IndexMap<String, u64>> {
    let mut counts = IndexMap::new();
    for relation in model.domain_relations() {
        let plan = plan_relation(relation, model)?;
        debug!(
            "Relation {} ({}) from {}: {} -> {}",
            plan.relation, plan.shape, plan.table, plan.source_column, plan.target_column
        );
        let count = load_relation(&plan, source, index, inserter)?;
        info!("Created {} edges for relation {}", count, plan.relation);
        *counts.entry(plan.relation).or_insert(0) += count;
    }
    Ok(counts)
}

fn load_relation(
    plan: &RelationPlan,
    source: &dyn RelationalSource,
    index: &IndexProvider,
    inserter: &mut BatchInserter,
) -> MigrationResult<u64> {
    let edge_type = EdgeType::new(plan.relation.as_str());
    source.query(&plan.sql(), &mut |row| {
        let from = resolve(plan, row, &plan.source_column, index)?;
        let to = resolve(plan, row, &plan.target_column, index)?;
        inserter.create_relationship(from, to, &edge_type, PropertyMap::new())?;
        Ok(())
    })
    .map_err(|e| e.in_table(&plan.table))
}

fn resolve(plan: &RelationPlan, row: &Row, column: &str, index: &IndexProvider) -> MigrationResult<NodeId> {
    let value = row.get(column).ok_or_else(|| MigrationError::MissingColumn {
        table: plan.table.clone(),
        column: column.to_string(),
    })?;
    let oid: Oid = value.to_oid(column)?.ok_or_else(|| SourceError::TypeMismatch {
        column: column.to_string(),
        expected: "INTEGER",
        found: "NULL",
    })?;
    index.lookup(oid).ok_or_else(|| MigrationError::UnresolvedOid {
        relation: plan.relation.clone(),
        oid,
    })
}
