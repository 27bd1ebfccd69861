//! Migration orchestration
//!
//! A [`Migrator`] runs one linear, fail-fast pass over the source:
//!
//! ```text
//! Init -> SchemaSetup -> HierarchyLoaded -> ObjectsLoaded
//!      -> RelationsLoaded -> RootLinked -> Finalized
//! ```
//!
//! Any failure stops the run where it is; whatever was already written stays
//! in the output store.

pub mod catalog;
pub mod hierarchy;
pub mod objects;
pub mod relations;

pub use catalog::{ClassCatalog, DEFAULT_CATALOG_TABLE};
pub use hierarchy::load_class_hierarchy;
pub use objects::load_objects;
pub use relations::{load_relations, plan_relation, plan_relations, JoinStrategy, RelationPlan};

use crate::error::{MigrationError, MigrationResult};
use crate::graph::{EdgeType, GraphStore, Label, PropertyMap};
use crate::index::{IndexProvider, IndexSummary};
use crate::model::{DomainModel, Oid};
use crate::persistence::BatchInserter;
use crate::source::RelationalSource;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use tracing::{error, info};

/// Label of catalog nodes
pub const DOMAIN_CLASS_LABEL: &str = "FF_DOMAIN_CLASS";
/// Catalog node property holding the full class name
pub const DOMAIN_CLASS_PROPERTY: &str = "domainClass";
/// Catalog node property holding the class id
pub const CLASS_ID_PROPERTY: &str = "classId";
/// Root -> catalog node
pub const DOMAIN_CLASS_EDGE: &str = "DOMAIN_CLASS";
/// Root -> domain root object
pub const DOMAIN_ROOT_EDGE: &str = "DOMAIN_ROOT";
/// Object node property holding the OID
pub const OID_PROPERTY: &str = "oid";

pub const DEFAULT_ROOT_OID: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationPhase {
    Init,
    SchemaSetup,
    HierarchyLoaded,
    ObjectsLoaded,
    RelationsLoaded,
    RootLinked,
    Finalized,
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationPhase::Init => "INIT",
            MigrationPhase::SchemaSetup => "SCHEMA_SETUP",
            MigrationPhase::HierarchyLoaded => "HIERARCHY_LOADED",
            MigrationPhase::ObjectsLoaded => "OBJECTS_LOADED",
            MigrationPhase::RelationsLoaded => "RELATIONS_LOADED",
            MigrationPhase::RootLinked => "ROOT_LINKED",
            MigrationPhase::Finalized => "FINALIZED",
        };
        f.write_str(name)
    }
}

/// Run options that do not come from the model
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOptions {
    pub catalog_table: String,
    pub root_oid: i64,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            catalog_table: DEFAULT_CATALOG_TABLE.to_string(),
            root_oid: DEFAULT_ROOT_OID,
        }
    }
}

/// What a run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub phase: Option<MigrationPhase>,
    pub catalog_nodes: usize,
    /// Objects imported per class
    pub objects: IndexMap<String, u64>,
    /// Edges created per relation
    pub relations: IndexMap<String, u64>,
    #[serde(skip)]
    pub index: IndexSummary,
}

impl MigrationReport {
    pub fn total_objects(&self) -> u64 {
        self.objects.values().sum()
    }

    pub fn total_edges(&self) -> u64 {
        self.relations.values().sum()
    }
}

/// A finished run: the report and the populated store
#[derive(Debug)]
pub struct MigrationOutcome {
    pub report: MigrationReport,
    pub store: GraphStore,
}

/// One migration run over a source and an output store
pub struct Migrator<S: RelationalSource> {
    model: DomainModel,
    source: S,
    inserter: BatchInserter,
    index: IndexProvider,
    options: MigrationOptions,
    phase: MigrationPhase,
    report: MigrationReport,
}

impl<S: RelationalSource> Migrator<S> {
    pub fn new(model: DomainModel, source: S, inserter: BatchInserter) -> Self {
        Self::with_options(model, source, inserter, MigrationOptions::default())
    }

    pub fn with_options(model: DomainModel, source: S, inserter: BatchInserter, options: MigrationOptions) -> Self {
        Self {
            model,
            source,
            inserter,
            index: IndexProvider::new(),
            options,
            phase: MigrationPhase::Init,
            report: MigrationReport::default(),
        }
    }

    pub fn phase(&self) -> MigrationPhase {
        self.phase
    }

    /// Run every phase in order
    ///
    /// On failure the phase reached is logged and the error returned as is.
    pub fn migrate(mut self) -> MigrationResult<MigrationOutcome> {
        info!(
            "Migrating {} classes and {} relations",
            self.model.class_count(),
            self.model.domain_relations().len()
        );
        if let Err(e) = self.load() {
            error!(
                "Migration failed after phase {} ({}): {}",
                self.phase,
                e.category(),
                e
            );
            return Err(e);
        }

        let phase = self.phase;
        match self.finalize() {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Migration failed after phase {} ({}): {}", phase, e.category(), e);
                Err(e)
            }
        }
    }

    fn advance(&mut self, phase: MigrationPhase) {
        self.phase = phase;
        info!("Migration phase {}", phase);
    }

    fn load(&mut self) -> MigrationResult<()> {
        self.inserter
            .create_deferred_constraint(&Label::new(DOMAIN_CLASS_LABEL), DOMAIN_CLASS_PROPERTY)?;
        self.advance(MigrationPhase::SchemaSetup);

        let catalog = ClassCatalog::load(&self.model, &self.source, &self.options.catalog_table)?;
        self.report.catalog_nodes = load_class_hierarchy(&catalog, &mut self.inserter)?;
        self.advance(MigrationPhase::HierarchyLoaded);

        self.report.objects = load_objects(
            &self.model,
            &catalog,
            &self.source,
            &mut self.inserter,
            &mut self.index,
        )?;
        self.advance(MigrationPhase::ObjectsLoaded);

        self.report.relations = load_relations(&self.model, &self.source, &self.index, &mut self.inserter)?;
        self.advance(MigrationPhase::RelationsLoaded);

        self.link_domain_root()?;
        self.advance(MigrationPhase::RootLinked);
        Ok(())
    }

    fn link_domain_root(&mut self) -> MigrationResult<()> {
        let oid = self.options.root_oid;
        let target = self
            .index
            .lookup(Oid::new(oid))
            .ok_or(MigrationError::MissingDomainRoot { oid })?;
        let root = self.inserter.root_node();
        self.inserter
            .create_relationship(root, target, &EdgeType::new(DOMAIN_ROOT_EDGE), PropertyMap::new())?;
        Ok(())
    }

    fn finalize(self) -> MigrationResult<MigrationOutcome> {
        let mut report = self.report;
        report.index = self.index.shutdown();
        let store = self.inserter.shutdown()?;
        report.phase = Some(MigrationPhase::Finalized);
        info!(
            "Migration finished: {} objects, {} edges, {} catalog nodes",
            report.total_objects(),
            report.total_edges(),
            report.catalog_nodes
        );
        Ok(MigrationOutcome { report, store })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::model::DomainClass;
    use crate::source::SqliteSource;

    fn source(with_root: bool) -> SqliteSource {
        let source = SqliteSource::in_memory().unwrap();
        source
            .execute_batch(
                "CREATE TABLE `FF$DOMAIN_CLASS_INFO` (DOMAIN_CLASS_NAME TEXT, DOMAIN_CLASS_ID INTEGER);
                 INSERT INTO `FF$DOMAIN_CLASS_INFO` VALUES ('a.Thing', 0);
                 CREATE TABLE THING (OID INTEGER, LABEL TEXT);
                 INSERT INTO THING VALUES (2, 'b');",
            )
            .unwrap();
        if with_root {
            source.execute_batch("INSERT INTO THING VALUES (1, 'a');").unwrap();
        }
        source
    }

    fn model() -> DomainModel {
        DomainModel::new(vec![DomainClass::new("a.Thing").with_slot("label", "String")], vec![]).unwrap()
    }

    #[test]
    fn test_phases_and_report() {
        let migrator = Migrator::new(model(), source(true), BatchInserter::in_memory().unwrap());
        assert_eq!(migrator.phase(), MigrationPhase::Init);

        let outcome = migrator.migrate().unwrap();
        assert_eq!(outcome.report.phase, Some(MigrationPhase::Finalized));
        assert_eq!(outcome.report.catalog_nodes, 1);
        assert_eq!(outcome.report.total_objects(), 2);
        assert_eq!(outcome.report.index.global_entries, 2);

        let store = outcome.store;
        assert_eq!(store.node_count(), 4);
        let root_edges = store.get_edges_by_type(&EdgeType::new(DOMAIN_ROOT_EDGE));
        assert_eq!(root_edges.len(), 1);
        let target = store.get_node(root_edges[0].target).unwrap();
        assert_eq!(target.get_property(OID_PROPERTY), Some(&crate::graph::PropertyValue::Integer(1)));
        assert_eq!(store.constraints().len(), 1);
    }

    #[test]
    fn test_missing_root_is_precondition_violation() {
        let migrator = Migrator::new(model(), source(false), BatchInserter::in_memory().unwrap());
        let err = migrator.migrate().unwrap_err();
        assert!(matches!(err, MigrationError::MissingDomainRoot { oid: 1 }));
        assert_eq!(err.category(), ErrorCategory::PreconditionViolation);
    }

    #[test]
    fn test_configurable_root_oid() {
        let options = MigrationOptions {
            root_oid: 2,
            ..MigrationOptions::default()
        };
        let migrator = Migrator::with_options(model(), source(false), BatchInserter::in_memory().unwrap(), options);
        assert!(migrator.migrate().is_ok());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(MigrationPhase::HierarchyLoaded.to_string(), "HIERARCHY_LOADED");
        assert!(MigrationPhase::SchemaSetup < MigrationPhase::Finalized);
    }
}
