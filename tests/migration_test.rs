use relgraph::graph::{EdgeType, GraphStore, Label, NodeId, PropertyValue};
use relgraph::migration::{DOMAIN_CLASS_EDGE, DOMAIN_CLASS_LABEL, DOMAIN_ROOT_EDGE};
use relgraph::{
    recover, BatchInserter, DomainModel, ErrorCategory, MigrationError, MigrationOutcome, Migrator,
    SqliteSource,
};

const PET_BASE: i64 = 1 << 32;

const PETS_MODEL: &str = r#"
classes:
  - name: org.example.Person
    slots: [{ name: name, type: String }]
  - name: org.example.Pet
    slots: [{ name: name, type: String }]
relations:
  - name: owns
    first:  { type: org.example.Pet, name: pet, multiplicity: one }
    second: { type: org.example.Person, name: owner, multiplicity: many }
"#;

fn pets_source() -> SqliteSource {
    let source = SqliteSource::in_memory().unwrap();
    source
        .execute_batch(&format!(
            "CREATE TABLE `FF$DOMAIN_CLASS_INFO` (DOMAIN_CLASS_NAME TEXT, DOMAIN_CLASS_ID INTEGER);
             INSERT INTO `FF$DOMAIN_CLASS_INFO` VALUES ('org.example.Person', 0), ('org.example.Pet', 1);
             CREATE TABLE PERSON (OID INTEGER, NAME TEXT);
             INSERT INTO PERSON VALUES (1, 'Alice'), (2, 'Bob'), (3, 'Carol');
             CREATE TABLE PET (OID INTEGER, NAME TEXT, OID_OWNER INTEGER);
             INSERT INTO PET VALUES ({rex}, 'Rex', 1), ({tom}, 'Tom', 2), ({nemo}, 'Nemo', NULL);",
            rex = PET_BASE + 1,
            tom = PET_BASE + 2,
            nemo = PET_BASE + 3,
        ))
        .unwrap();
    source
}

fn migrate(model: &str, source: SqliteSource) -> Result<MigrationOutcome, MigrationError> {
    let model = DomainModel::from_yaml_str(model).unwrap();
    Migrator::new(model, source, BatchInserter::in_memory().unwrap()).migrate()
}

fn node_with_oid(store: &GraphStore, label: &str, oid: i64) -> NodeId {
    let found = store.find_nodes_by_property(&Label::new(label), "oid", &PropertyValue::Integer(oid));
    assert_eq!(found.len(), 1, "expected one {} node with oid {}", label, oid);
    found[0].id
}

#[test]
fn test_end_to_end_people_and_pets() {
    let outcome = migrate(PETS_MODEL, pets_source()).unwrap();
    let store = &outcome.store;

    // 6 objects, 2 catalog nodes, 1 root
    assert_eq!(store.node_count(), 9);
    assert_eq!(store.get_nodes_by_label(&Label::new("org_example_Person")).len(), 3);
    assert_eq!(store.get_nodes_by_label(&Label::new("org_example_Pet")).len(), 3);
    assert_eq!(store.get_nodes_by_label(&Label::new(DOMAIN_CLASS_LABEL)).len(), 2);

    assert_eq!(store.get_edges_by_type(&EdgeType::new(DOMAIN_CLASS_EDGE)).len(), 2);
    let root_edges = store.get_edges_by_type(&EdgeType::new(DOMAIN_ROOT_EDGE));
    assert_eq!(root_edges.len(), 1);
    assert_eq!(root_edges[0].target, node_with_oid(store, "org_example_Person", 1));

    let owns = store.get_edges_by_type(&EdgeType::new("owns"));
    assert_eq!(owns.len(), 2);
    let alice = node_with_oid(store, "org_example_Person", 1);
    let rex = node_with_oid(store, "org_example_Pet", PET_BASE + 1);
    let bob = node_with_oid(store, "org_example_Person", 2);
    let tom = node_with_oid(store, "org_example_Pet", PET_BASE + 2);
    assert!(owns.iter().any(|e| e.source == alice && e.target == rex));
    assert!(owns.iter().any(|e| e.source == bob && e.target == tom));

    let rex_node = store.get_node(rex).unwrap();
    assert_eq!(rex_node.get_property("name"), Some(&PropertyValue::from("Rex")));

    assert_eq!(outcome.report.objects["org.example.Person"], 3);
    assert_eq!(outcome.report.objects["org.example.Pet"], 3);
    assert_eq!(outcome.report.relations["owns"], 2);
    assert!(store.constraint_violations().is_empty());
}

#[test]
fn test_many_to_many_yields_one_edge_per_join_row() {
    let model = r#"
classes:
  - name: school.Student
  - name: school.Course
    slots: [{ name: title, type: String }]
relations:
  - name: enrollments
    first:  { type: school.Student, name: students, multiplicity: many }
    second: { type: school.Course, name: courses, multiplicity: many }
"#;
    let course = |n: i64| (7i64 << 32) + n;
    let source = SqliteSource::in_memory().unwrap();
    source
        .execute_batch(&format!(
            "CREATE TABLE `FF$DOMAIN_CLASS_INFO` (DOMAIN_CLASS_NAME TEXT, DOMAIN_CLASS_ID INTEGER);
             INSERT INTO `FF$DOMAIN_CLASS_INFO` VALUES ('school.Student', 0), ('school.Course', 7);
             CREATE TABLE STUDENT (OID INTEGER);
             INSERT INTO STUDENT VALUES (1), (2);
             CREATE TABLE COURSE (OID INTEGER, TITLE TEXT);
             INSERT INTO COURSE VALUES ({c1}, 'Logic'), ({c2}, 'Rust');
             CREATE TABLE ENROLLMENTS (OID_STUDENT INTEGER, OID_COURSE INTEGER);
             INSERT INTO ENROLLMENTS VALUES (1, {c1}), (1, {c2}), (2, {c1}), (2, {c2});",
            c1 = course(1),
            c2 = course(2),
        ))
        .unwrap();

    let outcome = migrate(model, source).unwrap();
    let store = &outcome.store;
    let edges = store.get_edges_by_type(&EdgeType::new("enrollments"));
    assert_eq!(edges.len(), 4);

    let student_2 = node_with_oid(store, "school_Student", 2);
    let rust = node_with_oid(store, "school_Course", course(2));
    assert!(edges.iter().any(|e| e.source == student_2 && e.target == rust));
    assert!(edges
        .iter()
        .all(|e| store.get_node(e.source).unwrap().has_label(&Label::new("school_Student"))));
}

#[test]
fn test_one_to_one_with_unnamed_first_role() {
    let model = r#"
classes:
  - name: gov.Person
  - name: gov.Passport
    slots: [{ name: number, type: String }]
relations:
  - name: holds
    first:  { type: gov.Passport, multiplicity: one }
    second: { type: gov.Person, name: holder, multiplicity: one }
"#;
    let passport = (3i64 << 32) + 1;
    let source = SqliteSource::in_memory().unwrap();
    source
        .execute_batch(&format!(
            "CREATE TABLE `FF$DOMAIN_CLASS_INFO` (DOMAIN_CLASS_NAME TEXT, DOMAIN_CLASS_ID INTEGER);
             INSERT INTO `FF$DOMAIN_CLASS_INFO` VALUES ('gov.Person', 0), ('gov.Passport', 3);
             CREATE TABLE PERSON (OID INTEGER);
             INSERT INTO PERSON VALUES (1), (2);
             CREATE TABLE PASSPORT (OID INTEGER, NUMBER TEXT, OID_HOLDER INTEGER);
             INSERT INTO PASSPORT VALUES ({passport}, 'X123', 2);",
        ))
        .unwrap();

    let outcome = migrate(model, source).unwrap();
    let store = &outcome.store;
    let edges = store.get_edges_by_type(&EdgeType::new("holds"));
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source, node_with_oid(store, "gov_Person", 2));
    assert_eq!(edges[0].target, node_with_oid(store, "gov_Passport", passport));
}

#[test]
fn test_inheritance_flattened_into_root_table() {
    let model = r#"
classes:
  - name: hr.Party
    slots: [{ name: name, type: String }]
  - name: hr.Person
    superclass: hr.Party
    slots: [{ name: birthDate, type: DateTime }]
  - name: hr.Employee
    superclass: hr.Person
    slots: [{ name: hiredOn, type: DateTime }, { name: salary, type: Integer }]
"#;
    let employee = (2i64 << 32) + 1;
    let source = SqliteSource::in_memory().unwrap();
    source
        .execute_batch(&format!(
            "CREATE TABLE `FF$DOMAIN_CLASS_INFO` (DOMAIN_CLASS_NAME TEXT, DOMAIN_CLASS_ID INTEGER);
             INSERT INTO `FF$DOMAIN_CLASS_INFO` VALUES ('hr.Party', 0), ('hr.Person', 1), ('hr.Employee', 2);
             CREATE TABLE PARTY (OID INTEGER, NAME TEXT, BIRTH_DATE DATETIME, HIRED_ON DATE, SALARY INTEGER);
             INSERT INTO PARTY VALUES (1, 'Acme', NULL, NULL, NULL);
             INSERT INTO PARTY VALUES ({person}, 'Ann', '1990-05-17T08:30:00Z', NULL, NULL);
             INSERT INTO PARTY VALUES ({employee}, 'Bo', '1985-01-01 00:00:00', '2015-03-01', 5000);",
            person = (1i64 << 32) + 1,
        ))
        .unwrap();

    let outcome = migrate(model, source).unwrap();
    assert_eq!(outcome.report.objects["hr.Party"], 1);
    assert_eq!(outcome.report.objects["hr.Person"], 1);
    assert_eq!(outcome.report.objects["hr.Employee"], 1);

    let store = &outcome.store;
    let node = store.get_node(node_with_oid(store, "hr_Employee", employee)).unwrap();
    assert_eq!(node.get_property("name"), Some(&PropertyValue::from("Bo")));
    assert_eq!(node.get_property("birthDate"), Some(&PropertyValue::Integer(473_385_600_000)));
    assert_eq!(node.get_property("hiredOn"), Some(&PropertyValue::Integer(1_425_168_000_000)));
    assert_eq!(node.get_property("salary"), Some(&PropertyValue::Integer(5000)));

    let party = store.get_node(node_with_oid(store, "hr_Party", 1)).unwrap();
    assert!(!party.has_property("birthDate"));
    assert_eq!(party.property_count(), 2);
}

#[test]
fn test_missing_catalog_row_is_metadata_inconsistency() {
    let source = pets_source();
    source
        .execute_batch("DELETE FROM `FF$DOMAIN_CLASS_INFO` WHERE DOMAIN_CLASS_NAME = 'org.example.Pet';")
        .unwrap();
    let err = migrate(PETS_MODEL, source).unwrap_err();
    assert!(matches!(err, MigrationError::MissingClassMetadata { .. }));
    assert_eq!(err.category(), ErrorCategory::MetadataInconsistency);
}

#[test]
fn test_dangling_foreign_key_is_source_inconsistency() {
    let source = pets_source();
    source.execute_batch("UPDATE PET SET OID_OWNER = 99 WHERE NAME = 'Nemo';").unwrap();
    let err = migrate(PETS_MODEL, source).unwrap_err();
    assert!(matches!(err, MigrationError::UnresolvedOid { .. }));
    assert_eq!(err.category(), ErrorCategory::SourceDataInconsistency);
}

#[test]
fn test_missing_foreign_key_column_is_source_inconsistency() {
    let source = pets_source();
    source.execute_batch("ALTER TABLE PET DROP COLUMN OID_OWNER;").unwrap();
    let err = migrate(PETS_MODEL, source).unwrap_err();
    assert!(matches!(
        err,
        MigrationError::MissingColumn { ref table, ref column } if table == "PET" && column == "OID_OWNER"
    ));
    assert_eq!(err.category(), ErrorCategory::SourceDataInconsistency);
}

#[test]
fn test_missing_oid_column_is_source_inconsistency() {
    let source = pets_source();
    source
        .execute_batch(
            "DROP TABLE PERSON;
             CREATE TABLE PERSON (ID INTEGER, NAME TEXT);
             INSERT INTO PERSON VALUES (1, 'Alice');",
        )
        .unwrap();
    let err = migrate(PETS_MODEL, source).unwrap_err();
    assert!(matches!(
        err,
        MigrationError::MissingColumn { ref table, ref column } if table == "PERSON" && column == "OID"
    ));
    assert_eq!(err.category(), ErrorCategory::SourceDataInconsistency);
}

#[test]
fn test_unmapped_time_column_is_ignored() {
    let source = pets_source();
    source
        .execute_batch("ALTER TABLE PERSON ADD COLUMN OPENS_AT TIME; UPDATE PERSON SET OPENS_AT = '09:00:00';")
        .unwrap();
    let outcome = migrate(PETS_MODEL, source).unwrap();
    let store = &outcome.store;
    let alice = store.get_node(node_with_oid(store, "org_example_Person", 1)).unwrap();
    assert_eq!(alice.get_property("name"), Some(&PropertyValue::from("Alice")));
    assert_eq!(alice.property_count(), 2);
    assert_eq!(outcome.report.objects["org.example.Person"], 3);
}

#[test]
fn test_duplicate_oid_is_source_inconsistency() {
    let source = pets_source();
    source.execute_batch("INSERT INTO PERSON VALUES (2, 'Bob again');").unwrap();
    let err = migrate(PETS_MODEL, source).unwrap_err();
    assert!(matches!(err, MigrationError::DuplicateOid(_)));
    assert_eq!(err.category(), ErrorCategory::SourceDataInconsistency);
}

#[test]
fn test_missing_domain_root_is_precondition_violation() {
    let source = pets_source();
    source.execute_batch("UPDATE PET SET OID_OWNER = NULL; DELETE FROM PERSON WHERE OID = 1;").unwrap();
    let err = migrate(PETS_MODEL, source).unwrap_err();
    assert!(matches!(err, MigrationError::MissingDomainRoot { oid: 1 }));
    assert_eq!(err.category(), ErrorCategory::PreconditionViolation);
}

#[test]
fn test_graph_log_replays_to_same_store() {
    let dir = tempfile::tempdir().unwrap();
    let model = DomainModel::from_yaml_str(PETS_MODEL).unwrap();
    let inserter = BatchInserter::open(dir.path()).unwrap();
    let outcome = Migrator::new(model, pets_source(), inserter).migrate().unwrap();

    let replayed = recover(dir.path()).unwrap();
    assert_eq!(replayed.node_count(), outcome.store.node_count());
    assert_eq!(replayed.edge_count(), outcome.store.edge_count());
    assert_eq!(replayed.constraints(), outcome.store.constraints());
    assert_eq!(replayed.get_edges_by_type(&EdgeType::new("owns")).len(), 2);
}

#[test]
fn test_rerun_duplicates_and_reports_violations() {
    let dir = tempfile::tempdir().unwrap();
    for _ in 0..2 {
        let model = DomainModel::from_yaml_str(PETS_MODEL).unwrap();
        let inserter = BatchInserter::open(dir.path()).unwrap();
        Migrator::new(model, pets_source(), inserter).migrate().unwrap();
    }

    let store = recover(dir.path()).unwrap();
    // The root node is shared; everything else is loaded twice.
    assert_eq!(store.node_count(), 1 + 2 * 8);
    assert_eq!(store.edge_count(), 2 * 5);
    assert_eq!(store.constraints().len(), 1);

    let violations = store.constraint_violations();
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().all(|v| v.nodes.len() == 2));
}

#[test]
fn test_sqlite_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("legacy.db");
    {
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE `FF$DOMAIN_CLASS_INFO` (DOMAIN_CLASS_NAME TEXT, DOMAIN_CLASS_ID INTEGER);
             INSERT INTO `FF$DOMAIN_CLASS_INFO` VALUES ('org.example.Person', 0), ('org.example.Pet', 1);
             CREATE TABLE PERSON (OID INTEGER, NAME TEXT);
             INSERT INTO PERSON VALUES (1, 'Alice');
             CREATE TABLE PET (OID INTEGER, NAME TEXT, OID_OWNER INTEGER);",
        )
        .unwrap();
    }

    let source = SqliteSource::open(&db).unwrap();
    assert_eq!(source.path(), Some(db.as_path()));
    let outcome = migrate(PETS_MODEL, source).unwrap();
    assert_eq!(outcome.report.total_objects(), 1);
    assert_eq!(outcome.report.relations["owns"], 0);
}
