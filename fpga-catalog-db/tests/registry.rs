use fpga_catalog_db::*;

#[test]
fn handles_open_lazily_under_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("dbs");
    let mut registry = HandleRegistry::new(&root);
    assert!(!registry.is_open("games"));

    let count = registry
        .with_handle("games", |conn| {
            conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
                .unwrap();
            conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get::<_, i64>(0))
                .unwrap()
        })
        .unwrap();

    assert_eq!(count, 1);
    assert!(registry.is_open("games"));
    assert!(root.join("games.sqlite").exists());
}

#[test]
fn handle_is_reused_until_released() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = HandleRegistry::new(dir.path());

    registry
        .with_handle("a", |conn| conn.execute_batch("CREATE TEMP TABLE scratch (x);"))
        .unwrap()
        .unwrap();
    // Temporary tables live only as long as the connection.
    let has_scratch = |registry: &mut HandleRegistry| {
        registry
            .with_handle("a", |conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_temp_master WHERE name='scratch')",
                    [],
                    |row| row.get::<_, bool>(0),
                )
                .unwrap()
            })
            .unwrap()
    };
    assert!(has_scratch(&mut registry));

    assert!(registry.release("a"));
    assert!(!registry.release("a"));
    assert!(!has_scratch(&mut registry));
}

#[test]
fn invalid_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = HandleRegistry::new(dir.path());
    for name in ["", "../escape", "a/b", ".hidden"] {
        assert!(matches!(
            registry.with_handle(name, |_| ()),
            Err(RegistryError::InvalidName(_))
        ));
    }
}

#[test]
fn release_all_closes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = HandleRegistry::new(dir.path());
    registry.with_handle("a", |_| ()).unwrap();
    registry.with_handle("b", |_| ()).unwrap();

    registry.release_all();
    assert!(!registry.is_open("a"));
    assert!(!registry.is_open("b"));
}

#[test]
fn registry_databases_carry_the_catalog_schema() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = HandleRegistry::new(dir.path());
    let version = registry
        .with_handle("catalogs", |conn| schema::schema_version(conn).unwrap())
        .unwrap();
    assert_eq!(version, schema::SCHEMA_VERSION);
}

#[test]
fn explicit_paths_override_the_root() {
    let dir = tempfile::tempdir().unwrap();
    let custom = dir.path().join("elsewhere").join("catalogs.db");
    let mut registry = HandleRegistry::new(dir.path().join("dbs")).with_path("catalogs", &custom);
    assert_eq!(registry.path_of("catalogs"), custom);
    assert_eq!(registry.path_of("games"), dir.path().join("dbs").join("games.sqlite"));

    registry
        .with_handle("catalogs", |conn| list_catalogs(conn, &CatalogFilter::default()).unwrap())
        .unwrap();
    assert!(custom.exists());
    assert!(!dir.path().join("dbs").exists());
}
