use datarepo_core::{ConfigError, QueryConfig, ResourceConfig};
use std::fs;

#[test]
fn configs_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let query_path = dir.path().join("query.json");
    let resource_path = dir.path().join("users.json");
    fs::write(&query_path, r#"{ "page_parameter": "p", "path": "/api/users" }"#).unwrap();
    fs::write(
        &resource_path,
        r#"{ "table": "users", "search_fields": ["first_name"] }"#,
    )
    .unwrap();

    let query = QueryConfig::from_path(&query_path).unwrap();
    assert_eq!(query.page_number_parameter(), "p[number]");
    assert_eq!(query.path, "/api/users");

    let resource = ResourceConfig::from_path(&resource_path).unwrap();
    assert_eq!(resource.table, "users");
    assert!(resource.relations.is_empty());
}

#[test]
fn missing_and_malformed_files_are_typed_errors() {
    let dir = tempfile::tempdir().unwrap();

    let err = ResourceConfig::from_path(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ \"table\": ").unwrap();
    assert!(matches!(
        ResourceConfig::from_path(&broken).unwrap_err(),
        ConfigError::Parse(_)
    ));

    let blank = dir.path().join("blank.json");
    fs::write(&blank, r#"{ "table": "  " }"#).unwrap();
    assert!(matches!(
        ResourceConfig::from_path(&blank).unwrap_err(),
        ConfigError::Invalid(_)
    ));
}
