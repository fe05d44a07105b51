mod common;

use common::{seeded_conn, users_definition, users_model};
use datarepo_core::model::{ModelDefinition, Relation, RelationKind};
use datarepo_core::RepoError;

#[test]
fn resolve_reads_columns_in_schema_order() {
    let conn = seeded_conn();
    let model = users_model(&conn);

    assert_eq!(model.table(), "users");
    assert_eq!(model.primary_key(), "id");
    assert_eq!(
        model.columns(),
        &["id", "first_name", "last_name", "email", "status", "age"]
    );
    assert!(model.has_column("email"));
    assert!(!model.has_column("password"));
}

#[test]
fn resolve_binds_relation_keys_by_kind() {
    let conn = seeded_conn();
    let users = users_model(&conn);

    let posts = users.relation("posts").unwrap();
    assert_eq!(posts.kind, RelationKind::HasMany);
    assert_eq!(posts.parent_key, "id");
    assert_eq!(posts.related_key, "user_id");

    let author = common::posts_model(&conn)
        .relation("author")
        .cloned()
        .unwrap();
    assert_eq!(author.kind, RelationKind::BelongsTo);
    assert_eq!(author.parent_key, "user_id");
    assert_eq!(author.related_key, "id");
    assert_eq!(author.related_columns.len(), 6);
}

#[test]
fn missing_table_is_reported() {
    let conn = seeded_conn();
    let err = ModelDefinition::new("comments").resolve(&conn).unwrap_err();
    assert!(matches!(err, RepoError::MissingRequiredTable(table) if table == "comments"));
}

#[test]
fn missing_primary_key_is_reported() {
    let conn = seeded_conn();
    let err = ModelDefinition::new("users")
        .primary_key("uuid")
        .resolve(&conn)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::MissingRequiredColumn { ref table, ref column } if table == "users" && column == "uuid"
    ));
}

#[test]
fn missing_relation_key_is_reported() {
    let conn = seeded_conn();
    let err = ModelDefinition::new("users")
        .relation(Relation::has_many("posts", "posts", "author_id"))
        .resolve(&conn)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::MissingRequiredColumn { ref table, ref column } if table == "posts" && column == "author_id"
    ));
}

#[test]
fn duplicate_relation_names_are_rejected() {
    let conn = seeded_conn();
    let err = users_definition()
        .relation(Relation::has_many("posts", "posts", "user_id"))
        .resolve(&conn)
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidSpec(_)));
}

#[test]
fn ensure_helpers_name_the_offending_identifier() {
    let conn = seeded_conn();
    let model = users_model(&conn);

    let err = model.ensure_column("password").unwrap_err();
    assert_eq!(err.to_string(), "unknown column `password` for table `users`");

    let err = model.ensure_relation("comments").unwrap_err();
    assert!(matches!(err, RepoError::UnknownRelation { ref relation, .. } if relation == "comments"));
}
