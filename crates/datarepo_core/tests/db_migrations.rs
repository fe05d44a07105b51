mod common;

use common::MIGRATIONS;
use datarepo_core::db::migrations::{current_user_version, latest_version};
use datarepo_core::db::{open_db, open_db_in_memory, DbError, Migration};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory(&MIGRATIONS).unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version(&MIGRATIONS));
    assert_table_exists(&conn, "users");
    assert_table_exists(&conn, "posts");
    assert_table_exists(&conn, "profiles");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");

    let first = open_db(&path, &MIGRATIONS[..1]).unwrap();
    assert_eq!(current_user_version(&first).unwrap(), 1);
    drop(first);

    let second = open_db(&path, &MIGRATIONS).unwrap();
    assert_eq!(current_user_version(&second).unwrap(), 2);
    assert_table_exists(&second, "profiles");
    drop(second);

    let third = open_db(&path, &MIGRATIONS).unwrap();
    assert_eq!(current_user_version(&third).unwrap(), 2);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path, &MIGRATIONS).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_migration_list_leaves_existing_schema_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("external.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE things (id INTEGER PRIMARY KEY); PRAGMA user_version = 7;")
        .unwrap();
    drop(conn);

    let conn = open_db(&path, &[]).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), 7);
    assert_table_exists(&conn, "things");
}

#[test]
fn unordered_migrations_are_rejected() {
    let migrations = [
        Migration::new(2, "CREATE TABLE a (id INTEGER PRIMARY KEY);"),
        Migration::new(1, "CREATE TABLE b (id INTEGER PRIMARY KEY);"),
    ];

    match open_db_in_memory(&migrations).unwrap_err() {
        DbError::UnorderedMigrations { previous, next } => {
            assert_eq!((previous, next), (2, 1));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failing_migration_rolls_back_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.db");
    let migrations = [
        Migration::new(1, "CREATE TABLE a (id INTEGER PRIMARY KEY);"),
        Migration::new(2, "CREATE TABLE broken (;"),
    ];

    assert!(matches!(
        open_db(&path, &migrations).unwrap_err(),
        DbError::Sqlite(_)
    ));

    let conn = Connection::open(&path).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), 0);
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'a');",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 0);
}

#[test]
fn foreign_keys_are_enabled() {
    let conn = open_db_in_memory(&MIGRATIONS).unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
