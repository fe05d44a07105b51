#![allow(dead_code)]

use datarepo_core::db::{open_db_in_memory, Migration};
use datarepo_core::query::{AllowedFilter, AllowedSort, QuerySpec, SortField};
use datarepo_core::{Model, ModelDefinition, Record, Relation};
use rusqlite::Connection;

pub const MIGRATIONS: [Migration; 2] = [
    Migration::new(
        1,
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            age INTEGER
        );
        CREATE TABLE posts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title TEXT NOT NULL
        );",
    ),
    Migration::new(
        2,
        "CREATE TABLE profiles (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            bio TEXT
        );",
    ),
];

/// Four users, three posts, two profiles.
pub fn seeded_conn() -> Connection {
    let conn = open_db_in_memory(&MIGRATIONS).unwrap();
    conn.execute_batch(
        "INSERT INTO users (id, first_name, last_name, email, status, age) VALUES
            (1, 'Alice', 'Smith', 'alice@example.com', 'active', 30),
            (2, 'Bob', 'Jones', 'bob@example.com', 'inactive', 25),
            (3, 'Carol', 'Alison', 'carol@example.com', 'active', 41),
            (4, 'Dave', 'Brown', NULL, 'active', 19);
        INSERT INTO posts (id, user_id, title) VALUES
            (1, 1, 'Hello'),
            (2, 1, 'Second'),
            (3, 3, 'Carol post');
        INSERT INTO profiles (id, user_id, bio) VALUES
            (1, 1, 'Alice bio'),
            (2, 2, 'Bob bio');",
    )
    .unwrap();
    conn
}

pub fn users_definition() -> ModelDefinition {
    ModelDefinition::new("users")
        .relation(Relation::has_many("posts", "posts", "user_id"))
        .relation(Relation::has_one("profile", "profiles", "user_id"))
}

pub fn users_model(conn: &Connection) -> Model {
    users_definition().resolve(conn).unwrap()
}

pub fn posts_model(conn: &Connection) -> Model {
    ModelDefinition::new("posts")
        .relation(Relation::belongs_to("author", "users", "user_id"))
        .resolve(conn)
        .unwrap()
}

pub struct UserQueries;

impl QuerySpec for UserQueries {
    fn filters(&self) -> Vec<AllowedFilter> {
        vec![
            AllowedFilter::exact("status"),
            AllowedFilter::partial("name").on_column("first_name"),
            AllowedFilter::operator("age"),
        ]
    }

    fn sorts(&self) -> Vec<AllowedSort> {
        vec![
            AllowedSort::aliased("name", "first_name"),
            AllowedSort::field("age"),
        ]
    }

    fn default_sort(&self) -> Vec<SortField> {
        vec![SortField::desc("age")]
    }

    fn collection_relations(&self) -> Vec<String> {
        vec!["posts".to_string(), "profile".to_string()]
    }

    fn resource_relations(&self) -> Vec<String> {
        vec!["posts".to_string()]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            "id".to_string(),
            "first_name".to_string(),
            "email".to_string(),
        ]
    }

    fn search_fields(&self) -> Vec<String> {
        vec!["first_name".to_string(), "last_name".to_string()]
    }
}

pub fn text<'a>(record: &'a Record, column: &str) -> &'a str {
    record.get(column).and_then(|value| value.as_str()).unwrap()
}

pub fn int(record: &Record, column: &str) -> i64 {
    record.get(column).and_then(|value| value.as_i64()).unwrap()
}

pub fn ids(records: &[Record]) -> Vec<i64> {
    records.iter().map(|record| int(record, "id")).collect()
}
