mod common;

use common::{ids, posts_model, seeded_conn, text, users_model, UserQueries};
use datarepo_core::model::{Attributes, Related};
use datarepo_core::query::{AllowedFilter, QuerySpec};
use datarepo_core::{
    ApiRepository, ConfiguredSpec, QueryConfig, QueryParams, RepoError, ResourceConfig,
    SqliteApiRepository,
};
use rusqlite::Connection;

fn users_api(conn: &Connection) -> SqliteApiRepository<'_, UserQueries> {
    SqliteApiRepository::new(conn, users_model(conn), UserQueries).unwrap()
}

#[test]
fn filter_and_sort_from_query_string() {
    let conn = seeded_conn();
    let api = users_api(&conn);

    let params = QueryParams::parse("filter[status]=active&sort=-name");
    let users = api.get_all_resources(&params).unwrap();
    assert_eq!(ids(&users), vec![4, 3, 1]);
}

#[test]
fn default_sort_applies_only_without_sort_terms() {
    let conn = seeded_conn();
    let api = users_api(&conn);

    let by_default = api.get_all_resources(&QueryParams::new()).unwrap();
    assert_eq!(ids(&by_default), vec![3, 1, 2, 4]);

    let explicit = api
        .get_all_resources(&QueryParams::new().with_sort("age"))
        .unwrap();
    assert_eq!(ids(&explicit), vec![4, 2, 1, 3]);

    let disallowed = api
        .get_all_resources(&QueryParams::new().with_sort("-email"))
        .unwrap();
    assert_eq!(ids(&disallowed), vec![1, 2, 3, 4]);
}

#[test]
fn filter_kinds() {
    let conn = seeded_conn();
    let api = users_api(&conn);

    let partial = api
        .get_all_resources(&QueryParams::new().with_filter("name", "AL"))
        .unwrap();
    assert_eq!(ids(&partial), vec![1]);

    let at_least_thirty = api
        .get_all_resources(&QueryParams::new().with_filter("age", ">=30"))
        .unwrap();
    assert_eq!(ids(&at_least_thirty), vec![3, 1]);

    let not_thirty = api
        .get_all_resources(&QueryParams::parse("filter[age]=!%3D30&sort=age"))
        .unwrap();
    assert_eq!(ids(&not_thirty), vec![4, 2, 3]);

    let any_status = api
        .get_all_resources(&QueryParams::new().with_filter("status", "active,inactive"))
        .unwrap();
    assert_eq!(any_status.len(), 4);
}

#[test]
fn unknown_and_blank_parameters_are_ignored() {
    let conn = seeded_conn();
    let api = users_api(&conn);

    let params = QueryParams::parse(
        "filter[email]=bob@example.com&filter[status]=&include=secrets&fields[users]=password&foo=bar",
    );
    let users = api.get_all_resources(&params).unwrap();
    assert_eq!(users.len(), 4);
    assert!(users.iter().all(|user| user.relations().is_empty()));
    assert_eq!(users[0].attributes().len(), 6);
}

#[test]
fn collection_includes_load_relations() {
    let conn = seeded_conn();
    let api = users_api(&conn);

    let params = QueryParams::new()
        .with_include("posts,profile")
        .with_sort("name");
    let users = api.get_all_resources(&params).unwrap();

    let alice = &users[0];
    assert_eq!(ids(alice.relation("posts").unwrap().records()), vec![1, 2]);
    match alice.relation("profile") {
        Some(Related::One(Some(profile))) => assert_eq!(text(profile, "bio"), "Alice bio"),
        other => panic!("unexpected profile: {other:?}"),
    }

    let dave = &users[3];
    assert!(matches!(dave.relation("profile"), Some(Related::One(None))));
    assert!(dave.relation("posts").unwrap().records().is_empty());
}

#[test]
fn fields_projection_keeps_allowed_columns_only() {
    let conn = seeded_conn();
    let api = users_api(&conn);

    let params = QueryParams::parse("fields[users]=first_name,last_name&include=posts&sort=name");
    let users = api.get_all_resources(&params).unwrap();

    let alice = &users[0];
    let columns: Vec<&String> = alice.attributes().keys().collect();
    assert_eq!(columns, vec!["first_name"]);
    assert_eq!(alice.relation("posts").unwrap().records().len(), 2);

    let unscoped = api
        .get_all_resources(&QueryParams::parse("fields=id,email"))
        .unwrap();
    assert_eq!(unscoped[0].attributes().len(), 2);
}

#[test]
fn paginated_search_reports_totals() {
    let conn = seeded_conn();
    let api = users_api(&conn);

    let params = QueryParams::parse("page[size]=10");
    let page = api.paginate_search_resources("ali", &params).unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.per_page, 10);
    assert_eq!(page.current_page, 1);
    assert_eq!(page.last_page, 1);
    assert_eq!((page.from, page.to), (Some(1), Some(2)));
    assert_eq!(ids(&page.data), vec![3, 1]);

    let plain = api.search_resources("alice", &QueryParams::new()).unwrap();
    assert_eq!(ids(&plain), vec![1]);
}

#[test]
fn page_size_is_clamped_to_configured_maximum() {
    let conn = seeded_conn();
    let api = users_api(&conn);

    let page = api
        .paginate_all_resources(&QueryParams::parse("page[size]=500"))
        .unwrap();
    assert_eq!(page.per_page, 30);

    let api = users_api(&conn).with_config(QueryConfig {
        default_page_size: 3,
        max_page_size: 3,
        ..QueryConfig::default()
    });
    let page = api.paginate_all_resources(&QueryParams::new()).unwrap();
    assert_eq!(page.per_page, 3);
    assert_eq!(page.last_page, 2);
}

#[test]
fn pagination_links_preserve_query() {
    let conn = seeded_conn();
    let api = users_api(&conn).with_config(QueryConfig {
        path: "/users".to_string(),
        ..QueryConfig::default()
    });

    let params = QueryParams::parse("filter[status]=active&page[number]=2&page[size]=2");
    let page = api.paginate_all_resources(&params).unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.last_page, 2);
    assert_eq!(ids(&page.data), vec![4]);
    assert_eq!(
        page.links.prev.as_deref(),
        Some("/users?filter%5Bstatus%5D=active&page%5Bsize%5D=2&page%5Bnumber%5D=1")
    );
    assert!(page.links.next.is_none());
    assert_eq!(
        page.links.first,
        "/users?filter%5Bstatus%5D=active&page%5Bsize%5D=2&page%5Bnumber%5D=1"
    );
}

#[test]
fn collection_by_conditions() {
    let conn = seeded_conn();
    let api = users_api(&conn);

    let active = Attributes::new().with("status", "active");
    let users = api
        .get_all_resources_by(&active, &QueryParams::new().with_sort("name"))
        .unwrap();
    assert_eq!(ids(&users), vec![1, 3, 4]);

    let page = api
        .paginate_all_resources_by(&active, &QueryParams::new().with_page(1, 2))
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(ids(&page.data), vec![3, 1]);

    let err = api
        .get_all_resources_by(&Attributes::new().with("role", "admin"), &QueryParams::new())
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownColumn { .. }));
}

#[test]
fn single_resource_uses_resource_includes_only() {
    let conn = seeded_conn();
    let api = users_api(&conn);

    let params = QueryParams::parse("include=posts,profile&filter[status]=active");
    let bob = api.get_resource("id", 2, &params).unwrap().unwrap();
    assert_eq!(text(&bob, "first_name"), "Bob");
    assert!(bob.relation("posts").is_some());
    assert!(bob.relation("profile").is_none());

    let carol = api
        .get_resource_by(
            &Attributes::new().with("email", "carol@example.com"),
            &QueryParams::new(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(text(&carol, "last_name"), "Alison");

    assert!(api
        .get_resource("id", 99, &QueryParams::new())
        .unwrap()
        .is_none());
    assert!(matches!(
        api.get_resource("password", "x", &QueryParams::new()),
        Err(RepoError::UnknownColumn { .. })
    ));
}

struct BrokenQueries;

impl QuerySpec for BrokenQueries {
    fn filters(&self) -> Vec<AllowedFilter> {
        vec![AllowedFilter::exact("role")]
    }

    fn search_fields(&self) -> Vec<String> {
        Vec::new()
    }
}

#[test]
fn invalid_spec_is_rejected_at_construction() {
    let conn = seeded_conn();
    let err = SqliteApiRepository::new(&conn, users_model(&conn), BrokenQueries)
        .err()
        .unwrap();
    assert!(matches!(err, RepoError::InvalidSpec(_)));
}

#[test]
fn set_model_keeps_previous_model_on_mismatch() {
    let conn = seeded_conn();
    let mut api = users_api(&conn);

    let err = api.set_model(posts_model(&conn)).unwrap_err();
    assert!(matches!(err, RepoError::InvalidSpec(_)));
    assert_eq!(api.model().table(), "users");
    assert_eq!(api.get_all_resources(&QueryParams::new()).unwrap().len(), 4);
}

#[test]
fn json_configured_resource_end_to_end() {
    let conn = seeded_conn();
    let config = ResourceConfig::from_json_str(
        r#"{
            "table": "users",
            "relations": [
                { "name": "posts", "kind": "has_many", "related_table": "posts", "foreign_key": "user_id" }
            ],
            "filters": [{ "name": "status", "kind": "exact" }],
            "sorts": [{ "name": "name", "column": "first_name" }],
            "default_sort": ["-name"],
            "collection_includes": ["posts"],
            "search_fields": ["first_name", "last_name"]
        }"#,
    )
    .unwrap();
    let model = config.model_definition().resolve(&conn).unwrap();
    let api = SqliteApiRepository::new(&conn, model, ConfiguredSpec::new(config)).unwrap();

    let users = api
        .get_all_resources(&QueryParams::parse("filter[status]=active&include=posts"))
        .unwrap();
    assert_eq!(ids(&users), vec![4, 3, 1]);
    assert_eq!(users[1].relation("posts").unwrap().records().len(), 1);

    let json = serde_json::to_value(&users[2]).unwrap();
    assert_eq!(json["first_name"], "Alice");
    assert_eq!(json["posts"][1]["title"], "Second");
}
