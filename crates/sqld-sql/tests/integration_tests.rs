//! Integration tests for schema and query parsing

use pretty_assertions::assert_eq;
use sqld_core::{Column, DiagnosticCode, Parameter, Schema};
use sqld_sql::{QueryParser, SchemaParser};
use std::collections::BTreeMap;

const BLOG_SCHEMA: &str = r#"
    CREATE TABLE users (
        id INT PRIMARY KEY,
        name VARCHAR(255)
    );

    CREATE TABLE posts (
        id INT PRIMARY KEY,
        title VARCHAR(255),
        content TEXT,
        user_id INT
    );
"#;

fn blog_catalog() -> Schema {
    let outcome = SchemaParser::new().parse(BLOG_SCHEMA, None);
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    outcome.value.unwrap()
}

#[test]
fn parses_query_select_with_table_aliases() {
    let catalog = blog_catalog();
    let query = r#"
        -- name: listPosts :many
        SELECT u.name, p.title, p.content
        FROM users u
        JOIN posts p ON u.id = p.user_id
        WHERE u.id = :id;
    "#;

    let outcome = QueryParser::new().parse(query, &catalog, None);
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);

    let queries = outcome.value.unwrap();
    assert_eq!(queries.len(), 1);

    let list_posts = &queries[0];
    assert_eq!(list_posts.name, "listPosts");
    assert_eq!(list_posts.kind, "many");
    assert_eq!(
        list_posts.table_aliases,
        BTreeMap::from([
            ("p".to_string(), "posts".to_string()),
            ("u".to_string(), "users".to_string()),
        ])
    );
    assert_eq!(
        list_posts.input,
        vec![Parameter {
            name: "id".to_string(),
            origin: "u.id".to_string(),
            sql_type: "INT".to_string(),
        }]
    );
    assert_eq!(
        list_posts.output,
        vec![
            Column::new("name", "VARCHAR(255)"),
            Column::new("title", "VARCHAR(255)"),
            Column::new("content", "TEXT"),
        ]
    );
}

#[test]
fn select_star_expands_from_table() {
    let catalog = SchemaParser::new()
        .parse("CREATE TABLE users(id INT PRIMARY KEY, name VARCHAR(255));", None)
        .value
        .unwrap();

    let outcome = QueryParser::new().parse("-- name: listUsers :many\nSELECT * FROM users;", &catalog, None);
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);

    let query = &outcome.value.unwrap()[0];
    assert!(query.input.is_empty());
    assert_eq!(
        query.output,
        vec![Column::new("id", "INT"), Column::new("name", "VARCHAR(255)")]
    );
}

#[test]
fn compact_schema_on_one_line() {
    let outcome = SchemaParser::new().parse(
        "CREATE TABLE users(id INT PRIMARY KEY, name VARCHAR(255)); CREATE TABLE posts(id INT PRIMARY KEY, title VARCHAR(255), content TEXT, user_id INT);",
        None,
    );
    let schema = outcome.value.unwrap();
    assert_eq!(schema, blog_catalog());
}

#[test]
fn unresolved_parameter_does_not_affect_other_queries() {
    let catalog = blog_catalog();
    let queries = r#"
        -- name: broken :one
        SELECT p.title FROM posts p WHERE x.id = :id AND p.id = :post;

        -- name: getUser :one
        SELECT name FROM users WHERE id = :id;
    "#;

    let outcome = QueryParser::new().parse(queries, &catalog, None);
    let messages: Vec<_> = outcome.diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, vec!["table `x` not found on schema"]);
    assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::QueryTableNotFound);

    let queries = outcome.value.unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(
        queries[0].input.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["post"]
    );
    assert_eq!(queries[1].input[0].sql_type, "INT");
    assert_eq!(queries[1].output, vec![Column::new("name", "VARCHAR(255)")]);
}

#[test]
fn errors_from_all_blocks_are_pooled() {
    let catalog = blog_catalog();
    let queries = r#"
        -- name: first :one
        SELECT u.email FROM users u;

        -- name: second :many
        SELECT * FROM comments;
    "#;

    let outcome = QueryParser::new().parse(queries, &catalog, None);
    let pooled: Vec<_> = outcome
        .diagnostics
        .iter()
        .map(|d| (d.query.as_deref(), d.code))
        .collect();
    assert_eq!(
        pooled,
        vec![
            (Some("first"), DiagnosticCode::QueryColumnNotFound),
            (Some("second"), DiagnosticCode::QueryTableNotFound),
        ]
    );
    assert_eq!(outcome.value.unwrap().len(), 2);
}

#[test]
fn lookups_ignore_case_across_schema_and_queries() {
    let catalog = SchemaParser::new()
        .parse("CREATE TABLE Accounts (Id BIGINT, Email VARCHAR(320));", None)
        .value
        .unwrap();

    let outcome = QueryParser::new().parse(
        "-- name: byEmail :one\nselect A.id, a.EMAIL from ACCOUNTS a where A.Email = :email;",
        &catalog,
        None,
    );
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);

    let query = &outcome.value.unwrap()[0];
    assert_eq!(query.table_aliases.get("a").map(String::as_str), Some("ACCOUNTS"));
    assert_eq!(query.input[0].origin, "A.Email");
    assert_eq!(query.input[0].sql_type, "VARCHAR(320)");
    assert_eq!(
        query.output,
        vec![Column::new("Id", "BIGINT"), Column::new("Email", "VARCHAR(320)")]
    );
}

#[test]
fn catalogs_from_several_files_merge() {
    let parser = SchemaParser::new();
    let users = parser.parse("CREATE TABLE users (id INT);", None).value.unwrap();
    let posts = parser.parse("CREATE TABLE posts (id INT, user_id INT);", None).value.unwrap();

    let merged = Schema::merge(vec![users, posts]).value.unwrap();
    let outcome = QueryParser::new().parse(
        "-- name: q :many\nSELECT p.id FROM posts p JOIN users u ON u.id = p.user_id WHERE u.id = :uid;",
        &merged,
        None,
    );
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
}

#[test]
fn queries_serialize_for_code_generation() {
    let catalog = blog_catalog();
    let outcome = QueryParser::new().parse(
        "-- name: getPost :one\nSELECT p.title FROM posts p WHERE p.id = :id;",
        &catalog,
        None,
    );

    let json = serde_json::to_value(outcome.value.unwrap()).unwrap();
    assert_eq!(json[0]["name"], "getPost");
    assert_eq!(json[0]["type"], "one");
    assert_eq!(json[0]["tableAliases"]["p"], "posts");
    assert_eq!(json[0]["input"][0]["origin"], "p.id");
    assert_eq!(json[0]["output"][0]["type"], "VARCHAR(255)");
}
