use std::sync::{Arc, Mutex};

use dbrs::drivers::{InMemoryBackend, InMemoryResponseBuilder};
use dbrs::error::{BackendError, DbRsError};
use dbrs::feature::DriverFeature;
use dbrs::log::{LoggedQuery, QueryLogger};
use dbrs::query::{Expr, PlaceholderStyle, TypeMap};
use dbrs::schema::{ColumnDef, ColumnType, TableSchema};
use dbrs::types::{BindingType, SqlValue};
use dbrs::{DatabaseDriver, Driver, DriverConfig, LogConfig, Query, StatementSource};
use serde_json::json;
use tracing::Level;

#[derive(Default)]
struct CapturingLogger {
    entries: Mutex<Vec<(String, LoggedQuery)>>,
}

impl CapturingLogger {
    fn entries(&self) -> Vec<(String, LoggedQuery)> {
        self.entries.lock().unwrap().clone()
    }
}

impl QueryLogger for CapturingLogger {
    fn log(&self, _level: Level, message: &str, query: &LoggedQuery) {
        self.entries
            .lock()
            .unwrap()
            .push((message.to_string(), query.clone()));
    }
}

fn driver(backend: &InMemoryBackend) -> Driver<InMemoryBackend> {
    Driver::new(backend.clone(), DriverConfig::default()).unwrap()
}

fn logged_driver(backend: &InMemoryBackend) -> (Driver<InMemoryBackend>, Arc<CapturingLogger>) {
    let logger = Arc::new(CapturingLogger::default());
    let config = DriverConfig {
        log: LogConfig::Sink(logger.clone()),
        ..Default::default()
    };
    (Driver::new(backend.clone(), config).unwrap(), logger)
}

#[test]
fn test_transactions_report_sentinels() {
    let backend = InMemoryBackend::new();
    let mut driver = driver(&backend);

    assert!(!driver.commit_transaction().unwrap());
    assert!(!driver.rollback_transaction().unwrap());
    assert_eq!(backend.connect_attempts(), 0);

    assert!(driver.begin_transaction().unwrap());
    assert!(driver.in_transaction());
    assert!(driver.begin_transaction().unwrap());
    assert!(driver.commit_transaction().unwrap());
    assert!(!driver.in_transaction());

    assert!(driver.begin_transaction().unwrap());
    assert!(driver.rollback_transaction().unwrap());

    assert_eq!(backend.transaction_log(), vec!["BEGIN", "COMMIT", "BEGIN", "ROLLBACK"]);
}

#[test]
fn test_transaction_statements_are_logged() {
    let backend = InMemoryBackend::new();
    let (mut driver, logger) = logged_driver(&backend);

    driver.begin_transaction().unwrap();
    driver.commit_transaction().unwrap();

    let messages: Vec<String> = logger.entries().into_iter().map(|(m, _)| m).collect();
    assert_eq!(messages, vec!["BEGIN", "COMMIT"]);
}

#[test]
fn test_is_connected_probes_and_heals() {
    let backend = InMemoryBackend::new();
    let mut driver = driver(&backend);

    assert!(!driver.is_connected());
    driver.connect().unwrap();
    assert!(driver.is_connected());

    backend.set_probe_error(Some(BackendError::with_code("57P01", "terminating connection")));
    assert!(!driver.is_connected());
    assert_eq!(backend.open_connections(), 0);

    backend.set_probe_error(None);
    driver.connect().unwrap();
    assert!(driver.is_connected());
    assert_eq!(backend.connect_attempts(), 2);
}

#[test]
fn test_connect_retries_transient_errors() {
    let backend = InMemoryBackend::new().with_connect_failures(3, "08006");
    let mut driver = driver(&backend);

    driver.connect().unwrap();
    assert_eq!(driver.connect_retries(), 4);
    assert_eq!(backend.connect_attempts(), 4);
}

#[test]
fn test_connect_gives_up_after_max_attempts() {
    let backend = InMemoryBackend::new().with_connect_failures(5, "08001");
    let mut driver = driver(&backend);

    let err = driver.connect().unwrap_err();
    assert!(matches!(err, DbRsError::Connection { .. }));
    assert_eq!(err.backend_code(), Some("08001"));
    assert_eq!(driver.connect_retries(), 4);
    assert!(!driver.is_connected());
}

#[test]
fn test_connect_does_not_retry_other_errors() {
    let backend = InMemoryBackend::new()
        .with_connect_failure(BackendError::with_code("28P01", "password authentication failed"));
    let mut driver = driver(&backend);

    let err = driver.connect().unwrap_err();
    assert_eq!(driver.connect_retries(), 1);
    assert!(err.to_string().contains("InMemory"));
    assert!(err.to_string().contains("password authentication failed"));
}

#[test]
fn test_configured_retry_codes_override_backend() {
    let backend = InMemoryBackend::new().with_connect_failures(1, "08006");
    let config = DriverConfig {
        retry_error_codes: Some(vec!["40001".to_string()]),
        ..Default::default()
    };
    let mut driver = Driver::new(backend.clone(), config).unwrap();

    assert!(driver.connect().is_err());
    assert_eq!(driver.connect_retries(), 1);
}

#[test]
fn test_execute_binds_typed_params_and_logs() {
    let backend = InMemoryBackend::new().with_response(
        InMemoryResponseBuilder::new()
            .columns(&["id"])
            .row(&["3"])
            .build(),
    );
    let (mut driver, logger) = logged_driver(&backend);

    let mut statement = driver
        .execute(
            "SELECT id FROM users WHERE id = ? AND name = ?",
            &[json!("3"), json!("O'Hara")],
            &[Some("integer"), None],
        )
        .unwrap();
    assert_eq!(statement.row_count(), 1);

    backend.assert_last_query(
        "SELECT id FROM users WHERE id = ? AND name = ?",
        &[SqlValue::Int64(3), SqlValue::Text("O'Hara".to_string())],
    );

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    let (message, query) = &entries[0];
    assert_eq!(message, "SELECT id FROM users WHERE id = 3 AND name = 'O''Hara'");
    assert_eq!(query.driver, "InMemory");
    assert_eq!(query.num_rows, Some(1));
    assert!(query.error.is_none());

    let row = statement.fetch().unwrap().unwrap();
    assert_eq!(row.get_by_name("id").unwrap(), &json!("3"));
    assert!(statement.fetch().unwrap().is_none());
}

#[test]
fn test_schema_types_without_converters_bind_by_value() {
    let backend = InMemoryBackend::new();
    let mut driver = driver(&backend);

    driver
        .execute("SELECT id FROM users WHERE name = ?", &[json!("x")], &[Some("string")])
        .unwrap();
    backend.assert_last_query(
        "SELECT id FROM users WHERE name = ?",
        &[SqlValue::Text("x".to_string())],
    );

    let schema = TableSchema::new("users")
        .add_column(ColumnDef::new("id", ColumnType::Integer))
        .add_column(ColumnDef::new("name", ColumnType::String { length: Some(50) }))
        .add_column(ColumnDef::new("active", ColumnType::Boolean));
    let types = schema.type_map();

    let mut insert = Query::insert_into("users", &["id", "name", "active"]);
    for column in ["id", "name", "active"] {
        if let Some(type_name) = types.get(column) {
            insert = insert.insert_type(column, type_name);
        }
    }
    let mut insert = insert.values(vec![json!("7"), json!("Ann"), json!(true)]);
    driver.run(&mut insert).unwrap();

    backend.assert_last_query(
        "INSERT INTO users (id, name, active) VALUES (?, ?, ?)",
        &[
            SqlValue::Int64(7),
            SqlValue::Text("Ann".to_string()),
            SqlValue::Bool(true),
        ],
    );
}

#[test]
fn test_failed_queries_are_logged_then_raised() {
    let backend =
        InMemoryBackend::new().with_error(BackendError::with_code("42P01", "relation does not exist"));
    let (mut driver, logger) = logged_driver(&backend);

    let err = driver.execute("SELECT * FROM missing", &[], &[]).unwrap_err();
    assert!(matches!(err, DbRsError::Execution(_)));
    assert_eq!(err.backend_code(), Some("42P01"));

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    let (_, query) = &entries[0];
    assert_eq!(query.error.as_deref(), Some("[42P01] relation does not exist"));
    assert_eq!(query.num_rows, None);
    assert_eq!(query.took, None);
}

#[test]
fn test_unlogged_driver_reports_no_logging() {
    let backend = InMemoryBackend::new();
    let driver = driver(&backend);
    assert!(!driver.log("SELECT 1", Default::default()));
}

#[test]
fn test_run_reuses_query_binder() {
    let backend = InMemoryBackend::new();
    let mut driver = driver(&backend);

    let mut query = Query::update("users")
        .set("name", Expr::value("Ann"))
        .where_(dbrs::WhereClause::compare(
            Expr::ident("id"),
            dbrs::clauses::Operator::Eq,
            Expr::typed(json!("9"), "integer"),
        ));

    driver.run(&mut query).unwrap();
    driver.run(&mut query).unwrap();

    assert_eq!(query.binder().len(), 2);
    let queries = backend.recorded_queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0], queries[1]);
    assert_eq!(
        queries[1].params,
        vec![SqlValue::Text("Ann".to_string()), SqlValue::Int64(9)]
    );
}

#[test]
fn test_named_placeholders_are_interpolated_in_logs() {
    let backend = InMemoryBackend::new().with_placeholder_style(PlaceholderStyle::Named);
    let (mut driver, logger) = logged_driver(&backend);

    let mut query = Query::update("users")
        .set("name", Expr::value("Ann"))
        .where_(dbrs::WhereClause::compare(
            Expr::ident("id"),
            dbrs::clauses::Operator::Eq,
            Expr::typed(json!("9"), "integer"),
        ));
    driver.run(&mut query).unwrap();

    backend.assert_last_query(
        "UPDATE users SET name = :c0 WHERE id = :c1",
        &[SqlValue::Text("Ann".to_string()), SqlValue::Int64(9)],
    );
    let entries = logger.entries();
    assert_eq!(entries[0].0, "UPDATE users SET name = 'Ann' WHERE id = 9");
}

#[test]
fn test_prepared_select_casts_typed_fields() {
    let backend = InMemoryBackend::new().with_response(
        InMemoryResponseBuilder::new()
            .columns(&["id", "price", "note"])
            .row(&["12", "9.50", "n/a"])
            .build(),
    );
    let mut driver = driver(&backend);

    let types = TypeMap::new()
        .with("id", "integer")
        .with("price", "decimal")
        .with("note", "unknown_type");
    let mut query = Query::select()
        .field(Expr::ident("id"))
        .field(Expr::ident("price"))
        .field(Expr::ident("note"))
        .from("products")
        .with_select_types(types);

    let mut statement = driver.prepare(StatementSource::Query(&mut query)).unwrap();
    driver.execute_statement(&mut statement).unwrap();
    let rows = statement.fetch_all().unwrap().rows();

    assert_eq!(rows[0].get_by_name("id").unwrap(), &json!(12));
    assert_eq!(rows[0].get_by_name("note").unwrap(), &json!("n/a"));
    assert_eq!(rows[0].get_by_name("price").unwrap(), &json!("9.50"));
}

#[test]
fn test_exec_returns_affected_rows() {
    let backend =
        InMemoryBackend::new().with_response(InMemoryResponseBuilder::new().affected(7).build());
    let mut driver = driver(&backend);

    assert_eq!(driver.exec("DELETE FROM sessions").unwrap(), 7);
    backend.assert_last_query("DELETE FROM sessions", &[]);
}

#[test]
fn test_quoting_and_schema_values() {
    let backend = InMemoryBackend::new();
    let mut driver = driver(&backend);

    assert_eq!(driver.quote("it's", BindingType::Str).unwrap(), "'it''s'");
    assert_eq!(driver.schema_value(&json!(null)).unwrap(), "NULL");
    assert_eq!(driver.schema_value(&json!(true)).unwrap(), "TRUE");
    assert_eq!(driver.schema_value(&json!(1.5)).unwrap(), "1.5");
    assert_eq!(driver.schema_value(&json!("12")).unwrap(), "12");
    assert_eq!(driver.schema_value(&json!("1e5")).unwrap(), "'1e5'");
    assert_eq!(driver.quote_identifier("users.name"), r#""users"."name""#);
    assert_eq!(driver.schema(), "main");
}

#[test]
fn test_last_insert_id_and_features() {
    let backend = InMemoryBackend::new()
        .with_last_insert_id("41")
        .with_feature(DriverFeature::Json, true);
    let mut driver = driver(&backend);

    assert_eq!(driver.last_insert_id(None).unwrap(), "41");
    assert!(driver.supports(DriverFeature::Json));
    assert!(driver.supports(DriverFeature::Savepoint));
    assert!(!driver.supports(DriverFeature::Window));
    assert!(driver.supports_named("json"));
    assert!(!driver.supports_named("no-such-feature"));
}
