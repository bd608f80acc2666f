use dbrs::builders::Select;
use dbrs::drivers::{InMemoryBackend, InMemoryResponseBuilder};
use dbrs::error::DbRsError;
use dbrs::query::{Expr, Order};
use dbrs::traits::{Column, Table};
use dbrs::types::{QueryResult, SqlValue};
use dbrs::{DatabaseDriver, Driver, DriverConfig, Query, WhereClause};
use serde_json::json;

// Test table and columns
struct Users;
struct UsersColumns {
    pub id: UsersId,
    pub name: UsersName,
}
struct UsersId;
struct UsersName;

impl Table for Users {
    type Columns = UsersColumns;
    fn table_name() -> &'static str {
        "users"
    }
    fn columns() -> Self::Columns {
        UsersColumns {
            id: UsersId,
            name: UsersName,
        }
    }
}

impl Column for UsersId {
    fn column_name(&self) -> &'static str {
        "id"
    }
    fn table_name(&self) -> &'static str {
        "users"
    }
    fn column_type(&self) -> Option<&'static str> {
        Some("integer")
    }
}

impl Column for UsersName {
    fn column_name(&self) -> &'static str {
        "name"
    }
    fn table_name(&self) -> &'static str {
        "users"
    }
}

fn driver(backend: &InMemoryBackend) -> Driver<InMemoryBackend> {
    Driver::new(backend.clone(), DriverConfig::default()).unwrap()
}

#[test]
fn test_simple_select_single_column() {
    let backend = InMemoryBackend::new().with_response(
        InMemoryResponseBuilder::new()
            .columns(&["id"])
            .row(&["1"])
            .build(),
    );
    let mut driver = driver(&backend);

    let result = Select::new()
        .columns(&[&Users::columns().id])
        .from(Users)
        .execute(&mut driver)
        .unwrap();

    // Verify the query that was executed
    backend.assert_last_query("SELECT users.id FROM users", &[]);
    backend.assert_query_count(1);

    // The integer column comes back as a number
    let row = result.single_row().unwrap();
    assert_eq!(row.get(&Users::columns().id).unwrap(), &json!(1));
}

#[test]
fn test_select_with_where() {
    let backend = InMemoryBackend::new().with_response(
        InMemoryResponseBuilder::new()
            .columns(&["id"])
            .row(&["42"])
            .build(),
    );
    let mut driver = driver(&backend);

    let result = Select::new()
        .columns(&[&Users::columns().id])
        .from(Users)
        .where_(WhereClause::eq(&Users::columns().name, "Bob"))
        .execute(&mut driver)
        .unwrap();

    backend.assert_last_query(
        "SELECT users.id FROM users WHERE users.name = ?",
        &[SqlValue::Text("Bob".to_string())],
    );

    let row = result.single_row().unwrap();
    assert_eq!(row.get(&Users::columns().id).unwrap(), &json!(42));
}

#[test]
fn test_typed_where_value_is_converted() {
    let backend = InMemoryBackend::new();
    let mut driver = driver(&backend);

    Select::new()
        .columns(&[&Users::columns().name])
        .from(Users)
        .where_(WhereClause::eq(&Users::columns().id, "17"))
        .execute(&mut driver)
        .unwrap();

    backend.assert_last_query(
        "SELECT users.name FROM users WHERE users.id = ?",
        &[SqlValue::Int64(17)],
    );
}

#[test]
fn test_select_with_where_and_limit() {
    let backend = InMemoryBackend::new().with_response(
        InMemoryResponseBuilder::new()
            .columns(&["id"])
            .row(&["1"])
            .row(&["2"])
            .row(&["3"])
            .build(),
    );
    let mut driver = driver(&backend);

    let result = Select::new()
        .columns(&[&Users::columns().id])
        .from(Users)
        .where_(WhereClause::eq(&Users::columns().name, "Test"))
        .limit(3)
        .execute(&mut driver)
        .unwrap();

    backend.assert_last_query(
        "SELECT users.id FROM users WHERE users.name = ? LIMIT 3",
        &[SqlValue::Text("Test".to_string())],
    );

    let rows = result.rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get(&Users::columns().id).unwrap(), &json!(1));
    assert_eq!(rows[1].get(&Users::columns().id).unwrap(), &json!(2));
    assert_eq!(rows[2].get(&Users::columns().id).unwrap(), &json!(3));
}

#[test]
fn test_select_empty_result() {
    let backend = InMemoryBackend::new()
        .with_response(InMemoryResponseBuilder::new().columns(&["id"]).build());
    let mut driver = driver(&backend);

    let result = Select::new()
        .columns(&[&Users::columns().id])
        .from(Users)
        .where_(WhereClause::eq(&Users::columns().id, 999))
        .execute(&mut driver)
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.len(), 0);

    // single_row should fail on empty result
    let err = QueryResult::from_raw(InMemoryResponseBuilder::new().columns(&["id"]).build())
        .single_row()
        .unwrap_err();

    match err {
        DbRsError::UnexpectedRowCount { expected, actual } => {
            assert_eq!(expected, 1);
            assert_eq!(actual, 0);
        }
        _ => panic!("Expected UnexpectedRowCount error"),
    }
}

#[test]
fn test_multiple_queries() {
    let backend = InMemoryBackend::new()
        .with_response(
            InMemoryResponseBuilder::new()
                .columns(&["id"])
                .row(&["1"])
                .build(),
        )
        .with_response(
            InMemoryResponseBuilder::new()
                .columns(&["name"])
                .row(&["Alice"])
                .build(),
        );
    let mut driver = driver(&backend);

    let result1 = Select::new()
        .columns(&[&Users::columns().id])
        .from(Users)
        .execute(&mut driver)
        .unwrap();

    let result2 = Select::new()
        .columns(&[&Users::columns().name])
        .from(Users)
        .order_by(&Users::columns().name, Order::Asc)
        .execute(&mut driver)
        .unwrap();

    backend.assert_query_count(2);

    let queries = backend.recorded_queries();
    assert_eq!(queries[0].sql, "SELECT users.id FROM users");
    assert_eq!(queries[1].sql, "SELECT users.name FROM users ORDER BY users.name ASC");

    assert_eq!(
        result2
            .single_row()
            .unwrap()
            .get(&Users::columns().name)
            .unwrap(),
        &json!("Alice")
    );
    assert_eq!(result1.len(), 1);
}

#[test]
fn test_compound_where_clause() {
    let backend = InMemoryBackend::new().with_response(
        InMemoryResponseBuilder::new()
            .columns(&["name"])
            .row(&["Admin"])
            .build(),
    );
    let mut driver = driver(&backend);

    let result = Select::new()
        .columns(&[&Users::columns().name])
        .from(Users)
        .where_(
            WhereClause::eq(&Users::columns().name, "Admin")
                .or(WhereClause::is_null(&Users::columns().name).not()),
        )
        .where_(WhereClause::in_list(&Users::columns().id, vec![1, 2]))
        .execute(&mut driver)
        .unwrap();

    backend.assert_last_query(
        "SELECT users.name FROM users WHERE ((users.name = ?) OR (NOT (users.name IS NULL))) AND (users.id IN (?, ?))",
        &[
            SqlValue::Text("Admin".to_string()),
            SqlValue::Int64(1),
            SqlValue::Int64(2),
        ],
    );

    let row = result.single_row().unwrap();
    assert_eq!(row.get(&Users::columns().name).unwrap(), &json!("Admin"));
}

#[test]
fn test_insert_update_delete_queries() {
    let backend = InMemoryBackend::new();
    let mut driver = driver(&backend);

    let mut insert = Query::insert_into("users", &["id", "name"])
        .insert_type("id", "integer")
        .values(vec![json!("5"), json!("Eve")]);
    let statement = driver.run(&mut insert).unwrap();
    assert_eq!(statement.query_string(), "INSERT INTO users (id, name) VALUES (?, ?)");
    backend.assert_last_query(
        "INSERT INTO users (id, name) VALUES (?, ?)",
        &[SqlValue::Int64(5), SqlValue::Text("Eve".to_string())],
    );

    let mut update = Query::update("users")
        .set("name", Expr::value("Eve Smith"))
        .where_(WhereClause::eq(&Users::columns().id, 5));
    driver.run(&mut update).unwrap();
    backend.assert_last_query(
        "UPDATE users SET name = ? WHERE users.id = ?",
        &[SqlValue::Text("Eve Smith".to_string()), SqlValue::Int64(5)],
    );

    let mut delete = Query::delete_from("users").where_(WhereClause::gt(&Users::columns().id, 100));
    driver.run(&mut delete).unwrap();
    backend.assert_last_query("DELETE FROM users WHERE users.id > ?", &[SqlValue::Int64(100)]);
}
