use crate::clauses::WhereClause;
use crate::error::Result;
use crate::query::{Expr, Order, Query};
use crate::traits::{Column, DatabaseDriver, Table};
use crate::types::QueryResult;

/// Entry point for building a SELECT query.
/// Must call `.columns()` to proceed.
#[derive(Debug, Default)]
pub struct Select;

impl Select {
    pub fn new() -> Self {
        Self
    }

    /// Specify the columns to select. Typed columns are cast when the
    /// rows are fetched.
    pub fn columns(self, cols: &[&dyn Column]) -> SelectWithColumns {
        let query = cols
            .iter()
            .fold(Query::select(), |query, column| query.column(*column));
        SelectWithColumns { query }
    }
}

/// SELECT builder after columns have been specified.
/// Must call `.from()` to proceed.
#[derive(Debug)]
pub struct SelectWithColumns {
    query: Query,
}

impl SelectWithColumns {
    /// Specify the table to select from.
    pub fn from<T: Table>(self, _table: T) -> SelectWithTable {
        SelectWithTable {
            query: self.query.from(T::qualified_name()),
        }
    }
}

/// SELECT builder after the table has been specified.
#[derive(Debug)]
pub struct SelectWithTable {
    query: Query,
}

impl SelectWithTable {
    /// Adds a condition, AND-ed with any earlier one.
    pub fn where_(mut self, clause: WhereClause) -> Self {
        self.query = self.query.where_(clause);
        self
    }

    pub fn order_by<C: Column>(mut self, column: &C, order: Order) -> Self {
        self.query = self.query.order_by(Expr::column(column), order);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.query = self.query.limit(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.query = self.query.offset(n);
        self
    }

    /// Leaves typed columns as the driver returned them.
    pub fn raw(mut self) -> Self {
        self.query = self.query.disable_results_casting();
        self
    }

    pub fn build(self) -> Query {
        self.query
    }

    /// Runs the query on `driver` and collects every row.
    pub fn execute(self, driver: &mut dyn DatabaseDriver) -> Result<QueryResult> {
        let mut query = self.query;
        driver.run(&mut query)?.fetch_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{InMemoryBackend, InMemoryResponseBuilder};
    use crate::{Driver, DriverConfig};
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

    fn sql(builder: SelectWithTable) -> (String, usize) {
        let backend = InMemoryBackend::new();
        let driver = Driver::new(backend, DriverConfig::default()).unwrap();
        let mut query = builder.build();
        let sql = query.sql(&driver).unwrap();
        (sql, query.binder().len())
    }

    #[test]
    fn test_build_simple_select() {
        let builder = Select::new()
            .columns(&[&Users::columns().id, &Users::columns().name])
            .from(Users);

        let (sql, params) = sql(builder);
        assert_eq!(sql, "SELECT users.id, users.name FROM users");
        assert_eq!(params, 0);
    }

    #[test]
    fn test_build_select_with_where_and_limit() {
        let builder = Select::new()
            .columns(&[&Users::columns().id])
            .from(Users)
            .where_(WhereClause::eq(&Users::columns().name, "John"))
            .order_by(&Users::columns().id, Order::Desc)
            .limit(10)
            .offset(20);

        let (sql, params) = sql(builder);
        assert_eq!(
            sql,
            "SELECT users.id FROM users WHERE users.name = ? ORDER BY users.id DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(params, 1);
    }

    #[test]
    fn test_typed_columns_are_cast() {
        let backend = InMemoryBackend::new().with_response(
            InMemoryResponseBuilder::new()
                .columns(&["id", "name"])
                .row(&["7", "Ann"])
                .build(),
        );
        let mut driver = Driver::new(backend, DriverConfig::default()).unwrap();

        let result = Select::new()
            .columns(&[&Users::columns().id, &Users::columns().name])
            .from(Users)
            .execute(&mut driver)
            .unwrap();

        let row = result.single_row().unwrap();
        assert_eq!(row.get(&Users::columns().id).unwrap(), &json!(7));
        assert_eq!(row.get(&Users::columns().name).unwrap(), &json!("Ann"));
    }

    #[test]
    fn test_raw_skips_casting() {
        let backend = InMemoryBackend::new().with_response(
            InMemoryResponseBuilder::new()
                .columns(&["id"])
                .row(&["7"])
                .build(),
        );
        let mut driver = Driver::new(backend, DriverConfig::default()).unwrap();

        let result = Select::new()
            .columns(&[&Users::columns().id])
            .from(Users)
            .raw()
            .execute(&mut driver)
            .unwrap();

        assert_eq!(
            result.single_row().unwrap().get(&Users::columns().id).unwrap(),
            &json!("7")
        );
    }
}
