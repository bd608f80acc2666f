use std::collections::HashMap;

use serde_json::Value;

use crate::{
    error::{DbRsError, Result},
    Column,
};

/// Values of one result row keyed by column name.
pub type RowValues = HashMap<String, Value>;

/// Driver-agnostic raw result from a database query.
/// Values are decoded by the backend into strings, numbers, booleans or null.
#[derive(Debug, Clone, Default)]
pub struct RawQueryResult {
    /// Column names in order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of values in column order
    pub rows: Vec<Vec<Value>>,
    /// Rows affected by a non-select statement. Falls back to the number of
    /// returned rows when the backend does not report it.
    pub rows_affected: Option<u64>,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Result of a statement that returned no rows but touched `count` of them.
    pub fn affected(count: u64) -> Self {
        Self {
            rows_affected: Some(count),
            ..Self::default()
        }
    }

    pub fn row_count(&self) -> u64 {
        self.rows_affected.unwrap_or(self.rows.len() as u64)
    }
}

/// A single row result from a query, accessed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: RowValues,
}

impl Row {
    /// Creates a new Row from column names and values.
    pub(crate) fn new(columns: &[String], values: Vec<Value>) -> Self {
        let values = columns
            .iter()
            .zip(values)
            .map(|(col, val)| (col.clone(), val))
            .collect();
        Self { values }
    }

    pub(crate) fn from_values(values: RowValues) -> Self {
        Self { values }
    }

    /// Gets a value by column.
    pub fn get<T: Column + ?Sized>(&self, column: &T) -> Result<&Value> {
        self.values
            .get(column.column_name())
            .ok_or_else(|| DbRsError::ColumnNotFound(column.qualified_name()))
    }

    /// Gets a value by its result column name.
    pub fn get_by_name(&self, name: &str) -> Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| DbRsError::ColumnNotFound(name.to_string()))
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> Vec<&str> {
        self.values.keys().map(|s| s.as_str()).collect()
    }

    pub fn into_values(self) -> RowValues {
        self.values
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Fully materialized result of a statement, containing zero or more rows.
#[derive(Debug)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl QueryResult {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Creates a QueryResult from a RawQueryResult without any type casting.
    pub fn from_raw(raw: RawQueryResult) -> Self {
        let rows = raw
            .rows
            .into_iter()
            .map(|values| Row::new(&raw.columns, values))
            .collect();
        Self {
            columns: raw.columns,
            rows,
        }
    }

    /// Extracts a single row from the result.
    /// Returns an error if the result contains zero or more than one row.
    pub fn single_row(self) -> Result<Row> {
        let actual = self.rows.len();
        let mut rows = self.rows.into_iter();
        match (rows.next(), rows.next()) {
            (Some(row), None) => Ok(row),
            _ => Err(DbRsError::UnexpectedRowCount {
                expected: 1,
                actual,
            }),
        }
    }

    /// Returns all rows from the result.
    pub fn rows(self) -> Vec<Row> {
        self.rows
    }

    /// Returns a reference to the rows without consuming the result.
    pub fn rows_ref(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the column names from this result.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of rows in this result.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if this result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct IdColumn;
    struct MissingColumn;

    impl Column for IdColumn {
        fn column_name(&self) -> &'static str {
            "id"
        }
        fn table_name(&self) -> &'static str {
            "test"
        }
    }

    impl Column for MissingColumn {
        fn column_name(&self) -> &'static str {
            "missing"
        }
        fn table_name(&self) -> &'static str {
            "test"
        }
    }

    #[test]
    fn test_row_get() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let row = Row::new(&columns, vec![json!(1), json!("John")]);

        assert_eq!(row.get(&IdColumn).unwrap(), &json!(1));
        assert_eq!(row.get_by_name("name").unwrap(), &json!("John"));
        assert!(matches!(
            row.get(&MissingColumn),
            Err(DbRsError::ColumnNotFound(name)) if name == "test.missing"
        ));
    }

    #[test]
    fn test_query_result_single_row_error_on_empty() {
        let raw = RawQueryResult::new(vec!["id".to_string()], vec![]);
        let err = QueryResult::from_raw(raw).single_row().unwrap_err();
        match err {
            DbRsError::UnexpectedRowCount { expected, actual } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 0);
            }
            _ => panic!("Expected UnexpectedRowCount error"),
        }
    }

    #[test]
    fn test_query_result_single_row_error_on_multiple() {
        let raw = RawQueryResult::new(
            vec!["id".to_string()],
            vec![vec![json!("1")], vec![json!("2")]],
        );
        let err = QueryResult::from_raw(raw).single_row().unwrap_err();
        assert!(matches!(
            err,
            DbRsError::UnexpectedRowCount {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_row_count_prefers_rows_affected() {
        assert_eq!(RawQueryResult::affected(3).row_count(), 3);
        let raw = RawQueryResult::new(vec!["id".into()], vec![vec![json!(1)]]);
        assert_eq!(raw.row_count(), 1);
    }
}
