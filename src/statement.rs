//! Prepared statements produced by a driver.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::conversion::TypeRegistry;
use crate::error::{BackendError, DbRsError, Result};
use crate::query::{Query, TypeMap};
use crate::traits::NativeStatement;
use crate::types::{BindingType, QueryResult, Row, RowValues, SqlValue};

/// What a statement is prepared from.
pub enum StatementSource<'a> {
    Sql(&'a str),
    Query(&'a mut Query),
}

impl<'a> From<&'a str> for StatementSource<'a> {
    fn from(sql: &'a str) -> Self {
        StatementSource::Sql(sql)
    }
}

impl<'a> From<&'a mut Query> for StatementSource<'a> {
    fn from(query: &'a mut Query) -> Self {
        StatementSource::Query(query)
    }
}

/// A parameter after conversion through its logical type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundParam {
    /// `1`, `2`, ... for positional parameters, the placeholder otherwise.
    pub name: String,
    pub value: SqlValue,
    pub binding: BindingType,
    pub type_name: Option<String>,
}

/// A prepared statement bound to the connection it was prepared on.
///
/// Rows are buffered on execution and handed out lazily; casting through
/// the attached type map happens as each row is read.
pub struct Statement {
    driver: String,
    sql: String,
    native: Box<dyn NativeStatement>,
    types: Arc<TypeRegistry>,
    type_map: Option<TypeMap>,
    params: Vec<BoundParam>,
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    row_count: u64,
}

impl Statement {
    pub(crate) fn new(
        driver: impl Into<String>,
        sql: impl Into<String>,
        native: Box<dyn NativeStatement>,
        types: Arc<TypeRegistry>,
    ) -> Self {
        Self {
            driver: driver.into(),
            sql: sql.into(),
            native,
            types,
            type_map: None,
            params: Vec::new(),
            columns: Vec::new(),
            rows: VecDeque::new(),
            row_count: 0,
        }
    }

    pub(crate) fn set_type_map(&mut self, type_map: TypeMap) {
        self.type_map = Some(type_map);
    }

    /// Binds `params` positionally, each converted through the type at the
    /// same index of `types` when there is one.
    pub fn bind(&mut self, params: &[Value], types: &[Option<&str>]) -> Result<()> {
        for (index, value) in params.iter().enumerate() {
            let type_name = types.get(index).copied().flatten();
            self.bind_value(&(index + 1).to_string(), value, type_name)?;
        }
        Ok(())
    }

    /// Binds one value by name, replacing an earlier binding of the same
    /// name.
    pub fn bind_value(&mut self, name: &str, value: &Value, type_name: Option<&str>) -> Result<()> {
        let (converted, binding) = self.types.to_database(value, type_name)?;
        let param = BoundParam {
            name: name.to_string(),
            value: converted,
            binding,
            type_name: type_name.map(str::to_string),
        };

        match self.params.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
        Ok(())
    }

    pub(crate) fn execute_native(&mut self) -> std::result::Result<(), BackendError> {
        let raw = self.native.execute(&self.params)?;
        self.row_count = raw.row_count();
        self.columns = raw.columns;
        self.rows = raw.rows.into();
        Ok(())
    }

    pub fn driver_name(&self) -> &str {
        &self.driver
    }

    pub fn query_string(&self) -> &str {
        &self.sql
    }

    pub fn bound_params(&self) -> &[BoundParam] {
        &self.params
    }

    pub fn param_values(&self) -> Vec<SqlValue> {
        self.params.iter().map(|p| p.value.clone()).collect()
    }

    /// Rows affected, or returned for a select.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn type_map(&self) -> Option<&TypeMap> {
        self.type_map.as_ref()
    }

    pub fn last_insert_id(&mut self, name: Option<&str>) -> Result<String> {
        self.native
            .last_insert_id(name)
            .map_err(DbRsError::Execution)
    }

    /// Next unread row, or `None` once every row has been read.
    pub fn fetch(&mut self) -> Result<Option<Row>> {
        match self.rows.pop_front() {
            Some(values) => self.cast_row(values).map(Some),
            None => Ok(None),
        }
    }

    /// Iterates the unread rows. Reading them again requires executing the
    /// statement again.
    pub fn rows(&mut self) -> Rows<'_> {
        Rows { statement: self }
    }

    pub fn fetch_all(&mut self) -> Result<QueryResult> {
        let rows = self.rows().collect::<Result<Vec<_>>>()?;
        Ok(QueryResult::new(self.columns.clone(), rows))
    }

    fn cast_row(&self, values: Vec<Value>) -> Result<Row> {
        let mut row: RowValues = self.columns.iter().cloned().zip(values).collect();

        if let Some(type_map) = &self.type_map {
            for (type_name, fields) in type_map.by_type() {
                if !self.types.contains(type_name) {
                    continue;
                }
                let present: Vec<&str> = fields
                    .into_iter()
                    .filter(|field| row.contains_key(*field))
                    .collect();
                if present.is_empty() {
                    continue;
                }
                row = self.types.get(type_name)?.many_to_native(row, &present)?;
            }
        }
        Ok(Row::from_values(row))
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("driver", &self.driver)
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("row_count", &self.row_count)
            .finish()
    }
}

/// Lazy row sequence of an executed [`Statement`].
pub struct Rows<'a> {
    statement: &'a mut Statement,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.statement.fetch().transpose()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.statement.rows.len();
        (remaining, Some(remaining))
    }
}
