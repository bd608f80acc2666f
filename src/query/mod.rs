//! The query value object and everything needed to turn it into SQL.
//!
//! A [`Query`] is built by callers (directly or through the select builder),
//! translated per backend and compiled by a [`QueryCompiler`] into SQL text
//! plus the values collected in its [`ValueBinder`].

mod binder;
mod compiler;
mod expression;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::clauses::WhereClause;
use crate::error::Result;
use crate::traits::{Column, DatabaseDriver};

pub use binder::{Binding, ValueBinder};
pub use compiler::{PlaceholderStyle, QueryCompiler};
pub(crate) use compiler::SqlWriter;
pub use expression::{
    avg, coalesce, concat, count, func, max, min, now, rand, sum, Expr, FunctionExpr, StringExpr,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Logical type names keyed by column or alias.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeMap {
    types: BTreeMap<String, String>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.insert(column, type_name);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, type_name: impl Into<String>) {
        self.types.insert(column.into(), type_name.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.types.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Columns grouped under their type name.
    pub fn by_type(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (column, type_name) in &self.types {
            grouped.entry(type_name).or_default().push(column);
        }
        grouped
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TypeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = TypeMap::new();
        for (column, type_name) in iter {
            map.insert(column, type_name);
        }
        map
    }
}

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectField {
    pub expr: Expr,
    pub alias: Option<String>,
}

/// A select, insert, update or delete statement in tree form.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub(crate) kind: QueryType,
    pub(crate) table: Option<String>,
    pub(crate) fields: Vec<SelectField>,
    pub(crate) insert_columns: Vec<String>,
    pub(crate) insert_types: TypeMap,
    pub(crate) values: Vec<Vec<Value>>,
    pub(crate) set: Vec<(String, Expr)>,
    pub(crate) where_clause: Option<WhereClause>,
    pub(crate) order_by: Vec<(Expr, Order)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) epilog: Option<String>,
    select_types: TypeMap,
    results_casting: bool,
    binder: ValueBinder,
}

impl Query {
    fn new(kind: QueryType, table: Option<String>) -> Self {
        Self {
            kind,
            table,
            fields: Vec::new(),
            insert_columns: Vec::new(),
            insert_types: TypeMap::new(),
            values: Vec::new(),
            set: Vec::new(),
            where_clause: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            epilog: None,
            select_types: TypeMap::new(),
            results_casting: true,
            binder: ValueBinder::new(),
        }
    }

    pub fn select() -> Self {
        Self::new(QueryType::Select, None)
    }

    pub fn insert_into(table: impl Into<String>, columns: &[&str]) -> Self {
        let mut query = Self::new(QueryType::Insert, Some(table.into()));
        query.insert_columns = columns.iter().map(|c| c.to_string()).collect();
        query
    }

    pub fn update(table: impl Into<String>) -> Self {
        Self::new(QueryType::Update, Some(table.into()))
    }

    pub fn delete_from(table: impl Into<String>) -> Self {
        Self::new(QueryType::Delete, Some(table.into()))
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Adds an expression to the select list.
    pub fn field(mut self, expr: impl Into<Expr>) -> Self {
        self.fields.push(SelectField {
            expr: expr.into(),
            alias: None,
        });
        self
    }

    /// Adds an aliased expression to the select list. Function results are
    /// typed after the function's return type.
    pub fn field_as(mut self, expr: impl Into<Expr>, alias: impl Into<String>) -> Self {
        let expr = expr.into();
        let alias = alias.into();
        if let Expr::Function(function) = &expr {
            self.select_types
                .insert(alias.clone(), function.return_type().to_string());
        }
        self.fields.push(SelectField {
            expr,
            alias: Some(alias),
        });
        self
    }

    /// Selects a column, recording its type for result casting.
    pub fn column<C: Column + ?Sized>(mut self, column: &C) -> Self {
        if let Some(type_name) = column.column_type() {
            self.select_types.insert(column.column_name(), type_name);
        }
        self.field(Expr::column(column))
    }

    /// Adds one row of values to an insert, in column order.
    pub fn values(mut self, row: Vec<Value>) -> Self {
        self.values.push(row);
        self
    }

    /// Declares the logical type used to bind an inserted column.
    pub fn insert_type(mut self, column: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.insert_types.insert(column, type_name);
        self
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.set.push((column.into(), value.into()));
        self
    }

    /// Adds a condition, AND-ed with any existing one.
    pub fn where_(mut self, clause: WhereClause) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(clause),
            None => clause,
        });
        self
    }

    pub fn order_by(mut self, expr: impl Into<Expr>, order: Order) -> Self {
        self.order_by.push((expr.into(), order));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// SQL appended verbatim after the compiled statement.
    pub fn epilog(mut self, sql: impl Into<String>) -> Self {
        self.epilog = Some(sql.into());
        self
    }

    pub fn select_type(mut self, column: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.select_types.insert(column, type_name);
        self
    }

    pub fn with_select_types(mut self, types: TypeMap) -> Self {
        self.select_types = types;
        self
    }

    pub fn disable_results_casting(mut self) -> Self {
        self.results_casting = false;
        self
    }

    pub fn enable_results_casting(mut self) -> Self {
        self.results_casting = true;
        self
    }

    pub fn kind(&self) -> QueryType {
        self.kind
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn epilog_sql(&self) -> Option<&str> {
        self.epilog.as_deref()
    }

    pub fn select_types(&self) -> &TypeMap {
        &self.select_types
    }

    pub fn is_results_casting_enabled(&self) -> bool {
        self.results_casting
    }

    pub fn binder(&self) -> &ValueBinder {
        &self.binder
    }

    pub fn binder_mut(&mut self) -> &mut ValueBinder {
        &mut self.binder
    }

    /// Compiles the query for `driver` into its own binder, which is reset
    /// first.
    pub fn sql(&mut self, driver: &dyn DatabaseDriver) -> Result<String> {
        let mut binder = std::mem::take(&mut self.binder);
        binder.reset();
        let compiled = driver.compile_query(self.clone(), &mut binder);
        self.binder = binder;
        compiled.map(|(_, sql)| sql)
    }
}
