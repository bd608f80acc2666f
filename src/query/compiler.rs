use serde_json::Value;

use crate::error::{DbRsError, Result};
use crate::query::{Expr, Query, QueryType, ValueBinder};
use crate::schema::SchemaDialect;

/// How bound values appear in compiled SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
    /// `?`
    Positional,
    /// The binder's own names, e.g. `:c0`.
    Named,
}

impl PlaceholderStyle {
    fn token(&self, position: usize, placeholder: &str) -> String {
        match self {
            PlaceholderStyle::Numbered => format!("${}", position),
            PlaceholderStyle::Positional => "?".to_string(),
            PlaceholderStyle::Named => placeholder.to_string(),
        }
    }
}

/// Renders a [`Query`] into parameterized SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCompiler {
    style: PlaceholderStyle,
    auto_quote: bool,
}

impl QueryCompiler {
    pub fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            auto_quote: false,
        }
    }

    /// Quote every identifier through the dialect.
    pub fn with_auto_quoting(mut self, enabled: bool) -> Self {
        self.auto_quote = enabled;
        self
    }

    pub fn style(&self) -> PlaceholderStyle {
        self.style
    }

    pub fn is_auto_quoting_enabled(&self) -> bool {
        self.auto_quote
    }

    pub(crate) fn writer<'a>(
        &self,
        binder: &'a mut ValueBinder,
        dialect: &'a dyn SchemaDialect,
    ) -> SqlWriter<'a> {
        SqlWriter {
            binder,
            dialect,
            style: self.style,
            auto_quote: self.auto_quote,
        }
    }

    /// Compiles `query`, binding every value into `binder`.
    pub fn compile(
        &self,
        query: &Query,
        binder: &mut ValueBinder,
        dialect: &dyn SchemaDialect,
    ) -> Result<String> {
        let mut writer = self.writer(binder, dialect);
        let mut sql = match query.kind {
            QueryType::Select => writer.select(query),
            QueryType::Insert => writer.insert(query)?,
            QueryType::Update => writer.update(query)?,
            QueryType::Delete => writer.delete(query)?,
        };

        if let Some(epilog) = &query.epilog {
            sql.push(' ');
            sql.push_str(epilog);
        }
        Ok(sql)
    }
}

/// Renders expressions while compiling one query.
pub(crate) struct SqlWriter<'a> {
    binder: &'a mut ValueBinder,
    dialect: &'a dyn SchemaDialect,
    style: PlaceholderStyle,
    auto_quote: bool,
}

impl<'a> SqlWriter<'a> {
    pub(crate) fn identifier(&self, name: &str) -> String {
        if self.auto_quote {
            self.dialect.quote_identifier(name)
        } else {
            name.to_string()
        }
    }

    fn bind(&mut self, value: Value, type_name: Option<&str>) -> String {
        let placeholder = self.binder.placeholder("c");
        let position = self.binder.bind(placeholder.clone(), value, type_name);
        self.style.token(position, &placeholder)
    }

    pub(crate) fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Identifier(name) => self.identifier(name),
            Expr::Value { value, type_name } => self.bind(value.clone(), type_name.as_deref()),
            Expr::Function(function) => {
                let args: Vec<String> = function.args().iter().map(|a| self.expr(a)).collect();
                format!("{}({})", function.name(), args.join(", "))
            }
            Expr::Collated(string) => {
                let token = self.bind(Value::String(string.string().to_string()), None);
                format!("{} COLLATE {}", token, string.collation())
            }
            Expr::Raw(sql) => sql.clone(),
        }
    }

    fn table(&self, query: &Query) -> Result<String> {
        query
            .table
            .as_deref()
            .map(|t| self.identifier(t))
            .ok_or_else(|| DbRsError::InvalidQuery("query has no table".to_string()))
    }

    fn where_sql(&mut self, query: &Query, sql: &mut String) {
        if let Some(clause) = &query.where_clause {
            sql.push_str(" WHERE ");
            let rendered = clause.build_sql(self);
            sql.push_str(&rendered);
        }
    }

    fn select(&mut self, query: &Query) -> String {
        let mut sql = String::with_capacity(256);
        sql.push_str("SELECT ");

        if query.fields.is_empty() {
            sql.push('*');
        } else {
            let fields: Vec<String> = query
                .fields
                .iter()
                .map(|field| {
                    let expr = self.expr(&field.expr);
                    match &field.alias {
                        Some(alias) => format!("{} AS {}", expr, self.identifier(alias)),
                        None => expr,
                    }
                })
                .collect();
            sql.push_str(&fields.join(", "));
        }

        if let Some(table) = query.table.as_deref() {
            sql.push_str(" FROM ");
            sql.push_str(&self.identifier(table));
        }

        self.where_sql(query, &mut sql);

        if !query.order_by.is_empty() {
            let order: Vec<String> = query
                .order_by
                .iter()
                .map(|(expr, order)| format!("{} {}", self.expr(expr), order.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        sql
    }

    fn insert(&mut self, query: &Query) -> Result<String> {
        let table = self.table(query)?;
        if query.insert_columns.is_empty() {
            return Err(DbRsError::InvalidQuery(
                "insert requires at least one column".to_string(),
            ));
        }
        if query.values.is_empty() {
            return Err(DbRsError::InvalidQuery(
                "insert requires at least one row of values".to_string(),
            ));
        }

        let columns: Vec<String> = query
            .insert_columns
            .iter()
            .map(|c| self.identifier(c))
            .collect();

        let mut rows = Vec::with_capacity(query.values.len());
        for row in &query.values {
            if row.len() != query.insert_columns.len() {
                return Err(DbRsError::InvalidQuery(format!(
                    "insert row has {} values for {} columns",
                    row.len(),
                    query.insert_columns.len()
                )));
            }
            let tokens: Vec<String> = query
                .insert_columns
                .iter()
                .zip(row)
                .map(|(column, value)| {
                    let type_name = query.insert_types.get(column);
                    self.bind(value.clone(), type_name)
                })
                .collect();
            rows.push(format!("({})", tokens.join(", ")));
        }

        Ok(format!(
            "INSERT INTO {} ({}) VALUES {}",
            table,
            columns.join(", "),
            rows.join(", ")
        ))
    }

    fn update(&mut self, query: &Query) -> Result<String> {
        let table = self.table(query)?;
        if query.set.is_empty() {
            return Err(DbRsError::InvalidQuery(
                "update requires at least one assignment".to_string(),
            ));
        }

        let assignments: Vec<String> = query
            .set
            .iter()
            .map(|(column, expr)| format!("{} = {}", self.identifier(column), self.expr(expr)))
            .collect();

        let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));
        self.where_sql(query, &mut sql);
        Ok(sql)
    }

    fn delete(&mut self, query: &Query) -> Result<String> {
        let mut sql = format!("DELETE FROM {}", self.table(query)?);
        self.where_sql(query, &mut sql);
        Ok(sql)
    }
}
