use serde_json::Value;

use crate::query::{Expr, SqlWriter};
use crate::traits::Column;

/// Comparison operators usable in a WHERE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
        }
    }
}

/// Represents a WHERE clause condition.
/// Supports comparisons, null checks, IN lists and logical combinations.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    /// left op right
    Compare(Expr, Operator, Expr),
    /// expr IS NULL
    IsNull(Expr),
    /// expr IS NOT NULL
    IsNotNull(Expr),
    /// expr IN (values...)
    In(Expr, Vec<Expr>),
    /// clause AND clause
    And(Box<WhereClause>, Box<WhereClause>),
    /// clause OR clause
    Or(Box<WhereClause>, Box<WhereClause>),
    /// NOT clause
    Not(Box<WhereClause>),
}

impl WhereClause {
    /// Compares two arbitrary expressions.
    pub fn compare(left: Expr, op: Operator, right: Expr) -> Self {
        WhereClause::Compare(left, op, right)
    }

    /// Creates an equality condition: column = value
    pub fn eq<C: Column, V: Into<Value>>(column: &C, value: V) -> Self {
        Self::column_op(column, Operator::Eq, value)
    }

    pub fn not_eq<C: Column, V: Into<Value>>(column: &C, value: V) -> Self {
        Self::column_op(column, Operator::NotEq, value)
    }

    pub fn gt<C: Column, V: Into<Value>>(column: &C, value: V) -> Self {
        Self::column_op(column, Operator::Gt, value)
    }

    pub fn gte<C: Column, V: Into<Value>>(column: &C, value: V) -> Self {
        Self::column_op(column, Operator::Gte, value)
    }

    pub fn lt<C: Column, V: Into<Value>>(column: &C, value: V) -> Self {
        Self::column_op(column, Operator::Lt, value)
    }

    pub fn lte<C: Column, V: Into<Value>>(column: &C, value: V) -> Self {
        Self::column_op(column, Operator::Lte, value)
    }

    pub fn like<C: Column>(column: &C, pattern: &str) -> Self {
        Self::column_op(column, Operator::Like, pattern)
    }

    pub fn is_null<C: Column>(column: &C) -> Self {
        WhereClause::IsNull(Expr::column(column))
    }

    pub fn is_not_null<C: Column>(column: &C) -> Self {
        WhereClause::IsNotNull(Expr::column(column))
    }

    pub fn in_list<C: Column, V: Into<Value>>(column: &C, values: Vec<V>) -> Self {
        let values = values
            .into_iter()
            .map(|v| typed_for(column, v.into()))
            .collect();
        WhereClause::In(Expr::column(column), values)
    }

    fn column_op<C: Column, V: Into<Value>>(column: &C, op: Operator, value: V) -> Self {
        WhereClause::Compare(Expr::column(column), op, typed_for(column, value.into()))
    }

    /// Combines this clause with another using AND
    pub fn and(self, other: WhereClause) -> Self {
        WhereClause::And(Box::new(self), Box::new(other))
    }

    /// Combines this clause with another using OR
    pub fn or(self, other: WhereClause) -> Self {
        WhereClause::Or(Box::new(self), Box::new(other))
    }

    /// Negates this clause
    pub fn not(self) -> Self {
        WhereClause::Not(Box::new(self))
    }

    /// Builds the SQL string, binding every value through `writer`.
    pub(crate) fn build_sql(&self, writer: &mut SqlWriter<'_>) -> String {
        match self {
            WhereClause::Compare(left, op, right) => {
                let left = writer.expr(left);
                let right = writer.expr(right);
                format!("{} {} {}", left, op.as_sql(), right)
            }
            WhereClause::IsNull(expr) => format!("{} IS NULL", writer.expr(expr)),
            WhereClause::IsNotNull(expr) => format!("{} IS NOT NULL", writer.expr(expr)),
            WhereClause::In(expr, values) => {
                if values.is_empty() {
                    return "1 = 0".to_string();
                }
                let expr = writer.expr(expr);
                let values: Vec<String> = values.iter().map(|v| writer.expr(v)).collect();
                format!("{} IN ({})", expr, values.join(", "))
            }
            WhereClause::And(left, right) => {
                let left_sql = left.build_sql(writer);
                let right_sql = right.build_sql(writer);
                format!("({}) AND ({})", left_sql, right_sql)
            }
            WhereClause::Or(left, right) => {
                let left_sql = left.build_sql(writer);
                let right_sql = right.build_sql(writer);
                format!("({}) OR ({})", left_sql, right_sql)
            }
            WhereClause::Not(inner) => format!("NOT ({})", inner.build_sql(writer)),
        }
    }
}

/// A value expression typed after the column it is compared with.
fn typed_for<C: Column + ?Sized>(column: &C, value: Value) -> Expr {
    match column.column_type() {
        Some(type_name) => Expr::typed(value, type_name),
        None => Expr::value(value),
    }
}
