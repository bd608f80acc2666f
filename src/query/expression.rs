use serde_json::Value;

use crate::traits::{Column, ColumnRef};

/// A node of a query's expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column or other identifier, optionally dotted (`users.id`).
    Identifier(String),
    /// A value bound as a query parameter.
    Value {
        value: Value,
        type_name: Option<String>,
    },
    Function(FunctionExpr),
    Collated(StringExpr),
    /// SQL emitted verbatim.
    Raw(String),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    pub fn column<C: Column + ?Sized>(column: &C) -> Self {
        Expr::Identifier(column.qualified_name())
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Expr::Value {
            value: value.into(),
            type_name: None,
        }
    }

    pub fn typed(value: impl Into<Value>, type_name: &str) -> Self {
        Expr::Value {
            value: value.into(),
            type_name: Some(type_name.to_string()),
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }
}

impl From<ColumnRef> for Expr {
    fn from(column: ColumnRef) -> Self {
        Expr::Identifier(column.qualified_name())
    }
}

impl From<FunctionExpr> for Expr {
    fn from(function: FunctionExpr) -> Self {
        Expr::Function(function)
    }
}

impl From<StringExpr> for Expr {
    fn from(string: StringExpr) -> Self {
        Expr::Collated(string)
    }
}

/// A SQL function call such as `COUNT(*)` or `COALESCE(a, b)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    name: String,
    args: Vec<Expr>,
    return_type: String,
}

impl FunctionExpr {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    /// Logical type of the function's result.
    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    pub fn returning(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = type_name.into();
        self
    }
}

/// Builds a call to the SQL function `name`.
pub fn func(name: impl Into<String>, args: Vec<Expr>) -> FunctionExpr {
    FunctionExpr {
        name: name.into(),
        args,
        return_type: "string".to_string(),
    }
}

pub fn count(expr: Expr) -> FunctionExpr {
    func("COUNT", vec![expr]).returning("integer")
}

pub fn sum(expr: Expr) -> FunctionExpr {
    func("SUM", vec![expr]).returning("decimal")
}

pub fn avg(expr: Expr) -> FunctionExpr {
    func("AVG", vec![expr]).returning("decimal")
}

pub fn min(expr: Expr) -> FunctionExpr {
    func("MIN", vec![expr])
}

pub fn max(expr: Expr) -> FunctionExpr {
    func("MAX", vec![expr])
}

pub fn coalesce(args: Vec<Expr>) -> FunctionExpr {
    func("COALESCE", args)
}

pub fn concat(args: Vec<Expr>) -> FunctionExpr {
    func("CONCAT", args)
}

pub fn now() -> FunctionExpr {
    func("NOW", vec![]).returning("datetime")
}

pub fn rand() -> FunctionExpr {
    func("RAND", vec![]).returning("float")
}

/// A string bound as a parameter and compared under a collation.
#[derive(Debug, Clone, PartialEq)]
pub struct StringExpr {
    string: String,
    collation: String,
}

impl StringExpr {
    pub fn new(string: impl Into<String>, collation: impl Into<String>) -> Self {
        Self {
            string: string.into(),
            collation: collation.into(),
        }
    }

    pub fn string(&self) -> &str {
        &self.string
    }

    pub fn collation(&self) -> &str {
        &self.collation
    }

    pub fn set_collation(&mut self, collation: impl Into<String>) {
        self.collation = collation.into();
    }
}
