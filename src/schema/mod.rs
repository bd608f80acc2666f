//! Table descriptors and the dialect that turns them into DDL.

mod dialect;
mod table;

use serde_json::Value;

use crate::conversion::{format_float, is_numeric};

pub use dialect::{quote_identifier_with, AnsiSchemaDialect, SchemaDialect};
pub use table::{
    ColumnDef, ColumnType, Constraint, ConstraintKind, ForeignKeyAction, Index, TableSchema,
};

/// Wraps `value` in single quotes, doubling embedded ones.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Literal for values that can be embedded without quoting. `None` means
/// the value must be quoted as a string.
pub fn value_literal(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("NULL".to_string()),
        Value::Bool(true) => Some("TRUE".to_string()),
        Value::Bool(false) => Some("FALSE".to_string()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => match n.as_u64() {
                Some(u) => Some(u.to_string()),
                None => n.as_f64().map(format_float),
            },
        },
        Value::String(s) if s == "0" => Some(s.clone()),
        Value::String(s)
            if is_numeric(s)
                && !s.contains(',')
                && !s.starts_with('0')
                && !s.contains('e') =>
        {
            Some(s.clone())
        }
        _ => None,
    }
}

/// Text a non-literal value is quoted as.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
