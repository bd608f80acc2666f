use serde_json::Value;

use super::number::is_numeric;
use super::TypeConverter;
use crate::error::{DbRsError, Result};
use crate::types::{BindingType, SqlValue};

/// Integer type converter.
///
/// Floats and numeric strings are truncated toward zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl IntegerType {
    pub fn new() -> Self {
        Self
    }
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Integer value of a scalar, or `None` if it does not hold a number.
fn scalar_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                if is_numeric(trimmed) {
                    trimmed.parse::<f64>().ok().map(|f| f.trunc() as i64)
                } else {
                    None
                }
            })
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

impl TypeConverter for IntegerType {
    fn name(&self) -> &str {
        "integer"
    }

    fn to_database(&self, value: &Value) -> Result<SqlValue> {
        if is_blank(value) {
            return Ok(SqlValue::Null);
        }

        scalar_to_i64(value).map(SqlValue::Int64).ok_or_else(|| {
            DbRsError::conversion(format!(
                "Cannot convert value of type `{}` to integer",
                type_label(value)
            ))
        })
    }

    fn to_native(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        scalar_to_i64(value).map(Value::from).ok_or_else(|| {
            DbRsError::conversion(format!(
                "Cannot read value of type `{}` as integer",
                type_label(value)
            ))
        })
    }

    fn binding_hint(&self, _value: &Value) -> BindingType {
        BindingType::Int
    }

    fn marshal(&self, value: &Value) -> Value {
        if is_blank(value) {
            return Value::Null;
        }
        match value {
            // Arrays marshal to 1; existing callers depend on it.
            Value::Array(_) => Value::from(1),
            Value::Number(_) => scalar_to_i64(value).map(Value::from).unwrap_or(Value::Null),
            Value::String(s) if is_numeric(s) => {
                scalar_to_i64(value).map(Value::from).unwrap_or(Value::Null)
            }
            _ => Value::Null,
        }
    }
}
