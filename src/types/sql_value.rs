use serde::Serialize;
use serde_json::Value;

/// Represents a SQL parameter value in a driver-agnostic way.
/// Drivers are responsible for converting these to their native types.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Text(String),
    Int32(i32),
    Int64(i64),
    Float(f64),
    Bool(bool),
}

/// The low-level parameter type a backend should use when binding a value
/// into a prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingType {
    Null,
    Bool,
    Int,
    Str,
    Lob,
}

impl SqlValue {
    /// Infers a wire value for an application value that has no declared
    /// logical type. Arrays and objects are bound as their JSON text.
    pub fn from_native(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int64(i),
                None => n.as_f64().map(SqlValue::Float).unwrap_or(SqlValue::Null),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        }
    }

    /// Binding type inferred from the value's variant.
    pub fn binding_type(&self) -> BindingType {
        match self {
            SqlValue::Null => BindingType::Null,
            SqlValue::Bool(_) => BindingType::Bool,
            SqlValue::Int32(_) | SqlValue::Int64(_) => BindingType::Int,
            SqlValue::Float(_) | SqlValue::Text(_) => BindingType::Str,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int64(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

impl From<SqlValue> for Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Value::Null,
            SqlValue::Text(s) => Value::String(s),
            SqlValue::Int32(i) => Value::from(i),
            SqlValue::Int64(i) => Value::from(i),
            SqlValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Bool(b) => Value::Bool(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_native_infers_variants() {
        assert_eq!(SqlValue::from_native(&json!(null)), SqlValue::Null);
        assert_eq!(SqlValue::from_native(&json!(7)), SqlValue::Int64(7));
        assert_eq!(SqlValue::from_native(&json!(1.5)), SqlValue::Float(1.5));
        assert_eq!(SqlValue::from_native(&json!("a")), SqlValue::Text("a".into()));
        assert_eq!(
            SqlValue::from_native(&json!([1, 2])),
            SqlValue::Text("[1,2]".into())
        );
    }

    #[test]
    fn test_binding_type() {
        assert_eq!(SqlValue::Int32(1).binding_type(), BindingType::Int);
        assert_eq!(SqlValue::from("x").binding_type(), BindingType::Str);
        assert_eq!(SqlValue::Null.binding_type(), BindingType::Null);
        assert_eq!(SqlValue::from(None::<i32>), SqlValue::Null);
    }
}
