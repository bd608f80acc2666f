use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use super::number::{format_float, is_numeric, NumberParser};
use super::TypeConverter;
use crate::error::{DbRsError, Result};
use crate::types::{BindingType, SqlValue};

static LOOSE_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9,. ]+$").expect("valid decimal pattern"));

/// Decimal type converter.
///
/// Decimal values are kept as strings end to end so no precision is lost to
/// floating point.
#[derive(Debug, Clone)]
pub struct DecimalType {
    parser: Arc<dyn NumberParser>,
    use_locale_parser: bool,
}

impl DecimalType {
    pub fn new(parser: Arc<dyn NumberParser>) -> Self {
        Self {
            parser,
            use_locale_parser: false,
        }
    }

    /// Sets whether `marshal` parses strings with the locale aware parser.
    ///
    /// Fails when enabling it with a parser that cannot parse localized
    /// numbers.
    pub fn use_locale_parser(mut self, enable: bool) -> Result<Self> {
        if enable && !self.parser.supports_locale_parsing() {
            return Err(DbRsError::configuration(format!(
                "Cannot use locale parsing with the {:?} number parser",
                self.parser
            )));
        }
        self.use_locale_parser = enable;
        Ok(self)
    }

    pub fn is_locale_parser_enabled(&self) -> bool {
        self.use_locale_parser
    }
}

fn number_to_string(n: &Number) -> String {
    match n.as_i64() {
        Some(i) => i.to_string(),
        None => match n.as_u64() {
            Some(u) => u.to_string(),
            None => n.as_f64().map(format_float).unwrap_or_else(|| n.to_string()),
        },
    }
}

impl TypeConverter for DecimalType {
    fn name(&self) -> &str {
        "decimal"
    }

    fn to_database(&self, value: &Value) -> Result<SqlValue> {
        match value {
            Value::Null => Ok(SqlValue::Null),
            Value::String(s) if s.is_empty() => Ok(SqlValue::Null),
            Value::String(s) if is_numeric(s) => Ok(SqlValue::Text(s.clone())),
            Value::Number(n) => Ok(match n.as_i64() {
                Some(i) => SqlValue::Int64(i),
                None => SqlValue::Text(number_to_string(n)),
            }),
            other => Err(DbRsError::conversion(format!(
                "Cannot convert value `{}` to a decimal",
                other
            ))),
        }
    }

    fn to_native(&self, value: &Value) -> Result<Value> {
        Ok(match value {
            Value::Null => Value::Null,
            Value::String(s) => Value::String(s.clone()),
            Value::Number(n) => Value::String(number_to_string(n)),
            Value::Bool(b) => Value::String(if *b { "1" } else { "0" }.to_string()),
            other => {
                return Err(DbRsError::conversion(format!(
                    "Cannot read value `{}` as a decimal",
                    other
                )))
            }
        })
    }

    fn binding_hint(&self, _value: &Value) -> BindingType {
        BindingType::Str
    }

    fn marshal(&self, value: &Value) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::String(s) if s.is_empty() => Value::Null,
            Value::String(s) if self.use_locale_parser => self
                .parser
                .parse_float(s)
                .map(|f| Value::String(format_float(f)))
                .unwrap_or(Value::Null),
            Value::Number(n) => Value::String(number_to_string(n)),
            Value::String(s) if is_numeric(s) || LOOSE_DECIMAL.is_match(s) => {
                Value::String(s.clone())
            }
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{LocaleNumberParser, PlainNumberParser};
    use serde_json::json;

    fn decimal() -> DecimalType {
        DecimalType::new(Arc::new(PlainNumberParser))
    }

    #[test]
    fn test_to_database() {
        let t = decimal();
        assert_eq!(t.to_database(&json!(null)).unwrap(), SqlValue::Null);
        assert_eq!(t.to_database(&json!("")).unwrap(), SqlValue::Null);
        assert_eq!(
            t.to_database(&json!("12.3400")).unwrap(),
            SqlValue::Text("12.3400".into())
        );
        assert_eq!(t.to_database(&json!(5)).unwrap(), SqlValue::Int64(5));
        assert_eq!(
            t.to_database(&json!(1.25)).unwrap(),
            SqlValue::Text("1.25".into())
        );
    }

    #[test]
    fn test_to_database_rejects_non_numeric() {
        let t = decimal();
        for value in [json!("abc"), json!(true), json!([1]), json!({"a": "1"})] {
            assert!(matches!(
                t.to_database(&value),
                Err(DbRsError::Conversion(_))
            ));
        }
    }

    #[test]
    fn test_round_trip_keeps_precision() {
        let t = decimal();
        for value in [json!("0.1"), json!("123456789012345678901234.5678"), json!(null)] {
            let stored: Value = t.to_database(&value).unwrap().into();
            assert_eq!(t.to_native(&stored).unwrap(), value);
        }
    }

    #[test]
    fn test_to_native_stringifies_numbers() {
        let t = decimal();
        assert_eq!(t.to_native(&json!(3)).unwrap(), json!("3"));
        assert_eq!(t.to_native(&json!(3.5)).unwrap(), json!("3.5"));
        assert_eq!(t.to_native(&json!(null)).unwrap(), json!(null));
    }

    #[test]
    fn test_marshal_without_locale_parser() {
        let t = decimal();
        assert_eq!(t.marshal(&json!("")), json!(null));
        assert_eq!(t.marshal(&json!("abc")), json!(null));
        assert_eq!(t.marshal(&json!("1,234.5")), json!("1,234.5"));
        assert_eq!(t.marshal(&json!("3.25")), json!("3.25"));
        assert_eq!(t.marshal(&json!(2.5)), json!("2.5"));
        assert_eq!(t.marshal(&json!([1])), json!(null));
    }

    #[test]
    fn test_marshal_with_locale_parser() {
        let t = DecimalType::new(Arc::new(LocaleNumberParser::de_de()))
            .use_locale_parser(true)
            .unwrap();
        assert!(t.is_locale_parser_enabled());
        assert_eq!(t.marshal(&json!("1.234,5")), json!("1234.5"));
        assert_eq!(t.marshal(&json!("zwei")), json!(null));
    }

    #[test]
    fn test_locale_parser_requires_compatible_parser() {
        let err = decimal().use_locale_parser(true).unwrap_err();
        assert!(matches!(err, DbRsError::Configuration(_)));

        let t = decimal().use_locale_parser(false).unwrap();
        assert!(!t.is_locale_parser_enabled());
    }

    #[test]
    fn test_binding_hint() {
        assert_eq!(decimal().binding_hint(&json!("1.5")), BindingType::Str);
    }
}
