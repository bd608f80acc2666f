//! Bidirectional conversion between application values and the values sent
//! to and read from the database.
//!
//! Application values are [`serde_json::Value`]s; values bound into
//! statements are [`SqlValue`]s. Each logical column type (`integer`,
//! `decimal`, ...) has one [`TypeConverter`], looked up by name through a
//! [`TypeRegistry`].

mod decimal;
mod integer;
mod number;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{DbRsError, Result};
use crate::types::{BindingType, RowValues, SqlValue};

pub use decimal::DecimalType;
pub use integer::IntegerType;
pub use number::{format_float, is_numeric, LocaleNumberParser, NumberParser, PlainNumberParser};

/// Conversion strategy for one logical column type.
pub trait TypeConverter: Send + Sync + fmt::Debug {
    /// The logical type name this converter was built for.
    fn name(&self) -> &str;

    /// Converts an application value into the value bound into a statement.
    /// `null` and the empty string both become SQL `NULL`.
    fn to_database(&self, value: &Value) -> Result<SqlValue>;

    /// Converts a raw value read from the database into its canonical
    /// application representation. `null` is returned unchanged.
    fn to_native(&self, value: &Value) -> Result<Value>;

    /// Converts the named `fields` of one result row, leaving every other
    /// field untouched. Equivalent to calling [`to_native`] on each field.
    ///
    /// [`to_native`]: TypeConverter::to_native
    fn many_to_native(&self, mut row: RowValues, fields: &[&str]) -> Result<RowValues> {
        for field in fields {
            if let Some(value) = row.get_mut(*field) {
                if !value.is_null() {
                    *value = self.to_native(value)?;
                }
            }
        }
        Ok(row)
    }

    /// Parameter type the backend should use when binding `value`.
    fn binding_hint(&self, value: &Value) -> BindingType;

    /// Best-effort coercion of loosely typed external input (form fields,
    /// JSON payloads). Returns `null` for input that cannot be understood.
    fn marshal(&self, value: &Value) -> Value;
}

/// Converters keyed by logical type name.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    converters: HashMap<String, Arc<dyn TypeConverter>>,
}

impl TypeRegistry {
    /// A registry without any converter.
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, converter: impl TypeConverter + 'static) {
        self.converters.insert(name.into(), Arc::new(converter));
    }

    /// Registers one converter instance under several names.
    pub fn register_shared(&mut self, names: &[&str], converter: Arc<dyn TypeConverter>) {
        for name in names {
            self.converters
                .insert((*name).to_string(), Arc::clone(&converter));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.converters.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn TypeConverter>> {
        self.converters
            .get(name)
            .cloned()
            .ok_or_else(|| DbRsError::configuration(format!("Unknown type `{}`", name)))
    }

    /// Converts `value` for binding, through the converter registered for
    /// `type_name` when there is one, by inference otherwise.
    pub fn to_database(
        &self,
        value: &Value,
        type_name: Option<&str>,
    ) -> Result<(SqlValue, BindingType)> {
        match type_name.and_then(|name| self.converters.get(name)) {
            Some(converter) => {
                let converted = converter.to_database(value)?;
                let hint = if converted.is_null() {
                    BindingType::Null
                } else {
                    converter.binding_hint(value)
                };
                Ok((converted, hint))
            }
            None => {
                let converted = SqlValue::from_native(value);
                let hint = converted.binding_type();
                Ok((converted, hint))
            }
        }
    }
}

impl Default for TypeRegistry {
    /// The integer family and `decimal`.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_shared(
            &["integer", "biginteger", "smallinteger", "tinyinteger"],
            Arc::new(IntegerType::new()),
        );
        registry.register("decimal", DecimalType::new(Arc::new(PlainNumberParser)));
        registry
    }
}
