use serde_json::Value;

use crate::error::Result;
use crate::statement::Statement;

/// One bound value of a compiled query.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Placeholder name, e.g. `:c0`.
    pub placeholder: String,
    /// 1-based position of the value among the query's parameters.
    pub position: usize,
    pub value: Value,
    /// Logical type used to convert the value, inferred when `None`.
    pub type_name: Option<String>,
}

/// Placeholder to value mapping collected while compiling one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueBinder {
    bindings: Vec<Binding>,
    counter: usize,
}

impl ValueBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a fresh placeholder name from `token`.
    pub fn placeholder(&mut self, token: &str) -> String {
        let name = format!(":{}{}", token, self.counter);
        self.counter += 1;
        name
    }

    /// Binds `value` to `placeholder` and returns its position. Binding the
    /// same placeholder again replaces the value but keeps the position.
    pub fn bind(
        &mut self,
        placeholder: impl Into<String>,
        value: Value,
        type_name: Option<&str>,
    ) -> usize {
        let placeholder = placeholder.into();
        let type_name = type_name.map(str::to_string);

        if let Some(existing) = self
            .bindings
            .iter_mut()
            .find(|b| b.placeholder == placeholder)
        {
            existing.value = value;
            existing.type_name = type_name;
            return existing.position;
        }

        let position = self.bindings.len() + 1;
        self.bindings.push(Binding {
            placeholder,
            position,
            value,
            type_name,
        });
        position
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Clears all bindings and restarts placeholder numbering.
    pub fn reset(&mut self) {
        self.bindings.clear();
        self.counter = 0;
    }

    /// Binds every value into `statement`, converting each through its
    /// logical type.
    pub fn attach_to(&self, statement: &mut Statement) -> Result<()> {
        for binding in &self.bindings {
            statement.bind_value(
                &binding.placeholder,
                &binding.value,
                binding.type_name.as_deref(),
            )?;
        }
        Ok(())
    }
}
