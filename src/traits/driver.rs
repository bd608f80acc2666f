use serde_json::Value;

use crate::error::Result;
use crate::feature::DriverFeature;
use crate::log::LogContext;
use crate::query::{Query, QueryCompiler, ValueBinder};
use crate::schema::{SchemaDialect, TableSchema};
use crate::statement::{Statement, StatementSource};
use crate::types::BindingType;

/// Trait for database driver implementations.
/// A driver owns at most one connection and is the single gateway for:
/// - Connecting to the database, lazily and with retries
/// - Compiling queries and binding their values
/// - Executing statements and logging every execution
/// - Transaction control and dialect capabilities
///
/// All calls block until the database has answered.
pub trait DatabaseDriver: Send {
    fn name(&self) -> &str;

    fn enabled(&self) -> bool;

    /// Opens the connection. A no-op when one is already open.
    fn connect(&mut self) -> Result<()>;

    /// Drops the connection and the cached server version.
    fn disconnect(&mut self);

    /// Probes the connection; false when there is none or the probe fails.
    fn is_connected(&mut self) -> bool;

    /// Server version, fetched once per connection.
    fn version(&mut self) -> Result<String>;

    /// Runs `sql` unprepared and returns the affected row count.
    fn exec(&mut self, sql: &str) -> Result<u64>;

    /// Prepares `sql`, binds `params` positionally with the matching
    /// `types`, and executes it.
    fn execute(&mut self, sql: &str, params: &[Value], types: &[Option<&str>])
        -> Result<Statement>;

    /// Compiles and executes `query` with the query's own value binder.
    fn run(&mut self, query: &mut Query) -> Result<Statement>;

    fn prepare(&mut self, source: StatementSource<'_>) -> Result<Statement>;

    /// Returns true without doing anything when a transaction is already
    /// open.
    fn begin_transaction(&mut self) -> Result<bool>;

    /// Returns false without doing anything when no transaction is open.
    fn commit_transaction(&mut self) -> Result<bool>;

    /// Returns false without doing anything when no transaction is open.
    fn rollback_transaction(&mut self) -> Result<bool>;

    fn in_transaction(&self) -> bool;

    fn quote(&mut self, value: &str, binding: BindingType) -> Result<String>;

    /// Literal for embedding `value` in DDL.
    fn schema_value(&mut self, value: &Value) -> Result<String>;

    fn schema(&self) -> &str;

    fn last_insert_id(&mut self, name: Option<&str>) -> Result<String>;

    fn quote_identifier(&self, identifier: &str) -> String;

    fn schema_dialect(&self) -> &dyn SchemaDialect;

    /// Translates `query` for this backend and compiles it into `binder`.
    /// Returns the translated query along with its SQL.
    fn compile_query(&self, query: Query, binder: &mut ValueBinder) -> Result<(Query, String)>;

    fn new_compiler(&self) -> QueryCompiler;

    fn new_table_schema(&self, table: &str) -> TableSchema;

    fn supports(&self, feature: DriverFeature) -> bool;

    /// Feature lookup by name; unknown names are unsupported.
    fn supports_named(&self, feature: &str) -> bool {
        feature
            .parse::<DriverFeature>()
            .map(|feature| self.supports(feature))
            .unwrap_or(false)
    }

    fn enable_auto_quoting(&mut self, enable: bool);

    fn disable_auto_quoting(&mut self) {
        self.enable_auto_quoting(false);
    }

    fn is_auto_quoting_enabled(&self) -> bool;

    fn max_alias_length(&self) -> Option<usize>;

    /// Forwards `message` to the query logger. False when none is set.
    fn log(&self, message: &str, context: LogContext) -> bool;
}
