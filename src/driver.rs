//! The driver: sole owner of one backend connection and the gateway for
//! every execution on it.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, Level};

use crate::config::{DriverConfig, LogConfig};
use crate::conversion::TypeRegistry;
use crate::error::{BackendError, DbRsError, Result};
use crate::feature::DriverFeature;
use crate::log::{LogContext, LoggedQuery, QueryLogger, TracingQueryLogger};
use crate::query::{Query, QueryCompiler, QueryType, ValueBinder};
use crate::retry::{CommandRetry, ErrorCodeWaitStrategy};
use crate::schema::{value_literal, value_text, SchemaDialect, TableSchema};
use crate::statement::{Statement, StatementSource};
use crate::traits::{Backend, Connection, DatabaseDriver};
use crate::types::BindingType;

/// Attempts made to open a connection before giving up.
const CONNECT_MAX_ATTEMPTS: usize = 4;

/// Whether the driver currently holds a connection.
pub enum ConnectionState {
    Disconnected,
    Connected(Box<dyn Connection>),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }
}

/// A database driver for backend `B`.
///
/// The connection is opened lazily by the first operation that needs it and
/// released on [`disconnect`](DatabaseDriver::disconnect) or drop.
pub struct Driver<B: Backend> {
    backend: B,
    config: DriverConfig,
    state: ConnectionState,
    version: Option<String>,
    auto_quoting: bool,
    connect_retries: usize,
    logger: Option<Arc<dyn QueryLogger>>,
    types: Arc<TypeRegistry>,
}

impl<B: Backend> Driver<B> {
    /// Validates `config` and fills it with the backend's defaults. No
    /// connection is opened yet.
    pub fn new(backend: B, config: DriverConfig) -> Result<Self> {
        config.validate()?;
        let config = config.merge_defaults(backend.base_config());

        let logger: Option<Arc<dyn QueryLogger>> = match &config.log {
            LogConfig::Disabled => None,
            LogConfig::Enabled => Some(Arc::new(TracingQueryLogger)),
            LogConfig::Sink(sink) => Some(Arc::clone(sink)),
        };

        Ok(Self {
            auto_quoting: config.quote_identifiers,
            backend,
            config,
            state: ConnectionState::Disconnected,
            version: None,
            connect_retries: 0,
            logger,
            types: Arc::new(TypeRegistry::default()),
        })
    }

    /// Replaces the converters used to bind and cast values.
    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = Arc::new(types);
        self
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Attempts the last connect took, whether it succeeded or not.
    pub fn connect_retries(&self) -> usize {
        self.connect_retries
    }

    pub fn logger(&self) -> Option<&Arc<dyn QueryLogger>> {
        self.logger.as_ref()
    }

    pub fn set_logger(&mut self, logger: Arc<dyn QueryLogger>) {
        self.logger = Some(logger);
    }

    /// Opens a connection to `dsn`, retrying on the backend's transient
    /// error codes (or the configured `retryErrorCodes`).
    pub fn connect_with_retry(&mut self, dsn: &str) -> Result<Box<dyn Connection>> {
        let codes = self
            .config
            .retry_error_codes
            .clone()
            .unwrap_or_else(|| self.backend.retry_error_codes());
        let strategy = ErrorCodeWaitStrategy::new(codes, self.backend.connect_retry_delay());
        let mut retry = CommandRetry::new(strategy, CONNECT_MAX_ATTEMPTS);

        let backend = &self.backend;
        let config = &self.config;
        let result = retry.run(|| backend.connect(dsn, config));
        self.connect_retries = retry.attempts();

        result.map_err(|source| self.connection_error(source))
    }

    /// Runs `statement` against the server, logging the outcome either way.
    pub fn execute_statement(&self, statement: &mut Statement) -> Result<()> {
        let started = Instant::now();
        let result = statement.execute_native();
        let params = statement.param_values();
        let names = statement
            .bound_params()
            .iter()
            .map(|param| param.name.clone())
            .collect();

        match result {
            Ok(()) => {
                let context =
                    LogContext::success(params, statement.row_count(), started.elapsed())
                        .with_names(names);
                self.log(statement.query_string(), context);
                Ok(())
            }
            Err(error) => {
                self.log(
                    statement.query_string(),
                    LogContext::failure(params, &error).with_names(names),
                );
                Err(DbRsError::Execution(error))
            }
        }
    }

    pub fn savepoint_sql(&self, name: &str) -> String {
        self.backend.savepoint_sql(name)
    }

    pub fn release_savepoint_sql(&self, name: &str) -> String {
        self.backend.release_savepoint_sql(name)
    }

    pub fn rollback_savepoint_sql(&self, name: &str) -> String {
        self.backend.rollback_savepoint_sql(name)
    }

    pub fn disable_foreign_key_sql(&self) -> String {
        self.backend.disable_foreign_key_sql()
    }

    pub fn enable_foreign_key_sql(&self) -> String {
        self.backend.enable_foreign_key_sql()
    }

    fn connection_error(&self, source: BackendError) -> DbRsError {
        DbRsError::Connection {
            driver: self.backend.name().to_string(),
            reason: source.message.clone(),
            source,
        }
    }

    /// The open connection, connecting first when there is none.
    fn connection(&mut self) -> Result<&mut Box<dyn Connection>> {
        if !self.state.is_connected() {
            self.connect()?;
        }
        match &mut self.state {
            ConnectionState::Connected(connection) => Ok(connection),
            ConnectionState::Disconnected => Err(DbRsError::Connection {
                driver: self.backend.name().to_string(),
                reason: "connection was not established".to_string(),
                source: BackendError::new("connection was not established"),
            }),
        }
    }
}

impl<B: Backend> DatabaseDriver for Driver<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn enabled(&self) -> bool {
        self.backend.enabled()
    }

    fn connect(&mut self) -> Result<()> {
        if self.state.is_connected() {
            return Ok(());
        }

        let dsn = self.backend.dsn(&self.config);
        let mut connection = self.connect_with_retry(&dsn)?;
        if let Err(source) = self.backend.after_connect(connection.as_mut(), &self.config) {
            return Err(self.connection_error(source));
        }

        self.state = ConnectionState::Connected(connection);
        debug!(
            driver = self.backend.name(),
            attempts = self.connect_retries,
            "connected"
        );
        Ok(())
    }

    fn disconnect(&mut self) {
        if let ConnectionState::Connected(_) =
            std::mem::replace(&mut self.state, ConnectionState::Disconnected)
        {
            debug!(driver = self.backend.name(), "disconnected");
        }
        self.version = None;
    }

    fn is_connected(&mut self) -> bool {
        let alive = match &mut self.state {
            ConnectionState::Disconnected => return false,
            ConnectionState::Connected(connection) => connection.ping().is_ok(),
        };
        if !alive {
            debug!(driver = self.backend.name(), "connection probe failed");
            self.disconnect();
        }
        alive
    }

    fn version(&mut self) -> Result<String> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }
        let version = self
            .connection()?
            .server_version()
            .map_err(DbRsError::Execution)?;
        self.version = Some(version.clone());
        Ok(version)
    }

    fn exec(&mut self, sql: &str) -> Result<u64> {
        let started = Instant::now();
        let result = self.connection()?.exec(sql);
        match result {
            Ok(affected) => {
                self.log(sql, LogContext::success(Vec::new(), affected, started.elapsed()));
                Ok(affected)
            }
            Err(error) => {
                self.log(sql, LogContext::failure(Vec::new(), &error));
                Err(DbRsError::Execution(error))
            }
        }
    }

    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
        types: &[Option<&str>],
    ) -> Result<Statement> {
        let mut statement = self.prepare(StatementSource::Sql(sql))?;
        if !params.is_empty() {
            statement.bind(params, types)?;
        }
        self.execute_statement(&mut statement)?;
        Ok(statement)
    }

    fn run(&mut self, query: &mut Query) -> Result<Statement> {
        let mut statement = self.prepare(StatementSource::Query(&mut *query))?;
        query.binder().attach_to(&mut statement)?;
        self.execute_statement(&mut statement)?;
        Ok(statement)
    }

    fn prepare(&mut self, source: StatementSource<'_>) -> Result<Statement> {
        match source {
            StatementSource::Sql(sql) => {
                let native = self
                    .connection()?
                    .prepare(sql)
                    .map_err(DbRsError::Execution)?;
                Ok(Statement::new(
                    self.backend.name(),
                    sql,
                    native,
                    Arc::clone(&self.types),
                ))
            }
            StatementSource::Query(query) => {
                let sql = query.sql(&*self)?;
                let native = self
                    .connection()?
                    .prepare(&sql)
                    .map_err(DbRsError::Execution)?;
                let mut statement =
                    Statement::new(self.backend.name(), sql, native, Arc::clone(&self.types));
                if query.kind() == QueryType::Select && query.is_results_casting_enabled() {
                    statement.set_type_map(query.select_types().clone());
                }
                Ok(statement)
            }
        }
    }

    fn begin_transaction(&mut self) -> Result<bool> {
        if self.connection()?.in_transaction() {
            return Ok(true);
        }
        self.log("BEGIN", LogContext::default());
        self.connection()?.begin().map_err(DbRsError::Execution)?;
        Ok(true)
    }

    fn commit_transaction(&mut self) -> Result<bool> {
        if !self.in_transaction() {
            return Ok(false);
        }
        self.log("COMMIT", LogContext::default());
        self.connection()?.commit().map_err(DbRsError::Execution)?;
        Ok(true)
    }

    fn rollback_transaction(&mut self) -> Result<bool> {
        if !self.in_transaction() {
            return Ok(false);
        }
        self.log("ROLLBACK", LogContext::default());
        self.connection()?.rollback().map_err(DbRsError::Execution)?;
        Ok(true)
    }

    fn in_transaction(&self) -> bool {
        match &self.state {
            ConnectionState::Connected(connection) => connection.in_transaction(),
            ConnectionState::Disconnected => false,
        }
    }

    fn quote(&mut self, value: &str, binding: BindingType) -> Result<String> {
        Ok(self.connection()?.quote(value, binding))
    }

    fn schema_value(&mut self, value: &Value) -> Result<String> {
        match value_literal(value) {
            Some(literal) => Ok(literal),
            None => self.quote(&value_text(value), BindingType::Str),
        }
    }

    fn schema(&self) -> &str {
        self.config.schema.as_deref().unwrap_or_default()
    }

    fn last_insert_id(&mut self, name: Option<&str>) -> Result<String> {
        self.connection()?
            .last_insert_id(name)
            .map_err(DbRsError::Execution)
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        self.backend.schema_dialect().quote_identifier(identifier)
    }

    fn schema_dialect(&self) -> &dyn SchemaDialect {
        self.backend.schema_dialect()
    }

    fn compile_query(&self, query: Query, binder: &mut ValueBinder) -> Result<(Query, String)> {
        let translate = self.backend.query_translator(query.kind());
        let translated = translate(query);
        let sql = self
            .new_compiler()
            .compile(&translated, binder, self.backend.schema_dialect())?;
        Ok((translated, sql))
    }

    fn new_compiler(&self) -> QueryCompiler {
        QueryCompiler::new(self.backend.placeholder_style()).with_auto_quoting(self.auto_quoting)
    }

    fn new_table_schema(&self, table: &str) -> TableSchema {
        match self.config.table_schema {
            Some(factory) => factory(table.to_string()),
            None => TableSchema::new(table),
        }
    }

    fn supports(&self, feature: DriverFeature) -> bool {
        self.backend.supports(feature)
    }

    fn enable_auto_quoting(&mut self, enable: bool) {
        self.auto_quoting = enable;
    }

    fn is_auto_quoting_enabled(&self) -> bool {
        self.auto_quoting
    }

    fn max_alias_length(&self) -> Option<usize> {
        self.backend.max_alias_length()
    }

    fn log(&self, message: &str, context: LogContext) -> bool {
        let Some(logger) = &self.logger else {
            return false;
        };
        let query = LoggedQuery::new(self.backend.name(), message, context);
        logger.log(Level::DEBUG, &query.to_string(), &query);
        true
    }
}

impl<B: Backend> Drop for Driver<B> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<B: Backend> fmt::Debug for Driver<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("backend", &self.backend.name())
            .field("connected", &self.state.is_connected())
            .field("version", &self.version)
            .field("auto_quoting", &self.auto_quoting)
            .field("connect_retries", &self.connect_retries)
            .field("logging", &self.logger.is_some())
            .finish()
    }
}
