//! PostgreSQL backend.
//!
//! ```no_run
//! use dbrs::drivers::PostgresBackend;
//! use dbrs::{DatabaseDriver, Driver, DriverConfig};
//!
//! let config = DriverConfig {
//!     username: Some("app".to_string()),
//!     password: Some("secret".to_string()),
//!     database: Some("app".to_string()),
//!     ..Default::default()
//! };
//! let mut driver = Driver::new(PostgresBackend::new(), config)?;
//! driver.connect()?;
//! # Ok::<(), dbrs::DbRsError>(())
//! ```

mod connection;
mod dialect;
mod numeric;

use crate::config::DriverConfig;
use crate::error::BackendError;
use crate::feature::DriverFeature;
use crate::query::{PlaceholderStyle, Query, QueryType};
use crate::schema::{quote_string, SchemaDialect};
use crate::traits::{base_supports, Backend, Connection, QueryTranslator};

use self::connection::PgConnection;

pub use self::dialect::PostgresSchemaDialect;

/// Identifiers longer than this are truncated by the server.
const MAX_IDENTIFIER_LENGTH: usize = 63;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresBackend {
    dialect: PostgresSchemaDialect,
}

impl PostgresBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Quotes a keyword/value connection string value when it needs it.
fn dsn_value(value: &str) -> String {
    let plain = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

/// Inserts return the written row so generated keys are readable.
fn returning_insert(query: Query) -> Query {
    if query.epilog_sql().is_some() {
        query
    } else {
        query.epilog("RETURNING *")
    }
}

fn unchanged(query: Query) -> Query {
    query
}

impl Backend for PostgresBackend {
    fn name(&self) -> &'static str {
        "Postgres"
    }

    fn base_config(&self) -> DriverConfig {
        DriverConfig {
            host: Some("localhost".to_string()),
            port: Some(5432),
            username: Some("postgres".to_string()),
            database: Some("postgres".to_string()),
            schema: Some("public".to_string()),
            encoding: Some("utf8".to_string()),
            ..Default::default()
        }
    }

    /// Keyword/value connection string. The password is never part of it.
    fn dsn(&self, config: &DriverConfig) -> String {
        let mut parts = Vec::new();
        if let Some(host) = &config.host {
            parts.push(format!("host={}", dsn_value(host)));
        }
        if let Some(port) = config.port {
            parts.push(format!("port={}", port));
        }
        if let Some(username) = &config.username {
            parts.push(format!("user={}", dsn_value(username)));
        }
        if let Some(database) = &config.database {
            parts.push(format!("dbname={}", dsn_value(database)));
        }
        for (key, value) in &config.flags {
            parts.push(format!("{}={}", key, dsn_value(value)));
        }
        parts.join(" ")
    }

    fn connect(
        &self,
        dsn: &str,
        config: &DriverConfig,
    ) -> Result<Box<dyn Connection>, BackendError> {
        let connection = PgConnection::open(dsn, config.password.as_deref())?;
        Ok(Box::new(connection))
    }

    fn after_connect(
        &self,
        connection: &mut dyn Connection,
        config: &DriverConfig,
    ) -> Result<(), BackendError> {
        if let Some(encoding) = config.encoding.as_deref().filter(|e| !e.is_empty()) {
            connection.exec(&format!("SET NAMES {}", quote_string(encoding)))?;
        }
        if let Some(schema) = config.schema.as_deref().filter(|s| !s.is_empty()) {
            connection.exec(&format!("SET search_path TO {}", quote_string(schema)))?;
        }
        if let Some(timezone) = config.timezone.as_deref().filter(|t| !t.is_empty()) {
            connection.exec(&format!("SET TIME ZONE {}", quote_string(timezone)))?;
        }
        for statement in &config.init {
            connection.exec(statement)?;
        }
        Ok(())
    }

    fn retry_error_codes(&self) -> Vec<String> {
        // cannot_connect_now, connection failures, too_many_connections
        ["57P03", "08001", "08006", "53300"]
            .iter()
            .map(|code| code.to_string())
            .collect()
    }

    fn schema_dialect(&self) -> &dyn SchemaDialect {
        &self.dialect
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    fn query_translator(&self, kind: QueryType) -> QueryTranslator {
        match kind {
            QueryType::Insert => returning_insert,
            _ => unchanged,
        }
    }

    fn supports(&self, feature: DriverFeature) -> bool {
        match feature {
            DriverFeature::Cte
            | DriverFeature::Json
            | DriverFeature::TruncateWithConstraints
            | DriverFeature::Window => true,
            DriverFeature::DisableConstraintWithoutTransaction => false,
            other => base_supports(other),
        }
    }

    fn max_alias_length(&self) -> Option<usize> {
        Some(MAX_IDENTIFIER_LENGTH)
    }
}
