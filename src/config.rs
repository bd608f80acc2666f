use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{DbRsError, Result};
use crate::log::QueryLogger;
use crate::schema::TableSchema;

/// Builds the descriptor returned by `Driver::new_table_schema`.
pub type TableSchemaFactory = fn(String) -> TableSchema;

/// Query logging setting of a driver.
///
/// Deserializes from a boolean; a custom sink can only be installed in code.
#[derive(Clone, Default, Deserialize)]
#[serde(from = "bool")]
pub enum LogConfig {
    #[default]
    Disabled,
    /// Log through the default `tracing` sink.
    Enabled,
    Sink(Arc<dyn QueryLogger>),
}

impl From<bool> for LogConfig {
    fn from(value: bool) -> Self {
        if value {
            LogConfig::Enabled
        } else {
            LogConfig::Disabled
        }
    }
}

impl fmt::Debug for LogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogConfig::Disabled => f.write_str("Disabled"),
            LogConfig::Enabled => f.write_str("Enabled"),
            LogConfig::Sink(_) => f.write_str("Sink(..)"),
        }
    }
}

/// Driver configuration.
///
/// Unset options fall back to the backend's defaults when the driver is
/// constructed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverConfig {
    pub username: Option<String>,
    /// Legacy spelling of `username`; rejected.
    pub login: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    /// Backend connection flags, passed through as connection options.
    pub flags: BTreeMap<String, String>,
    pub log: LogConfig,
    pub quote_identifiers: bool,
    pub schema: Option<String>,
    pub encoding: Option<String>,
    pub timezone: Option<String>,
    /// Statements run on every new connection.
    pub init: Vec<String>,
    /// Error codes that make a failed connect attempt retryable. Overrides
    /// the backend's own list when set.
    pub retry_error_codes: Option<Vec<String>>,
    #[serde(skip)]
    pub table_schema: Option<TableSchemaFactory>,
}

impl DriverConfig {
    /// Fills every unset option from `base`.
    pub fn merge_defaults(self, base: DriverConfig) -> DriverConfig {
        let mut flags = base.flags;
        flags.extend(self.flags);

        DriverConfig {
            username: self.username.or(base.username),
            login: self.login,
            password: self.password.or(base.password),
            host: self.host.or(base.host),
            port: self.port.or(base.port),
            database: self.database.or(base.database),
            flags,
            log: match self.log {
                LogConfig::Disabled => base.log,
                log => log,
            },
            quote_identifiers: self.quote_identifiers || base.quote_identifiers,
            schema: self.schema.or(base.schema),
            encoding: self.encoding.or(base.encoding),
            timezone: self.timezone.or(base.timezone),
            init: if self.init.is_empty() {
                base.init
            } else {
                self.init
            },
            retry_error_codes: self.retry_error_codes.or(base.retry_error_codes),
            table_schema: self.table_schema.or(base.table_schema),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let has_username = self.username.as_deref().is_some_and(|u| !u.is_empty());
        let has_login = self.login.as_deref().is_some_and(|l| !l.is_empty());
        if !has_username && has_login {
            return Err(DbRsError::configuration(
                "Please pass \"username\" instead of \"login\" for connecting to the database",
            ));
        }
        Ok(())
    }
}
