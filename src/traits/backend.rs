use std::time::Duration;

use crate::config::DriverConfig;
use crate::error::BackendError;
use crate::feature::DriverFeature;
use crate::query::{PlaceholderStyle, Query, QueryType};
use crate::schema::{quote_string, SchemaDialect};
use crate::statement::BoundParam;
use crate::types::{BindingType, RawQueryResult};

/// Rewrites a query into the backend's dialect before compilation.
pub type QueryTranslator = fn(Query) -> Query;

/// One open connection to a database server.
///
/// Every call blocks until the server has answered.
pub trait Connection: Send {
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn NativeStatement>, BackendError>;

    /// Runs `sql` without preparing it and returns the affected row count.
    fn exec(&mut self, sql: &str) -> Result<u64, BackendError>;

    /// Lightweight liveness probe, usually `SELECT 1`.
    fn ping(&mut self) -> Result<(), BackendError>;

    fn server_version(&mut self) -> Result<String, BackendError>;

    fn in_transaction(&self) -> bool;

    fn begin(&mut self) -> Result<(), BackendError>;

    fn commit(&mut self) -> Result<(), BackendError>;

    fn rollback(&mut self) -> Result<(), BackendError>;

    /// Last generated id, optionally of a named sequence or table.
    fn last_insert_id(&mut self, name: Option<&str>) -> Result<String, BackendError>;

    /// Escapes `value` as a literal for direct embedding in SQL.
    fn quote(&self, value: &str, _binding: BindingType) -> String {
        quote_string(value)
    }
}

/// A statement prepared on a [`Connection`].
pub trait NativeStatement: Send {
    fn execute(&mut self, params: &[BoundParam]) -> Result<RawQueryResult, BackendError>;

    /// Last generated id on the connection this statement belongs to.
    fn last_insert_id(&mut self, name: Option<&str>) -> Result<String, BackendError>;
}

/// Everything that differs between database servers.
pub trait Backend: Send + Sync {
    /// Name reported in logs and connection errors.
    fn name(&self) -> &'static str;

    /// Whether the backend can be used in this build.
    fn enabled(&self) -> bool {
        true
    }

    /// Defaults merged under the user's configuration.
    fn base_config(&self) -> DriverConfig;

    fn dsn(&self, config: &DriverConfig) -> String;

    fn connect(
        &self,
        dsn: &str,
        config: &DriverConfig,
    ) -> Result<Box<dyn Connection>, BackendError>;

    /// Session setup run once on every new connection.
    fn after_connect(
        &self,
        _connection: &mut dyn Connection,
        _config: &DriverConfig,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    /// Native error codes that make a failed connect attempt retryable.
    fn retry_error_codes(&self) -> Vec<String>;

    fn connect_retry_delay(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn schema_dialect(&self) -> &dyn SchemaDialect;

    fn placeholder_style(&self) -> PlaceholderStyle;

    fn query_translator(&self, _kind: QueryType) -> QueryTranslator {
        identity
    }

    fn supports(&self, feature: DriverFeature) -> bool {
        base_supports(feature)
    }

    fn max_alias_length(&self) -> Option<usize> {
        None
    }

    fn savepoint_sql(&self, name: &str) -> String {
        format!("SAVEPOINT LEVEL{}", name)
    }

    fn release_savepoint_sql(&self, name: &str) -> String {
        format!("RELEASE SAVEPOINT LEVEL{}", name)
    }

    fn rollback_savepoint_sql(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT LEVEL{}", name)
    }

    fn disable_foreign_key_sql(&self) -> String {
        "SET CONSTRAINTS ALL DEFERRED".to_string()
    }

    fn enable_foreign_key_sql(&self) -> String {
        "SET CONSTRAINTS ALL IMMEDIATE".to_string()
    }
}

/// Features every backend has unless it says otherwise.
pub fn base_supports(feature: DriverFeature) -> bool {
    matches!(
        feature,
        DriverFeature::DisableConstraintWithoutTransaction
            | DriverFeature::Quote
            | DriverFeature::Savepoint
    )
}

fn identity(query: Query) -> Query {
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_supports() {
        let supported: Vec<DriverFeature> = DriverFeature::ALL
            .iter()
            .copied()
            .filter(|f| base_supports(*f))
            .collect();

        assert_eq!(
            supported,
            vec![
                DriverFeature::DisableConstraintWithoutTransaction,
                DriverFeature::Quote,
                DriverFeature::Savepoint,
            ]
        );
    }
}
