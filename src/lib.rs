//! dbrs - A blocking database driver layer with a typed query builder
//!
//! A [`Driver`] wraps a [`traits::Backend`] (PostgreSQL, or the in-memory
//! backend used in tests) and owns its single connection: lazy connect
//! with retry, transactions, value quoting, query compilation and
//! query logging.
//!
//! # Example
//! ```no_run
//! use dbrs::builders::Select;
//! use dbrs::drivers::PostgresBackend;
//! use dbrs::{Column, Driver, DriverConfig, Table, WhereClause};
//!
//! struct Users;
//! struct UsersColumns {
//!     id: UsersId,
//! }
//! struct UsersId;
//!
//! impl Table for Users {
//!     type Columns = UsersColumns;
//!     fn table_name() -> &'static str {
//!         "users"
//!     }
//!     fn columns() -> Self::Columns {
//!         UsersColumns { id: UsersId }
//!     }
//! }
//!
//! impl Column for UsersId {
//!     fn column_name(&self) -> &'static str {
//!         "id"
//!     }
//!     fn table_name(&self) -> &'static str {
//!         "users"
//!     }
//!     fn column_type(&self) -> Option<&'static str> {
//!         Some("integer")
//!     }
//! }
//!
//! let mut driver = Driver::new(PostgresBackend::new(), DriverConfig::default())?;
//! let row = Select::new()
//!     .columns(&[&Users::columns().id])
//!     .from(Users)
//!     .where_(WhereClause::eq(&Users::columns().id, 1))
//!     .execute(&mut driver)?
//!     .single_row()?;
//!
//! let id = row.get(&Users::columns().id)?;
//! # Ok::<(), dbrs::DbRsError>(())
//! ```

pub mod builders;
pub mod clauses;
pub mod config;
pub mod conversion;
pub mod drivers;
pub mod error;
pub mod feature;
pub mod log;
pub mod query;
pub mod retry;
pub mod schema;
pub mod statement;
pub mod traits;
pub mod types;

mod driver;

// Re-export main types for convenient access
pub use clauses::WhereClause;
pub use config::{DriverConfig, LogConfig};
pub use driver::{ConnectionState, Driver};
pub use error::{BackendError, DbRsError, Result};
pub use feature::DriverFeature;
pub use query::{Query, TypeMap};
pub use statement::{Statement, StatementSource};
pub use traits::{Column, ColumnRef, DatabaseDriver, Table};
pub use types::{QueryResult, RawQueryResult, Row, SqlValue};
