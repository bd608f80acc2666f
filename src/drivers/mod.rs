pub mod postgres;

pub use self::in_memory_test::{InMemoryBackend, InMemoryResponseBuilder, RecordedQuery};
pub use self::postgres::{PostgresBackend, PostgresSchemaDialect};
