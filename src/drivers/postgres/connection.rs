//! Blocking PostgreSQL connection on top of tokio-postgres.
//!
//! Each connection owns a private current-thread runtime and blocks on it
//! for every call, so it must not be used from inside another async
//! runtime.

use std::error::Error;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Weak};

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};
use tokio_postgres::{Client, Config, NoTls, Row, SimpleQueryMessage};
use tracing::error;

use crate::error::BackendError;
use crate::statement::BoundParam;
use crate::traits::{Connection, NativeStatement};
use crate::types::{RawQueryResult, SqlValue};

use super::numeric::PgNumeric;

/// SQLSTATE reported for connect failures that carry none.
const CONNECTION_FAILURE: &str = "08001";

/// SQLSTATE for statements used after their connection was closed.
const CONNECTION_DOES_NOT_EXIST: &str = "08003";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub(super) type BoxError = Box<dyn Error + Sync + Send>;

/// Converts a tokio-postgres error, keeping the SQLSTATE as the code.
fn pg_error(error: tokio_postgres::Error) -> BackendError {
    let message = match error.as_db_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    };
    match error.code() {
        Some(state) => BackendError::with_code(state.code(), message),
        None => BackendError::new(message),
    }
}

fn connect_error(error: tokio_postgres::Error) -> BackendError {
    let mut error = pg_error(error);
    if error.code.is_none() {
        error.code = Some(CONNECTION_FAILURE.to_string());
    }
    error
}

struct Session {
    // Dropped before the runtime that drives it.
    client: Client,
    runtime: Runtime,
}

impl Session {
    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

pub(crate) struct PgConnection {
    session: Arc<Session>,
    in_transaction: bool,
}

impl PgConnection {
    pub(crate) fn open(dsn: &str, password: Option<&str>) -> Result<Self, BackendError> {
        let mut config = Config::from_str(dsn).map_err(connect_error)?;
        if let Some(password) = password {
            config.password(password);
        }

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BackendError::with_code(CONNECTION_FAILURE, e.to_string()))?;

        let (client, connection) = runtime
            .block_on(config.connect(NoTls))
            .map_err(connect_error)?;

        runtime.spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "postgres connection terminated");
            }
        });

        Ok(Self {
            session: Arc::new(Session { client, runtime }),
            in_transaction: false,
        })
    }

    fn batch(&mut self, sql: &str) -> Result<(), BackendError> {
        let session = &self.session;
        session
            .block_on(session.client.batch_execute(sql))
            .map_err(pg_error)
    }
}

impl Connection for PgConnection {
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn NativeStatement>, BackendError> {
        let session = &self.session;
        let statement = session
            .block_on(session.client.prepare(sql))
            .map_err(pg_error)?;
        Ok(Box::new(PgStatement {
            session: Arc::downgrade(&self.session),
            statement,
        }))
    }

    fn exec(&mut self, sql: &str) -> Result<u64, BackendError> {
        let session = &self.session;
        let messages = session
            .block_on(session.client.simple_query(sql))
            .map_err(pg_error)?;

        let affected = messages
            .iter()
            .map(|message| match message {
                SimpleQueryMessage::CommandComplete(rows) => *rows,
                _ => 0,
            })
            .sum();
        Ok(affected)
    }

    fn ping(&mut self) -> Result<(), BackendError> {
        self.batch("SELECT 1")
    }

    fn server_version(&mut self) -> Result<String, BackendError> {
        let session = &self.session;
        let row = session
            .block_on(session.client.query_one("SHOW server_version", &[]))
            .map_err(pg_error)?;
        row.try_get::<_, String>(0).map_err(pg_error)
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        self.batch("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.batch("ROLLBACK")?;
        self.in_transaction = false;
        Ok(())
    }

    fn last_insert_id(&mut self, name: Option<&str>) -> Result<String, BackendError> {
        last_insert_id(&self.session, name)
    }
}

fn last_insert_id(session: &Session, name: Option<&str>) -> Result<String, BackendError> {
    let row = match name {
        Some(sequence) => session.block_on(
            session
                .client
                .query_one("SELECT CURRVAL($1::text::regclass)::text", &[&sequence]),
        ),
        None => session.block_on(session.client.query_one("SELECT LASTVAL()::text", &[])),
    }
    .map_err(pg_error)?;
    row.try_get::<_, String>(0).map_err(pg_error)
}

/// Holds the session weakly. Dropping the connection closes it even while
/// statements remain.
struct PgStatement {
    session: Weak<Session>,
    statement: tokio_postgres::Statement,
}

fn live_session(session: &Weak<Session>) -> Result<Arc<Session>, BackendError> {
    session
        .upgrade()
        .ok_or_else(|| BackendError::with_code(CONNECTION_DOES_NOT_EXIST, "connection is closed"))
}

impl NativeStatement for PgStatement {
    fn execute(&mut self, params: &[BoundParam]) -> Result<RawQueryResult, BackendError> {
        let expected = self.statement.params().len();
        if params.len() != expected {
            return Err(BackendError::with_code(
                "08P01",
                format!(
                    "statement expects {} parameters but {} were bound",
                    expected,
                    params.len()
                ),
            ));
        }

        let session = live_session(&self.session)?;
        let values: Vec<PgParam<'_>> = params.iter().map(|p| PgParam(&p.value)).collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();

        if self.statement.columns().is_empty() {
            let affected = session
                .block_on(session.client.execute(&self.statement, &refs))
                .map_err(pg_error)?;
            return Ok(RawQueryResult::affected(affected));
        }

        let rows = session
            .block_on(session.client.query(&self.statement, &refs))
            .map_err(pg_error)?;
        let columns = self
            .statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RawQueryResult::new(columns, rows))
    }

    fn last_insert_id(&mut self, name: Option<&str>) -> Result<String, BackendError> {
        last_insert_id(&*live_session(&self.session)?, name)
    }
}

/// A bound value encoded for whatever type the server inferred for its
/// placeholder.
#[derive(Debug)]
struct PgParam<'a>(&'a SqlValue);

impl ToSql for PgParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self.0 {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                _ => int_to_sql(i64::from(*b), ty, out),
            },
            SqlValue::Int32(i) => int_to_sql(i64::from(*i), ty, out),
            SqlValue::Int64(i) => int_to_sql(*i, ty, out),
            SqlValue::Float(f) => float_to_sql(*f, ty, out),
            SqlValue::Text(s) => text_to_sql(s, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn int_to_sql(value: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::INT8 => value.to_sql(ty, out),
        Type::OID => u32::try_from(value)?.to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::NUMERIC => PgNumeric::parse(&value.to_string())?.to_sql(ty, out),
        Type::BOOL => (value != 0).to_sql(ty, out),
        _ => text_to_sql(&value.to_string(), ty, out),
    }
}

fn float_to_sql(value: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => value.to_sql(ty, out),
        Type::NUMERIC => PgNumeric::parse(&value.to_string())?.to_sql(ty, out),
        _ => text_to_sql(&value.to_string(), ty, out),
    }
}

fn text_to_sql(value: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    let value = value.trim_end_matches('\0');
    match *ty {
        Type::INT2 => value.trim().parse::<i16>()?.to_sql(ty, out),
        Type::INT4 => value.trim().parse::<i32>()?.to_sql(ty, out),
        Type::INT8 => value.trim().parse::<i64>()?.to_sql(ty, out),
        Type::OID => value.trim().parse::<u32>()?.to_sql(ty, out),
        Type::FLOAT4 => value.trim().parse::<f32>()?.to_sql(ty, out),
        Type::FLOAT8 => value.trim().parse::<f64>()?.to_sql(ty, out),
        Type::NUMERIC => PgNumeric::parse(value)?.to_sql(ty, out),
        Type::BOOL => parse_bool(value)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<Value>(value)?.to_sql(ty, out),
        Type::TIMESTAMP => NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(value)?
            .with_timezone(&Utc)
            .to_sql(ty, out),
        Type::DATE => NaiveDate::parse_from_str(value, "%Y-%m-%d")?.to_sql(ty, out),
        Type::TIME => NaiveTime::parse_from_str(value, "%H:%M:%S%.f")?.to_sql(ty, out),
        _ => value.to_sql(ty, out),
    }
}

fn parse_bool(value: &str) -> Result<bool, BoxError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        other => Err(format!("invalid boolean `{}`", other).into()),
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, index: usize) -> Result<Option<T>, BackendError> {
    row.try_get::<_, Option<T>>(index).map_err(pg_error)
}

fn decode_row(row: &Row) -> Result<Vec<Value>, BackendError> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| decode_value(row, index, column.type_()))
        .collect()
}

/// Decodes one column into a JSON value. Numerics stay strings so no
/// precision is lost.
fn decode_value(row: &Row, index: usize, ty: &Type) -> Result<Value, BackendError> {
    let value = match *ty {
        Type::BOOL => get::<bool>(row, index)?.map(Value::from),
        Type::INT2 => get::<i16>(row, index)?.map(Value::from),
        Type::INT4 => get::<i32>(row, index)?.map(Value::from),
        Type::INT8 => get::<i64>(row, index)?.map(Value::from),
        Type::OID => get::<u32>(row, index)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, index)?.map(|f| Value::from(f64::from(f))),
        Type::FLOAT8 => get::<f64>(row, index)?.map(Value::from),
        Type::NUMERIC => get::<PgNumeric>(row, index)?.map(|n| Value::String(n.to_string())),
        Type::JSON | Type::JSONB => get::<Value>(row, index)?,
        Type::TIMESTAMP => get::<NaiveDateTime>(row, index)?
            .map(|t| Value::String(t.format(TIMESTAMP_FORMAT).to_string())),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, index)?.map(|t| Value::String(t.to_rfc3339())),
        Type::DATE => get::<NaiveDate>(row, index)?.map(|d| Value::String(d.to_string())),
        Type::TIME => get::<NaiveTime>(row, index)?.map(|t| Value::String(t.to_string())),
        Type::BYTEA => get::<Vec<u8>>(row, index)?.map(|bytes| {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            Value::String(format!("\\x{}", hex))
        }),
        _ => get::<String>(row, index)?.map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}
