//! Query logging: the sink interface and the per-execution event.

use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::Level;

use crate::types::SqlValue;

// `::` is matched so casts such as `x::text` are never read as a name.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"::|\$(\d+)|\?|:([A-Za-z_]\w*)").expect("valid placeholder pattern")
});

/// Receives one event per logged query.
pub trait QueryLogger: Send + Sync {
    /// `message` is the SQL with its parameters interpolated.
    fn log(&self, level: Level, message: &str, query: &LoggedQuery);
}

/// Context passed to `Driver::log` alongside the message.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub error: Option<String>,
    pub params: Vec<SqlValue>,
    /// Placeholder name of each param, for named-style SQL.
    pub names: Vec<String>,
    pub num_rows: Option<u64>,
    pub took: Option<f64>,
}

impl LogContext {
    /// Context of a successful execution.
    pub fn success(params: Vec<SqlValue>, num_rows: u64, took: Duration) -> Self {
        Self {
            error: None,
            params,
            names: Vec::new(),
            num_rows: Some(num_rows),
            took: Some(round_millis(took)),
        }
    }

    /// Context of a failed execution; row count and timing are left out.
    pub fn failure(params: Vec<SqlValue>, error: impl fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            params,
            names: Vec::new(),
            num_rows: None,
            took: None,
        }
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }
}

/// Milliseconds rounded to one decimal place.
pub fn round_millis(took: Duration) -> f64 {
    (took.as_secs_f64() * 10_000.0).round() / 10.0
}

/// Snapshot of one query execution handed to the logging sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedQuery {
    pub driver: String,
    pub query: String,
    pub params: Vec<SqlValue>,
    #[serde(skip)]
    pub names: Vec<String>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub took: Option<f64>,
}

impl LoggedQuery {
    pub fn new(driver: impl Into<String>, query: impl Into<String>, context: LogContext) -> Self {
        Self {
            driver: driver.into(),
            query: query.into(),
            params: context.params,
            names: context.names,
            error: context.error,
            num_rows: context.num_rows,
            took: context.took,
        }
    }

    /// Structured form: `driver`, `query`, `params`, `error` and, on success,
    /// `numRows` and `took`.
    pub fn context(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// The query with placeholders replaced by their bound values. Only
    /// meant for reading logs; never execute the result.
    pub fn interpolate(&self) -> String {
        if self.params.is_empty() {
            return self.query.clone();
        }

        let mut next = 0;
        PLACEHOLDER
            .replace_all(&self.query, |caps: &Captures<'_>| {
                let index = if let Some(position) = caps.get(1) {
                    position.as_str().parse::<usize>().unwrap_or(0).checked_sub(1)
                } else if let Some(name) = caps.get(2) {
                    self.position_of(name.as_str())
                } else if &caps[0] == "?" {
                    next += 1;
                    Some(next - 1)
                } else {
                    None
                };
                match index.and_then(|i| self.params.get(i)) {
                    Some(value) => render_value(value),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|bound| bound.trim_start_matches(':') == name)
    }
}

fn render_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(true) => "TRUE".to_string(),
        SqlValue::Bool(false) => "FALSE".to_string(),
        SqlValue::Int32(i) => i.to_string(),
        SqlValue::Int64(i) => i.to_string(),
        SqlValue::Float(f) => f.to_string(),
        SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

impl fmt::Display for LoggedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.interpolate())
    }
}

/// Default sink: one `tracing` event per query under the `dbrs::query`
/// target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingQueryLogger;

macro_rules! query_event {
    ($level:ident, $message:expr, $query:expr) => {
        tracing::$level!(
            target: "dbrs::query",
            driver = %$query.driver,
            num_rows = ?$query.num_rows,
            took_ms = ?$query.took,
            error = ?$query.error,
            "{}",
            $message
        )
    };
}

impl QueryLogger for TracingQueryLogger {
    fn log(&self, level: Level, message: &str, query: &LoggedQuery) {
        match level {
            Level::ERROR => query_event!(error, message, query),
            Level::WARN => query_event!(warn, message, query),
            Level::INFO => query_event!(info, message, query),
            Level::DEBUG => query_event!(debug, message, query),
            _ => query_event!(trace, message, query),
        }
    }
}
