mod row;
mod sql_value;

pub use row::{QueryResult, RawQueryResult, Row, RowValues};
pub use sql_value::{BindingType, SqlValue};
