mod backend;
mod column;
mod driver;
mod table;

pub use backend::{base_supports, Backend, Connection, NativeStatement, QueryTranslator};
pub use column::{Column, ColumnRef};
pub use driver::DatabaseDriver;
pub use table::Table;
