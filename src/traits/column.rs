/// Trait representing a database column.
/// Implementations are typically generated from schema definitions.
pub trait Column {
    /// Returns the column name as it appears in the database.
    fn column_name(&self) -> &'static str;

    /// Returns the table name this column belongs to.
    fn table_name(&self) -> &'static str;

    /// Logical type of the column's values (`integer`, `decimal`, ...).
    /// Typed columns are converted when bound and cast when selected.
    fn column_type(&self) -> Option<&'static str> {
        None
    }

    /// Returns the fully qualified column name (table.column).
    fn qualified_name(&self) -> String {
        format!("{}.{}", self.table_name(), self.column_name())
    }
}

/// A reference to a column, used internally by query builders.
/// This allows storing column information without requiring the original Column type.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
    pub column_type: Option<&'static str>,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            column_type: None,
        }
    }

    pub fn from_column<C: Column + ?Sized>(col: &C) -> Self {
        Self {
            table: col.table_name().to_string(),
            column: col.column_name().to_string(),
            column_type: col.column_type(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}
