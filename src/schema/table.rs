use serde_json::Value;

use crate::query::TypeMap;
use crate::schema::SchemaDialect;

/// Abstract column types, mapped to concrete SQL types by each dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    BigInteger,
    SmallInteger,
    TinyInteger,
    Decimal {
        precision: Option<u8>,
        scale: Option<u8>,
    },
    Float,
    String {
        length: Option<u32>,
    },
    Char {
        length: Option<u32>,
    },
    Text,
    Boolean,
    Date,
    DateTime,
    Timestamp,
    Time,
    Uuid,
    Binary,
    Json,
}

impl ColumnType {
    /// Logical type name used for value conversion.
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::BigInteger => "biginteger",
            ColumnType::SmallInteger => "smallinteger",
            ColumnType::TinyInteger => "tinyinteger",
            ColumnType::Decimal { .. } => "decimal",
            ColumnType::Float => "float",
            ColumnType::String { .. } => "string",
            ColumnType::Char { .. } => "char",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Time => "time",
            ColumnType::Uuid => "uuid",
            ColumnType::Binary => "binary",
            ColumnType::Json => "json",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer
                | ColumnType::BigInteger
                | ColumnType::SmallInteger
                | ColumnType::TinyInteger
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: Option<Value>,
    pub autoincrement: bool,
    pub comment: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            autoincrement: false,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self.nullable = false;
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

impl ForeignKeyAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::Restrict => "RESTRICT",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
            ForeignKeyAction::NoAction => "NO ACTION",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    Primary,
    Unique,
    Foreign {
        table: String,
        columns: Vec<String>,
        on_update: ForeignKeyAction,
        on_delete: ForeignKeyAction,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
}

impl Constraint {
    pub fn primary(name: impl Into<String>, columns: &[&str]) -> Self {
        Self::with_kind(name, ConstraintKind::Primary, columns)
    }

    pub fn unique(name: impl Into<String>, columns: &[&str]) -> Self {
        Self::with_kind(name, ConstraintKind::Unique, columns)
    }

    /// A foreign key from `columns` to `references` in `table`. Both actions
    /// default to `RESTRICT`.
    pub fn foreign(
        name: impl Into<String>,
        columns: &[&str],
        table: impl Into<String>,
        references: &[&str],
    ) -> Self {
        let kind = ConstraintKind::Foreign {
            table: table.into(),
            columns: references.iter().map(|c| c.to_string()).collect(),
            on_update: ForeignKeyAction::Restrict,
            on_delete: ForeignKeyAction::Restrict,
        };
        Self::with_kind(name, kind, columns)
    }

    fn with_kind(name: impl Into<String>, kind: ConstraintKind, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        if let ConstraintKind::Foreign { on_update, .. } = &mut self.kind {
            *on_update = action;
        }
        self
    }

    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        if let ConstraintKind::Foreign { on_delete, .. } = &mut self.kind {
            *on_delete = action;
        }
        self
    }

    pub fn is_foreign(&self) -> bool {
        matches!(self.kind, ConstraintKind::Foreign { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Describes one table and generates its DDL through a [`SchemaDialect`].
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnDef>,
    constraints: Vec<Constraint>,
    indexes: Vec<Index>,
    temporary: bool,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            temporary: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a column, replacing any previous one with the same name.
    pub fn add_column(mut self, column: ColumnDef) -> Self {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        self
    }

    pub fn add_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn add_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Columns of the primary key constraint, if any.
    pub fn primary_key(&self) -> Vec<&str> {
        self.constraints
            .iter()
            .find(|c| c.kind == ConstraintKind::Primary)
            .map(|c| c.columns.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Logical type of every column, for result casting.
    pub fn type_map(&self) -> TypeMap {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.column_type.type_name()))
            .collect()
    }

    /// The table with its primary and unique keys, then its indexes.
    pub fn create_sql(&self, dialect: &dyn SchemaDialect) -> Vec<String> {
        dialect.create_table_sql(self)
    }

    pub fn drop_sql(&self, dialect: &dyn SchemaDialect) -> Vec<String> {
        dialect.drop_table_sql(self)
    }

    pub fn truncate_sql(&self, dialect: &dyn SchemaDialect) -> Vec<String> {
        dialect.truncate_table_sql(self)
    }

    /// Foreign keys, added once every referenced table exists.
    pub fn add_constraint_sql(&self, dialect: &dyn SchemaDialect) -> Vec<String> {
        dialect.add_constraint_sql(self)
    }

    pub fn drop_constraint_sql(&self, dialect: &dyn SchemaDialect) -> Vec<String> {
        dialect.drop_constraint_sql(self)
    }
}
