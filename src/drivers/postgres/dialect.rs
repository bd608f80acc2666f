use crate::schema::{quote_string, ColumnDef, ColumnType, SchemaDialect, TableSchema};

/// PostgreSQL DDL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresSchemaDialect;

impl SchemaDialect for PostgresSchemaDialect {
    fn column_type_sql(&self, column: &ColumnDef) -> String {
        match column.column_type {
            ColumnType::Integer if column.autoincrement => "SERIAL".to_string(),
            ColumnType::BigInteger if column.autoincrement => "BIGSERIAL".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInteger => "BIGINT".to_string(),
            ColumnType::SmallInteger | ColumnType::TinyInteger => "SMALLINT".to_string(),
            ColumnType::Decimal {
                precision: Some(precision),
                scale,
            } => format!("NUMERIC({},{})", precision, scale.unwrap_or(0)),
            ColumnType::Decimal { .. } => "NUMERIC".to_string(),
            ColumnType::Float => "DOUBLE PRECISION".to_string(),
            ColumnType::String { length: Some(length) } => format!("VARCHAR({})", length),
            ColumnType::String { length: None } => "VARCHAR".to_string(),
            ColumnType::Char { length } => format!("CHAR({})", length.unwrap_or(1)),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime | ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::Time => "TIME".to_string(),
            ColumnType::Uuid => "UUID".to_string(),
            ColumnType::Binary => "BYTEA".to_string(),
            ColumnType::Json => "JSONB".to_string(),
        }
    }

    // SERIAL types already generate values.
    fn autoincrement_sql(&self, column: &ColumnDef) -> Option<&'static str> {
        (column.autoincrement && !column.column_type.is_integer())
            .then_some("GENERATED BY DEFAULT AS IDENTITY")
    }

    fn column_comment_sql(&self, schema: &TableSchema, column: &ColumnDef) -> Option<String> {
        column.comment.as_ref().map(|comment| {
            format!(
                "COMMENT ON COLUMN {}.{} IS {}",
                self.quote_identifier(schema.name()),
                self.quote_identifier(&column.name),
                quote_string(comment)
            )
        })
    }

    fn foreign_key_suffix(&self) -> &'static str {
        " DEFERRABLE INITIALLY IMMEDIATE"
    }

    fn drop_table_sql(&self, schema: &TableSchema) -> Vec<String> {
        vec![format!(
            "DROP TABLE {} CASCADE",
            self.quote_identifier(schema.name())
        )]
    }

    fn truncate_table_sql(&self, schema: &TableSchema) -> Vec<String> {
        vec![format!(
            "TRUNCATE {} RESTART IDENTITY CASCADE",
            self.quote_identifier(schema.name())
        )]
    }
}
