use crate::schema::table::{ColumnDef, ColumnType, Constraint, ConstraintKind, Index, TableSchema};
use crate::schema::{quote_string, value_literal, value_text};

/// Quotes an identifier with `open`/`close`, handling the forms that show
/// up in generated SQL: `*`, `table.*`, dotted names, `expr AS alias` and
/// function calls (left untouched).
pub fn quote_identifier_with(identifier: &str, open: char, close: char) -> String {
    let identifier = identifier.trim();

    if identifier.is_empty() || identifier == "*" {
        return identifier.to_string();
    }
    if identifier.starts_with(open) && identifier.ends_with(close) && identifier.len() > 1 {
        return identifier.to_string();
    }
    if identifier.contains('(') {
        return identifier.to_string();
    }

    if let Some(index) = identifier.to_ascii_uppercase().find(" AS ") {
        let (expr, alias) = identifier.split_at(index);
        return format!(
            "{} AS {}",
            quote_identifier_with(expr, open, close),
            quote_identifier_with(&alias[4..], open, close)
        );
    }

    let escaped_close: String = [close, close].iter().collect();
    identifier
        .split('.')
        .map(|part| {
            if part == "*" {
                part.to_string()
            } else {
                format!(
                    "{}{}{}",
                    open,
                    part.replace(close, &escaped_close),
                    close
                )
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Backend-specific DDL generation. Every method has an ANSI default;
/// backends override what their SQL differs on.
pub trait SchemaDialect: Send + Sync {
    fn quote_identifier(&self, identifier: &str) -> String {
        quote_identifier_with(identifier, '"', '"')
    }

    fn column_type_sql(&self, column: &ColumnDef) -> String {
        match column.column_type {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInteger => "BIGINT".to_string(),
            ColumnType::SmallInteger | ColumnType::TinyInteger => "SMALLINT".to_string(),
            ColumnType::Decimal {
                precision: Some(precision),
                scale,
            } => format!("DECIMAL({},{})", precision, scale.unwrap_or(0)),
            ColumnType::Decimal { .. } => "DECIMAL".to_string(),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::String { length } => format!("VARCHAR({})", length.unwrap_or(255)),
            ColumnType::Char { length } => format!("CHAR({})", length.unwrap_or(1)),
            ColumnType::Text | ColumnType::Json => "TEXT".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime | ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::Time => "TIME".to_string(),
            ColumnType::Uuid => "CHAR(36)".to_string(),
            ColumnType::Binary => "BLOB".to_string(),
        }
    }

    /// Default clause literal; strings are quoted.
    fn default_sql(&self, column: &ColumnDef) -> Option<String> {
        column.default.as_ref().map(|value| {
            value_literal(value).unwrap_or_else(|| quote_string(&value_text(value)))
        })
    }

    /// Clause making `column` generate its own values.
    fn autoincrement_sql(&self, column: &ColumnDef) -> Option<&'static str> {
        column
            .autoincrement
            .then_some("GENERATED BY DEFAULT AS IDENTITY")
    }

    /// Extra statement attaching `column`'s comment, run after the table
    /// is created.
    fn column_comment_sql(&self, _schema: &TableSchema, _column: &ColumnDef) -> Option<String> {
        None
    }

    /// Appended to every foreign key definition.
    fn foreign_key_suffix(&self) -> &'static str {
        ""
    }

    fn column_sql(&self, column: &ColumnDef) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_type_sql(column)
        );
        if let Some(identity) = self.autoincrement_sql(column) {
            sql.push(' ');
            sql.push_str(identity);
        }
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default_sql(column) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default);
        }
        sql
    }

    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn constraint_sql(&self, constraint: &Constraint) -> String {
        let columns = self.column_list(&constraint.columns);
        match &constraint.kind {
            ConstraintKind::Primary => format!("PRIMARY KEY ({})", columns),
            ConstraintKind::Unique => format!(
                "CONSTRAINT {} UNIQUE ({})",
                self.quote_identifier(&constraint.name),
                columns
            ),
            ConstraintKind::Foreign {
                table,
                columns: references,
                on_update,
                on_delete,
            } => format!(
                "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}{}",
                self.quote_identifier(&constraint.name),
                columns,
                self.quote_identifier(table),
                self.column_list(references),
                on_update.as_sql(),
                on_delete.as_sql(),
                self.foreign_key_suffix()
            ),
        }
    }

    fn index_sql(&self, schema: &TableSchema, index: &Index) -> String {
        format!(
            "CREATE INDEX {} ON {} ({})",
            self.quote_identifier(&index.name),
            self.quote_identifier(schema.name()),
            self.column_list(&index.columns)
        )
    }

    fn create_table_sql(&self, schema: &TableSchema) -> Vec<String> {
        let mut lines: Vec<String> = schema.columns().iter().map(|c| self.column_sql(c)).collect();
        lines.extend(
            schema
                .constraints()
                .iter()
                .filter(|c| !c.is_foreign())
                .map(|c| self.constraint_sql(c)),
        );

        let temporary = if schema.is_temporary() { "TEMPORARY " } else { "" };
        let mut statements = vec![format!(
            "CREATE {}TABLE {} (\n{}\n)",
            temporary,
            self.quote_identifier(schema.name()),
            lines.join(",\n")
        )];
        statements.extend(
            schema
                .columns()
                .iter()
                .filter_map(|c| self.column_comment_sql(schema, c)),
        );
        statements.extend(schema.indexes().iter().map(|i| self.index_sql(schema, i)));
        statements
    }

    fn drop_table_sql(&self, schema: &TableSchema) -> Vec<String> {
        vec![format!("DROP TABLE {}", self.quote_identifier(schema.name()))]
    }

    fn truncate_table_sql(&self, schema: &TableSchema) -> Vec<String> {
        vec![format!("TRUNCATE TABLE {}", self.quote_identifier(schema.name()))]
    }

    fn add_constraint_sql(&self, schema: &TableSchema) -> Vec<String> {
        let table = self.quote_identifier(schema.name());
        schema
            .constraints()
            .iter()
            .filter(|c| c.is_foreign())
            .map(|c| format!("ALTER TABLE {} ADD {}", table, self.constraint_sql(c)))
            .collect()
    }

    fn drop_constraint_sql(&self, schema: &TableSchema) -> Vec<String> {
        let table = self.quote_identifier(schema.name());
        schema
            .constraints()
            .iter()
            .filter(|c| c.is_foreign())
            .map(|c| {
                format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    table,
                    self.quote_identifier(&c.name)
                )
            })
            .collect()
    }
}

/// Plain ANSI SQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiSchemaDialect;

impl SchemaDialect for AnsiSchemaDialect {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ForeignKeyAction, TableSchema};

    fn articles() -> TableSchema {
        TableSchema::new("articles")
            .add_column(ColumnDef::new("id", ColumnType::Integer).autoincrement())
            .add_column(
                ColumnDef::new("title", ColumnType::String { length: Some(100) })
                    .not_null()
                    .default_value("untitled"),
            )
            .add_column(ColumnDef::new("author_id", ColumnType::Integer))
            .add_constraint(Constraint::primary("primary", &["id"]))
            .add_constraint(Constraint::unique("title_idx", &["title"]))
            .add_constraint(
                Constraint::foreign("author_fk", &["author_id"], "authors", &["id"])
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .add_index(Index::new("author_idx", &["author_id"]))
    }

    #[test]
    fn test_quote_identifier_forms() {
        let dialect = AnsiSchemaDialect;
        assert_eq!(dialect.quote_identifier("name"), r#""name""#);
        assert_eq!(dialect.quote_identifier("users.id"), r#""users"."id""#);
        assert_eq!(dialect.quote_identifier("users.*"), r#""users".*"#);
        assert_eq!(dialect.quote_identifier("*"), "*");
        assert_eq!(dialect.quote_identifier("COUNT(*)"), "COUNT(*)");
        assert_eq!(dialect.quote_identifier("a.b AS c"), r#""a"."b" AS "c""#);
        assert_eq!(dialect.quote_identifier(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(dialect.quote_identifier(r#""done""#), r#""done""#);
        assert_eq!(quote_identifier_with("name", '`', '`'), "`name`");
    }

    #[test]
    fn test_create_emits_table_then_indexes() {
        let sql = articles().create_sql(&AnsiSchemaDialect);

        assert_eq!(sql.len(), 2);
        assert_eq!(
            sql[0],
            "CREATE TABLE \"articles\" (\n\
             \"id\" INTEGER GENERATED BY DEFAULT AS IDENTITY NOT NULL,\n\
             \"title\" VARCHAR(100) NOT NULL DEFAULT 'untitled',\n\
             \"author_id\" INTEGER,\n\
             PRIMARY KEY (\"id\"),\n\
             CONSTRAINT \"title_idx\" UNIQUE (\"title\")\n)"
        );
        assert_eq!(
            sql[1],
            r#"CREATE INDEX "author_idx" ON "articles" ("author_id")"#
        );
    }

    #[test]
    fn test_foreign_keys_only_in_constraint_sql() {
        let schema = articles();
        let add = schema.add_constraint_sql(&AnsiSchemaDialect);
        assert_eq!(
            add,
            vec![
                r#"ALTER TABLE "articles" ADD CONSTRAINT "author_fk" FOREIGN KEY ("author_id") REFERENCES "authors" ("id") ON UPDATE RESTRICT ON DELETE CASCADE"#
            ]
        );
        assert_eq!(
            schema.drop_constraint_sql(&AnsiSchemaDialect),
            vec![r#"ALTER TABLE "articles" DROP CONSTRAINT "author_fk""#]
        );
        assert_eq!(schema.drop_sql(&AnsiSchemaDialect), vec![r#"DROP TABLE "articles""#]);
        assert_eq!(
            schema.truncate_sql(&AnsiSchemaDialect),
            vec![r#"TRUNCATE TABLE "articles""#]
        );
    }
}
