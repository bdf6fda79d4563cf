//! Declarative schema description
//!
//! Table layouts are declared once in code and used for both DDL rendering
//! and insert-column ordering. The live database is only introspected to
//! report drift, never to decide what to write.
//!
//! # Usage
//!
//! ```rust,ignore
//! pub struct ArtistTableSchema;
//!
//! impl TableSchema for ArtistTableSchema {
//!     fn table_name() -> &'static str { "artist" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("id", SqlType::Text).primary_key(),
//!             ColumnDefinition::new("name", SqlType::Text).not_null(),
//!         ]
//!     }
//!
//!     fn natural_key() -> &'static [&'static str] { &["name"] }
//! }
//!
//! let ddl = ArtistTableSchema::create_table_sql();
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};

/// Declared SQL column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Real,
    Integer,
    Date,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Real => "REAL",
            SqlType::Integer => "INTEGER",
            SqlType::Date => "DATE",
        }
    }
}

/// Foreign key target of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
    pub on_delete_cascade: bool,
}

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: &'static str,
    /// Declared SQL type
    pub sql_type: SqlType,
    /// NOT NULL constraint
    pub not_null: bool,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// REFERENCES clause
    pub references: Option<ForeignKey>,
    /// Plain (non-unique) index on this column
    pub indexed: bool,
}

impl ColumnDefinition {
    /// Create new column definition
    pub fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            not_null: false,
            primary_key: false,
            references: None,
            indexed: false,
        }
    }

    /// Mark column as PRIMARY KEY
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Reference `table(column)` with ON DELETE CASCADE
    pub fn references_cascade(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(ForeignKey {
            table,
            column,
            on_delete_cascade: true,
        });
        self
    }

    /// Request a plain index on this column
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Render the column clause used inside CREATE TABLE
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type.as_sql());

        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(fk) = self.references {
            sql.push_str(&format!(" REFERENCES {}({})", fk.table, fk.column));
            if fk.on_delete_cascade {
                sql.push_str(" ON DELETE CASCADE");
            }
        }

        sql
    }
}

/// Defines the declared schema for a database table
pub trait TableSchema {
    /// Table name in database
    fn table_name() -> &'static str;

    /// Column definitions (order is the insert order and the DDL order)
    fn expected_columns() -> Vec<ColumnDefinition>;

    /// Columns forming the deduplication key
    fn natural_key() -> &'static [&'static str];

    /// `CREATE TABLE IF NOT EXISTS` statement for this table
    fn create_table_sql() -> String {
        let columns: Vec<String> = Self::expected_columns()
            .iter()
            .map(|c| format!("    {}", c.to_sql()))
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            Self::table_name(),
            columns.join(",\n")
        )
    }

    /// Plain indexes requested by column definitions
    fn index_sql() -> Vec<String> {
        Self::expected_columns()
            .iter()
            .filter(|c| c.indexed)
            .map(|c| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_{col} ON {table}({col})",
                    table = Self::table_name(),
                    col = c.name
                )
            })
            .collect()
    }

    /// Name of the optional unique index over the natural key
    fn unique_index_name() -> String {
        format!("uq_{}_{}", Self::table_name(), Self::natural_key().join("_"))
    }

    /// `CREATE UNIQUE INDEX IF NOT EXISTS` over the natural key
    fn unique_index_sql() -> String {
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            Self::unique_index_name(),
            Self::table_name(),
            Self::natural_key().join(", ")
        )
    }
}

/// Actual column from database introspection (PRAGMA table_info result)
#[derive(Debug, Clone)]
pub struct ActualColumn {
    /// Column ID (position in table)
    pub cid: i32,
    /// Column name
    pub name: String,
    /// SQL type from PRAGMA table_info
    pub type_name: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// DEFAULT value
    pub default_value: Option<String>,
    /// PRIMARY KEY flag
    pub pk: bool,
}

/// Schema drift detected between declared and actual schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    /// Table missing from database
    MissingTable { table: String },
    /// Column missing from database
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Column type mismatch
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    /// Constraint mismatch
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String, // "NOT NULL", "PRIMARY KEY"
    },
}

impl std::fmt::Display for SchemaDrift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaDrift::MissingTable { table } => write!(f, "table '{}' is missing", table),
            SchemaDrift::MissingColumn { table, column } => {
                write!(f, "column {}.{} is missing", table, column.name)
            }
            SchemaDrift::TypeMismatch {
                table,
                column,
                expected,
                actual,
            } => write!(
                f,
                "column {}.{} has type '{}', expected '{}'",
                table, column, actual, expected
            ),
            SchemaDrift::ConstraintMismatch {
                table,
                column,
                constraint,
            } => write!(f, "column {}.{} lacks {}", table, column, constraint),
        }
    }
}

/// Schema introspection - read actual database schema
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Read actual columns from a declared table using PRAGMA table_info
    ///
    /// Returns columns in database order (by cid)
    pub async fn introspect_table(
        pool: &SqlitePool,
        table_name: &'static str,
    ) -> Result<Vec<ActualColumn>> {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        columns.sort_by_key(|c| c.cid);

        Ok(columns)
    }

    /// Check if table exists
    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type='table' AND name = ?
            )
            "#,
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

}

/// Schema comparison - detect drift between declared and actual
pub struct SchemaDiff;

impl SchemaDiff {
    /// Compare declared schema to actual database schema
    pub fn compare(
        table_name: &str,
        expected: &[ColumnDefinition],
        actual: &[ActualColumn],
    ) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            let Some(actual_col) = actual.iter().find(|c| c.name == expected_col.name) else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: expected_col.clone(),
                });
                continue;
            };

            if !Self::types_compatible(expected_col.sql_type.as_sql(), &actual_col.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.to_string(),
                    expected: expected_col.sql_type.as_sql().to_string(),
                    actual: actual_col.type_name.clone(),
                });
            }

            // PRAGMA reports notnull = 0 for a TEXT PRIMARY KEY, so only plain columns are checked
            if expected_col.not_null && !expected_col.primary_key && !actual_col.not_null {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.to_string(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if expected_col.primary_key && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.to_string(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }

    /// Check if SQL types are compatible (SQLite type affinity rules)
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = expected.to_uppercase();
        let act = actual.to_uppercase();

        if exp == act {
            return true;
        }

        if exp.contains("INT") && act.contains("INT") {
            return true;
        }

        if (exp.contains("TEXT") || exp.contains("CHAR") || exp.contains("CLOB"))
            && (act.contains("TEXT") || act.contains("CHAR") || act.contains("CLOB"))
        {
            return true;
        }

        if (exp.contains("REAL") || exp.contains("FLOAT") || exp.contains("DOUBLE"))
            && (act.contains("REAL") || act.contains("FLOAT") || act.contains("DOUBLE"))
        {
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    struct TagTableSchema;

    impl TableSchema for TagTableSchema {
        fn table_name() -> &'static str {
            "tag"
        }

        fn expected_columns() -> Vec<ColumnDefinition> {
            vec![
                ColumnDefinition::new("id", SqlType::Text).primary_key(),
                ColumnDefinition::new("label", SqlType::Text).not_null(),
                ColumnDefinition::new("weight", SqlType::Real),
            ]
        }

        fn natural_key() -> &'static [&'static str] {
            &["label"]
        }
    }

    async fn verify_tag(pool: &SqlitePool) -> Vec<SchemaDrift> {
        if !SchemaIntrospector::table_exists(pool, "tag").await.unwrap() {
            return vec![SchemaDrift::MissingTable {
                table: "tag".to_string(),
            }];
        }
        let actual = SchemaIntrospector::introspect_table(pool, "tag").await.unwrap();
        SchemaDiff::compare("tag", &TagTableSchema::expected_columns(), &actual)
    }

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_column_definition_builder() {
        let col = ColumnDefinition::new("song_id", SqlType::Text)
            .not_null()
            .references_cascade("song", "id")
            .indexed();

        assert_eq!(col.name, "song_id");
        assert!(col.not_null);
        assert!(col.indexed);
        assert_eq!(
            col.to_sql(),
            "song_id TEXT NOT NULL REFERENCES song(id) ON DELETE CASCADE"
        );
    }

    #[test]
    fn test_create_table_sql() {
        let sql = TagTableSchema::create_table_sql();

        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS tag ("));
        assert!(sql.contains("id TEXT PRIMARY KEY"));
        assert!(sql.contains("label TEXT NOT NULL"));
        assert!(sql.contains("weight REAL\n"));
    }

    #[test]
    fn test_unique_index_sql() {
        assert_eq!(
            TagTableSchema::unique_index_sql(),
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_tag_label ON tag (label)"
        );
    }

    #[test]
    fn test_types_compatible() {
        assert!(SchemaDiff::types_compatible("TEXT", "TEXT"));
        assert!(SchemaDiff::types_compatible("TEXT", "VARCHAR(255)"));
        assert!(SchemaDiff::types_compatible("REAL", "FLOAT"));
        assert!(SchemaDiff::types_compatible("INTEGER", "INT"));
        assert!(SchemaDiff::types_compatible("DATE", "date"));
        assert!(!SchemaDiff::types_compatible("TEXT", "INTEGER"));
        assert!(!SchemaDiff::types_compatible("DATE", "TEXT"));
    }

    #[tokio::test]
    async fn test_verify_missing_table() {
        let pool = setup_test_db().await;

        let drift = verify_tag(&pool).await;

        assert_eq!(
            drift,
            vec![SchemaDrift::MissingTable {
                table: "tag".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_verify_declared_table_has_no_drift() {
        let pool = setup_test_db().await;
        sqlx::query(&TagTableSchema::create_table_sql())
            .execute(&pool)
            .await
            .unwrap();

        let drift = verify_tag(&pool).await;

        assert!(drift.is_empty(), "unexpected drift: {:?}", drift);
    }

    #[tokio::test]
    async fn test_verify_detects_missing_column() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE tag (id TEXT PRIMARY KEY, label TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let drift = verify_tag(&pool).await;

        assert_eq!(drift.len(), 1);
        assert!(matches!(
            &drift[0],
            SchemaDrift::MissingColumn { column, .. } if column.name == "weight"
        ));
    }
}
