//! Schema management
//!
//! DDL for the catalog tables, rendered from the declared schema in
//! `deejay_common::db::table_schemas`. Each function runs on a connection
//! supplied by the caller so the caller owns the transaction boundary.

use deejay_common::db::Table;
use deejay_common::Result;
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info};

/// Create all six tables and their plain indexes
///
/// Dimension tables are created before the join tables that reference them.
pub async fn create_all(conn: &mut SqliteConnection) -> Result<()> {
    for table in Table::ALL {
        sqlx::query(&table.create_table_sql())
            .execute(&mut *conn)
            .await?;

        for index in table.index_sql() {
            sqlx::query(&index).execute(&mut *conn).await?;
        }
        debug!(table = %table, "Table ensured");
    }

    info!("Catalog tables created ({} tables)", Table::ALL.len());
    Ok(())
}

/// Unique index over a table's natural key
pub async fn create_unique_index(conn: &mut SqliteConnection, table: Table) -> Result<()> {
    sqlx::query(&table.unique_index_sql())
        .execute(&mut *conn)
        .await?;
    debug!(table = %table, index = %table.unique_index_name(), "Unique index ensured");
    Ok(())
}

/// Drop a table together with the join tables that reference it
///
/// SQLite keeps a join table's foreign key pointing at a dropped parent and
/// then rejects every write to the join table, so existing dependents are
/// dropped first. Returns the dropped tables, dependents first.
pub async fn drop_table(conn: &mut SqliteConnection, table: Table) -> Result<Vec<Table>> {
    let mut dropped = Vec::new();

    for dependent in table.referenced_by() {
        if table_exists(conn, dependent).await? {
            sqlx::query(&format!("DROP TABLE {}", dependent.name()))
                .execute(&mut *conn)
                .await?;
            debug!(table = %dependent, parent = %table, "Dropped dependent table");
            dropped.push(dependent);
        }
    }

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", table.name()))
        .execute(&mut *conn)
        .await?;
    dropped.push(table);

    Ok(dropped)
}

/// Delete all rows of a table, cascading to referencing join rows
///
/// Returns the number of rows deleted from `table` itself.
pub async fn delete_table(conn: &mut SqliteConnection, table: Table) -> Result<u64> {
    let result = sqlx::query(&format!("DELETE FROM {}", table.name()))
        .execute(&mut *conn)
        .await?;
    debug!(table = %table, rows = result.rows_affected(), "Rows deleted");
    Ok(result.rows_affected())
}

async fn table_exists(conn: &mut SqliteConnection, table: Table) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
    )
    .bind(table.name())
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

/// Teardown order: join tables before the tables they reference
pub fn teardown_order() -> Vec<Table> {
    Table::ALL.iter().rev().copied().collect()
}

/// Outcome of a per-table batch
///
/// Every requested name gets an entry; one failure never stops the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    /// (table name, error message)
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn record_success(&mut self, table: &str) {
        self.succeeded.push(table.to_string());
    }

    pub fn record_failure(&mut self, table: &str, error: impl ToString) {
        self.failed.push((table.to_string(), error.to_string()));
    }
}
