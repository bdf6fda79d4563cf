//! Atomic insert-if-absent
//!
//! Existence is checked first. The insert itself is a single conditional
//! statement guarded by the same fingerprint, so a writer that lost a race
//! affects no row and picks up the winner's id instead of duplicating it.

use crate::db::identity::{
    bind_value, find_identity, try_find_identity, EntityKind, Fingerprint, SqlValue,
};
use crate::types::SongRecord;
use deejay_common::{uuid_utils, Error, Result};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

/// Result of an insert-if-absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub id: Uuid,
    /// False when an existing row was reused
    pub inserted: bool,
}

impl UpsertOutcome {
    fn existing(id: Uuid) -> Self {
        Self { id, inserted: false }
    }
}

/// A validated dimension row ready for insert-if-absent
pub trait DimensionRow: Sized {
    const KIND: EntityKind;

    /// Validate and project a record; never touches storage
    fn from_record(record: &SongRecord) -> Result<Self>;

    /// Non-id column values in declared order
    fn values(&self) -> Vec<(&'static str, SqlValue)>;

    fn fingerprint(&self) -> &Fingerprint;
}

/// Insert-if-absent for a dimension row
pub async fn upsert<R: DimensionRow>(conn: &mut SqliteConnection, row: &R) -> Result<UpsertOutcome> {
    let outcome = insert_if_absent(conn, &row.values(), row.fingerprint()).await?;
    if !outcome.inserted {
        debug!(kind = %R::KIND, id = %outcome.id, "Reusing existing row");
    }
    Ok(outcome)
}

/// Return the id of the row matching `fingerprint`, inserting `values` if none exists
///
/// `values` are the non-id columns of the row. Every column name must be
/// declared for the fingerprint's table.
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    values: &[(&'static str, SqlValue)],
    fingerprint: &Fingerprint,
) -> Result<UpsertOutcome> {
    let table = fingerprint.table;

    let declared = table.column_names();
    if let Some((column, _)) = values.iter().find(|(c, _)| !declared.contains(c)) {
        return Err(Error::Internal(format!(
            "column '{}' is not declared for table {}",
            column, table
        )));
    }

    // A failed lookup counts as no match; the conditional insert re-checks
    if let Some(id) = find_identity(conn, fingerprint).await {
        return Ok(UpsertOutcome::existing(id));
    }

    let id = uuid_utils::generate();
    let sql = conditional_insert_sql(table.name(), values, fingerprint);

    let mut query = sqlx::query(&sql).bind(id.to_string());
    for (_, value) in values {
        query = bind_value(query, value);
    }
    for (_, value) in &fingerprint.columns {
        query = bind_value(query, value);
    }

    let result = query.execute(&mut *conn).await?;

    if result.rows_affected() == 1 {
        debug!(table = %table, %id, "Inserted row");
        return Ok(UpsertOutcome { id, inserted: true });
    }

    // A concurrent writer inserted the same key between lookup and insert
    match try_find_identity(conn, fingerprint).await? {
        Some(existing) => {
            debug!(table = %table, id = %existing, "Insert lost race, reusing existing row");
            Ok(UpsertOutcome::existing(existing))
        }
        None => Err(Error::Internal(format!(
            "conditional insert into {} affected no row and no match exists",
            table
        ))),
    }
}

fn conditional_insert_sql(
    table: &str,
    values: &[(&'static str, SqlValue)],
    fingerprint: &Fingerprint,
) -> String {
    let columns: Vec<&str> = std::iter::once("id")
        .chain(values.iter().map(|(c, _)| *c))
        .collect();
    let placeholders = vec!["?"; columns.len()].join(", ");

    format!(
        "INSERT INTO {table} ({columns}) SELECT {placeholders} \
         WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE {predicate})",
        table = table,
        columns = columns.join(", "),
        placeholders = placeholders,
        predicate = fingerprint.predicate(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use deejay_common::db::Table;

    #[test]
    fn test_conditional_insert_sql() {
        let fp = Fingerprint {
            table: Table::Artist,
            columns: vec![("name", SqlValue::Text("X".to_string()))],
        };
        let sql = conditional_insert_sql(
            "artist",
            &[("name", SqlValue::Text("X".to_string()))],
            &fp,
        );

        assert_eq!(
            sql,
            "INSERT INTO artist (id, name) SELECT ?, ? \
             WHERE NOT EXISTS (SELECT 1 FROM artist WHERE name IS ?)"
        );
    }
}
