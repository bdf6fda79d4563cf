//! Identity resolution
//!
//! Decides whether a row matching a natural key already exists and returns
//! its surrogate id. Lookups compare with `IS` so an absent feature value
//! matches a stored NULL.

use crate::db::dates::parse_date;
use crate::types::SongRecord;
use chrono::NaiveDate;
use deejay_common::db::Table;
use deejay_common::{uuid_utils, Error, Result};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Row, Sqlite, SqliteConnection};
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Dimension entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Song,
    Artist,
    Album,
}

/// How a lookup value is read from the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// Required non-blank text
    Text,
    /// Optional number (absent compares as NULL)
    Number,
    /// Required tag date, normalized to a calendar date
    Date,
}

/// One natural-key column and the record field feeding it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupColumn {
    /// Stored column name
    pub column: &'static str,
    /// Record field name
    pub field: &'static str,
    pub kind: LookupKind,
}

const SONG_LOOKUP: &[LookupColumn] = &[
    LookupColumn { column: "title", field: "title", kind: LookupKind::Text },
    LookupColumn { column: "happy_non_happy", field: "happy_non_happy", kind: LookupKind::Number },
    LookupColumn { column: "sad_non_sad", field: "sad_non_sad", kind: LookupKind::Number },
];

const ARTIST_LOOKUP: &[LookupColumn] = &[
    LookupColumn { column: "name", field: "artist", kind: LookupKind::Text },
];

const ALBUM_LOOKUP: &[LookupColumn] = &[
    LookupColumn { column: "title", field: "album", kind: LookupKind::Text },
    LookupColumn { column: "date", field: "date", kind: LookupKind::Date },
];

impl EntityKind {
    pub fn table(self) -> Table {
        match self {
            EntityKind::Song => Table::Song,
            EntityKind::Artist => Table::Artist,
            EntityKind::Album => Table::Album,
        }
    }

    /// Natural-key columns with their record field mapping
    pub fn lookup_columns(self) -> &'static [LookupColumn] {
        match self {
            EntityKind::Song => SONG_LOOKUP,
            EntityKind::Artist => ARTIST_LOOKUP,
            EntityKind::Album => ALBUM_LOOKUP,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table().name())
    }
}

/// A value bound into a statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Real(f64),
    Integer(i64),
    Date(NaiveDate),
    Id(Uuid),
    Null,
}

impl SqlValue {
    pub fn from_optional_real(value: Option<f64>) -> Self {
        value.map(SqlValue::Real).unwrap_or(SqlValue::Null)
    }

    pub fn from_optional_integer(value: Option<i64>) -> Self {
        value.map(SqlValue::Integer).unwrap_or(SqlValue::Null)
    }
}

/// Bind a value; ids and dates are stored as text
pub fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Real(f) => query.bind(*f),
        SqlValue::Integer(i) => query.bind(*i),
        SqlValue::Date(d) => query.bind(d.format("%Y-%m-%d").to_string()),
        SqlValue::Id(id) => query.bind(id.to_string()),
        SqlValue::Null => query.bind(None::<String>),
    }
}

/// Natural-key values of one row, in declared column order
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    pub table: Table,
    pub columns: Vec<(&'static str, SqlValue)>,
}

impl Fingerprint {
    /// Project a record onto an entity's natural key
    ///
    /// Fails before any storage access when a required key field is
    /// missing or a date cannot be normalized.
    pub fn from_record(kind: EntityKind, record: &SongRecord) -> Result<Self> {
        let mut columns = Vec::with_capacity(kind.lookup_columns().len());

        for lookup in kind.lookup_columns() {
            let value = match lookup.kind {
                LookupKind::Text => record
                    .text(lookup.field)
                    .map(SqlValue::Text)
                    .ok_or_else(|| missing(kind, lookup.field))?,
                LookupKind::Number => SqlValue::from_optional_real(record.number(lookup.field)?),
                LookupKind::Date => {
                    let raw = record
                        .text(lookup.field)
                        .ok_or_else(|| missing(kind, lookup.field))?;
                    let date = parse_date(&raw).ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "{}: unusable {} '{}'",
                            kind, lookup.field, raw
                        ))
                    })?;
                    SqlValue::Date(date)
                }
            };
            columns.push((lookup.column, value));
        }

        Ok(Self {
            table: kind.table(),
            columns,
        })
    }

    /// Fingerprint of a join row: the ordered pair of foreign ids
    pub fn pair(table: Table, first: (&'static str, Uuid), second: (&'static str, Uuid)) -> Self {
        Self {
            table,
            columns: vec![
                (first.0, SqlValue::Id(first.1)),
                (second.0, SqlValue::Id(second.1)),
            ],
        }
    }

    /// `c1 IS ? AND c2 IS ? ...`
    pub fn predicate(&self) -> String {
        self.columns
            .iter()
            .map(|(column, _)| format!("{} IS ?", column))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Value of a key column, if it belongs to this fingerprint
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }
}

fn missing(kind: EntityKind, field: &str) -> Error {
    Error::InvalidInput(format!("{}: missing required field '{}'", kind, field))
}

/// Look up the surrogate id of the row matching `fingerprint`
pub async fn try_find_identity(
    conn: &mut SqliteConnection,
    fingerprint: &Fingerprint,
) -> Result<Option<Uuid>> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} LIMIT 1",
        fingerprint.table.name(),
        fingerprint.predicate()
    );

    let mut query = sqlx::query(&sql);
    for (_, value) in &fingerprint.columns {
        query = bind_value(query, value);
    }

    let Some(row) = query.fetch_optional(&mut *conn).await? else {
        return Ok(None);
    };

    let id: String = row.try_get("id")?;
    let id = uuid_utils::parse(&id).map_err(|e| {
        Error::Internal(format!(
            "{} row has malformed id '{}': {}",
            fingerprint.table, id, e
        ))
    })?;

    debug!(table = %fingerprint.table, %id, "Identity resolved");
    Ok(Some(id))
}

/// Look up the surrogate id, treating any lookup failure as "no match"
///
/// The caller then falls through to an insert attempt, which surfaces
/// the underlying problem if it persists.
pub async fn find_identity(conn: &mut SqliteConnection, fingerprint: &Fingerprint) -> Option<Uuid> {
    match try_find_identity(conn, fingerprint).await {
        Ok(found) => found,
        Err(e) => {
            warn!(table = %fingerprint.table, error = %e, "Identity lookup failed, treating as absent");
            None
        }
    }
}
