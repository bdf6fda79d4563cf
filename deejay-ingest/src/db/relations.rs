//! Relation linking
//!
//! One join row per (first_id, second_id) pair. The optional ordinal (track
//! number) only exists on song_album and is written once, on creation.

use crate::db::identity::{EntityKind, Fingerprint, SqlValue};
use crate::db::upsert::{insert_if_absent, UpsertOutcome};
use deejay_common::db::Table;
use deejay_common::{Error, Result};
use sqlx::SqliteConnection;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Join table kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    SongAlbum,
    SongArtist,
    AlbumArtist,
}

impl RelationKind {
    pub const ALL: [RelationKind; 3] = [
        RelationKind::SongAlbum,
        RelationKind::SongArtist,
        RelationKind::AlbumArtist,
    ];

    pub fn table(self) -> Table {
        match self {
            RelationKind::SongAlbum => Table::SongAlbum,
            RelationKind::SongArtist => Table::SongArtist,
            RelationKind::AlbumArtist => Table::AlbumArtist,
        }
    }

    /// Entity kinds in column order
    pub fn kinds(self) -> (EntityKind, EntityKind) {
        match self {
            RelationKind::SongAlbum => (EntityKind::Song, EntityKind::Album),
            RelationKind::SongArtist => (EntityKind::Song, EntityKind::Artist),
            RelationKind::AlbumArtist => (EntityKind::Album, EntityKind::Artist),
        }
    }

    /// Foreign-key columns in column order
    pub fn key_columns(self) -> (&'static str, &'static str) {
        match self {
            RelationKind::SongAlbum => ("song_id", "album_id"),
            RelationKind::SongArtist => ("song_id", "artist_id"),
            RelationKind::AlbumArtist => ("album_id", "artist_id"),
        }
    }

    /// Relation joining two entity kinds, in either order
    pub fn between(a: EntityKind, b: EntityKind) -> Option<RelationKind> {
        Self::ALL.into_iter().find(|rel| {
            let (first, second) = rel.kinds();
            (first, second) == (a, b) || (first, second) == (b, a)
        })
    }

    pub fn has_ordinal(self) -> bool {
        self == RelationKind::SongAlbum
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table().name())
    }
}

impl FromStr for RelationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let table: Table = s.parse()?;
        Self::ALL
            .into_iter()
            .find(|rel| rel.table() == table)
            .ok_or_else(|| Error::InvalidInput(format!("'{}' is not a relation table", s)))
    }
}

/// A validated link request with ids in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub kind: RelationKind,
    pub first: Uuid,
    pub second: Uuid,
    pub ordinal: Option<i64>,
}

impl Link {
    /// Order `(kind, id)` pairs to match the relation's columns
    ///
    /// Fails when the entity kinds do not belong to the relation or an
    /// ordinal is given for a relation without one.
    pub fn new(
        kind: RelationKind,
        a: (EntityKind, Uuid),
        b: (EntityKind, Uuid),
        ordinal: Option<i64>,
    ) -> Result<Self> {
        let (first_kind, second_kind) = kind.kinds();

        let (first, second) = if (a.0, b.0) == (first_kind, second_kind) {
            (a.1, b.1)
        } else if (b.0, a.0) == (first_kind, second_kind) {
            (b.1, a.1)
        } else {
            return Err(Error::InvalidInput(format!(
                "{} does not join {} and {}",
                kind, a.0, b.0
            )));
        };

        if ordinal.is_some() && !kind.has_ordinal() {
            return Err(Error::InvalidInput(format!("{} carries no ordinal", kind)));
        }

        Ok(Self {
            kind,
            first,
            second,
            ordinal,
        })
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let (first_col, second_col) = self.kind.key_columns();
        Fingerprint::pair(
            self.kind.table(),
            (first_col, self.first),
            (second_col, self.second),
        )
    }

    fn values(&self) -> Vec<(&'static str, SqlValue)> {
        let (first_col, second_col) = self.kind.key_columns();
        let mut values = vec![
            (first_col, SqlValue::Id(self.first)),
            (second_col, SqlValue::Id(self.second)),
        ];
        if self.kind.has_ordinal() {
            values.push(("tracknumber", SqlValue::from_optional_integer(self.ordinal)));
        }
        values
    }
}

/// Ensure exactly one join row exists for the link's id pair
///
/// A foreign-key violation (unknown id) surfaces as a database error.
pub async fn link(conn: &mut SqliteConnection, link: &Link) -> Result<UpsertOutcome> {
    insert_if_absent(conn, &link.values(), &link.fingerprint()).await
}
