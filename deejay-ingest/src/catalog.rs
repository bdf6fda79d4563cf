//! Catalog operator surface
//!
//! Every public operation here is a failure boundary: errors are logged and
//! turned into an absent result, a `false`, or a per-table report. Each
//! upsert and each link runs in its own transaction, is retried on lock
//! contention and is bounded by the configured operation timeout.

use crate::db::relations::{self, Link, RelationKind};
use crate::db::{
    identity, schema, upsert, AlbumRow, ArtistRow, BatchReport, DimensionRow, EntityKind,
    Fingerprint, SongRow, UpsertOutcome,
};
use crate::types::SongRecord;
use crate::utils::{begin_monitored, retry_on_lock};
use deejay_common::config::StoreSettings;
use deejay_common::db::{init_database, verify_all, SchemaDrift, Table};
use deejay_common::{Error, Result};
use futures::future::BoxFuture;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Per-record outcome of `ingest`
///
/// `None` means the step failed or was skipped because an id it needed
/// was missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub song: Option<UpsertOutcome>,
    pub album: Option<UpsertOutcome>,
    pub artist: Option<UpsertOutcome>,
    pub song_album: Option<UpsertOutcome>,
    pub song_artist: Option<UpsertOutcome>,
    pub album_artist: Option<UpsertOutcome>,
}

impl IngestReport {
    pub fn dimensions(&self) -> [(EntityKind, Option<UpsertOutcome>); 3] {
        [
            (EntityKind::Song, self.song),
            (EntityKind::Album, self.album),
            (EntityKind::Artist, self.artist),
        ]
    }

    pub fn relations(&self) -> [(RelationKind, Option<UpsertOutcome>); 3] {
        [
            (RelationKind::SongAlbum, self.song_album),
            (RelationKind::SongArtist, self.song_artist),
            (RelationKind::AlbumArtist, self.album_artist),
        ]
    }

    /// All six rows resolved
    pub fn is_complete(&self) -> bool {
        self.dimensions().iter().all(|(_, o)| o.is_some())
            && self.relations().iter().all(|(_, o)| o.is_some())
    }
}

/// Song catalog backed by SQLite
#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
    settings: StoreSettings,
}

impl Catalog {
    pub fn new(pool: SqlitePool, settings: StoreSettings) -> Self {
        Self { pool, settings }
    }

    /// Open (or create) the database file and wrap it
    pub async fn open(db_path: &Path, settings: StoreSettings) -> Result<Self> {
        settings.validate()?;
        let pool = init_database(db_path).await?;
        Ok(Self::new(pool, settings))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Run `op` in its own monitored transaction with lock retry and timeout
    ///
    /// The transaction is committed on success and rolled back on error.
    async fn guarded<T, F>(&self, operation: &'static str, op: F) -> Result<T>
    where
        F: for<'c> Fn(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T>>,
    {
        let pool = &self.pool;
        let op = &op;

        let attempts = retry_on_lock(operation, self.settings.max_lock_wait_ms, || async move {
            let mut tx = begin_monitored(pool, operation).await?;
            let outcome = match tx.connection() {
                Ok(conn) => op(conn).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(value) => {
                    tx.commit().await?;
                    Ok(value)
                }
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(operation, error = %rollback_err, "Rollback failed");
                    }
                    Err(e)
                }
            }
        });

        let timeout = self.settings.operation_timeout();
        match tokio::time::timeout(timeout, attempts).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "{} exceeded {} ms",
                operation,
                timeout.as_millis()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------------

    /// Create all tables in one transaction; also unique indexes when configured
    pub async fn create_all(&self) -> bool {
        let created = self
            .guarded("create_all", |conn| Box::pin(schema::create_all(conn)))
            .await;

        if let Err(e) = created {
            error!(error = %e, "Creating catalog tables failed, nothing was created");
            return false;
        }

        if self.settings.unique_indexes {
            return self.create_unique_indexes().await.is_success();
        }
        true
    }

    /// Unique index over each table's natural key, one transaction per table
    pub async fn create_unique_indexes(&self) -> BatchReport {
        let mut report = BatchReport::default();

        for table in Table::ALL {
            let result = self
                .guarded("create_unique_index", move |conn| {
                    Box::pin(schema::create_unique_index(conn, table))
                })
                .await;

            match result {
                Ok(()) => report.record_success(table.name()),
                Err(e) => {
                    // Existing duplicate keys make the index impossible
                    error!(table = %table, error = %e, "Creating unique index failed");
                    report.record_failure(table.name(), e);
                }
            }
        }

        info!(
            created = report.succeeded.len(),
            failed = report.failed.len(),
            "Unique indexes processed"
        );
        report
    }

    /// Drop each named table in its own transaction
    ///
    /// Join tables referencing a dropped table are dropped with it and
    /// reported as well.
    pub async fn drop_all<S: AsRef<str>>(&self, names: &[S]) -> BatchReport {
        self.per_table("drop_table", names, |conn, table| {
            Box::pin(schema::drop_table(conn, table))
        })
        .await
    }

    /// Delete all rows of each named table in its own transaction
    pub async fn delete_all<S: AsRef<str>>(&self, names: &[S]) -> BatchReport {
        self.per_table("delete_table", names, |conn, table| {
            Box::pin(async move { schema::delete_table(conn, table).await.map(|_| vec![table]) })
        })
        .await
    }

    /// `op` returns every table it processed
    async fn per_table<S, F>(&self, operation: &'static str, names: &[S], op: F) -> BatchReport
    where
        S: AsRef<str>,
        F: for<'c> Fn(&'c mut SqliteConnection, Table) -> BoxFuture<'c, Result<Vec<Table>>>,
    {
        let mut report = BatchReport::default();

        for name in names {
            let name = name.as_ref();

            let table: Table = match name.parse() {
                Ok(table) => table,
                Err(e) => {
                    warn!(operation, table = name, error = %e, "Skipping unknown table");
                    report.record_failure(name, e);
                    continue;
                }
            };

            let op = &op;
            match self.guarded(operation, move |conn| op(conn, table)).await {
                Ok(processed) => {
                    info!(operation, table = %table, processed = processed.len(), "Table processed");
                    for t in processed {
                        report.record_success(t.name());
                    }
                }
                Err(e) => {
                    error!(operation, table = %table, error = %e, "Table operation failed");
                    report.record_failure(table.name(), e);
                }
            }
        }

        report
    }

    /// Compare the live tables with the declared schema
    pub async fn verify_schema(&self) -> Option<Vec<SchemaDrift>> {
        match verify_all(&self.pool).await {
            Ok(drift) => Some(drift),
            Err(e) => {
                error!(error = %e, "Schema verification failed");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Identity and dimension upserts
    // ------------------------------------------------------------------

    /// Read-only identity lookup for a record
    pub async fn find_identity(&self, kind: EntityKind, record: &SongRecord) -> Option<Uuid> {
        let fingerprint = match Fingerprint::from_record(kind, record) {
            Ok(fp) => fp,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Cannot build lookup key");
                return None;
            }
        };

        let mut conn = match self.pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Identity lookup could not acquire a connection");
                return None;
            }
        };

        identity::find_identity(&mut *conn, &fingerprint).await
    }

    pub async fn upsert_song(&self, record: &SongRecord) -> Option<Uuid> {
        self.upsert_dimension::<SongRow>(record).await.map(|o| o.id)
    }

    pub async fn upsert_artist(&self, record: &SongRecord) -> Option<Uuid> {
        self.upsert_dimension::<ArtistRow>(record).await.map(|o| o.id)
    }

    pub async fn upsert_album(&self, record: &SongRecord) -> Option<Uuid> {
        self.upsert_dimension::<AlbumRow>(record).await.map(|o| o.id)
    }

    /// Validate, then insert-if-absent; validation failures never reach storage
    pub async fn upsert_dimension<R>(&self, record: &SongRecord) -> Option<UpsertOutcome>
    where
        R: DimensionRow + Clone + Send + Sync + 'static,
    {
        let row = match R::from_record(record) {
            Ok(row) => row,
            Err(e) => {
                warn!(kind = %R::KIND, error = %e, "Record rejected");
                return None;
            }
        };

        let result = self
            .guarded("upsert", move |conn| {
                let row = row.clone();
                Box::pin(async move { upsert::upsert(conn, &row).await })
            })
            .await;

        match result {
            Ok(outcome) => {
                debug!(kind = %R::KIND, id = %outcome.id, inserted = outcome.inserted, "Upserted");
                Some(outcome)
            }
            Err(e) => {
                error!(kind = %R::KIND, error = %e, "Upsert failed");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// Ensure one join row exists for the two ids
    pub async fn link(
        &self,
        relation: RelationKind,
        first_kind: EntityKind,
        first_id: Uuid,
        second_kind: EntityKind,
        second_id: Uuid,
    ) -> Option<Uuid> {
        self.link_with_ordinal(relation, (first_kind, first_id), (second_kind, second_id), None)
            .await
            .map(|o| o.id)
    }

    /// `link` carrying the song_album track number
    pub async fn link_with_ordinal(
        &self,
        relation: RelationKind,
        first: (EntityKind, Uuid),
        second: (EntityKind, Uuid),
        ordinal: Option<i64>,
    ) -> Option<UpsertOutcome> {
        let link = match Link::new(relation, first, second, ordinal) {
            Ok(link) => link,
            Err(e) => {
                warn!(relation = %relation, error = %e, "Link rejected");
                return None;
            }
        };

        let result = self
            .guarded("link", move |conn| {
                Box::pin(async move { relations::link(conn, &link).await })
            })
            .await;

        match result {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(
                    relation = %relation,
                    first = %link.first,
                    second = %link.second,
                    error = %e,
                    "Link failed"
                );
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------

    /// Upsert song, album and artist, then link them pairwise
    ///
    /// Links whose ids are missing are skipped.
    pub async fn ingest(&self, record: &SongRecord) -> IngestReport {
        let song = self.upsert_dimension::<SongRow>(record).await;
        let album = self.upsert_dimension::<AlbumRow>(record).await;
        let artist = self.upsert_dimension::<ArtistRow>(record).await;

        let song_album = match (song, album) {
            (Some(s), Some(a)) => {
                self.link_with_ordinal(
                    RelationKind::SongAlbum,
                    (EntityKind::Song, s.id),
                    (EntityKind::Album, a.id),
                    record.track_number(),
                )
                .await
            }
            _ => None,
        };

        let song_artist = match (song, artist) {
            (Some(s), Some(a)) => {
                self.link_with_ordinal(
                    RelationKind::SongArtist,
                    (EntityKind::Song, s.id),
                    (EntityKind::Artist, a.id),
                    None,
                )
                .await
            }
            _ => None,
        };

        let album_artist = match (album, artist) {
            (Some(al), Some(ar)) => {
                self.link_with_ordinal(
                    RelationKind::AlbumArtist,
                    (EntityKind::Album, al.id),
                    (EntityKind::Artist, ar.id),
                    None,
                )
                .await
            }
            _ => None,
        };

        let report = IngestReport {
            song,
            album,
            artist,
            song_album,
            song_artist,
            album_artist,
        };

        if !report.is_complete() {
            warn!(title = ?record.text("title"), "Record only partially ingested");
        }
        report
    }
}
