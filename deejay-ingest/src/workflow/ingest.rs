//! Batch ingest
//!
//! Runs `Catalog::ingest` over a sequence of records with a bounded number
//! in flight (`store.ingest_concurrency`, default 1 = one record fully
//! processed before the next starts).

use crate::catalog::{Catalog, IngestReport};
use crate::db::UpsertOutcome;
use crate::types::SongRecord;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Created / reused / failed counts for one row kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub created: usize,
    pub reused: usize,
    pub failed: usize,
}

impl Tally {
    fn add(&mut self, outcome: Option<UpsertOutcome>) {
        match outcome {
            Some(o) if o.inserted => self.created += 1,
            Some(_) => self.reused += 1,
            None => self.failed += 1,
        }
    }
}

/// Totals of a batch ingest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub records: usize,
    /// Records with at least one failed or skipped step
    pub incomplete: usize,
    pub songs: Tally,
    pub albums: Tally,
    pub artists: Tally,
    pub relations: Tally,
}

impl IngestSummary {
    pub fn absorb(&mut self, report: &IngestReport) {
        self.records += 1;
        if !report.is_complete() {
            self.incomplete += 1;
        }

        self.songs.add(report.song);
        self.albums.add(report.album);
        self.artists.add(report.artist);
        for (_, outcome) in report.relations() {
            self.relations.add(outcome);
        }
    }
}

/// Ingest all records and summarize
pub async fn ingest_all(catalog: &Catalog, records: Vec<SongRecord>) -> IngestSummary {
    let start = Instant::now();
    let concurrency = catalog.settings().ingest_concurrency.max(1);
    let total = records.len();

    info!(records = total, concurrency, "Starting ingest");

    let summary = stream::iter(records)
        .map(|record| async move { catalog.ingest(&record).await })
        .buffer_unordered(concurrency)
        .fold(IngestSummary::default(), |mut summary, report| async move {
            summary.absorb(&report);
            summary
        })
        .await;

    info!(
        records = summary.records,
        incomplete = summary.incomplete,
        songs_created = summary.songs.created,
        albums_created = summary.albums.created,
        artists_created = summary.artists.created,
        relations_created = summary.relations.created,
        elapsed_ms = start.elapsed().as_millis(),
        "Ingest complete"
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn created() -> Option<UpsertOutcome> {
        Some(UpsertOutcome { id: Uuid::new_v4(), inserted: true })
    }

    fn reused() -> Option<UpsertOutcome> {
        Some(UpsertOutcome { id: Uuid::new_v4(), inserted: false })
    }

    #[test]
    fn test_absorb_complete_report() {
        let report = IngestReport {
            song: created(),
            album: reused(),
            artist: reused(),
            song_album: created(),
            song_artist: created(),
            album_artist: reused(),
        };

        let mut summary = IngestSummary::default();
        summary.absorb(&report);

        assert_eq!(summary.records, 1);
        assert_eq!(summary.incomplete, 0);
        assert_eq!(summary.songs, Tally { created: 1, reused: 0, failed: 0 });
        assert_eq!(summary.albums.reused, 1);
        assert_eq!(summary.relations, Tally { created: 2, reused: 1, failed: 0 });
    }

    #[test]
    fn test_absorb_partial_report() {
        let report = IngestReport {
            song: created(),
            artist: created(),
            song_artist: created(),
            ..IngestReport::default()
        };

        let mut summary = IngestSummary::default();
        summary.absorb(&report);

        assert_eq!(summary.incomplete, 1);
        assert_eq!(summary.albums.failed, 1);
        assert_eq!(summary.relations.failed, 2);
    }
}
