//! Integration tests for dimension upserts and identity resolution

mod helpers;

use deejay_ingest::{EntityKind, SongRecord};
use helpers::{count_rows, create_test_catalog, louis_armstrong_record, scenario_record};
use sqlx::Row;

#[tokio::test]
async fn test_song_upsert_is_idempotent() {
    let (_dir, catalog) = create_test_catalog().await.unwrap();
    let record = louis_armstrong_record();

    let first = catalog.upsert_song(&record).await.expect("first upsert");
    let second = catalog.upsert_song(&record).await.expect("second upsert");

    assert_eq!(first, second);
    assert_eq!(count_rows(catalog.pool(), "song").await, 1);
}

#[tokio::test]
async fn test_distinct_fingerprints_yield_distinct_songs() {
    let (_dir, catalog) = create_test_catalog().await.unwrap();

    let a = catalog
        .upsert_song(&scenario_record("A", "X", "M"))
        .await
        .unwrap();
    let b = catalog
        .upsert_song(&scenario_record("A", "X", "M").with("sad_non_sad", 0.9))
        .await
        .unwrap();
    let c = catalog
        .upsert_song(&scenario_record("B", "X", "M"))
        .await
        .unwrap();

    assert_ne!(a, b);
    assert_ne!(a, c);
    assert_eq!(count_rows(catalog.pool(), "song").await, 3);
}

#[tokio::test]
async fn test_fingerprint_collision_reuses_first_song() {
    let (_dir, catalog) = create_test_catalog().await.unwrap();

    let first = catalog
        .upsert_song(&scenario_record("A", "X", "M").with("bpm", 100.0))
        .await
        .unwrap();
    // Same title and ratios, different non-key features
    let second = catalog
        .upsert_song(&scenario_record("A", "X", "M").with("bpm", 140.0))
        .await
        .unwrap();

    assert_eq!(first, second);

    let bpm: f64 = sqlx::query_scalar("SELECT bpm FROM song")
        .fetch_one(catalog.pool())
        .await
        .unwrap();
    assert_eq!(bpm, 100.0, "existing row must not be updated");
}

#[tokio::test]
async fn test_unrecognized_keys_are_dropped() {
    let (_dir, catalog) = create_test_catalog().await.unwrap();
    let record = louis_armstrong_record()
        .with("lyrics", "la la la")
        .with("composer", "Fats Waller");

    let id = catalog.upsert_song(&record).await.expect("upsert with extra keys");

    let row = sqlx::query("SELECT * FROM song WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(catalog.pool())
        .await
        .unwrap();

    assert_eq!(row.get::<String, _>("title"), "I'm Crazy 'Bout My Baby - Edit");
    assert_eq!(
        row.get::<Option<String>, _>("comment").as_deref(),
        Some("Converted by https://spotifydown.com")
    );
    assert_eq!(row.get::<f64, _>("valence"), 5.886054);
    assert_eq!(row.get::<f64, _>("arousal"), 5.5037227);
    assert_eq!(row.get::<f64, _>("bpm"), 96.3);
    assert_eq!(row.columns().len(), deejay_common::db::Table::Song.column_names().len());
}

#[tokio::test]
async fn test_missing_fingerprint_ratios_match_null() {
    let (_dir, catalog) = create_test_catalog().await.unwrap();
    let record = SongRecord::new().with("title", "Untagged");

    let first = catalog.upsert_song(&record).await.unwrap();
    let second = catalog.upsert_song(&record).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(count_rows(catalog.pool(), "song").await, 1);
}

#[tokio::test]
async fn test_artist_and_album_upserts() {
    let (_dir, catalog) = create_test_catalog().await.unwrap();
    let record = louis_armstrong_record();

    let artist = catalog.upsert_artist(&record).await.unwrap();
    assert_eq!(catalog.upsert_artist(&record).await, Some(artist));

    let album = catalog.upsert_album(&record).await.unwrap();
    assert_eq!(catalog.upsert_album(&record).await, Some(album));

    // Same title, different release date is a different album
    let reissue = catalog
        .upsert_album(&record.clone().with("date", "1999-05-01"))
        .await
        .unwrap();
    assert_ne!(album, reissue);

    let date: String = sqlx::query_scalar("SELECT date FROM album WHERE id = ?")
        .bind(album.to_string())
        .fetch_one(catalog.pool())
        .await
        .unwrap();
    assert_eq!(date, "1955-01-01");

    assert_eq!(count_rows(catalog.pool(), "artist").await, 1);
    assert_eq!(count_rows(catalog.pool(), "album").await, 2);
}

#[tokio::test]
async fn test_validation_failures_do_not_touch_storage() {
    let (_dir, catalog) = create_test_catalog().await.unwrap();

    let no_artist = SongRecord::new().with("title", "A");
    let bad_date = scenario_record("A", "X", "M").with("date", "1999-13-01");
    let no_title = SongRecord::new().with("artist", "X");

    assert_eq!(catalog.upsert_artist(&no_artist).await, None);
    assert_eq!(catalog.upsert_album(&bad_date).await, None);
    assert_eq!(catalog.upsert_song(&no_title).await, None);

    assert_eq!(count_rows(catalog.pool(), "artist").await, 0);
    assert_eq!(count_rows(catalog.pool(), "album").await, 0);
    assert_eq!(count_rows(catalog.pool(), "song").await, 0);
}

#[tokio::test]
async fn test_find_identity() {
    let (_dir, catalog) = create_test_catalog().await.unwrap();
    let record = scenario_record("A", "X", "M");

    assert_eq!(catalog.find_identity(EntityKind::Album, &record).await, None);

    let album = catalog.upsert_album(&record).await.unwrap();
    assert_eq!(
        catalog.find_identity(EntityKind::Album, &record).await,
        Some(album)
    );
    // "1999" and "1999-01-01" normalize to the same date
    assert_eq!(
        catalog
            .find_identity(EntityKind::Album, &record.clone().with("date", "1999-01-01"))
            .await,
        Some(album)
    );
}

#[tokio::test]
async fn test_storage_failure_returns_absent() {
    let (_dir, catalog) = create_test_catalog().await.unwrap();
    sqlx::query("DROP TABLE song_album")
        .execute(catalog.pool())
        .await
        .unwrap();
    sqlx::query("DROP TABLE song_artist")
        .execute(catalog.pool())
        .await
        .unwrap();
    sqlx::query("DROP TABLE song")
        .execute(catalog.pool())
        .await
        .unwrap();

    assert_eq!(catalog.upsert_song(&scenario_record("A", "X", "M")).await, None);
    // Other tables remain usable
    assert!(catalog.upsert_artist(&scenario_record("A", "X", "M")).await.is_some());
}

#[tokio::test]
async fn test_json_and_numeric_text_features_resolve_to_same_song() {
    let (_dir, catalog) = create_test_catalog().await.unwrap();

    let from_json: SongRecord = serde_json::from_str(
        r#"{"title": "T", "happy_non_happy": 0.09090909090909091, "sad_non_sad": 0.18085106382978725}"#,
    )
    .unwrap();
    let from_text = SongRecord::new()
        .with("title", "T")
        .with("happy_non_happy", "0.09090909090909091")
        .with("sad_non_sad", "0.18085106382978725");

    let first = catalog.upsert_song(&from_json).await.unwrap();
    let second = catalog.upsert_song(&from_text).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(count_rows(catalog.pool(), "song").await, 1);

    let stored: f64 = sqlx::query_scalar("SELECT happy_non_happy FROM song")
        .fetch_one(catalog.pool())
        .await
        .unwrap();
    assert_eq!(stored, 0.09090909090909091);
}
