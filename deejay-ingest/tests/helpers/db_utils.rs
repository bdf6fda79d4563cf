//! Database Test Utilities

#![allow(dead_code)]

use anyhow::Result;
use deejay_common::config::StoreSettings;
use deejay_ingest::Catalog;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Catalog on a throwaway database file with all tables created
///
/// Returns (TempDir, Catalog) - TempDir must be kept alive for duration of test
pub async fn create_test_catalog() -> Result<(TempDir, Catalog)> {
    create_test_catalog_with(StoreSettings::default()).await
}

pub async fn create_test_catalog_with(settings: StoreSettings) -> Result<(TempDir, Catalog)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_catalog.db");

    let catalog = Catalog::open(&db_path, settings).await?;
    anyhow::ensure!(catalog.create_all().await, "create_all failed");

    Ok((temp_dir, catalog))
}

/// Row count of a table
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}
