//! Test Helper Utilities
//!
//! Shared utilities for deejay-ingest integration tests

pub mod db_utils;
pub mod records;

pub use db_utils::{count_rows, create_test_catalog, create_test_catalog_with};
pub use records::{louis_armstrong_record, scenario_record};
