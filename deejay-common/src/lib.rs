//! # deejay Common Library
//!
//! Shared code for the deejay crates:
//! - Error type
//! - Bootstrap configuration (TOML, environment, defaults)
//! - Declared table schemas and schema introspection
//! - Database pool bootstrap
//! - UUID helpers

pub mod config;
pub mod db;
pub mod error;
pub mod uuid_utils;

pub use error::{Error, Result};
