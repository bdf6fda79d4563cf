//! Inbound song record model
//!
//! A song record is the flat key/value mapping produced by the audio
//! analysis stage: tag metadata (title, artist, album, date, tracknumber)
//! next to classifier ratios, a valence/arousal regression pair and bpm.

use deejay_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// A single value of a song record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Null,
    Flag(bool),
    Number(f64),
    Text(String),
    /// Numeric list; a two-element series is a regression pair
    Series(Vec<f64>),
}

impl From<f64> for RecordValue {
    fn from(value: f64) -> Self {
        RecordValue::Number(value)
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        RecordValue::Text(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        RecordValue::Text(value)
    }
}

impl From<(f64, f64)> for RecordValue {
    fn from((a, b): (f64, f64)) -> Self {
        RecordValue::Series(vec![a, b])
    }
}

impl From<bool> for RecordValue {
    fn from(value: bool) -> Self {
        RecordValue::Flag(value)
    }
}

/// Song record keyed by normalized field name
///
/// Tag keys carrying a descriptor suffix (`comment:n`) are stored under
/// their base key (`comment`). When both spellings are present the
/// unsuffixed one is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, RecordValue>", into = "BTreeMap<String, RecordValue>")]
pub struct SongRecord {
    fields: BTreeMap<String, RecordValue>,
}

impl From<BTreeMap<String, RecordValue>> for SongRecord {
    fn from(raw: BTreeMap<String, RecordValue>) -> Self {
        let mut fields = BTreeMap::new();
        // BTreeMap order puts "comment" before "comment:n"
        for (key, value) in raw {
            fields.entry(normalize_key(&key)).or_insert(value);
        }
        Self { fields }
    }
}

impl From<SongRecord> for BTreeMap<String, RecordValue> {
    fn from(record: SongRecord) -> Self {
        record.fields
    }
}

fn normalize_key(key: &str) -> String {
    key.split(':').next().unwrap_or(key).trim().to_string()
}

impl SongRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<RecordValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<RecordValue>) {
        self.fields.insert(normalize_key(key), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&RecordValue> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Non-blank text value
    ///
    /// Numbers are rendered as text so a year given as `1955` reads as `"1955"`.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            RecordValue::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            RecordValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Numeric value of a feature column
    ///
    /// Absent, null and blank values are `None`. A value that cannot be read
    /// as a number is a validation failure.
    pub fn number(&self, key: &str) -> Result<Option<f64>> {
        match self.fields.get(key) {
            None | Some(RecordValue::Null) => Ok(None),
            Some(RecordValue::Number(n)) => Ok(Some(*n)),
            Some(RecordValue::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(RecordValue::Text(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| {
                Error::InvalidInput(format!("'{}' is not numeric: {:?}", key, s))
            }),
            Some(other) => Err(Error::InvalidInput(format!(
                "'{}' is not numeric: {:?}",
                key, other
            ))),
        }
    }

    /// Two-element regression pair (e.g. `valence_arousal`)
    pub fn pair(&self, key: &str) -> Result<Option<(f64, f64)>> {
        match self.fields.get(key) {
            None | Some(RecordValue::Null) => Ok(None),
            Some(RecordValue::Series(values)) if values.len() == 2 => {
                Ok(Some((values[0], values[1])))
            }
            Some(other) => Err(Error::InvalidInput(format!(
                "'{}' must be a pair of numbers, got {:?}",
                key, other
            ))),
        }
    }

    /// Track number from `"3"`, `"3/12"` or a number
    ///
    /// Blank and unreadable values yield `None`; the track number is an
    /// ordinal only and never blocks ingestion.
    pub fn track_number(&self) -> Option<i64> {
        let parsed = match self.fields.get("tracknumber")? {
            RecordValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 => Some(*n as i64),
            RecordValue::Text(s) if s.trim().is_empty() => return None,
            RecordValue::Text(s) => s.split('/').next().and_then(|n| n.trim().parse().ok()),
            RecordValue::Null => return None,
            _ => None,
        };

        if parsed.is_none() {
            warn!(
                value = ?self.fields.get("tracknumber"),
                "Ignoring unreadable tracknumber"
            );
        }
        parsed
    }
}
