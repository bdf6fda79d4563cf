//! Sample song records

#![allow(dead_code)]

use deejay_ingest::SongRecord;

/// Full analyzer output for one track
pub fn louis_armstrong_record() -> SongRecord {
    serde_json::from_str(
        r#"{
            "album": "Satch Plays Fats",
            "artist": "Louis Armstrong",
            "comment:n": "Converted by https://spotifydown.com",
            "date": "1955",
            "title": "I'm Crazy 'Bout My Baby - Edit",
            "tracknumber": "",
            "valence_arousal": [5.886054, 5.5037227],
            "danceable_not_danceable": 0.19786096256684493,
            "aggressive_non_aggressive": 0.0,
            "happy_non_happy": 0.09090909090909091,
            "party_non_party": 0.7165775401069518,
            "relaxed_non_relaxed": 0.0,
            "sad_non_sad": 0.18085106382978725,
            "acoustic_non_acoustic": 0.475177304964539,
            "electronic_non_electronic": 0.0,
            "instrumental_voice": 0.3333333333333333,
            "female_male": 0.19858156028368795,
            "bright_dark": 0.014184397163120567,
            "acoustic_electronic": 0.014184397163120567,
            "dry_wet": 0.7553191489361702,
            "bpm": 96.3
        }"#,
    )
    .unwrap()
}

/// Minimal record: title/artist/album/date plus the two fingerprint ratios
pub fn scenario_record(title: &str, artist: &str, album: &str) -> SongRecord {
    SongRecord::new()
        .with("title", title)
        .with("artist", artist)
        .with("album", album)
        .with("date", "1999")
        .with("happy_non_happy", 0.2)
        .with("sad_non_sad", 0.1)
}
