//! Raw input records as the upstream data producer emits them.
//!
//! Field names are a contract with the producer: song-metadata files use
//! snake_case, activity-log files use camelCase. Both arrive as
//! newline-delimited JSON; a song file carries a single record, a log file
//! a batch of event records.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Errors of the malformed-input class. Recoverable: the offending record
/// or file is reported and skipped, the run continues.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Unreadable file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Empty input file")]
    EmptyFile,
}

/// One song-metadata record. year and duration are required by the
/// producer contract; the artist location fields may be absent or null.
#[derive(Debug, Clone, Deserialize)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i64,
    pub duration: f64,
    pub artist_name: String,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
}

/// One activity-log event. Only `NextSong` events carry the full
/// song/artist/session payload, so everything past ts/page/sessionId is
/// optional at parse time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Millisecond epoch timestamp.
    pub ts: i64,
    pub page: String,
    #[serde(default, deserialize_with = "de_user_id")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    pub session_id: i64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl LogEvent {
    pub fn is_next_song(&self) -> bool {
        self.page == "NextSong"
    }
}

/// The producer emits userId as a number, a numeric string, an empty
/// string (anonymous sessions) or not at all. Normalize all of those.
fn de_user_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawUserId {
        Int(i64),
        Str(String),
    }

    match Option::<RawUserId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawUserId::Int(id)) => Ok(Some(id)),
        Some(RawUserId::Str(s)) if s.is_empty() => Ok(None),
        Some(RawUserId::Str(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Parse the single record of a song-metadata file.
pub fn parse_song_record(file_text: &str) -> Result<SongRecord, RecordError> {
    let line = file_text
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or(RecordError::EmptyFile)?;
    Ok(serde_json::from_str(line)?)
}

/// Parse one line of an activity-log file.
pub fn parse_log_event(line: &str) -> Result<LogEvent, RecordError> {
    Ok(serde_json::from_str(line)?)
}
