//! Activity-log transformation: the fact-table assembly pipeline.
//!
//! Per log file: filter to NextSong events, derive the time dimension,
//! deduplicate users, resolve song/artist foreign keys and emit one
//! songplay row per retained event, in original file order.
//!
//! Write strategy: user and time rows go through the bulk columnar path
//! (buffered, appended verbatim, deduplicated later by the reconciler);
//! songplay rows are inserted row by row because each depends on a
//! per-row lookup.

use super::events::{parse_log_event, LogEvent};
use crate::warehouse::{SongplayRow, TimeRow, UserRow, Warehouse, TIME_TABLE, USERS_TABLE};
use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info, warn};

/// Keep only song-play events. Order-preserving and idempotent: other
/// pages carry no song/artist/session payload worth faceting.
pub fn filter_next_song(events: Vec<LogEvent>) -> Vec<LogEvent> {
    events.into_iter().filter(LogEvent::is_next_song).collect()
}

/// Derive one time row per event. An out-of-range timestamp is a
/// malformed record: reported, skipped.
pub fn derive_time_rows(events: &[LogEvent]) -> Vec<TimeRow> {
    let mut rows = Vec::with_capacity(events.len());
    for event in events {
        match TimeRow::from_epoch_ms(event.ts) {
            Ok(row) => rows.push(row),
            Err(e) => warn!("Skipping time derivation: {:#}", e),
        }
    }
    rows
}

/// One user row per distinct user_id, keeping the first occurrence in
/// file order (stable, not sorted). Events without a user id carry no
/// user row.
pub fn dedup_users(events: &[LogEvent]) -> Vec<UserRow> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for event in events {
        let Some(user_id) = event.user_id else {
            continue;
        };
        if !seen.insert(user_id) {
            continue;
        }
        rows.push(UserRow {
            user_id,
            first_name: event.first_name.clone(),
            last_name: event.last_name.clone(),
            gender: event.gender.clone(),
            level: event.level.clone(),
        });
    }
    rows
}

fn build_songplay(event: &LogEvent, resolved: Option<(String, String)>) -> SongplayRow {
    let (song_id, artist_id) = match resolved {
        Some((song_id, artist_id)) => (Some(song_id), Some(artist_id)),
        None => (None, None),
    };
    SongplayRow {
        start_time: event.ts,
        user_id: event.user_id,
        level: event.level.clone(),
        song_id,
        artist_id,
        session_id: event.session_id,
        location: event.location.clone(),
        user_agent: event.user_agent.clone(),
    }
}

/// Per-file handler for the activity-log path.
///
/// Malformed lines are reported and skipped; a bulk-append or insert
/// failure propagates and aborts the run; a lookup-query failure skips
/// only that row's play.
pub fn process_log_file(warehouse: &Warehouse, path: &Path) -> Result<()> {
    let file_text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("Skipping unreadable log file {:?}: {}", path, e);
            return Ok(());
        }
    };

    let mut events = Vec::new();
    for line in file_text.lines().filter(|l| !l.trim().is_empty()) {
        match parse_log_event(line) {
            Ok(event) => events.push(event),
            Err(e) => warn!("Skipping log record in {:?}: {}", path, e),
        }
    }

    let events = filter_next_song(events);

    let time_buffer: String = derive_time_rows(&events)
        .iter()
        .map(|row| row.bulk_record() + "\n")
        .collect();
    let time_rows = warehouse.bulk_append(&TIME_TABLE, &time_buffer)?;

    let user_buffer: String = dedup_users(&events)
        .iter()
        .filter_map(|row| match row.bulk_record() {
            Some(record) => Some(record + "\n"),
            None => {
                // Awkward but parseable record; report it and keep going.
                warn!(
                    "Skipping user row {} in {:?}: field contains the bulk delimiter",
                    row.user_id, path
                );
                None
            }
        })
        .collect();
    let user_rows = warehouse.bulk_append(&USERS_TABLE, &user_buffer)?;

    let mut songplays = 0;
    for event in &events {
        let resolved = match (&event.song, &event.artist, event.length) {
            (Some(song), Some(artist), Some(length)) => {
                match warehouse.lookup_song(song, artist, length) {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        // Skip this row's play, keep going with the rest.
                        error!("{:#}", e);
                        continue;
                    }
                }
            }
            _ => None,
        };
        warehouse.insert_songplay(&build_songplay(event, resolved))?;
        songplays += 1;
    }

    info!(
        "{:?}: {} time rows, {} user rows, {} songplays",
        path, time_rows, user_rows, songplays
    );
    Ok(())
}
