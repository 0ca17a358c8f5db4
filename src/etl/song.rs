//! Song-metadata extraction: one record in, one song row and one artist
//! row out.

use super::events::{parse_song_record, SongRecord};
use crate::warehouse::{ArtistRow, SongRow, Warehouse};
use anyhow::Result;
use std::path::Path;
use tracing::warn;

/// Map one song-metadata record to its song and artist rows, fields copied
/// verbatim.
pub fn extract_song(record: &SongRecord) -> (SongRow, ArtistRow) {
    let song = SongRow {
        song_id: record.song_id.clone(),
        title: record.title.clone(),
        artist_id: record.artist_id.clone(),
        year: record.year,
        duration: record.duration,
    };
    let artist = ArtistRow {
        artist_id: record.artist_id.clone(),
        name: record.artist_name.clone(),
        location: record.artist_location.clone(),
        latitude: record.artist_latitude,
        longitude: record.artist_longitude,
    };
    (song, artist)
}

/// Per-file handler for the song-metadata path.
///
/// A malformed or unreadable file is reported and abandoned without
/// failing the run; a store error propagates and aborts it.
pub fn process_song_file(warehouse: &Warehouse, path: &Path) -> Result<()> {
    let file_text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("Skipping unreadable song file {:?}: {}", path, e);
            return Ok(());
        }
    };
    let record = match parse_song_record(&file_text) {
        Ok(record) => record,
        Err(e) => {
            warn!("Skipping song file {:?}: {}", path, e);
            return Ok(());
        }
    };

    let (song, artist) = extract_song(&record);
    warehouse.insert_song(&song)?;
    warehouse.insert_artist(&artist)?;
    Ok(())
}
