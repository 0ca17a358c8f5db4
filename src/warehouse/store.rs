//! SQLite-backed warehouse store.
//!
//! Owns the single connection used for the whole run. The connection runs
//! in autocommit mode, so every successful write is durable immediately and
//! rows written before a failure stay committed. The pipeline is strictly
//! single-threaded; `Warehouse` is deliberately not shared across threads.

use super::models::{ArtistRow, SongRow, SongplayRow};
use super::schema::{Table, ALL_TABLES, ARTISTS_TABLE, SONGPLAYS_TABLE, SONGS_TABLE, SONG_SELECT_SQL};
use anyhow::{bail, Context, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

pub struct Warehouse {
    conn: Connection,
}

fn create_schema(conn: &Connection) -> Result<()> {
    for table in ALL_TABLES {
        conn.execute(&table.create_sql(), [])
            .with_context(|| format!("Failed to create table {}", table.name))?;
        for (index_name, column_name) in table.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({});", index_name, table.name, column_name),
                [],
            )
            .with_context(|| format!("Failed to create index {}", index_name))?;
        }
    }
    Ok(())
}

impl Warehouse {
    /// Open (or create) the warehouse database at `db_path`. A brand new
    /// database gets the full star schema created on the spot.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            db_path.as_ref(),
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open warehouse database {:?}", db_path.as_ref()))?;

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
                [],
                |r| r.get(0),
            )
            .unwrap_or(0);

        if table_count == 0 {
            info!("Creating warehouse schema in {:?}", db_path.as_ref());
            create_schema(&conn)?;
        }

        Ok(Warehouse { conn })
    }

    /// Drop and recreate all five tables, discarding any loaded data.
    pub fn recreate_schema(&self) -> Result<()> {
        for table in ALL_TABLES {
            self.conn
                .execute(&table.drop_sql(), [])
                .with_context(|| format!("Failed to drop table {}", table.name))?;
        }
        create_schema(&self.conn)
    }

    /// Upsert one song row; a repeated song_id overwrites the stored row.
    pub fn insert_song(&self, row: &SongRow) -> Result<()> {
        let sql = SONGS_TABLE.insert_sql();
        self.conn
            .execute(
                &sql,
                params![row.song_id, row.title, row.artist_id, row.year, row.duration],
            )
            .with_context(|| format!("Song insert failed for {}: {}", row.song_id, sql))?;
        Ok(())
    }

    /// Upsert one artist row; a repeated artist_id overwrites the stored row.
    pub fn insert_artist(&self, row: &ArtistRow) -> Result<()> {
        let sql = ARTISTS_TABLE.insert_sql();
        self.conn
            .execute(
                &sql,
                params![row.artist_id, row.name, row.location, row.latitude, row.longitude],
            )
            .with_context(|| format!("Artist insert failed for {}: {}", row.artist_id, sql))?;
        Ok(())
    }

    pub fn insert_songplay(&self, row: &SongplayRow) -> Result<()> {
        let sql = SONGPLAYS_TABLE.insert_sql();
        self.conn
            .execute(
                &sql,
                params![
                    row.start_time,
                    row.user_id,
                    row.level,
                    row.song_id,
                    row.artist_id,
                    row.session_id,
                    row.location,
                    row.user_agent,
                ],
            )
            .with_context(|| format!("Songplay insert failed at ts {}: {}", row.start_time, sql))?;
        Ok(())
    }

    /// Resolve (song_id, artist_id) by exact match on title, artist name and
    /// duration. Returns None when nothing matches; on multiple matches the
    /// first row wins.
    pub fn lookup_song(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<(String, String)>> {
        self.conn
            .query_row(SONG_SELECT_SQL, params![title, artist_name, duration], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()
            .with_context(|| format!("Song lookup failed for \"{}\" / \"{}\"", title, artist_name))
    }

    /// Append a header-less comma-separated buffer verbatim to `table`.
    ///
    /// Each line must carry one field per declared column, in declared
    /// order; empty fields load as NULL. No deduplication happens here, the
    /// reconciler cleans up afterwards. Returns the number of appended rows.
    pub fn bulk_append(&self, table: &Table, buffer: &str) -> Result<usize> {
        let sql = table.insert_sql();
        let mut stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("Failed to prepare bulk insert: {}", sql))?;
        let expected = table.columns.len();
        let mut appended = 0;
        for line in buffer.lines() {
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != expected {
                bail!(
                    "Bulk record for {} has {} fields, expected {}: {}",
                    table.name,
                    fields.len(),
                    expected,
                    line
                );
            }
            stmt.execute(params_from_iter(
                fields
                    .iter()
                    .map(|f| if f.is_empty() { None } else { Some(*f) }),
            ))
            .with_context(|| format!("Bulk append into {} failed for record: {}", table.name, line))?;
            appended += 1;
        }
        Ok(appended)
    }

    /// Remove every row of `table` that is not the last inserted one for its
    /// `key_column` value. Idempotent. Returns the number of deleted rows.
    pub fn delete_key_duplicates(&self, table: &Table, key_column: &str) -> Result<usize> {
        let sql = format!(
            "DELETE FROM {table} WHERE rowid NOT IN \
             (SELECT MAX(rowid) FROM {table} GROUP BY {key})",
            table = table.name,
            key = key_column,
        );
        self.conn
            .execute(&sql, [])
            .with_context(|| format!("Deduplication failed: {}", sql))
    }

    pub fn row_count(&self, table: &Table) -> Result<i64> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table.name), [], |r| r.get(0))
            .with_context(|| format!("Failed to count rows in {}", table.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::schema::{TIME_TABLE, USERS_TABLE};
    use tempfile::TempDir;

    fn create_tmp_warehouse() -> (Warehouse, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let warehouse = Warehouse::open(temp_dir.path().join("test.db")).unwrap();
        (warehouse, temp_dir)
    }

    fn sample_song() -> SongRow {
        SongRow {
            song_id: "SOUPIRU12A6D4FA1E1".to_string(),
            title: "Der Kleine Dompfaff".to_string(),
            artist_id: "ARJIE2Y1187B994AB7".to_string(),
            year: 0,
            duration: 152.92036,
        }
    }

    fn sample_artist() -> ArtistRow {
        ArtistRow {
            artist_id: "ARJIE2Y1187B994AB7".to_string(),
            name: "Line Renaud".to_string(),
            location: Some("Paris, France".to_string()),
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn open_creates_schema_once() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let warehouse = Warehouse::open(&db_path).unwrap();
        assert_eq!(warehouse.row_count(&SONGS_TABLE).unwrap(), 0);
        drop(warehouse);

        // Reopening an existing database must not try to recreate tables.
        let warehouse = Warehouse::open(&db_path).unwrap();
        assert_eq!(warehouse.row_count(&SONGS_TABLE).unwrap(), 0);
    }

    #[test]
    fn song_and_artist_upserts_are_idempotent() {
        let (warehouse, _temp_dir) = create_tmp_warehouse();
        warehouse.insert_song(&sample_song()).unwrap();
        warehouse.insert_song(&sample_song()).unwrap();
        warehouse.insert_artist(&sample_artist()).unwrap();
        warehouse.insert_artist(&sample_artist()).unwrap();
        assert_eq!(warehouse.row_count(&SONGS_TABLE).unwrap(), 1);
        assert_eq!(warehouse.row_count(&ARTISTS_TABLE).unwrap(), 1);
    }

    #[test]
    fn lookup_resolves_exact_triple_only() {
        let (warehouse, _temp_dir) = create_tmp_warehouse();
        warehouse.insert_song(&sample_song()).unwrap();
        warehouse.insert_artist(&sample_artist()).unwrap();

        let hit = warehouse
            .lookup_song("Der Kleine Dompfaff", "Line Renaud", 152.92036)
            .unwrap();
        assert_eq!(
            hit,
            Some((
                "SOUPIRU12A6D4FA1E1".to_string(),
                "ARJIE2Y1187B994AB7".to_string()
            ))
        );

        // Case-sensitive exact match, no fuzzy fallback.
        assert!(warehouse
            .lookup_song("der kleine dompfaff", "Line Renaud", 152.92036)
            .unwrap()
            .is_none());
        assert!(warehouse
            .lookup_song("Der Kleine Dompfaff", "Line Renaud", 152.9)
            .unwrap()
            .is_none());
    }

    #[test]
    fn bulk_append_loads_verbatim_with_nulls() {
        let (warehouse, _temp_dir) = create_tmp_warehouse();
        let appended = warehouse
            .bulk_append(&USERS_TABLE, "39,Walter,Frye,M,free\n39,Walter,Frye,M,paid\n8,,,F,\n")
            .unwrap();
        assert_eq!(appended, 3);
        assert_eq!(warehouse.row_count(&USERS_TABLE).unwrap(), 3);
    }

    #[test]
    fn bulk_append_rejects_ragged_records() {
        let (warehouse, _temp_dir) = create_tmp_warehouse();
        let result = warehouse.bulk_append(&TIME_TABLE, "1542241826796,0,15\n");
        assert!(result.is_err());
    }

    #[test]
    fn delete_key_duplicates_keeps_last_inserted() {
        let (warehouse, _temp_dir) = create_tmp_warehouse();
        warehouse
            .bulk_append(&USERS_TABLE, "39,Walter,Frye,M,free\n39,Walter,Frye,M,paid\n")
            .unwrap();
        let deleted = warehouse.delete_key_duplicates(&USERS_TABLE, "user_id").unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(warehouse.row_count(&USERS_TABLE).unwrap(), 1);

        // Idempotent: a second pass removes nothing.
        let deleted = warehouse.delete_key_duplicates(&USERS_TABLE, "user_id").unwrap();
        assert_eq!(deleted, 0);
    }
}
