//! SQLite schema definitions for the playvault star schema.
//!
//! One fact table (songplays) and four dimension tables (songs, artists,
//! users, time). Statement text (CREATE/DROP/INSERT) and column lists are
//! generated from the declarative `Table` definitions below so the column
//! order used by the bulk-load path always matches the DDL.

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
}

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Allow unused_mut because the variable is only mutated when
            // optional field assignments are passed to the macro
            // (e.g., `is_primary_key = true`)
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
    /// Conflict clause appended to the generated INSERT, for tables whose
    /// key may legitimately repeat across input files.
    pub on_conflict: Option<&'static str>,
}

impl Table {
    pub fn create_sql(&self) -> String {
        let mut sql = format!("CREATE TABLE {} (", self.name);
        for (column_index, column) in self.columns.iter().enumerate() {
            if column_index > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!(
                "{} {}",
                column.name,
                match column.sql_type {
                    SqlType::Text => "TEXT",
                    SqlType::Integer => "INTEGER",
                    SqlType::Real => "REAL",
                }
            ));
            if column.is_primary_key {
                sql.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                sql.push_str(" NOT NULL");
            }
        }
        sql.push_str(");");
        sql
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {};", self.name)
    }

    /// Parameterized INSERT over the full declared column order, with the
    /// table's conflict clause appended when it has one.
    pub fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.column_names().collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            names.join(", "),
            placeholders.join(", ")
        );
        if let Some(clause) = self.on_conflict {
            sql.push(' ');
            sql.push_str(clause);
        }
        sql
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }
}

/// Songs dimension, sourced 1:1 from song-metadata records.
pub const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("song_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("duration", &SqlType::Real),
    ],
    indices: &[("idx_songs_title", "title")],
    on_conflict: Some(
        "ON CONFLICT(song_id) DO UPDATE SET title = excluded.title, \
         artist_id = excluded.artist_id, year = excluded.year, duration = excluded.duration",
    ),
};

/// Artists dimension, sourced from the same record as its song.
pub const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("latitude", &SqlType::Real),
        sqlite_column!("longitude", &SqlType::Real),
    ],
    indices: &[("idx_artists_name", "name")],
    on_conflict: Some(
        "ON CONFLICT(artist_id) DO UPDATE SET name = excluded.name, \
         location = excluded.location, latitude = excluded.latitude, \
         longitude = excluded.longitude",
    ),
};

/// Users dimension. user_id is the semantic key but is deliberately not
/// declared UNIQUE: the bulk-load path appends rows verbatim and the
/// duplicate reconciler enforces the key afterwards.
pub const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("first_name", &SqlType::Text),
        sqlite_column!("last_name", &SqlType::Text),
        sqlite_column!("gender", &SqlType::Text),
        sqlite_column!("level", &SqlType::Text),
    ],
    indices: &[("idx_users_user_id", "user_id")],
    on_conflict: None,
};

/// Time dimension. start_time (epoch millis) is the semantic key, enforced
/// by the reconciler for the same reason as `users`.
pub const TIME_TABLE: Table = Table {
    name: "time",
    columns: &[
        sqlite_column!("start_time", &SqlType::Integer, non_null = true),
        sqlite_column!("hour", &SqlType::Integer),
        sqlite_column!("day", &SqlType::Integer),
        sqlite_column!("week", &SqlType::Text),
        sqlite_column!("month", &SqlType::Integer),
        sqlite_column!("year", &SqlType::Integer),
        sqlite_column!("weekday", &SqlType::Integer),
    ],
    indices: &[("idx_time_start_time", "start_time")],
    on_conflict: None,
};

/// Songplays fact table. song_id/artist_id stay NULL when the lookup
/// against the songs/artists dimensions finds no match.
pub const SONGPLAYS_TABLE: Table = Table {
    name: "songplays",
    columns: &[
        sqlite_column!("start_time", &SqlType::Integer, non_null = true),
        sqlite_column!("user_id", &SqlType::Integer),
        sqlite_column!("level", &SqlType::Text),
        sqlite_column!("song_id", &SqlType::Text),
        sqlite_column!("artist_id", &SqlType::Text),
        sqlite_column!("session_id", &SqlType::Integer),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("user_agent", &SqlType::Text),
    ],
    indices: &[("idx_songplays_start_time", "start_time")],
    on_conflict: None,
};

pub const ALL_TABLES: &[&Table] = &[
    &SONGS_TABLE,
    &ARTISTS_TABLE,
    &USERS_TABLE,
    &TIME_TABLE,
    &SONGPLAYS_TABLE,
];

/// Exact-match foreign-key lookup for the fact path: (title, artist name,
/// duration) -> (song_id, artist_id), first match on ties.
pub const SONG_SELECT_SQL: &str = "SELECT songs.song_id, artists.artist_id \
     FROM songs JOIN artists ON songs.artist_id = artists.artist_id \
     WHERE songs.title = ?1 AND artists.name = ?2 AND songs.duration = ?3 \
     LIMIT 1";
