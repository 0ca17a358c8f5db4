mod models;
mod schema;
mod store;

pub use models::{ArtistRow, SongRow, SongplayRow, TimeRow, UserRow};
pub use schema::{
    Column, SqlType, Table, ALL_TABLES, ARTISTS_TABLE, SONGPLAYS_TABLE, SONGS_TABLE,
    SONG_SELECT_SQL, TIME_TABLE, USERS_TABLE,
};
pub use store::Warehouse;
