mod events;
mod log;
mod process;
mod reconcile;
mod song;

pub use events::{LogEvent, RecordError, SongRecord};
pub use log::{dedup_users, derive_time_rows, filter_next_song, process_log_file};
pub use process::{discover_files, process_data};
pub use reconcile::reconcile_duplicates;
pub use song::{extract_song, process_song_file};
