//! Playvault Warehouse Loader
//!
//! Loads song-metadata and user-activity-log JSON files into a SQLite
//! star schema (songs, artists, users, time, songplays) for streaming
//! analytics. Batch-only: one synchronous pass over static file
//! directories per invocation.

pub mod config;
pub mod etl;
pub mod warehouse;
