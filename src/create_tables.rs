//! Schema (re)creation tool.
//!
//! Drops and recreates the five warehouse tables, discarding any loaded
//! data. Run it before a full reload; the loader itself only creates the
//! schema when the database file is brand new.

use anyhow::Result;
use clap::Parser;
use playvault::config::{EtlConfig, FileConfig};
use playvault::warehouse::{Warehouse, ALL_TABLES};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "create-tables")]
#[command(about = "Drop and recreate the playvault star schema")]
struct Args {
    /// Path to the SQLite warehouse database file.
    #[clap(long)]
    pub db: Option<PathBuf>,

    /// Optional TOML config file; CLI flags take precedence over it.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = EtlConfig::resolve(args.db, None, None, file_config);

    info!("Recreating schema in {:?}", config.db_path);
    let warehouse = Warehouse::open(&config.db_path)?;
    warehouse.recreate_schema()?;

    for table in ALL_TABLES {
        info!("  created table {}", table.name);
    }
    info!("Done.");
    Ok(())
}
