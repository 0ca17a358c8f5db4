use anyhow::{Context, Result};
use clap::Parser;
use playvault::config::{EtlConfig, FileConfig};
use playvault::etl::{process_data, process_log_file, process_song_file, reconcile_duplicates};
use playvault::warehouse::{Warehouse, ALL_TABLES};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "playvault-etl")]
#[command(about = "Load song metadata and activity logs into the playvault star schema")]
struct CliArgs {
    /// Path to the SQLite warehouse database file.
    #[clap(long, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// Directory containing song-metadata JSON files.
    #[clap(long, value_parser = parse_path)]
    pub song_data: Option<PathBuf>,

    /// Directory containing activity-log JSON files.
    #[clap(long, value_parser = parse_path)]
    pub log_data: Option<PathBuf>,

    /// Optional TOML config file; CLI flags take precedence over it.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli_args = CliArgs::parse();
    let file_config = match &cli_args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = EtlConfig::resolve(
        cli_args.db,
        cli_args.song_data,
        cli_args.log_data,
        file_config,
    );

    info!("Opening warehouse database at {:?}", config.db_path);
    let warehouse = Warehouse::open(&config.db_path)?;

    // Songs and artists load first: the fact path resolves its foreign
    // keys against them.
    info!("Processing song data...");
    process_data(&warehouse, &config.song_data_dir, process_song_file)?;

    info!("Processing log data...");
    process_data(&warehouse, &config.log_data_dir, process_log_file)?;

    info!("Reconciling bulk-loaded duplicates...");
    reconcile_duplicates(&warehouse)?;

    info!("");
    info!("Load summary");
    info!("============");
    for table in ALL_TABLES {
        info!("  {}: {} rows", table.name, warehouse.row_count(table)?);
    }

    Ok(())
}
