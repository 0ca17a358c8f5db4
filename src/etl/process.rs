//! Batch file processing: discovery and the per-file drive loop.

use crate::warehouse::Warehouse;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Recursively collect every `.json` file under `root`, sorted by path so
/// the load order is deterministic across runs. A root that does not
/// exist discovers zero files, the same as an empty directory.
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", root))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().is_some_and(|ext| ext == "json") {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Apply `handler` to every discovered file, logging progress after each.
///
/// One file is the failure isolation boundary: handlers absorb
/// malformed-input errors themselves and return Ok, while store
/// operational errors propagate from here and abort the run. A directory
/// with zero matching files processes zero files and returns normally.
pub fn process_data<F>(warehouse: &Warehouse, root: &Path, handler: F) -> Result<usize>
where
    F: Fn(&Warehouse, &Path) -> Result<()>,
{
    let files = discover_files(root)?;
    info!("{} files found in {:?}", files.len(), root);

    for (i, file) in files.iter().enumerate() {
        handler(warehouse, file)?;
        info!("{}/{} files processed", i + 1, files.len());
    }
    Ok(files.len())
}
