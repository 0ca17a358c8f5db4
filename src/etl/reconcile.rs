//! Post-load duplicate reconciliation for the bulk-loaded tables.
//!
//! The bulk path appends user and time rows verbatim, so the same user_id
//! or start_time can land more than once. This pass keeps the last
//! inserted row per key, which preserves the upsert semantics of the
//! row-by-row path: a later batch overwrites a user's level. Re-running
//! the pass never changes the remaining row set.

use crate::warehouse::{Warehouse, TIME_TABLE, USERS_TABLE};
use anyhow::Result;
use tracing::{error, info};

const DEDUP_TARGETS: &[(&crate::warehouse::Table, &str)] =
    &[(&USERS_TABLE, "user_id"), (&TIME_TABLE, "start_time")];

/// Run every deduplication statement, reporting per-statement errors
/// without aborting the remaining ones. Returns the total rows removed.
pub fn reconcile_duplicates(warehouse: &Warehouse) -> Result<usize> {
    let mut removed = 0;
    for (table, key_column) in DEDUP_TARGETS {
        match warehouse.delete_key_duplicates(table, key_column) {
            Ok(deleted) => {
                if deleted > 0 {
                    info!("Removed {} duplicate rows from {}", deleted, table.name);
                }
                removed += deleted;
            }
            Err(e) => error!("{:#}", e),
        }
    }
    Ok(removed)
}
