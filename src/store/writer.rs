//! Idempotent per-record upsert against the remote store.

use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::store::{Filter, Store};
use crate::types::{TypedRecord, WriteSummary};

#[derive(Debug, Clone, Copy)]
enum UpsertOp {
    Inserted,
    Updated,
}

/// Write records one at a time with per-record isolation: any single
/// record's failure (network, store-side validation, missing natural key)
/// is logged and counted, never aborting the rest of the batch.
///
/// Deduplication is check-then-act on the natural key and is NOT
/// transactional: two overlapping passes can both see "not found" and
/// double-insert. The next pass's upsert converges updates but will not
/// merge such duplicates.
pub async fn upsert_records(
    store: &dyn Store,
    table: &str,
    records: &[TypedRecord],
) -> WriteSummary {
    let mut summary = WriteSummary::default();

    for record in records {
        let team = record.hometeam().unwrap_or("unknown").to_string();
        match upsert_one(store, table, record).await {
            Ok(UpsertOp::Updated) => {
                debug!(team, "updated existing record");
                summary.success_count += 1;
            }
            Ok(UpsertOp::Inserted) => {
                debug!(team, "inserted new record");
                summary.success_count += 1;
            }
            Err(e) => {
                warn!(team, "record write failed: {e}");
                summary.error_count += 1;
            }
        }
    }

    info!(
        success = summary.success_count,
        failed = summary.error_count,
        total = records.len(),
        "store write complete"
    );
    summary
}

async fn upsert_one(store: &dyn Store, table: &str, record: &TypedRecord) -> Result<UpsertOp> {
    let key = record
        .natural_key()
        .ok_or_else(|| AppError::Store("missing timeupdated or hometeam".to_string()))?;

    let filters = [
        Filter::eq("hometeam", key.hometeam),
        Filter::prefix("timeupdated", key.date),
    ];
    let existing = store.find_ids(table, &filters).await?;

    if let Some(id) = existing.first() {
        store.update(table, id, &record.fields).await?;
        Ok(UpsertOp::Updated)
    } else {
        store.insert(table, &record.fields).await?;
        Ok(UpsertOp::Inserted)
    }
}
