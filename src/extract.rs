//! Tolerant table extraction over an [`ActiveView`].
//!
//! The source renders the table skeleton first and populates rows
//! afterwards, and re-renders invalidate element references mid-read, so
//! extraction waits for population, re-resolves cells by positional index
//! on staleness, and skips rows that no longer line up with the schema.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::{
    BATCH_PAUSE_MS, CELL_RETRY_DELAY_MS, CELL_RETRY_LIMIT, EXTRACT_BATCH_SIZE, POPULATE_POLL_MS,
    TABLE_POPULATE_TIMEOUT_SECS, TABLE_SELECTORS,
};
use crate::error::{AppError, Result};
use crate::page::{ActiveView, CellError};
use crate::schema::{RawRow, TableSchema};

/// Extract every well-formed row of the target table.
///
/// Fails with `TableNotFound` when no selector strategy locates the table
/// and `TableTimeout` when the table never gains a data row; both abort
/// the pass. Row-level problems (cell-count mismatch, vanished rows,
/// persistently stale cells) are logged and recovered locally.
pub async fn extract<V: ActiveView>(view: &mut V, schema: &TableSchema) -> Result<Vec<RawRow>> {
    let table_selector = locate_table(view).await?;
    let total_rows = wait_for_rows(view, table_selector).await?;
    info!(rows = total_rows, selector = table_selector, "table populated");

    let mut rows = Vec::with_capacity(total_rows);

    let mut batch_start = 0;
    while batch_start < total_rows {
        let batch_end = (batch_start + EXTRACT_BATCH_SIZE).min(total_rows);
        debug!(from = batch_start + 1, to = batch_end, total = total_rows, "processing batch");

        for row_index in batch_start..batch_end {
            let cell_count = match view.cell_count(table_selector, row_index).await {
                Ok(n) => n,
                Err(_) => {
                    warn!(row = row_index + 1, "row no longer available, skipping");
                    continue;
                }
            };
            if cell_count != schema.len() {
                warn!(
                    row = row_index + 1,
                    expected = schema.len(),
                    found = cell_count,
                    "cell count mismatch, skipping row"
                );
                continue;
            }

            let mut cells = Vec::with_capacity(schema.len());
            for col_index in 0..schema.len() {
                cells.push(read_cell(view, table_selector, row_index, col_index).await);
            }
            rows.push(RawRow { cells });
        }

        batch_start = batch_end;
        if batch_start < total_rows {
            sleep(Duration::from_millis(BATCH_PAUSE_MS)).await;
        }
    }

    info!(scraped = rows.len(), of = total_rows, "extraction complete");
    Ok(rows)
}

/// First selector in the configured list that matches wins.
async fn locate_table<V: ActiveView>(view: &mut V) -> Result<&'static str> {
    for selector in TABLE_SELECTORS.iter().copied() {
        if view.exists(selector).await? {
            return Ok(selector);
        }
    }
    Err(AppError::TableNotFound(TABLE_SELECTORS.len()))
}

/// Block until the table has at least one data row, bounded by the
/// populate timeout. Returns the row count observed.
async fn wait_for_rows<V: ActiveView>(view: &mut V, table_selector: &str) -> Result<usize> {
    let deadline = Instant::now() + Duration::from_secs(TABLE_POPULATE_TIMEOUT_SECS);
    loop {
        let count = view.row_count(table_selector).await?;
        if count > 0 {
            return Ok(count);
        }
        if Instant::now() >= deadline {
            return Err(AppError::TableTimeout(TABLE_POPULATE_TIMEOUT_SECS));
        }
        sleep(Duration::from_millis(POPULATE_POLL_MS)).await;
        view.refresh().await?;
    }
}

/// Read one cell, retrying transient staleness by re-resolving the cell
/// from the live view by index. A persistently stale or vanished cell
/// yields null without failing the row. Empty-cell sentinels (`""`, `"-"`)
/// normalize to null.
async fn read_cell<V: ActiveView>(
    view: &mut V,
    table_selector: &str,
    row: usize,
    col: usize,
) -> Option<String> {
    for attempt in 0..CELL_RETRY_LIMIT {
        match view.cell_text(table_selector, row, col).await {
            Ok(text) => return normalize_cell(text),
            Err(CellError::Stale) => {
                debug!(row = row + 1, col = col + 1, attempt = attempt + 1, "stale cell, retrying");
                sleep(Duration::from_millis(CELL_RETRY_DELAY_MS)).await;
            }
            Err(CellError::Gone) => {
                warn!(row = row + 1, col = col + 1, "cell no longer available");
                return None;
            }
        }
    }
    warn!(row = row + 1, col = col + 1, "persistently stale cell");
    None
}

fn normalize_cell(text: Option<String>) -> Option<String> {
    let text = text?;
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "-" {
        None
    } else {
        Some(trimmed.to_string())
    }
}
