//! One end-to-end pass: authenticate → navigate → select sub-view →
//! extract → clean → write.
//!
//! Each pass builds a fresh session and tears it down with the pass, so
//! nothing leaks across passes. The first failing stage aborts the pass;
//! the supervisor owns the retry policy.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info};

use crate::clean::coerce_row;
use crate::config::{Config, STORE_TABLE};
use crate::extract::extract;
use crate::page::HttpPage;
use crate::schema::{RawRow, TableSchema};
use crate::session::{authenticate, navigate, select_subview};
use crate::store::writer::upsert_records;
use crate::store::Store;
use crate::types::{RunResult, Stage, TimestampPolicy, TypedRecord};

/// One complete scrape-clean-upsert attempt. The supervisor drives this
/// behind its hard timeout and backoff policy.
#[async_trait]
pub trait PassRunner: Send + Sync {
    async fn run_pass(&self) -> RunResult;
}

pub struct ScrapePipeline {
    cfg: Config,
    schema: TableSchema,
    store: Arc<dyn Store>,
}

impl ScrapePipeline {
    pub fn new(cfg: Config, store: Arc<dyn Store>) -> Self {
        Self {
            cfg,
            schema: TableSchema::fulltime_model_raw(),
            store,
        }
    }

    async fn run_stages(&self, started: Instant) -> RunResult {
        let fail = |stage: Stage, err: &dyn std::fmt::Display| {
            error!(stage = %stage, "pass aborted: {err}");
            RunResult::failed(stage, err, started.elapsed())
        };

        let mut page = match HttpPage::open(&self.cfg) {
            Ok(p) => p,
            Err(e) => return fail(Stage::Authenticating, &e),
        };

        if let Err(e) = authenticate(&mut page, &self.cfg).await {
            return fail(Stage::Authenticating, &e);
        }
        if let Err(e) = navigate(&mut page, &self.cfg).await {
            return fail(Stage::Navigating, &e);
        }
        if let Err(e) = select_subview(&mut page).await {
            return fail(Stage::SelectingSubview, &e);
        }

        let raw_rows = match extract(&mut page, &self.schema).await {
            Ok(rows) => rows,
            Err(e) => return fail(Stage::Extracting, &e),
        };
        if raw_rows.is_empty() {
            return fail(Stage::Extracting, &"no rows extracted");
        }
        let rows_scraped = raw_rows.len();

        let (records, rows_skipped) =
            clean_rows(&raw_rows, &self.schema, self.cfg.timestamp_policy);
        let rows_cleaned = records.len() + rows_skipped;
        info!(
            cleaned = rows_cleaned,
            skipped_missing_key = rows_skipped,
            "rows cleaned"
        );

        let summary = upsert_records(self.store.as_ref(), STORE_TABLE, &records).await;

        let result = RunResult {
            rows_scraped,
            rows_cleaned,
            rows_written: summary.success_count,
            rows_skipped,
            rows_failed: summary.error_count,
            duration: started.elapsed(),
            terminal_error: None,
        };
        info!(
            scraped = result.rows_scraped,
            written = result.rows_written,
            skipped = result.rows_skipped,
            failed = result.rows_failed,
            secs = result.duration.as_secs_f64(),
            "pass complete"
        );
        result
    }
}

#[async_trait]
impl PassRunner for ScrapePipeline {
    async fn run_pass(&self) -> RunResult {
        let started = Instant::now();
        self.run_stages(started).await
    }
}

/// Coerce raw rows and drop records missing the natural key (they can
/// never be written). Returns the writable records and the dropped count.
pub fn clean_rows(
    rows: &[RawRow],
    schema: &TableSchema,
    policy: TimestampPolicy,
) -> (Vec<TypedRecord>, usize) {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for row in rows {
        let record = coerce_row(row, schema, policy);
        if record.natural_key().is_some() {
            records.push(record);
        } else {
            skipped += 1;
        }
    }
    (records, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(timeupdated: Option<&str>, hometeam: Option<&str>) -> RawRow {
        let schema = TableSchema::fulltime_model_raw();
        let cells = schema
            .columns()
            .iter()
            .map(|c| match c.name.as_str() {
                "timeupdated" => timeupdated.map(String::from),
                "hometeam" => hometeam.map(String::from),
                _ => None,
            })
            .collect();
        RawRow { cells }
    }

    #[test]
    fn keyless_records_are_dropped_as_skipped() {
        let schema = TableSchema::fulltime_model_raw();
        let rows = vec![
            row(Some("29/08/2025, 18:44:35"), Some("Arsenal")),
            row(None, Some("Leeds")),
            row(Some("29/08/2025, 18:44:35"), None),
        ];
        let (records, skipped) = clean_rows(&rows, &schema, TimestampPolicy::Lenient);
        assert_eq!(records.len(), 1);
        assert_eq!(skipped, 2);
        assert_eq!(records[0].hometeam(), Some("Arsenal"));
    }

    #[test]
    fn strict_policy_drops_rows_with_unparseable_timestamps() {
        let schema = TableSchema::fulltime_model_raw();
        let rows = vec![row(Some("not a time"), Some("Arsenal"))];

        let (lenient, _) = clean_rows(&rows, &schema, TimestampPolicy::Lenient);
        assert_eq!(lenient.len(), 1);
        assert_eq!(lenient[0].timeupdated(), Some("not a time"));

        let (strict, skipped) = clean_rows(&rows, &schema, TimestampPolicy::Strict);
        assert!(strict.is_empty());
        assert_eq!(skipped, 1);
    }
}
