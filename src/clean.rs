//! Field coercion: raw cell text → typed values.
//!
//! Pure functions, no I/O, never panic. A field that cannot be converted
//! becomes null (or, for timestamps under the lenient policy, the raw
//! text) and is logged at debug level.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde_json::{Number, Value};
use tracing::debug;

use crate::schema::{FieldKind, RawRow, TableSchema};
use crate::types::{TimestampPolicy, TypedRecord};

/// On-page timestamp format, e.g. `29/08/2025, 18:44:35`.
const TS_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";
/// Fallback without seconds.
const TS_FORMAT_SHORT: &str = "%d/%m/%Y, %H:%M";
/// ISO output format accepted by the store's timestamp column.
const TS_ISO: &str = "%Y-%m-%dT%H:%M:%S";

fn decimal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid decimal pattern"))
}

/// Converts one raw row into a typed record. The row must be positionally
/// aligned with the schema (the extractor guarantees this).
pub fn coerce_row(raw: &RawRow, schema: &TableSchema, policy: TimestampPolicy) -> TypedRecord {
    let mut record = TypedRecord::new();
    for (column, cell) in schema.columns().iter().zip(&raw.cells) {
        let value = match cell.as_deref().map(str::trim) {
            // Empty-cell sentinels may survive upstream normalization when
            // a caller feeds raw rows in directly.
            None => Value::Null,
            Some(text) if text.is_empty() || text == "-" => Value::Null,
            Some(text) => match column.kind {
                FieldKind::Timestamp => coerce_timestamp(text, policy, &column.name),
                FieldKind::Integer => coerce_integer(text, &column.name),
                FieldKind::Float => coerce_float(text, &column.name),
                FieldKind::Text => coerce_text(text),
            },
        };
        record.insert(&column.name, value);
    }
    record
}

fn coerce_timestamp(text: &str, policy: TimestampPolicy, column: &str) -> Value {
    let trimmed = text.trim();
    let parsed = NaiveDateTime::parse_from_str(trimmed, TS_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, TS_FORMAT_SHORT));
    match parsed {
        Ok(dt) => Value::String(dt.format(TS_ISO).to_string()),
        Err(_) => {
            debug!(column, value = trimmed, "unparseable timestamp");
            match policy {
                TimestampPolicy::Lenient => Value::String(trimmed.to_string()),
                TimestampPolicy::Strict => Value::Null,
            }
        }
    }
}

fn coerce_integer(text: &str, column: &str) -> Value {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    match digits.parse::<i64>() {
        Ok(n) => Value::Number(n.into()),
        Err(_) => {
            if !text.trim().is_empty() {
                debug!(column, value = text, "unparseable integer");
            }
            Value::Null
        }
    }
}

fn coerce_float(text: &str, column: &str) -> Value {
    let trimmed = text.trim();
    let parsed = trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| {
            decimal_re()
                .find(trimmed)
                .and_then(|m| m.as_str().parse::<f64>().ok())
        });
    match parsed.and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => {
            debug!(column, value = trimmed, "unparseable float");
            Value::Null
        }
    }
}

fn coerce_text(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::String(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        TableSchema::fulltime_model_raw()
    }

    fn row_with(name: &str, value: &str) -> RawRow {
        let schema = schema();
        let cells = schema
            .columns()
            .iter()
            .map(|c| (c.name == name).then(|| value.to_string()))
            .collect();
        RawRow { cells }
    }

    fn coerced(name: &str, value: &str, policy: TimestampPolicy) -> Value {
        let record = coerce_row(&row_with(name, value), &schema(), policy);
        record.fields.get(name).cloned().unwrap()
    }

    #[test]
    fn timestamp_parses_primary_format() {
        assert_eq!(
            coerced("timeupdated", "29/08/2025, 18:44:35", TimestampPolicy::Lenient),
            Value::String("2025-08-29T18:44:35".into())
        );
    }

    #[test]
    fn timestamp_falls_back_to_short_format() {
        assert_eq!(
            coerced("timeupdated", "29/08/2025, 18:44", TimestampPolicy::Lenient),
            Value::String("2025-08-29T18:44:00".into())
        );
    }

    #[test]
    fn unparseable_timestamp_policy_split() {
        assert_eq!(
            coerced("timeupdated", "late kickoff", TimestampPolicy::Lenient),
            Value::String("late kickoff".into())
        );
        assert_eq!(
            coerced("timeupdated", "late kickoff", TimestampPolicy::Strict),
            Value::Null
        );
    }

    #[test]
    fn integer_strips_non_digits() {
        assert_eq!(coerced("min", "45'", TimestampPolicy::Strict), Value::Number(45.into()));
        assert_eq!(coerced("min", "HT", TimestampPolicy::Strict), Value::Null);
    }

    #[test]
    fn float_direct_parse_and_sign() {
        let v = coerced("hdp1", "-2.25", TimestampPolicy::Strict);
        assert_eq!(v.as_f64(), Some(-2.25));
    }

    #[test]
    fn float_pattern_extraction_fallback() {
        let v = coerced("modsup", "1.5 (approx)", TimestampPolicy::Strict);
        assert_eq!(v.as_f64(), Some(1.5));
    }

    #[test]
    fn garbage_numeric_is_null_never_panics() {
        assert_eq!(coerced("hprice", "n/a", TimestampPolicy::Strict), Value::Null);
        assert_eq!(coerced("aprice", "", TimestampPolicy::Strict), Value::Null);
    }

    #[test]
    fn text_is_trimmed_never_empty() {
        assert_eq!(
            coerced("league", "  Premier League  ", TimestampPolicy::Strict),
            Value::String("Premier League".into())
        );
        assert_eq!(coerced("score", "   ", TimestampPolicy::Strict), Value::Null);
    }

    #[test]
    fn dash_sentinel_is_null_for_every_kind() {
        for name in ["timeupdated", "min", "hdp1", "analysis"] {
            assert_eq!(coerced(name, "-", TimestampPolicy::Lenient), Value::Null);
            assert_eq!(coerced(name, " - ", TimestampPolicy::Lenient), Value::Null);
        }
    }

    #[test]
    fn null_cells_stay_null() {
        let schema = schema();
        let raw = RawRow { cells: vec![None; schema.len()] };
        let record = coerce_row(&raw, &schema, TimestampPolicy::Lenient);
        assert_eq!(record.fields.len(), schema.len());
        assert!(record.fields.values().all(Value::is_null));
    }
}
