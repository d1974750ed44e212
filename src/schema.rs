//! Fixed column schema for the full-time model table.
//!
//! Column names match the lowercase PostgreSQL column names in the
//! `inplay_football` table exactly; the order matches the on-page table.

/// How a raw cell value is coerced before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `%d/%m/%Y, %H:%M:%S` on-page, stored as ISO 8601.
    Timestamp,
    /// Elapsed-minute counter; digits only.
    Integer,
    /// Handicap / price / model value.
    Float,
    /// Trimmed text, null when empty.
    Text,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub kind: FieldKind,
}

/// Ordered column schema for one scraped table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    columns: Vec<Column>,
}

impl TableSchema {
    /// Schema of the "Full-Time Model Raw" table: 51 columns, header
    /// fields, the modsup/price block, twenty home/away handicap pairs,
    /// and a trailing analysis column.
    pub fn fulltime_model_raw() -> Self {
        let mut columns = vec![
            Column { name: "timeupdated".into(), kind: FieldKind::Timestamp },
            Column { name: "league".into(), kind: FieldKind::Text },
            Column { name: "hometeam".into(), kind: FieldKind::Text },
            Column { name: "awayteam".into(), kind: FieldKind::Text },
            Column { name: "min".into(), kind: FieldKind::Integer },
            Column { name: "score".into(), kind: FieldKind::Text },
            Column { name: "modsup".into(), kind: FieldKind::Float },
            Column { name: "hdp1".into(), kind: FieldKind::Float },
            Column { name: "hprice".into(), kind: FieldKind::Float },
            Column { name: "aprice".into(), kind: FieldKind::Float },
        ];
        for i in 1..=20 {
            columns.push(Column { name: format!("homehdp{i}"), kind: FieldKind::Float });
            columns.push(Column { name: format!("awayhdp{i}"), kind: FieldKind::Float });
        }
        columns.push(Column { name: "analysis".into(), kind: FieldKind::Text });
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

/// One physical table row's cell texts, positionally aligned with the
/// schema. The extractor guarantees `cells.len() == schema.len()` for
/// every row it yields; `None` is an empty or unreadable cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub cells: Vec<Option<String>>,
}
