//! Remote store seam: a key-filtered CRUD surface over the hosted
//! PostgREST service, plus the upsert writer that feeds it.

pub mod supabase;
pub mod writer;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// Typed row filter, rendered into the store's query syntax by each
/// implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Column equals value exactly.
    Eq(String, String),
    /// Column value starts with the given prefix (same-day timestamp
    /// matching).
    Prefix(String, String),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<String>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn prefix(column: &str, value: impl Into<String>) -> Self {
        Filter::Prefix(column.to_string(), value.into())
    }
}

/// Remote store operations the pipeline needs. Ids are opaque; the
/// store assigns them and the writer only echoes them back.
#[async_trait]
pub trait Store: Send + Sync {
    /// Ids of rows matching every filter.
    async fn find_ids(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>>;

    /// Insert a new row.
    async fn insert(&self, table: &str, record: &Map<String, Value>) -> Result<()>;

    /// Replace the row with the given store-assigned id.
    async fn update(&self, table: &str, id: &Value, record: &Map<String, Value>) -> Result<()>;
}
