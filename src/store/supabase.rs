//! Supabase (PostgREST) implementation of the [`Store`] trait.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::store::{Filter, Store};

pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    key: String,
}

impl SupabaseStore {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.store_url.trim_end_matches('/').to_string(),
            key: cfg.store_key.clone(),
        })
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    /// PostgREST filter syntax: `eq.value` / `like.prefix*`.
    fn render(filter: &Filter) -> (String, String) {
        match filter {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{value}")),
            Filter::Prefix(column, value) => (column.clone(), format!("like.{value}*")),
        }
    }

    async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(AppError::Store(format!("{what} returned {status}: {body}")))
    }
}

#[async_trait]
impl Store for SupabaseStore {
    async fn find_ids(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let mut query: Vec<(String, String)> = vec![("select".to_string(), "id".to_string())];
        query.extend(filters.iter().map(Self::render));

        let resp = self
            .authed(self.client.get(self.endpoint(table)).query(&query))
            .send()
            .await?;
        let rows: Vec<Map<String, Value>> = Self::check(resp, "select").await?.json().await?;
        Ok(rows.into_iter().filter_map(|mut r| r.remove("id")).collect())
    }

    async fn insert(&self, table: &str, record: &Map<String, Value>) -> Result<()> {
        let resp = self
            .authed(self.client.post(self.endpoint(table)).json(record))
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        Self::check(resp, "insert").await?;
        Ok(())
    }

    async fn update(&self, table: &str, id: &Value, record: &Map<String, Value>) -> Result<()> {
        let id = match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let resp = self
            .authed(
                self.client
                    .patch(self.endpoint(table))
                    .query(&[("id", format!("eq.{id}"))])
                    .json(record),
            )
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        Self::check(resp, "update").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_render_to_postgrest_operators() {
        assert_eq!(
            SupabaseStore::render(&Filter::eq("hometeam", "Leeds United")),
            ("hometeam".to_string(), "eq.Leeds United".to_string())
        );
        assert_eq!(
            SupabaseStore::render(&Filter::prefix("timeupdated", "2025-08-29")),
            ("timeupdated".to_string(), "like.2025-08-29*".to_string())
        );
    }
}
