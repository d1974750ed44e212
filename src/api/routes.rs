use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::health::HealthState;

#[derive(Clone)]
pub struct ApiState {
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/", get(get_root))
        .with_state(state)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub uptime_secs: u64,
    pub pass_running: bool,
    /// ISO timestamp of the last completed pass, or "never".
    pub last_pass_at: String,
    pub passes_ok: u64,
    pub passes_failed: u64,
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "inplay-scraper",
        uptime_secs: state.health.uptime_secs(),
        pass_running: state.health.pass_running(),
        last_pass_at: format_last_pass(state.health.last_pass_at()),
        passes_ok: state.health.passes_ok(),
        passes_failed: state.health.passes_failed(),
    })
}

async fn get_root(State(state): State<ApiState>) -> String {
    format!(
        "inplay-scraper\nstatus: running\npass running: {}\nuptime: {}s\n",
        state.health.pass_running(),
        state.health.uptime_secs(),
    )
}

fn format_last_pass(epoch_secs: u64) -> String {
    if epoch_secs == 0 {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp(epoch_secs as i64, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| "never".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_pass_formats_as_iso_or_never() {
        assert_eq!(format_last_pass(0), "never");
        assert_eq!(format_last_pass(1_756_492_800), "2025-08-29T18:40:00Z");
    }
}
