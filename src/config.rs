use crate::error::{AppError, Result};
use crate::types::TimestampPolicy;

pub const LOGIN_URL: &str = "https://inplayfootballtips.co.uk/login";
pub const FULLTIME_URL: &str = "https://inplayfootballtips.co.uk/full-time";

/// Supabase table the pipeline writes into.
pub const STORE_TABLE: &str = "inplay_football";

/// Hard wall-clock limit for one complete pass. A pass that blocks past
/// this is aborted and counted as a failure.
pub const PASS_TIMEOUT_SECS: u64 = 600;

/// Cooldown after a failed or timed-out pass.
pub const FAILURE_COOLDOWN_SECS: u64 = 30;

/// Breather after a successful pass before the next one starts.
pub const SUCCESS_DELAY_SECS: u64 = 1;

/// How long to wait for the table to gain at least one data row after the
/// table element itself is present. The source renders the skeleton first
/// and fills rows in afterwards.
pub const TABLE_POPULATE_TIMEOUT_SECS: u64 = 60;

/// Poll interval while waiting for rows to appear.
pub const POPULATE_POLL_MS: u64 = 2000;

/// How long to wait for the target view's root content element.
pub const NAV_READY_TIMEOUT_SECS: u64 = 30;

/// Settle delay after activating the sub-view tab.
pub const SUBVIEW_SETTLE_SECS: u64 = 3;

/// Rows are read in batches of this size with a brief pause in between.
pub const EXTRACT_BATCH_SIZE: usize = 5;
pub const BATCH_PAUSE_MS: u64 = 1000;

/// Per-cell retry budget for transiently stale reads.
pub const CELL_RETRY_LIMIT: usize = 3;
pub const CELL_RETRY_DELAY_MS: u64 = 500;

/// Ordered selector list for locating the target table; first match wins.
pub const TABLE_SELECTORS: &[&str] = &[
    "#fulltimemodelraw",
    "table#fulltimemodelraw",
    "div.fulltime table",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub login_url: String,
    pub fulltime_url: String,
    pub username: String,
    pub password: String,
    pub store_url: String,
    pub store_key: String,
    pub log_level: String,
    pub api_port: u16,
    /// True when running under the hosted deployment environment. Alters
    /// timeout magnitudes and the user-agent string only.
    pub production: bool,
    /// What to do with timestamps that fail both parse formats.
    pub timestamp_policy: TimestampPolicy,
    /// Per-request HTTP timeout for source page fetches (seconds).
    pub page_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let store_key = std::env::var("SUPABASE_SERVICE_KEY")
            .map_err(|_| AppError::Config("SUPABASE_SERVICE_KEY must be set".to_string()))?;

        let production = std::env::var("RAILWAY_ENVIRONMENT_NAME").is_ok();

        let timestamp_policy = match std::env::var("TIMESTAMP_POLICY")
            .unwrap_or_else(|_| "lenient".to_string())
            .to_lowercase()
            .as_str()
        {
            "lenient" => TimestampPolicy::Lenient,
            "strict" => TimestampPolicy::Strict,
            other => {
                return Err(AppError::Config(format!(
                    "TIMESTAMP_POLICY must be 'lenient' or 'strict', got '{other}'"
                )))
            }
        };

        Ok(Self {
            login_url: std::env::var("LOGIN_URL").unwrap_or_else(|_| LOGIN_URL.to_string()),
            fulltime_url: std::env::var("FULLTIME_URL")
                .unwrap_or_else(|_| FULLTIME_URL.to_string()),
            username: std::env::var("SOURCE_USERNAME")
                .unwrap_or_else(|_| "Wyatt1110".to_string()),
            password: std::env::var("SOURCE_PASSWORD")
                .unwrap_or_else(|_| "Wiggers10".to_string()),
            store_url: std::env::var("SUPABASE_URL")
                .unwrap_or_else(|_| "https://gwvnmzflxttdlhrkejmy.supabase.co".to_string()),
            store_key,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| {
                    AppError::Config("API_PORT must be a valid port number".to_string())
                })?,
            production,
            timestamp_policy,
            page_timeout_secs: if production { 180 } else { 60 },
        })
    }
}
