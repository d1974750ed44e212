use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("sub-view selection failed: {0}")]
    Selection(String),

    #[error("target table not found (tried {0} selectors)")]
    TableNotFound(usize),

    #[error("table never populated within {0}s")]
    TableTimeout(u64),

    #[error("store request failed: {0}")]
    Store(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("pass exceeded the hard timeout")]
    PassTimeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
