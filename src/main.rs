mod api;
mod clean;
mod config;
mod error;
mod extract;
mod page;
mod pipeline;
mod schema;
mod session;
mod store;
mod supervisor;
mod types;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{PassRunner, ScrapePipeline};
use crate::store::supabase::SupabaseStore;
use crate::store::Store;
use crate::supervisor::{run_bounded, Supervisor};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    // The guard must outlive run() so buffered file output is flushed.
    let _guard = init_logging(&cfg);

    let once = std::env::args().any(|a| a == "--once");
    if let Err(e) = run(cfg, once).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(cfg: &Config) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "scraper.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::new(&cfg.log_level))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();
    guard
}

async fn run(cfg: Config, once: bool) -> Result<()> {
    info!(
        production = cfg.production,
        policy = ?cfg.timestamp_policy,
        "inplay scraper starting"
    );

    let store: Arc<dyn Store> = Arc::new(SupabaseStore::new(&cfg)?);
    let pipeline: Arc<dyn PassRunner> = Arc::new(ScrapePipeline::new(cfg.clone(), store));

    if once {
        // Single-shot invocation: one pass, exit code by outcome.
        let result = run_bounded(pipeline.as_ref()).await;
        return if result.succeeded() {
            info!(written = result.rows_written, "single pass succeeded");
            Ok(())
        } else {
            Err(crate::error::AppError::Unexpected(
                result
                    .terminal_error
                    .unwrap_or_else(|| "pass failed".to_string()),
            ))
        };
    }

    let health = Arc::new(HealthState::new());

    // Health endpoint for the deployment platform.
    let app = router(ApiState {
        health: Arc::clone(&health),
    });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("health API listening on {bind_addr}");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("health API server stopped: {e}");
        }
    });

    // Interrupt handling: flip the shutdown flag, observed between passes.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current pass");
            let _ = shutdown_tx.send(true);
        }
    });

    Supervisor::new(pipeline, health, shutdown_rx).run().await;
    Ok(())
}
