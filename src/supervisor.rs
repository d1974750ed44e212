//! Continuous-run supervisor: unbounded pass loop with a hard per-pass
//! timeout, fixed cooldown on failure, and a short breather on success.
//! An interrupt is observed between passes only, so the in-flight pass
//! always completes its teardown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{error, info};

use crate::api::health::HealthState;
use crate::config::{FAILURE_COOLDOWN_SECS, PASS_TIMEOUT_SECS, SUCCESS_DELAY_SECS};
use crate::pipeline::PassRunner;
use crate::types::RunResult;

pub struct Supervisor {
    runner: Arc<dyn PassRunner>,
    health: Arc<HealthState>,
    shutdown: watch::Receiver<bool>,
}

impl Supervisor {
    pub fn new(
        runner: Arc<dyn PassRunner>,
        health: Arc<HealthState>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            runner,
            health,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut run_count: u64 = 0;

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            run_count += 1;
            info!(run = run_count, "starting pass");

            self.health.set_pass_running(true);
            let result = run_bounded(self.runner.as_ref()).await;
            self.health.set_pass_running(false);
            self.health.record_pass(result.succeeded());

            let delay = cooldown_after(&result);
            if result.succeeded() {
                info!(
                    run = run_count,
                    written = result.rows_written,
                    failed = result.rows_failed,
                    secs = result.duration.as_secs_f64(),
                    "pass succeeded, next pass in {}s",
                    delay.as_secs()
                );
            } else {
                error!(
                    run = run_count,
                    cause = result.terminal_error.as_deref().unwrap_or("unknown"),
                    "pass failed, cooling down {}s",
                    delay.as_secs()
                );
            }

            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("supervisor stopped");
    }
}

/// Run one pass under the hard wall-clock limit.
pub async fn run_bounded(runner: &dyn PassRunner) -> RunResult {
    let limit = Duration::from_secs(PASS_TIMEOUT_SECS);
    match timeout(limit, runner.run_pass()).await {
        Ok(result) => result,
        Err(_) => RunResult::timed_out(limit),
    }
}

/// Fixed backoff policy: short breather after success, full cooldown
/// after any failure or timeout.
pub fn cooldown_after(result: &RunResult) -> Duration {
    if result.succeeded() {
        Duration::from_secs(SUCCESS_DELAY_SECS)
    } else {
        Duration::from_secs(FAILURE_COOLDOWN_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct ScriptedRunner {
        succeed: bool,
        /// Extra in-pass delay, to drive the hard timeout.
        pass_duration: Duration,
        starts: Mutex<Vec<Instant>>,
    }

    impl ScriptedRunner {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                succeed,
                pass_duration: Duration::ZERO,
                starts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PassRunner for ScriptedRunner {
        async fn run_pass(&self) -> RunResult {
            self.starts.lock().unwrap().push(Instant::now());
            sleep(self.pass_duration).await;
            if self.succeed {
                RunResult {
                    rows_written: 1,
                    ..RunResult::default()
                }
            } else {
                RunResult::failed(
                    crate::types::Stage::Extracting,
                    "table not found",
                    Duration::ZERO,
                )
            }
        }
    }

    async fn run_for(runner: Arc<ScriptedRunner>, simulated: Duration) -> Vec<Instant> {
        let (tx, rx) = watch::channel(false);
        let health = Arc::new(HealthState::new());
        let scripted: Arc<dyn PassRunner> = runner.clone();
        let handle = tokio::spawn(Supervisor::new(scripted, health, rx).run());
        sleep(simulated).await;
        tx.send(true).unwrap();
        handle.await.unwrap();
        runner.starts.lock().unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn failed_pass_waits_the_full_cooldown() {
        let runner = ScriptedRunner::new(false);
        let starts = run_for(runner, Duration::from_secs(70)).await;
        assert!(starts.len() >= 2, "expected at least two passes");
        assert_eq!((starts[1] - starts[0]).as_secs(), FAILURE_COOLDOWN_SECS);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_pass_restarts_after_the_short_delay() {
        let runner = ScriptedRunner::new(true);
        let starts = run_for(runner, Duration::from_secs(5)).await;
        assert!(starts.len() >= 2);
        assert_eq!((starts[1] - starts[0]).as_secs(), SUCCESS_DELAY_SECS);
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_pass_is_timed_out_and_cooled_down() {
        let runner = Arc::new(ScriptedRunner {
            succeed: true,
            pass_duration: Duration::from_secs(PASS_TIMEOUT_SECS * 2),
            starts: Mutex::new(Vec::new()),
        });
        let window = Duration::from_secs(PASS_TIMEOUT_SECS + FAILURE_COOLDOWN_SECS + 10);
        let starts = run_for(runner, window).await;
        assert_eq!(starts.len(), 2);
        assert_eq!(
            (starts[1] - starts[0]).as_secs(),
            PASS_TIMEOUT_SECS + FAILURE_COOLDOWN_SECS
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_ends_the_loop_between_passes() {
        let runner = ScriptedRunner::new(true);
        let starts = run_for(runner.clone(), Duration::from_millis(100)).await;
        assert_eq!(starts.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn health_state_tracks_pass_outcomes() {
        let runner = ScriptedRunner::new(false);
        let (tx, rx) = watch::channel(false);
        let health = Arc::new(HealthState::new());
        let scripted: Arc<dyn PassRunner> = runner;
        let handle = tokio::spawn(Supervisor::new(scripted, Arc::clone(&health), rx).run());
        sleep(Duration::from_secs(40)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(health.passes_failed() >= 1);
        assert_eq!(health.passes_ok(), 0);
    }
}
