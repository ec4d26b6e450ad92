//! Periodic driver for ingestion runs.
//!
//! One background task owns the timer and awaits each tick's run before
//! waiting on the next, so runs never overlap. Ticks missed while a run
//! overran the interval are skipped, not replayed.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::{IngestError, RunResult};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler interval must be greater than zero")]
    InvalidInterval,
}

/// Lifecycle of the scheduler task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed, timer not yet armed
    Idle,
    /// Timer armed, no run in flight
    Waiting,
    /// One run in flight
    Running,
    /// Shut down; no further runs
    Stopped,
}

enum Command {
    Shutdown,
}

/// Fires a tick callback on a fixed interval, strictly serialized.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    run_on_start: bool,
}

impl Scheduler {
    /// # Errors
    ///
    /// [`SchedulerError::InvalidInterval`] for a zero interval.
    pub fn new(interval: Duration) -> Result<Self, SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }
        Ok(Self {
            interval,
            run_on_start: false,
        })
    }

    /// Fire once immediately instead of waiting a full interval first.
    pub fn run_on_start(mut self, enabled: bool) -> Self {
        self.run_on_start = enabled;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the scheduler task.
    ///
    /// `on_tick` is invoked once per elapsed interval; its outcome is logged
    /// and never stops the schedule.
    pub fn start<F, Fut>(self, mut on_tick: F) -> SchedulerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<RunResult, IngestError>> + Send + 'static,
    {
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let (command_tx, mut command_rx) = mpsc::channel(8);

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // interval's first tick completes immediately
            if !self.run_on_start {
                timer.tick().await;
            }
            state_tx.send_replace(SchedulerState::Waiting);
            tracing::info!(
                interval_secs = self.interval.as_secs(),
                run_on_start = self.run_on_start,
                "Scheduler started"
            );

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        state_tx.send_replace(SchedulerState::Running);
                        log_outcome(on_tick().await);
                        state_tx.send_replace(SchedulerState::Waiting);
                    }
                    msg = command_rx.recv() => {
                        match msg {
                            Some(Command::Shutdown) | None => break,
                        }
                    }
                }
            }

            state_tx.send_replace(SchedulerState::Stopped);
            tracing::info!("Scheduler stopped");
        });

        SchedulerHandle {
            commands: command_tx,
            state: state_rx,
            task,
        }
    }
}

/// Log a run outcome at a severity matching how bad it was.
fn log_outcome(outcome: Result<RunResult, IngestError>) {
    match outcome {
        Ok(result) if result.is_success() => {
            tracing::info!(
                sources = result.sources_attempted,
                inserted = result.articles_inserted,
                "Scheduled ingestion succeeded"
            );
        }
        Ok(result) => {
            let Some(err) = result.aggregate_error() else {
                return;
            };
            if result.all_failed() {
                tracing::error!(error = %err, "Scheduled ingestion failed for every source");
            } else {
                tracing::warn!(
                    failed = result.failures.len(),
                    inserted = result.articles_inserted,
                    error = %err,
                    "Scheduled ingestion partially failed"
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Scheduled ingestion could not run");
        }
    }
}

/// Handle to a running [`Scheduler`]
pub struct SchedulerHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SchedulerState>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Subscribe to state transitions
    pub fn watch(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    /// Stop the timer and wait for the scheduler task to exit.
    ///
    /// A run already in flight completes first; it is never aborted.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Scheduler task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const HOUR: Duration = Duration::from_secs(3600);

    fn counting_tick(
        calls: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
        run_time: Duration,
    ) -> impl FnMut() -> std::pin::Pin<
        Box<dyn Future<Output = Result<RunResult, IngestError>> + Send>,
    > + Send
           + 'static {
        move || {
            let calls = calls.clone();
            let in_flight = in_flight.clone();
            let max_in_flight = max_in_flight.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(run_time).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(RunResult::default())
            })
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert_eq!(
            Scheduler::new(Duration::ZERO).unwrap_err(),
            SchedulerError::InvalidInterval
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tick = counting_tick(
            calls.clone(),
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
            Duration::ZERO,
        );

        let handle = Scheduler::new(HOUR).unwrap().start(tick);

        // Nothing fires before the first interval elapses
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(HOUR * 3).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_on_start_fires_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tick = counting_tick(
            calls.clone(),
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
            Duration::ZERO,
        );

        let handle = Scheduler::new(HOUR).unwrap().run_on_start(true).start(tick);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_runs_never_overlap() {
        let calls = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        // Each run takes two and a half intervals
        let tick = counting_tick(
            calls.clone(),
            Arc::new(AtomicUsize::new(0)),
            max_in_flight.clone(),
            Duration::from_secs(150),
        );

        let handle = Scheduler::new(Duration::from_secs(60))
            .unwrap()
            .run_on_start(true)
            .start(tick);

        tokio::time::sleep(Duration::from_secs(1000)).await;

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        // A late tick fires once the previous run returns; the missed ones are dropped
        let runs = calls.load(Ordering::SeqCst);
        assert!((6..=7).contains(&runs), "runs = {runs}");

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_runs_do_not_stop_schedule() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = Scheduler::new(HOUR).unwrap().start(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<RunResult, _>(IngestError::Registry("database unavailable".to_string()))
            }
        });

        tokio::time::sleep(HOUR * 2 + Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_transitions() {
        let tick = counting_tick(
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
            Duration::from_secs(30),
        );
        let handle = Scheduler::new(HOUR).unwrap().start(tick);
        let mut states = handle.watch();

        states
            .wait_for(|s| *s == SchedulerState::Waiting)
            .await
            .unwrap();
        assert_eq!(handle.state(), SchedulerState::Waiting);

        tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
        assert_eq!(handle.state(), SchedulerState::Running);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(handle.state(), SchedulerState::Waiting);

        let mut states = handle.watch();
        handle.shutdown().await;
        assert_eq!(*states.borrow_and_update(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_in_flight_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let tick = counting_tick(
            calls.clone(),
            in_flight.clone(),
            Arc::new(AtomicUsize::new(0)),
            Duration::from_secs(30),
        );
        let handle = Scheduler::new(HOUR).unwrap().run_on_start(true).start(tick);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(in_flight.load(Ordering::SeqCst), 1);

        handle.shutdown().await;
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
