//! Polling scheduler
//!
//! Owns the single repeating timer task. The timer runs if and only if the
//! scheduler is enabled and at least one subscriber is registered; callers
//! re-check that condition with [`PollingScheduler::reconcile`] after every
//! change to either input.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

struct SchedulerState {
    task: Option<JoinHandle<()>>,
    enabled: bool,
}

/// Starts and stops the polling timer
pub struct PollingScheduler {
    state: Mutex<SchedulerState>,
}

impl Default for PollingScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PollingScheduler {
    /// Creates an enabled scheduler with no timer running
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SchedulerState {
                task: None,
                enabled: true,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True while a timer task is alive
    pub fn is_active(&self) -> bool {
        self.lock()
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// True unless the scheduler has been stopped
    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Enables or disables automatic polling; takes effect on the next `reconcile`
    pub fn set_enabled(&self, enabled: bool) {
        self.lock().enabled = enabled;
    }

    /// Starts or cancels the timer so that it runs iff enabled with subscribers
    ///
    /// `subscriber_count` is read while the scheduler lock is held, so
    /// concurrent reconciles always converge on the latest count. `spawn` is
    /// only called when a timer has to be started.
    pub fn reconcile<C, S>(&self, subscriber_count: C, spawn: S)
    where
        C: FnOnce() -> usize,
        S: FnOnce() -> Option<JoinHandle<()>>,
    {
        let mut state = self.lock();
        let subscribers = subscriber_count();
        let wanted = state.enabled && subscribers > 0;

        if state.task.as_ref().is_some_and(|task| task.is_finished()) {
            tracing::warn!("Polling task exited unexpectedly");
            state.task = None;
        }

        if wanted && state.task.is_none() {
            state.task = spawn();
            if state.task.is_some() {
                tracing::info!(subscribers, "Price polling started");
            }
        } else if !wanted {
            if let Some(task) = state.task.take() {
                task.abort();
                tracing::info!(subscribers, "Price polling stopped");
            }
        }
    }

    /// Cancels the timer and disables automatic polling
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.enabled = false;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.lock().task.take() {
            task.abort();
        }
    }
}

/// Spawns the repeating timer
///
/// The first tick fires immediately. `on_tick` returns `false` to end the
/// loop, e.g. when the owning service is gone.
pub fn spawn_poller<F>(period: Duration, mut on_tick: F) -> JoinHandle<()>
where
    F: FnMut() -> bool + Send + 'static,
{
    tokio::spawn(async move {
        tracing::info!(
            refresh_interval_secs = period.as_secs(),
            "Starting price polling task"
        );

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !on_tick() {
                tracing::debug!("Price polling task finished");
                break;
            }
        }
    })
}
