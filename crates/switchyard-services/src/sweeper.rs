//! Periodic background sweep shared by the peer registry and sticky router.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Shortest sweep period. `tokio::time::interval` rejects a zero period.
pub(crate) const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Owns at most one sweep task. Dropping the sweeper aborts the task.
#[derive(Default)]
pub(crate) struct Sweeper {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Run `sweep` every `every`, replacing any task already running.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn start<F>(&self, every: Duration, sweep: F)
    where
        F: Fn() + Send + 'static,
    {
        if every < MIN_SWEEP_INTERVAL {
            tracing::warn!(
                requested_ms = every.as_millis() as u64,
                "sweep interval too short, using {}ms",
                MIN_SWEEP_INTERVAL.as_millis()
            );
        }
        let every = every.max(MIN_SWEEP_INTERVAL);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately; nothing can be stale yet.
            interval.tick().await;
            loop {
                interval.tick().await;
                sweep();
            }
        });

        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = slot.replace(task) {
            old.abort();
        }
    }

    pub(crate) fn stop(&self) {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
