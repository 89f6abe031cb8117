//! Owned background task with a start/stop lifecycle.
//!
//! Timer-driven work (polling, the push connection loop) is held by a
//! [`ScheduledTask`] so there can only ever be one active task per owner:
//! re-spawning aborts the predecessor, and stop/drop abort outright. This
//! makes double-start and leaked-timer bugs structural rather than a matter
//! of caller discipline.

#[cfg(test)]
#[path = "task_test.rs"]
mod task_test;

use std::future::Future;

use tokio::task::JoinHandle;

/// A single owned background task slot.
#[derive(Debug, Default)]
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// A slot with no running task.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Spawn `future` into the slot, aborting any task already running.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        self.handle = Some(tokio::spawn(future));
    }

    /// Abort the running task, if any.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether a task is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.stop();
    }
}
