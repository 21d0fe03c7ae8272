//! Spawn utilities.
use std::future::Future;
use tokio::task::JoinHandle;

/// A spawned background task that is aborted when the handle is dropped.
///
/// Subscriptions are held through this handle so that releasing the owner also releases the
/// subscription.
#[derive(Debug)]
#[must_use = "dropping the handle aborts the task"]
pub struct TaskHandle {
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawns `fut` on the current runtime.
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self { handle: tokio::spawn(fut) }
    }

    /// Whether the task ran to completion or was aborted.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Aborts the task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
