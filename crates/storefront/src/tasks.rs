//! Best-effort background work.
//!
//! Follow-up writes that must not hold up or fail the caller (the audit
//! report after a message is generated) are spawned here. Failures are
//! logged and dropped.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

/// Handle for spawning fire-and-forget tasks.
///
/// Tasks are detached, so they run to completion even after every handle is
/// dropped. Cloning shares the count of running tasks.
#[derive(Clone)]
pub struct BackgroundTasks {
    running: Arc<watch::Sender<usize>>,
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Decrements the running count when the task ends, panics included.
struct Running(Arc<watch::Sender<usize>>);

impl Drop for Running {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl BackgroundTasks {
    #[must_use]
    pub fn new() -> Self {
        let (running, _) = watch::channel(0);
        Self {
            running: Arc::new(running),
        }
    }

    /// Run `task` on the runtime without waiting for it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F, E>(&self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.running.send_modify(|n| *n += 1);
        let guard = Running(Arc::clone(&self.running));
        tokio::spawn(async move {
            let _guard = guard;
            match task.await {
                Ok(()) => debug!(task = name, "Background task finished"),
                Err(e) => warn!(task = name, error = %e, "Background task failed"),
            }
        });
    }

    /// Number of tasks spawned and still running.
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.running.borrow()
    }

    /// Wait until no task is running, including ones spawned while waiting.
    pub async fn wait_idle(&self) {
        let mut idle = self.running.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = idle.wait_for(|n| *n == 0).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_wait_idle_joins_spawned_tasks() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            tasks.spawn("count", async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<(), std::io::Error>(())
            });
        }
        assert_eq!(tasks.pending(), 3);

        tasks.wait_idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let tasks = BackgroundTasks::new();
        tasks.spawn("fails", async { Err::<(), _>("boom") });
        tasks.wait_idle().await;
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_finished_tasks_are_released_without_waiting() {
        let tasks = BackgroundTasks::new();
        for _ in 0..10_000 {
            tasks.spawn("noop", async { Ok::<(), std::io::Error>(()) });
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_tasks_outlive_dropped_handle() {
        let done = Arc::new(AtomicUsize::new(0));
        let tasks = BackgroundTasks::new();
        {
            let done = done.clone();
            tasks.spawn("late", async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<(), std::io::Error>(())
            });
        }
        drop(tasks);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_task_is_not_counted() {
        let tasks = BackgroundTasks::new();
        tasks.spawn("panics", async {
            if std::hint::black_box(true) {
                panic!("boom");
            }
            Ok::<(), std::io::Error>(())
        });
        tasks.wait_idle().await;
        assert_eq!(tasks.pending(), 0);
    }
}
