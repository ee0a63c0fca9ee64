// Scheduled Executor for periodic tasks.
// Adapted for async/tokio runtime; used by the Job Registry's eviction
// sweep (C9) and the Catalog Introspector's TTL refresh tick (C1).

use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;

/// A trait for tasks that run periodically.
pub trait ScheduledTask: Send + Sync + 'static {
    /// Execute the task. Returns `Ok(())` on success, `Err` on failure.
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>>;

    /// Whether the task should terminate. Default: never (run forever).
    fn should_terminate(&self) -> bool {
        false
    }
}

impl<T: ScheduledTask> ScheduledTask for Arc<T> {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        (**self).run()
    }

    fn should_terminate(&self) -> bool {
        (**self).should_terminate()
    }
}

/// Runs a [`ScheduledTask`] on a fixed interval until shutdown or
/// `should_terminate()` returns true.
pub struct ScheduledExecutor {
    interval: Duration,
    task_name: String,
    shutdown: Arc<AtomicBool>,
}

impl ScheduledExecutor {
    pub fn new(task_name: impl Into<String>, interval: Duration) -> Self {
        Self { task_name: task_name.into(), interval, shutdown: Arc::new(AtomicBool::new(false)) }
    }

    pub async fn start<T>(self, task: T)
    where
        T: ScheduledTask,
    {
        let task_name = self.task_name.clone();
        let interval_ms = self.interval.as_millis() as i64;
        let shutdown = self.shutdown;

        tracing::info!(task = %task_name, interval = ?self.interval, "starting scheduled task");

        let mut next_execution = Utc::now().timestamp_millis() + interval_ms;

        loop {
            if shutdown.load(Ordering::Relaxed) || task.should_terminate() {
                tracing::info!(task = %task_name, "scheduled task shutting down");
                break;
            }

            let now = Utc::now().timestamp_millis();
            if now >= next_execution {
                tracing::debug!(task = %task_name, "executing scheduled task");
                if let Err(e) = task.run().await {
                    tracing::error!(task = %task_name, error = %e, "scheduled task failed");
                }
                next_execution = Utc::now().timestamp_millis() + interval_ms;
            }

            let wait_ms = next_execution.saturating_sub(Utc::now().timestamp_millis());
            if wait_ms > 0 {
                sleep(Duration::from_millis(wait_ms as u64)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct TestTask {
        counter: Arc<AtomicU32>,
        max_runs: u32,
    }

    impl ScheduledTask for TestTask {
        fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
            Box::pin(async move {
                self.counter.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
        }

        fn should_terminate(&self) -> bool {
            self.counter.load(Ordering::Relaxed) >= self.max_runs
        }
    }

    #[tokio::test]
    async fn runs_until_should_terminate() {
        let counter = Arc::new(AtomicU32::new(0));
        let task = TestTask { counter: counter.clone(), max_runs: 3 };
        let executor = ScheduledExecutor::new("test", Duration::from_millis(5));
        executor.start(task).await;
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }
}
