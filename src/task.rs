//! Background-task contract (spec §4.5/§4.6/§4.7): scheduling a crawl to
//! run off the caller's task so job creation returns immediately. Grounded
//! in `original_source/site_utils.py`'s `start_thread` and `crawler.py`'s
//! `start_crawler`, which hands the whole crawl off to `deferred.defer`.

use std::future::Future;
use std::pin::Pin;

pub type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub trait TaskRunner: Send + Sync {
    /// Schedules `task` to run independently of the caller. The caller
    /// observes no return value and no error — a crawl that fails reports
    /// its own failure through the result store, not through this contract.
    fn spawn(&self, task: BoxedTask);
}

/// Runs tasks on the Tokio runtime's thread pool, detached (spec §4.5:
/// job creation returns before the crawl finishes).
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTaskRunner;

impl TaskRunner for TokioTaskRunner {
    fn spawn(&self, task: BoxedTask) {
        tokio::spawn(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn spawned_task_runs_to_completion() {
        let runner = TokioTaskRunner;
        let (tx, rx) = oneshot::channel();

        runner.spawn(Box::pin(async move {
            let _ = tx.send(42);
        }));

        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn runner_is_usable_behind_a_shared_reference() {
        let runner: Arc<dyn TaskRunner> = Arc::new(TokioTaskRunner);
        let (tx, rx) = oneshot::channel();

        runner.spawn(Box::pin(async move {
            let _ = tx.send(());
        }));

        rx.await.unwrap();
    }
}
