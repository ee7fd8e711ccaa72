use futures_util::future::BoxFuture;

pub type DetachedTask = BoxFuture<'static, anyhow::Result<()>>;

/// Schedules work that outlives the request that started it.
///
/// A failing or panicking task is logged and never affects other tasks or the
/// caller.
pub trait DetachedRunner: Send + Sync {
    fn run_detached(&self, label: String, task: DetachedTask);
}

/// Runs each task on its own tokio task. Requires an active runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDetachedRunner;

impl DetachedRunner for TokioDetachedRunner {
    fn run_detached(&self, label: String, task: DetachedTask) {
        let worker = tokio::spawn(task);
        tokio::spawn(async move {
            match worker.await {
                Ok(Ok(())) => tracing::debug!(task = %label, "detached task finished"),
                Ok(Err(error)) => tracing::error!(
                    task = %label,
                    error = %format!("{error:#}"),
                    "detached task failed"
                ),
                Err(join_error) if join_error.is_panic() => {
                    tracing::error!(task = %label, "detached task panicked")
                }
                Err(_) => tracing::warn!(task = %label, "detached task was cancelled"),
            }
        });
    }
}
