//! Background task management
//!
//! Registers, starts and shuts down every long-running task of the service.
//!
//! # Task kinds
//!
//! - [`TaskKind::Listener`] - bus consumers
//! - [`TaskKind::Periodic`] - polling loops (outbox relay)

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use shared::error::AppError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::message::handler::backoff_delay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Listener,
    Periodic,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Listener => write!(f, "Listener"),
            TaskKind::Periodic => write!(f, "Periodic"),
        }
    }
}

/// Restart backoff for supervised tasks
#[derive(Debug, Clone, Copy)]
pub struct RestartPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

struct RegisteredTask {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Background task manager
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// tasks.spawn_supervised("consumer.credit", TaskKind::Listener, policy, move || {
///     let handler = handler.clone();
///     async move { handler.run().await }
/// });
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
}

fn panic_message(panic_info: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token tasks watch for the shutdown signal
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn a task that runs once
    ///
    /// Panics are caught and logged; an early exit is logged as unexpected.
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let wrapped_future = async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) => {
                    if !shutdown.is_cancelled() {
                        tracing::warn!(task = %name, kind = %kind, "Background task completed unexpectedly");
                    }
                }
                Err(panic_info) => {
                    tracing::error!(
                        task = %name,
                        kind = %kind,
                        panic = %panic_message(panic_info),
                        "Background task panicked"
                    );
                }
            }
        };

        let handle = tokio::spawn(wrapped_future);
        tracing::debug!(task = %name, kind = %kind, "Registered background task");
        self.tasks.push(RegisteredTask { name, kind, handle });
    }

    /// Spawn a task that is restarted whenever it fails, panics or returns
    /// before shutdown
    ///
    /// `factory` builds a fresh future for every run. Restart delays grow
    /// exponentially and reset once a run outlives `policy.max_delay`.
    pub fn spawn_supervised<F, Fut>(
        &mut self,
        name: &'static str,
        kind: TaskKind,
        policy: RestartPolicy,
        factory: F,
    ) where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let supervisor = async move {
            let mut restarts: u32 = 0;
            loop {
                let started = Instant::now();
                let outcome = AssertUnwindSafe(factory()).catch_unwind().await;
                if shutdown.is_cancelled() {
                    break;
                }

                let reason = match outcome {
                    Ok(Ok(())) => "exited before shutdown".to_string(),
                    Ok(Err(e)) => e.to_string(),
                    Err(panic_info) => format!("panicked: {}", panic_message(panic_info)),
                };
                if started.elapsed() > policy.max_delay {
                    restarts = 0;
                }
                restarts += 1;

                let delay = backoff_delay(
                    policy.initial_delay.as_millis() as u64,
                    restarts,
                    policy.max_delay.as_millis() as u64,
                );
                tracing::error!(
                    task = %name,
                    kind = %kind,
                    restarts,
                    delay_ms = delay.as_millis() as u64,
                    reason = %reason,
                    "Supervised task failed, restarting"
                );

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        };

        self.spawn(name, kind, supervisor);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn log_summary(&self) {
        let count = |k: TaskKind| self.tasks.iter().filter(|t| t.kind == k).count();
        tracing::info!(
            total = self.tasks.len(),
            listeners = count(TaskKind::Listener),
            periodic = count(TaskKind::Periodic),
            "Background tasks registered"
        );
    }

    /// Number of tasks that have stopped while the service is running
    ///
    /// Supervised tasks only end on shutdown, so anything finished here
    /// lost its supervisor.
    pub fn check_health(&self) -> usize {
        let failed: Vec<&str> = self
            .tasks
            .iter()
            .filter(|t| t.handle.is_finished())
            .map(|t| t.name)
            .collect();
        if !failed.is_empty() {
            tracing::error!(failed = ?failed, total = self.tasks.len(), "Background tasks stopped");
        }
        failed.len()
    }

    /// Cancel every task and wait for it to finish
    pub async fn shutdown(self) {
        tracing::info!(count = self.tasks.len(), "Shutting down background tasks");
        self.shutdown.cancel();

        for task in self.tasks {
            match task.handle.await {
                Ok(()) => tracing::debug!(task = %task.name, "Task completed"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = %task.name, "Task cancelled"),
                Err(e) => tracing::error!(task = %task.name, error = ?e, "Task panicked"),
            }
        }

        tracing::info!("All background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RestartPolicy {
        RestartPolicy {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_supervised_task_restarts_after_error_and_panic() {
        let runs = Arc::new(AtomicU32::new(0));
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();

        let counter = runs.clone();
        tasks.spawn_supervised("flaky", TaskKind::Listener, fast_policy(), move || {
            let counter = counter.clone();
            let token = token.clone();
            async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(AppError::internal("boom")),
                    1 => panic!("kaboom"),
                    _ => {
                        token.cancelled().await;
                        Ok(())
                    }
                }
            }
        });

        for _ in 0..100 {
            if runs.load(Ordering::SeqCst) >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.check_health(), 0);

        tasks.shutdown().await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_plain_tasks() {
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        tasks.spawn("waiter", TaskKind::Periodic, async move {
            token.cancelled().await;
        });
        tasks.spawn("quitter", TaskKind::Periodic, async {});
        assert_eq!(tasks.len(), 2);

        for _ in 0..100 {
            if tasks.check_health() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(tasks.check_health(), 1);
        tasks.shutdown().await;
    }
}
