//! Concurrent backend execution with per-backend failure isolation.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use super::events::CollectorEvent;
use crate::backend::{Backend, BackendError};
use crate::container::TextContainer;

/// Name recorded for a task whose backend could not be identified.
const UNKNOWN_BACKEND: &str = "<unknown>";

/// Worker pool sizing and timeout policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Maximum backends running at once.
    pub workers: usize,
    /// Per-backend limit on `run`. `None` waits for every backend.
    pub timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout: None,
        }
    }
}

/// Pool size for network-bound backends: `min(32, cpus + 4)`.
pub fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus + 4).min(32)
}

/// A backend whose run failed, panicked or timed out.
#[derive(Debug)]
pub struct BackendFailure {
    pub backend_name: String,
    pub error: BackendError,
}

/// Result of one execution: the successful columns plus every failure.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub container: TextContainer,
    pub failures: Vec<BackendFailure>,
}

impl ExecutionOutcome {
    pub fn succeeded(&self) -> usize {
        self.container.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn into_container(self) -> TextContainer {
        self.container
    }
}

/// Runs initialised backends on a bounded pool of tokio tasks.
#[derive(Debug, Clone, Default)]
pub struct PipelineExecutor {
    config: ExecutorConfig,
}

impl PipelineExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run every backend and collect the results.
    pub async fn execute(&self, backends: Vec<Box<dyn Backend>>) -> ExecutionOutcome {
        self.execute_with_events(backends, None).await
    }

    /// Run every backend, reporting progress on `events`.
    ///
    /// All backends are dispatched at once; the semaphore bounds how many
    /// run at a time. Results are written as tasks complete. A backend that
    /// returns an error, panics or exceeds the timeout has no column in the
    /// container and is listed in `failures` instead.
    pub async fn execute_with_events(
        &self,
        backends: Vec<Box<dyn Backend>>,
        events: Option<mpsc::Sender<CollectorEvent>>,
    ) -> ExecutionOutcome {
        let mut container = TextContainer::new();
        let mut failures = Vec::new();

        tracing::info!(
            "Running {} backend(s) on {} worker(s)",
            backends.len(),
            self.config.workers
        );
        emit(
            &events,
            CollectorEvent::Started {
                total_backends: backends.len(),
            },
        )
        .await;

        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();

        for backend in backends {
            let semaphore = Arc::clone(&semaphore);
            let events = events.clone();
            let timeout = self.config.timeout;
            tasks.spawn(run_backend(backend, semaphore, events, timeout));
        }

        while let Some(joined) = tasks.join_next().await {
            let (name, result) = match joined {
                Ok(finished) => finished,
                Err(e) => (
                    UNKNOWN_BACKEND.to_string(),
                    Err(BackendError::Panicked(e.to_string())),
                ),
            };

            match result {
                Ok(rows) => {
                    tracing::info!("Backend '{}' collected {} item(s)", name, rows.len());
                    emit(
                        &events,
                        CollectorEvent::BackendCompleted {
                            backend: name.clone(),
                            items: rows.len(),
                        },
                    )
                    .await;
                    if container.insert(name.clone(), rows).is_some() {
                        tracing::warn!("Backend '{}' overwrote an existing column", name);
                    }
                }
                Err(error) => {
                    tracing::warn!("Backend '{}' failed: {}", name, error);
                    emit(
                        &events,
                        CollectorEvent::BackendFailed {
                            backend: name.clone(),
                            error: error.to_string(),
                        },
                    )
                    .await;
                    failures.push(BackendFailure {
                        backend_name: name,
                        error,
                    });
                }
            }
        }

        emit(
            &events,
            CollectorEvent::Finished {
                succeeded: container.len(),
                failed: failures.len(),
            },
        )
        .await;

        ExecutionOutcome {
            container,
            failures,
        }
    }
}

async fn run_backend(
    mut backend: Box<dyn Backend>,
    semaphore: Arc<Semaphore>,
    events: Option<mpsc::Sender<CollectorEvent>>,
    timeout: Option<Duration>,
) -> (String, Result<Vec<String>, BackendError>) {
    let name = backend.backend_name().to_string();

    let Ok(_permit) = semaphore.acquire_owned().await else {
        return (name, Err(BackendError::Other("worker pool closed".to_string())));
    };

    tracing::debug!("Starting backend '{}'", name);
    emit(
        &events,
        CollectorEvent::BackendStarted {
            backend: name.clone(),
        },
    )
    .await;

    let run = AssertUnwindSafe(backend.run()).catch_unwind();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(outcome) => outcome,
            Err(_) => return (name, Err(BackendError::TimedOut(limit))),
        },
        None => run.await,
    };

    let result =
        outcome.unwrap_or_else(|payload| Err(BackendError::Panicked(panic_message(payload))));
    (name, result)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn emit(events: &Option<mpsc::Sender<CollectorEvent>>, event: CollectorEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
