//! Execution backend for per-device tasks.
//!
//! Each host runs in its own tokio task. The threaded strategy bounds the
//! number of tasks running at once with a semaphore; the serial strategy
//! runs hosts one after another in inventory order.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, error, info};

use crate::config::{RunnerStrategy, Settings};
use crate::error::DeployError;
use crate::inventory::Host;

/// Runs a task once per host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Runner {
    strategy: RunnerStrategy,
    num_workers: usize,
}

impl Runner {
    /// One host at a time.
    #[must_use]
    pub const fn serial() -> Self {
        Self {
            strategy: RunnerStrategy::Serial,
            num_workers: 1,
        }
    }

    /// Up to `num_workers` hosts at a time; zero is treated as one.
    #[must_use]
    pub const fn threaded(num_workers: usize) -> Self {
        Self {
            strategy: RunnerStrategy::Threaded,
            num_workers: if num_workers == 0 { 1 } else { num_workers },
        }
    }

    /// Creates the runner described by the settings.
    #[must_use]
    pub const fn from_settings(settings: &Settings) -> Self {
        match settings.runner.strategy {
            RunnerStrategy::Serial => Self::serial(),
            RunnerStrategy::Threaded => Self::threaded(settings.runner.num_workers),
        }
    }

    /// Returns the maximum number of hosts running at once.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.num_workers
    }

    /// Runs `task` for every host and returns the outputs in host order.
    ///
    /// A task that panics does not stop the others; once all tasks have
    /// finished, the first abnormal termination is returned as
    /// `DeployError::TaskAborted`.
    ///
    /// # Errors
    ///
    /// Returns an error if any task terminated abnormally.
    pub async fn run<T, F, Fut>(&self, hosts: Vec<Host>, task: F) -> Result<Vec<T>, DeployError>
    where
        F: Fn(Host) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        info!(
            "Running {} host(s) with the {:?} strategy ({} worker(s))",
            hosts.len(),
            self.strategy,
            self.num_workers
        );

        let names: Vec<String> = hosts.iter().map(|h| h.name().to_string()).collect();
        let joined = match self.strategy {
            RunnerStrategy::Serial => Self::run_serial(hosts, &task).await,
            RunnerStrategy::Threaded => self.run_threaded(hosts, &task).await,
        };

        let mut outputs = Vec::with_capacity(joined.len());
        let mut first_failure = None;
        for (name, outcome) in names.into_iter().zip(joined) {
            match outcome {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    error!("Task for {name} terminated abnormally: {err}");
                    if first_failure.is_none() {
                        first_failure = Some(DeployError::TaskAborted {
                            device: name,
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(outputs),
        }
    }

    async fn run_serial<T, F, Fut>(hosts: Vec<Host>, task: &F) -> Vec<Result<T, JoinError>>
    where
        F: Fn(Host) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut joined = Vec::with_capacity(hosts.len());
        for host in hosts {
            debug!("Starting task for {}", host.name());
            joined.push(tokio::spawn(task(host)).await);
        }
        joined
    }

    async fn run_threaded<T, F, Fut>(&self, hosts: Vec<Host>, task: &F) -> Vec<Result<T, JoinError>>
    where
        F: Fn(Host) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.num_workers));
        let mut handles = Vec::with_capacity(hosts.len());

        for host in hosts {
            let sem = Arc::clone(&semaphore);
            let work = task(host);
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                work.await
            }));
        }

        let mut joined = Vec::with_capacity(handles.len());
        for handle in handles {
            joined.push(handle.await);
        }
        joined
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
