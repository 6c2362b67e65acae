//! Worker loop (C8): dequeues jobs, drives one execution to completion at
//! a time, and never lets a single job's fault take the process down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use codr_bus::{Bus, BusError, JobStore};
use codr_ids::JobId;
use codr_protocol::{Language, SandboxLimits};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::cancel::CancellationToken;
use crate::executor::ExecutorError;
use crate::sandbox::{RlimitSandbox, Sandbox};
use crate::sanitizer;
use crate::{executor, pty_runner};

/// Worker-side error kinds, matching spec.md §7's Kind column for rows
/// raised in the worker rather than the gateway.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("compilation failed: {0}")]
    CompileFailed(String),
    #[error("compilation timed out")]
    CompileTimeout,
    #[error("sandbox unavailable: {0}")]
    SandboxUnavailable(String),
    #[error("bus unavailable: {0}")]
    BusUnavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl From<ExecutorError> for WorkerError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::CompileFailed { stderr } => WorkerError::CompileFailed(stderr),
            ExecutorError::CompileTimeout => WorkerError::CompileTimeout,
            other => WorkerError::SandboxUnavailable(other.to_string()),
        }
    }
}

impl From<BusError> for WorkerError {
    fn from(err: BusError) -> Self {
        WorkerError::BusUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for WorkerError {
    fn from(err: std::io::Error) -> Self {
        WorkerError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for WorkerError {
    fn from(err: tokio::task::JoinError) -> Self {
        WorkerError::Internal(err.to_string())
    }
}

#[derive(Clone)]
pub struct WorkerConfig {
    pub queue_name: String,
    pub poll_timeout_secs: u64,
    pub execution_timeout_secs: u64,
    pub max_memory_mb: u64,
    pub max_file_size_mb: u64,
    pub compilation_timeout_secs: u64,
    pub worker_id: String,
}

pub struct Worker<S, B> {
    store: S,
    bus: B,
    config: WorkerConfig,
    sandbox: Arc<dyn Sandbox>,
    failure_count: AtomicU64,
}

impl<S, B> Worker<S, B>
where
    S: JobStore + Clone + Send + Sync + 'static,
    B: Bus + Clone + Send + Sync + 'static,
{
    pub fn new(store: S, bus: B, config: WorkerConfig) -> Self {
        Self {
            store,
            bus,
            config,
            sandbox: Arc::new(RlimitSandbox),
            failure_count: AtomicU64::new(0),
        }
    }

    /// Runs until `shutdown` is signalled. Stops pulling new jobs at that
    /// point but finishes whatever job is in flight.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(worker_id = %self.config.worker_id, "worker loop starting");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let entry = tokio::select! {
                result = self.bus.dequeue(&self.config.queue_name, self.config.poll_timeout_secs) => result,
                _ = shutdown.changed() => continue,
            };

            let entry = match entry {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(err) => {
                    warn!(error = %err, "bus unavailable, backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            let queue_wait = (chrono::Utc::now() - entry.queued_at)
                .to_std()
                .unwrap_or_default();
            info!(job_id = %entry.job_id, queue_wait_ms = queue_wait.as_millis(), "claimed job");

            if let Err(err) = self.execute_job(entry.job_id.clone(), entry.code, entry.language, entry.filename).await {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                error!(job_id = %entry.job_id, error = %err, "job failed");
                let _ = self.bus.publish_error(&entry.job_id, err.to_string()).await;
            }
        }
        info!("worker loop stopping");
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    async fn execute_job(
        &self,
        job_id: JobId,
        code: String,
        language: Language,
        filename: String,
    ) -> Result<(), WorkerError> {
        self.store.mark_processing(&job_id).await?;

        let workdir = tempfile::tempdir()?;
        let prepared = executor::prepare(
            language,
            &code,
            &filename,
            workdir.path(),
            Duration::from_secs(self.config.compilation_timeout_secs),
        )
        .await;

        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                let worker_err = WorkerError::from(err);
                self.store
                    .mark_failed(&job_id, worker_err.to_string(), None)
                    .await?;
                let workdir_str = workdir.path().to_string_lossy().to_string();
                let sanitized = sanitizer::sanitize(&worker_err.to_string(), &workdir_str, language);
                self.bus.publish_error(&job_id, sanitized).await?;
                self.bus.publish_complete(&job_id, -1, 0.0).await?;
                return Err(worker_err);
            }
        };

        let limits = SandboxLimits::for_language(
            language,
            self.config.execution_timeout_secs,
            self.config.max_memory_mb,
            self.config.max_file_size_mb,
        );

        // Input listener (async) + bridge: keystrokes cross from the bus's
        // async pubsub stream to the PTY thread's blocking channel here.
        let mut bus_input = self.bus.subscribe_input(&job_id).await?;
        let (pty_input_tx, pty_input_rx) = std::sync::mpsc::channel::<Vec<u8>>();
        let bridge = tokio::spawn(async move {
            while let Some(data) = bus_input.recv().await {
                if pty_input_tx.send(data.into_bytes()).is_err() {
                    break;
                }
            }
        });

        let cancel = CancellationToken::new();
        let handle = tokio::runtime::Handle::current();
        let bus = self.bus.clone();
        let job_id_for_output = job_id.clone();
        let workdir_str = workdir.path().to_string_lossy().to_string();
        let sandbox = Arc::clone(&self.sandbox);
        let argv = prepared.argv;
        let workdir_path = workdir.path().to_path_buf();

        let result = tokio::task::spawn_blocking(move || {
            pty_runner::run(
                &argv,
                &workdir_path,
                limits,
                sandbox.as_ref(),
                move |bytes| {
                    let sanitized = sanitizer::sanitize(
                        &String::from_utf8_lossy(bytes),
                        &workdir_str,
                        language,
                    );
                    if sanitized.is_empty() {
                        return;
                    }
                    let bus = bus.clone();
                    let job_id = job_id_for_output.clone();
                    handle.spawn(async move {
                        let _ = bus.publish_output(&job_id, sanitized).await;
                    });
                },
                pty_input_rx,
                cancel,
            )
        })
        .await?;

        bridge.abort();

        if result.success {
            self.store.mark_completed(&job_id, result.clone()).await?;
        } else {
            self.store
                .mark_failed(&job_id, result.stderr.clone(), Some(result.clone()))
                .await?;
        }

        self.bus
            .publish_complete(&job_id, result.exit_code, result.execution_time)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_config_carries_the_expected_fields() {
        let config = WorkerConfig {
            queue_name: "codr:job_queue".to_string(),
            poll_timeout_secs: 5,
            execution_timeout_secs: 7,
            max_memory_mb: 300,
            max_file_size_mb: 1,
            compilation_timeout_secs: 10,
            worker_id: "w1".to_string(),
        };
        assert_eq!(config.queue_name, "codr:job_queue");
        assert_eq!(config.poll_timeout_secs, 5);
    }
}
