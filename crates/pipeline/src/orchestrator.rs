use std::{
    error, fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;

use crate::worker::{
    Outcome, Worker, WorkerContext, WorkerError, WorkerMetadata, WorkerStatus,
};

#[derive(Debug)]
pub enum PipelineError {
    /// A pipeline is already executing; the caller should back off.
    AlreadyRunning,
    ReinitForbidden,
    Storage(storage::StorageError),
    Worker {
        id: &'static str,
        source: WorkerError,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::AlreadyRunning => {
                write!(f, "a pipeline run is already in progress")
            }
            PipelineError::ReinitForbidden => {
                write!(f, "reinitialization is not allowed in production")
            }
            PipelineError::Storage(why) => write!(f, "{why}"),
            PipelineError::Worker { id, source } => {
                write!(f, "worker {id} failed: {source}")
            }
        }
    }
}

impl error::Error for PipelineError {}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRunRecord {
    pub worker: &'static str,
    pub status: WorkerStatus,
    pub duration_ms: u64,
    pub processed: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub runs: Vec<WorkerRunRecord>,
}

/// Runs the registered workers in order, one pipeline at a time.
///
/// A worker that skips lets its successor run; a worker that completes with
/// no successor ends the run; a failure aborts it. The in-progress flag
/// turns a concurrent invocation into `AlreadyRunning` instead of a second
/// pipeline.
pub struct Orchestrator {
    workers: Vec<Arc<dyn Worker>>,
    context: WorkerContext,
    running: AtomicBool,
}

impl Orchestrator {
    pub fn new(context: WorkerContext) -> Self {
        Self {
            workers: Vec::new(),
            context,
            running: AtomicBool::new(false),
        }
    }

    pub fn register(&mut self, worker: Arc<dyn Worker>) {
        self.workers.push(worker);
    }

    pub fn context(&self) -> &WorkerContext {
        &self.context
    }

    /// Metadata of every registered worker, in registration order.
    pub fn worker_metadata(&self) -> Vec<(&'static str, WorkerMetadata)> {
        self.workers
            .iter()
            .map(|worker| (worker.id(), worker.metadata()))
            .collect()
    }

    pub async fn run_pipeline(&self) -> Result<PipelineReport, PipelineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::AlreadyRunning);
        }
        let result = self.run_sequence().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn run_sequence(&self) -> Result<PipelineReport, PipelineError> {
        let started_at = Utc::now();
        let mut runs = Vec::with_capacity(self.workers.len());

        for worker in &self.workers {
            let id = worker.id();
            worker.state().begin_run();
            let clock = Instant::now();

            if !worker.can_run(&self.context).await {
                let duration = clock.elapsed();
                worker.state().record(WorkerStatus::Skipped, duration, 0);
                log::info!("worker {id} skipped (can_run = false)");
                runs.push(WorkerRunRecord {
                    worker: id,
                    status: WorkerStatus::Skipped,
                    duration_ms: duration.as_millis() as u64,
                    processed: 0,
                    message: "declined to run".to_owned(),
                });
                continue;
            }

            let outcome = tokio::time::timeout(
                self.context.config.worker_deadline,
                worker.execute(&self.context),
            )
            .await;
            let duration = clock.elapsed();

            let report = match outcome {
                Err(_elapsed) => {
                    worker.cancel();
                    worker.state().record(WorkerStatus::Failed, duration, 0);
                    log::error!("worker {id} exceeded its deadline");
                    return Err(PipelineError::Worker {
                        id,
                        source: WorkerError::DeadlineExceeded,
                    });
                }
                Ok(Err(source)) => {
                    worker.state().record(WorkerStatus::Failed, duration, 0);
                    log::error!("worker {id} failed: {source}");
                    return Err(PipelineError::Worker { id, source });
                }
                Ok(Ok(report)) => report,
            };

            let (status, processed, message) = match &report.outcome {
                Outcome::Completed { processed, message } => {
                    (WorkerStatus::Completed, *processed, message.clone())
                }
                Outcome::Skipped { reason } => {
                    (WorkerStatus::Skipped, 0, reason.clone())
                }
            };
            worker.state().record(status, duration, processed);
            log::info!(
                "worker {id} {status:?} in {} ms: {message}",
                duration.as_millis()
            );
            runs.push(WorkerRunRecord {
                worker: id,
                status,
                duration_ms: duration.as_millis() as u64,
                processed,
                message,
            });

            let completed_early = matches!(
                report.outcome,
                Outcome::Completed { .. }
            ) && report.next.is_none();
            if completed_early {
                break;
            }
        }

        Ok(PipelineReport {
            started_at,
            finished_at: Utc::now(),
            runs,
        })
    }

    /// Clears every store and runs the pipeline from scratch. Refused in
    /// production.
    pub async fn reinit(
        &self,
        environment: &str,
    ) -> Result<PipelineReport, PipelineError> {
        if environment == "production" {
            return Err(PipelineError::ReinitForbidden);
        }
        self.context
            .repos
            .clear_all()
            .await
            .map_err(PipelineError::Storage)?;
        log::warn!("stored data cleared, re-running the pipeline");
        self.run_pipeline().await
    }
}
