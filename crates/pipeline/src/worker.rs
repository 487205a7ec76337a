use std::{
    error, fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;
use storage::Repositories;

/// Identifier of the ingestion worker.
pub const INGESTION_WORKER: &str = "ingestion";
/// Identifier of the virtual-entity worker.
pub const VIRTUAL_ENTITY_WORKER: &str = "virtual-entities";
/// Identifier of the graph-build worker.
pub const GRAPH_BUILD_WORKER: &str = "graph-build";

/// Settings the pipeline reads. Assembled from the environment by the
/// binary; tests construct it directly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// When disabled, the virtual-entity worker skips itself.
    pub use_adaptive_data_loading: bool,
    /// Minimum spacing between successful ingestion runs.
    pub ingest_cooldown: Duration,
    /// Deadline for a single worker execution.
    pub worker_deadline: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            use_adaptive_data_loading: true,
            ingest_cooldown: Duration::from_secs(3600),
            worker_deadline: Duration::from_secs(300),
        }
    }
}

/// Everything a worker gets to touch during a run.
#[derive(Clone)]
pub struct WorkerContext {
    pub repos: Repositories,
    pub config: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Completed { processed: usize, message: String },
    Skipped { reason: String },
}

/// What one execution produced. `next` names the worker that should follow;
/// `None` ends the pipeline successfully, which is how an unchanged upstream
/// snapshot avoids a pointless rebuild.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub outcome: Outcome,
    pub next: Option<&'static str>,
}

impl WorkerReport {
    pub fn completed(
        processed: usize,
        message: impl Into<String>,
        next: Option<&'static str>,
    ) -> Self {
        Self {
            outcome: Outcome::Completed {
                processed,
                message: message.into(),
            },
            next,
        }
    }

    pub fn skipped(reason: impl Into<String>, next: Option<&'static str>) -> Self {
        Self {
            outcome: Outcome::Skipped {
                reason: reason.into(),
            },
            next,
        }
    }
}

#[derive(Debug)]
pub enum WorkerError {
    Upstream(upstream::UpstreamError),
    Storage(storage::StorageError),
    Build(route_graph::BuildError),
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::Upstream(why) => write!(f, "{why}"),
            WorkerError::Storage(why) => write!(f, "{why}"),
            WorkerError::Build(why) => write!(f, "{why}"),
            WorkerError::Cancelled => write!(f, "worker was cancelled"),
            WorkerError::DeadlineExceeded => {
                write!(f, "worker exceeded its deadline")
            }
        }
    }
}

impl error::Error for WorkerError {}

impl From<upstream::UpstreamError> for WorkerError {
    fn from(why: upstream::UpstreamError) -> Self {
        WorkerError::Upstream(why)
    }
}

impl From<storage::StorageError> for WorkerError {
    fn from(why: storage::StorageError) -> Self {
        WorkerError::Storage(why)
    }
}

impl From<route_graph::BuildError> for WorkerError {
    fn from(why: route_graph::BuildError) -> Self {
        WorkerError::Build(why)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Completed,
    Skipped,
    Failed,
}

/// Run bookkeeping every worker exposes through `metadata()`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerMetadata {
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_status: WorkerStatus,
    pub last_duration_ms: Option<u64>,
    pub last_processed: usize,
}

impl Default for WorkerMetadata {
    fn default() -> Self {
        Self {
            last_run: None,
            last_success: None,
            last_status: WorkerStatus::Idle,
            last_duration_ms: None,
            last_processed: 0,
        }
    }
}

/// Shared state composed into every worker: cancellation flag and run
/// metadata. The orchestrator records into it after each execution.
#[derive(Default)]
pub struct WorkerState {
    cancelled: AtomicBool,
    metadata: Mutex<WorkerMetadata>,
}

impl WorkerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Checked by workers at suspension points.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn begin_run(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn record(
        &self,
        status: WorkerStatus,
        duration: Duration,
        processed: usize,
    ) {
        let mut metadata =
            self.metadata.lock().expect("worker state lock poisoned");
        let now = Utc::now();
        metadata.last_run = Some(now);
        if status == WorkerStatus::Completed {
            metadata.last_success = Some(now);
        }
        metadata.last_status = status;
        metadata.last_duration_ms = Some(duration.as_millis() as u64);
        metadata.last_processed = processed;
    }

    pub fn snapshot(&self) -> WorkerMetadata {
        self.metadata
            .lock()
            .expect("worker state lock poisoned")
            .clone()
    }
}

/// A pipeline stage. Implementations hold a `WorkerState` and expose it
/// through `state()`; cancellation and metadata come with it.
#[async_trait]
pub trait Worker: Send + Sync {
    fn id(&self) -> &'static str;

    fn state(&self) -> &WorkerState;

    /// Whether the worker wants to run at all. A `false` is recorded as
    /// skipped and the pipeline moves on.
    async fn can_run(&self, _context: &WorkerContext) -> bool {
        true
    }

    async fn execute(
        &self,
        context: &WorkerContext,
    ) -> Result<WorkerReport, WorkerError>;

    fn cancel(&self) {
        self.state().cancel();
    }

    fn metadata(&self) -> WorkerMetadata {
        self.state().snapshot()
    }
}
