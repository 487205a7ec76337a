//! The cold path: sequential data pipeline that ingests upstream records,
//! guarantees connectivity with virtual entities, and builds the graph the
//! hot path reads.

pub mod augment;
pub mod graph_build;
pub mod ingest;
pub mod orchestrator;
pub mod worker;

pub use augment::VirtualEntityWorker;
pub use graph_build::GraphBuildWorker;
pub use ingest::{IngestionWorker, SnapshotSink};
pub use orchestrator::{Orchestrator, PipelineError, PipelineReport};
pub use worker::{
    Outcome, PipelineConfig, Worker, WorkerContext, WorkerError,
    WorkerMetadata, WorkerReport, WorkerState, WorkerStatus,
};
