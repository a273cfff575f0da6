//! The preprocessing orchestrator.
//!
//! A run walks a fixed stage sequence (cleanup, master dark, conversion,
//! calibration, registration, stacking, extraction, post-processing, final
//! cleanup), issuing host commands and reporting through an [`EventSink`].

pub(crate) mod driver;
mod extract;
mod orchestrator;
mod postprocess;
mod stages;
mod types;

pub use orchestrator::{execute, report_outcome, run_pipeline, run_pipeline_reported};
pub use types::{
    Artifact, ArtifactKind, EventSink, LogEntry, NoOpSink, Outcome, PipelineEvent, PipelineStage,
    RunSummary, Severity,
};
