//! Running the orchestrator on a background worker.
//!
//! [`PipelineService`] owns the single-run guard: at most one preprocessing
//! or prep run is active at a time. Events reach the caller through an
//! ordered channel; the worker never blocks on the consumer.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::debug;

use crate::config::Configuration;
use crate::engine::HostEngine;
use crate::error::{Result, VesperaError};
use crate::pipeline::{self, EventSink, Outcome, PipelineEvent, RunSummary, Severity};
use crate::prep::{self, PrepOptions, PrepSummary};
use crate::registry::Registry;

const WORKER_THREAD_NAME: &str = "vespera-worker";

/// Event sink that forwards every event over an mpsc channel.
pub struct ChannelSink {
    tx: mpsc::Sender<PipelineEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn progress(&self, percent: u8, message: &str) {
        let _ = self.tx.send(PipelineEvent::Progress {
            percent,
            message: message.to_string(),
        });
    }

    fn log(&self, message: &str, severity: Severity) {
        let _ = self.tx.send(PipelineEvent::Log {
            message: message.to_string(),
            severity,
        });
    }

    fn finished(&self, success: bool, summary: &str) {
        let _ = self.tx.send(PipelineEvent::Finished {
            success,
            summary: summary.to_string(),
        });
    }
}

/// Clears the active flag when dropped, including on worker panic.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A run executing on the worker thread.
pub struct RunHandle<T = RunSummary> {
    events: mpsc::Receiver<PipelineEvent>,
    worker: JoinHandle<Result<T>>,
}

impl<T> RunHandle<T> {
    pub fn events(&self) -> &mpsc::Receiver<PipelineEvent> {
        &self.events
    }

    /// Wait for the worker and return its result.
    pub fn join(self) -> Result<T> {
        self.worker
            .join()
            .map_err(|_| VesperaError::WorkerPanicked)?
    }

    /// Feed every event to `on_event` until the run ends, then join.
    pub fn wait_with<F>(self, mut on_event: F) -> Result<T>
    where
        F: FnMut(PipelineEvent),
    {
        for event in self.events.iter() {
            on_event(event);
        }
        self.worker
            .join()
            .map_err(|_| VesperaError::WorkerPanicked)?
    }
}

#[derive(Clone)]
pub struct PipelineService {
    registry: Arc<Registry>,
    active: Arc<AtomicBool>,
}

impl PipelineService {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Start a preprocessing run of `workdir` on the worker thread.
    pub fn start(
        &self,
        workdir: PathBuf,
        config: Configuration,
        engine: Box<dyn HostEngine>,
    ) -> Result<RunHandle> {
        let registry = Arc::clone(&self.registry);
        self.spawn(engine, move |engine, sink| {
            pipeline::execute(&workdir, &config, &registry, engine, sink)
        })
    }

    /// Start a Quick Prep run on a single stacked image.
    pub fn start_prep(
        &self,
        image: PathBuf,
        options: PrepOptions,
        engine: Box<dyn HostEngine>,
    ) -> Result<RunHandle<PrepSummary>> {
        self.spawn(engine, move |engine, sink| {
            prep::execute(&image, &options, engine, sink)
        })
    }

    fn spawn<T, F>(&self, mut engine: Box<dyn HostEngine>, job: F) -> Result<RunHandle<T>>
    where
        T: Outcome + Send + 'static,
        F: FnOnce(&mut dyn HostEngine, &dyn EventSink) -> Result<T> + Send + 'static,
    {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(VesperaError::RunInProgress);
        }
        let guard = ActiveGuard(Arc::clone(&self.active));

        let (tx, rx) = mpsc::channel();
        let worker = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || {
                let sink = ChannelSink::new(tx);
                let outcome = job(engine.as_mut(), &sink);
                // Free the service before the terminal event so a consumer
                // reacting to it can start the next run.
                drop(engine);
                drop(guard);
                pipeline::report_outcome(&sink, &outcome);
                debug!("Worker finished");
                outcome
            });

        match worker {
            Ok(worker) => Ok(RunHandle { events: rx, worker }),
            // The closure, and with it the guard, is dropped on spawn failure.
            Err(e) => Err(VesperaError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_clears_flag() {
        let flag = Arc::new(AtomicBool::new(true));
        drop(ActiveGuard(Arc::clone(&flag)));
        assert!(!flag.load(Ordering::Acquire));
    }
}
