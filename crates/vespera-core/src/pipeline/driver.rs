use tracing::{debug, error, info, warn};

use crate::engine::{Command, EngineError, HostEngine};
use crate::error::{VesperaError, Warning};

use super::types::{EventSink, LogEntry, PipelineStage, Severity};

/// Issues host commands for one run and fans its log and progress out to
/// both `tracing` and the event sink.
pub(crate) struct Driver<'a> {
    engine: &'a mut dyn HostEngine,
    sink: &'a dyn EventSink,
    stage: PipelineStage,
    last_percent: u8,
    host_calls: usize,
    log: Vec<LogEntry>,
    warnings: Vec<Warning>,
}

impl<'a> Driver<'a> {
    pub(crate) fn new(engine: &'a mut dyn HostEngine, sink: &'a dyn EventSink) -> Self {
        Self {
            engine,
            sink,
            stage: PipelineStage::Init,
            last_percent: 0,
            host_calls: 0,
            log: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn enter(&mut self, stage: PipelineStage) {
        debug!(%stage, "Entering stage");
        self.stage = stage;
    }

    /// Report progress, clamped so it never goes backwards.
    pub(crate) fn progress(&mut self, percent: u8, message: &str) {
        let percent = percent.clamp(self.last_percent, 100);
        self.last_percent = percent;
        self.sink.progress(percent, message);
    }

    pub(crate) fn log(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info | Severity::Success => info!(stage = %self.stage, "{message}"),
            Severity::Warning => warn!(stage = %self.stage, "{message}"),
            Severity::Error => error!(stage = %self.stage, "{message}"),
        }
        self.sink.log(&message, severity);
        self.log.push(LogEntry { severity, message });
    }

    pub(crate) fn info(&mut self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    pub(crate) fn success(&mut self, message: impl Into<String>) {
        self.log(Severity::Success, message);
    }

    pub(crate) fn warn(&mut self, warning: Warning) {
        self.log(Severity::Warning, warning.to_string());
        self.warnings.push(warning);
    }

    fn send(&mut self, command: &Command) -> Result<(), EngineError> {
        self.host_calls += 1;
        self.engine.execute(command)
    }

    /// Run a command whose failure aborts the run.
    pub(crate) fn exec(&mut self, command: Command) -> crate::error::Result<()> {
        self.send(&command).map_err(|e| {
            let reason = e.to_string();
            self.log(
                Severity::Error,
                format!("{} failed at `{command}`: {reason}", self.stage),
            );
            VesperaError::StageExecution {
                stage: self.stage,
                command: command.to_line(),
                reason,
            }
        })
    }

    /// Run a best-effort command. The caller turns a failure into a warning.
    pub(crate) fn try_exec(&mut self, command: Command) -> Result<(), EngineError> {
        let outcome = self.send(&command);
        if let Err(e) = &outcome {
            debug!(command = %command, error = %e, "Best-effort command failed");
        }
        outcome
    }

    /// Put the host back into `dir` after a failure, ignoring errors.
    pub(crate) fn restore_directory(&mut self, dir: String) {
        if self.host_calls == 0 {
            return;
        }
        if let Err(e) = self.send(&Command::Cd(dir)) {
            debug!(error = %e, "Could not restore host directory");
        }
    }

    pub(crate) fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub(crate) fn into_records(self) -> (Vec<LogEntry>, Vec<Warning>) {
        (self.log, self.warnings)
    }
}
