use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Warning;
use crate::io::fits::IntegrationEstimate;
use crate::io::frames::CleanupReport;
use crate::registry::EmissionLine;

/// Stage of a preprocessing run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    Init,
    Cleanup,
    PrepareCalibrationMaster,
    ConvertSignalFrames,
    Calibrate,
    Register,
    Stack,
    ExtractOrCompose,
    PostProcess,
    FinalCleanup,
    Done,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "Initialization"),
            Self::Cleanup => write!(f, "Cleanup"),
            Self::PrepareCalibrationMaster => write!(f, "Master dark preparation"),
            Self::ConvertSignalFrames => write!(f, "Light frame conversion"),
            Self::Calibrate => write!(f, "Calibration"),
            Self::Register => write!(f, "Registration"),
            Self::Stack => write!(f, "Stacking"),
            Self::ExtractOrCompose => write!(f, "Channel extraction"),
            Self::PostProcess => write!(f, "Post-processing"),
            Self::FinalCleanup => write!(f, "Final cleanup"),
            Self::Done => write!(f, "Done"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Events emitted during a run, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    Progress { percent: u8, message: String },
    Log { message: String, severity: Severity },
    /// Sent exactly once, last.
    Finished { success: bool, summary: String },
}

/// Thread-safe consumer of run events.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait EventSink: Send + Sync {
    /// `percent` never decreases within one run.
    fn progress(&self, _percent: u8, _message: &str) {}

    fn log(&self, _message: &str, _severity: Severity) {}

    fn finished(&self, _success: bool, _summary: &str) {}
}

/// Sink that drops every event, used when `run_pipeline` delegates.
pub struct NoOpSink;
impl EventSink for NoOpSink {}

/// One entry of a run's log.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The finished broadband or single-narrowband image.
    Final,
    /// One extracted emission-line channel of a dual-band stack.
    Channel(EmissionLine),
    /// The HOO recombination of a dual-band stack.
    Composite,
}

/// An output file written into the working directory.
///
/// The file name may contain the host's integration-time token, which the
/// host expands when saving.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        match self.kind {
            ArtifactKind::Final => write!(f, "{name}"),
            ArtifactKind::Channel(line) => write!(f, "{name} ({line} channel)"),
            ArtifactKind::Composite => write!(f, "{name} (HOO composite)"),
        }
    }
}

/// Result of a successful preprocessing run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub artifacts: Vec<Artifact>,
    pub warnings: Vec<Warning>,
    pub cleanup: CleanupReport,
    pub log: Vec<LogEntry>,
    pub elapsed: Duration,
    /// Exposure summed from the signal-frame headers, when any had one.
    pub integration: Option<IntegrationEstimate>,
}

/// Headline of a successful run, sent with the terminal event.
pub trait Outcome {
    fn headline(&self) -> String;
}

impl Outcome for RunSummary {
    fn headline(&self) -> String {
        let mut headline = format!(
            "Processing complete! {} file(s) written in {:.1}s",
            self.artifacts.len(),
            self.elapsed.as_secs_f64()
        );
        if !self.warnings.is_empty() {
            headline.push_str(&format!(" ({} warning(s))", self.warnings.len()));
        }
        headline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert!(PipelineStage::Init < PipelineStage::Cleanup);
        assert!(PipelineStage::Stack < PipelineStage::ExtractOrCompose);
        assert!(PipelineStage::FinalCleanup < PipelineStage::Done);
    }

    #[test]
    fn test_headline_counts_warnings() {
        let summary = RunSummary {
            artifacts: vec![Artifact {
                kind: ArtifactKind::Final,
                path: PathBuf::from("/w/result.fit"),
            }],
            warnings: vec![Warning::Skipped("pcc".into())],
            cleanup: CleanupReport::default(),
            log: Vec::new(),
            elapsed: Duration::from_millis(1500),
            integration: None,
        };
        assert_eq!(
            summary.headline(),
            "Processing complete! 1 file(s) written in 1.5s (1 warning(s))"
        );
    }
}
