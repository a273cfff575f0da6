use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;
use crate::pipeline::PipelineStage;

/// Which input frames could not be found in the working directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingFrames {
    Darks,
    Lights,
    Both,
    /// Darks and lights exist, but each in a different layout.
    MixedLayouts,
}

impl MissingFrames {
    /// Classify a pair of frame counts. `None` when both sets are present.
    pub fn from_counts(dark_count: usize, light_count: usize) -> Option<Self> {
        match (dark_count, light_count) {
            (0, 0) => Some(Self::Both),
            (0, _) => Some(Self::Darks),
            (_, 0) => Some(Self::Lights),
            _ => None,
        }
    }
}

impl fmt::Display for MissingFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Darks => write!(f, "dark frames"),
            Self::Lights => write!(f, "light frames"),
            Self::Both => write!(f, "dark or light frames"),
            Self::MixedLayouts => write!(
                f,
                "dark and light frames in the same layout (use darks/ with lights/, or *-dark files with 01-images-initial/)"
            ),
        }
    }
}

#[derive(Error, Debug)]
pub enum VesperaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No {missing} found in {}", workdir.display())]
    MissingInput {
        missing: MissingFrames,
        workdir: PathBuf,
    },

    #[error("{stage} failed at `{command}`: {reason}")]
    StageExecution {
        stage: PipelineStage,
        command: String,
        reason: String,
    },

    #[error("Host engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("A pipeline run is already active")]
    RunInProgress,

    #[error("Pipeline worker panicked")]
    WorkerPanicked,

    #[error("Invalid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization failed: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Image probe error: {0}")]
    Image(#[from] image::ImageError),
}

impl VesperaError {
    /// Short, user-facing message for the terminal `finished` event.
    ///
    /// Stage failures keep the command and host reason out of the summary;
    /// those are already in the log stream.
    pub fn summary(&self) -> String {
        match self {
            Self::StageExecution { stage, .. } => {
                format!("Processing failed during {stage}. See log for details.")
            }
            other => format!("Processing failed: {other}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, VesperaError>;

/// Non-fatal outcomes. They are logged as warnings and counted, but never
/// abort a run.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    /// An optional post-processing step failed.
    PostProcess { step: String, reason: String },
    /// A temporary file or folder could not be removed.
    Cleanup { path: PathBuf, reason: String },
    /// The dual-band composite could not be built.
    Composition(String),
    /// A reference image could not be relocated.
    Relocation { file: String, reason: String },
    /// A step was skipped because it does not apply.
    Skipped(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostProcess { step, reason } => write!(f, "{step} warning: {reason}"),
            Self::Cleanup { path, reason } => {
                write!(f, "Could not remove {}: {reason}", path.display())
            }
            Self::Composition(reason) => write!(f, "HOO composite note: {reason}"),
            Self::Relocation { file, reason } => write!(f, "Could not move {file}: {reason}"),
            Self::Skipped(reason) => write!(f, "Skipped: {reason}"),
        }
    }
}
