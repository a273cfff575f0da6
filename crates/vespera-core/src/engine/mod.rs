//! The host image-processing engine seam.
//!
//! The orchestrator never touches pixels; it issues [`Command`]s to a
//! [`HostEngine`], one blocking call at a time.

mod command;
pub mod script;
pub mod siril;

use thiserror::Error;

pub use command::{Command, Framing, Normalization, StackParams};
pub use script::ScriptWriter;
pub use siril::{SirilPipe, SirilPipeOptions};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("`{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("host engine unavailable: {0}")]
    Unavailable(String),

    #[error("host engine exited while running `{0}`")]
    Exited(String),

    #[error("host engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A host engine executing named operations.
///
/// Each call either fully succeeds or returns an error; there is no partial
/// success.
pub trait HostEngine: Send {
    /// Human-readable engine name, for logs.
    fn name(&self) -> &str;

    fn execute(&mut self, command: &Command) -> Result<(), EngineError>;
}

impl<E: HostEngine + ?Sized> HostEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&mut self, command: &Command) -> Result<(), EngineError> {
        (**self).execute(command)
    }
}
