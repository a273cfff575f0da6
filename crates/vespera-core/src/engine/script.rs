use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{Command, EngineError, HostEngine};

/// Minimum host version the generated scripts are written for.
const REQUIRED_HOST_VERSION: &str = "1.4.0";

/// Dry-run engine: every command succeeds and is recorded.
///
/// Clones share the same buffer, so a handle kept by the caller sees the
/// commands issued by a worker that owns another clone.
#[derive(Clone, Default)]
pub struct ScriptWriter {
    commands: Arc<Mutex<Vec<Command>>>,
}

impl ScriptWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// The recorded commands as a host script.
    pub fn to_script(&self) -> String {
        let mut script = format!("requires {REQUIRED_HOST_VERSION}\n");
        for command in self.commands() {
            script.push_str(&command.to_line());
            script.push('\n');
        }
        script
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_script())
    }
}

impl HostEngine for ScriptWriter {
    fn name(&self) -> &str {
        "script writer (dry run)"
    }

    fn execute(&mut self, command: &Command) -> Result<(), EngineError> {
        debug!(command = %command, "Recording");
        self.commands
            .lock()
            .map_err(|_| EngineError::Unavailable("script buffer poisoned".into()))?
            .push(command.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_buffer() {
        let writer = ScriptWriter::new();
        let mut worker_side = writer.clone();
        worker_side.execute(&Command::Load("result".into())).unwrap();
        worker_side.execute(&Command::RemoveIccProfile).unwrap();
        assert_eq!(writer.commands().len(), 2);
        assert_eq!(writer.to_script(), "requires 1.4.0\nload result\nicc_remove\n");
    }
}
