//! Siril driven through its named-pipe command interface (`siril-cli -p`).
//!
//! Commands are written one per line to the command pipe. Siril answers on
//! the result pipe with `status: starting <cmd>`, interleaved `log:` and
//! `progress:` lines, and finally `status: success <cmd>` or
//! `status: error <cmd>`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command as Process, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{Command, EngineError, HostEngine};

const PIPE_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct SirilPipeOptions {
    pub executable: PathBuf,
    pub command_pipe: PathBuf,
    pub result_pipe: PathBuf,
    /// How long to wait for Siril to create its pipes.
    pub startup_timeout: Duration,
}

impl Default for SirilPipeOptions {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("siril-cli"),
            command_pipe: PathBuf::from("/tmp/siril_command.in"),
            result_pipe: PathBuf::from("/tmp/siril_command.out"),
            startup_timeout: Duration::from_secs(15),
        }
    }
}

/// One line of Siril's result pipe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Reply {
    Ready,
    Starting,
    Success,
    Error,
    Exit,
    Log(String),
    Progress(String),
    Other(String),
}

pub(crate) fn parse_reply(line: &str) -> Reply {
    let line = line.trim_end();
    if line == "ready" {
        return Reply::Ready;
    }
    if let Some(status) = line.strip_prefix("status: ") {
        let word = status.split_whitespace().next().unwrap_or("");
        return match word {
            "starting" => Reply::Starting,
            "success" => Reply::Success,
            "error" => Reply::Error,
            "exit" => Reply::Exit,
            _ => Reply::Other(line.to_string()),
        };
    }
    if let Some(msg) = line.strip_prefix("log: ") {
        return Reply::Log(msg.to_string());
    }
    if let Some(p) = line.strip_prefix("progress: ") {
        return Reply::Progress(p.to_string());
    }
    Reply::Other(line.to_string())
}

/// Remove pipes left behind by an earlier Siril process. Siril creates
/// fresh ones on startup, and the existence poll must only see those.
fn remove_stale_pipes(paths: &[&Path]) -> Result<(), EngineError> {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => debug!(pipe = %path.display(), "Removed stale siril pipe"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(EngineError::Unavailable(format!(
                    "could not remove stale pipe {}: {e}",
                    path.display()
                )))
            }
        }
    }
    Ok(())
}

pub struct SirilPipe {
    child: Child,
    commands: File,
    results: BufReader<File>,
}

impl SirilPipe {
    /// Start `siril-cli` in pipe mode and connect to both pipes.
    pub fn launch(options: &SirilPipeOptions) -> Result<Self, EngineError> {
        remove_stale_pipes(&[&options.command_pipe, &options.result_pipe])?;
        let mut child = Process::new(&options.executable)
            .arg("-p")
            .arg("-r")
            .arg(&options.command_pipe)
            .arg("-w")
            .arg(&options.result_pipe)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| {
                EngineError::Unavailable(format!(
                    "could not start {}: {e}",
                    options.executable.display()
                ))
            })?;

        let deadline = Instant::now() + options.startup_timeout;
        while !(options.command_pipe.exists() && options.result_pipe.exists()) {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(EngineError::Unavailable(format!(
                    "siril exited during startup ({status})"
                )));
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                return Err(EngineError::Unavailable(
                    "timed out waiting for siril pipes".into(),
                ));
            }
            std::thread::sleep(PIPE_POLL_INTERVAL);
        }

        // Opening a FIFO blocks until the peer opens the other end, and the
        // order Siril opens its ends in is not fixed: open ours concurrently.
        let result_path = options.result_pipe.clone();
        let reader = std::thread::spawn(move || File::open(result_path));
        let commands = OpenOptions::new().write(true).open(&options.command_pipe)?;
        let results = reader
            .join()
            .map_err(|_| EngineError::Unavailable("result pipe opener panicked".into()))??;

        info!(executable = %options.executable.display(), "Connected to siril");
        Ok(Self {
            child,
            commands,
            results: BufReader::new(results),
        })
    }

    fn await_status(&mut self, command: &Command) -> Result<(), EngineError> {
        let mut last_log = None;
        let mut line = String::new();
        loop {
            line.clear();
            if self.results.read_line(&mut line)? == 0 {
                return Err(EngineError::Exited(command.to_line()));
            }
            match parse_reply(&line) {
                Reply::Success => return Ok(()),
                Reply::Error => {
                    return Err(EngineError::CommandFailed {
                        command: command.to_line(),
                        message: last_log.unwrap_or_else(|| "no details reported".into()),
                    })
                }
                Reply::Exit => return Err(EngineError::Exited(command.to_line())),
                Reply::Log(msg) => {
                    debug!(target: "siril", "{msg}");
                    last_log = Some(msg);
                }
                Reply::Progress(p) => debug!(target: "siril", progress = %p),
                Reply::Ready | Reply::Starting | Reply::Other(_) => {}
            }
        }
    }
}

impl HostEngine for SirilPipe {
    fn name(&self) -> &str {
        "siril"
    }

    fn execute(&mut self, command: &Command) -> Result<(), EngineError> {
        debug!(command = %command, "Sending to siril");
        writeln!(self.commands, "{}", command.to_line())?;
        self.commands.flush()?;
        self.await_status(command)
    }
}

impl Drop for SirilPipe {
    fn drop(&mut self) {
        if writeln!(self.commands, "exit").is_err() {
            warn!("Could not ask siril to exit");
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
