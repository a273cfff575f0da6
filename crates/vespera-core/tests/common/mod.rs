#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};

use tempfile::TempDir;
use vespera_core::engine::{Command, EngineError, HostEngine};
use vespera_core::pipeline::{EventSink, PipelineEvent, Severity};

const FITS_BLOCK: usize = 2880;

type FailWhen = Arc<dyn Fn(&Command) -> bool + Send + Sync>;

/// Mock host engine recording every command. Clones share the record, so a
/// test can keep one clone while the pipeline owns another.
#[derive(Clone)]
pub struct RecordingEngine {
    commands: Arc<Mutex<Vec<Command>>>,
    fail_when: Option<FailWhen>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            commands: Arc::new(Mutex::new(Vec::new())),
            fail_when: None,
        }
    }

    /// Fail every command for which `predicate` returns true.
    pub fn failing_when(predicate: impl Fn(&Command) -> bool + Send + Sync + 'static) -> Self {
        Self {
            commands: Arc::new(Mutex::new(Vec::new())),
            fail_when: Some(Arc::new(predicate)),
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.commands().iter().map(|c| c.to_line()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.commands().iter().filter(|c| c.name() == name).count()
    }
}

impl HostEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn execute(&mut self, command: &Command) -> Result<(), EngineError> {
        self.commands.lock().unwrap().push(command.clone());
        match &self.fail_when {
            Some(fail) if fail(command) => Err(EngineError::CommandFailed {
                command: command.to_line(),
                message: "simulated failure".into(),
            }),
            _ => Ok(()),
        }
    }
}

/// Engine that blocks on its first command until the gate is opened (or
/// the opener is dropped).
pub struct GatedEngine {
    gate: Option<mpsc::Receiver<()>>,
}

impl GatedEngine {
    pub fn new() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (Self { gate: Some(rx) }, tx)
    }
}

impl HostEngine for GatedEngine {
    fn name(&self) -> &str {
        "gated"
    }

    fn execute(&mut self, _command: &Command) -> Result<(), EngineError> {
        if let Some(gate) = self.gate.take() {
            let _ = gate.recv();
        }
        Ok(())
    }
}

/// Sink keeping every event in order.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::Progress { percent, .. } => Some(percent),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Vec<(bool, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::Finished { success, summary } => Some((success, summary)),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::Log {
                    message,
                    severity: Severity::Warning,
                } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn progress(&self, percent: u8, message: &str) {
        self.events.lock().unwrap().push(PipelineEvent::Progress {
            percent,
            message: message.to_string(),
        });
    }

    fn log(&self, message: &str, severity: Severity) {
        self.events.lock().unwrap().push(PipelineEvent::Log {
            message: message.to_string(),
            severity,
        });
    }

    fn finished(&self, success: bool, summary: &str) {
        self.events.lock().unwrap().push(PipelineEvent::Finished {
            success,
            summary: summary.to_string(),
        });
    }
}

/// Minimal FITS file: one header block with an optional EXPTIME card.
pub fn write_fits(path: &Path, exposure: Option<f64>) {
    let exptime = exposure.map(|seconds| format!("EXPTIME = {seconds:>20.1}"));
    let extra: Vec<&str> = exptime.iter().map(String::as_str).collect();
    write_fits_with_cards(path, &extra);
}

/// FITS header block with `extra` cards after the mandatory ones. Each card
/// is padded to 80 bytes, not 80 characters.
pub fn write_fits_with_cards(path: &Path, extra: &[&str]) {
    let mut cards = vec![
        "SIMPLE  =                    T",
        "BITPIX  =                   16",
        "NAXIS   =                    0",
    ];
    cards.extend_from_slice(extra);
    cards.push("END");

    let mut bytes: Vec<u8> = Vec::with_capacity(FITS_BLOCK);
    for card in cards {
        let mut record = card.as_bytes().to_vec();
        record.resize(80, b' ');
        bytes.extend(record);
    }
    bytes.resize(FITS_BLOCK, b' ');
    fs::write(path, bytes).unwrap();
}

pub fn write_rgb_tiff(path: &Path) {
    image::RgbImage::new(4, 4).save(path).unwrap();
}

pub fn write_gray_tiff(path: &Path) {
    image::GrayImage::new(4, 4).save(path).unwrap();
}

/// `darks/` and `lights/` with the given frame counts. Lights carry a 10 s
/// exposure.
pub fn organized_workdir(darks: usize, lights: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    let darks_dir = dir.path().join("darks");
    let lights_dir = dir.path().join("lights");
    fs::create_dir(&darks_dir).unwrap();
    fs::create_dir(&lights_dir).unwrap();
    for i in 1..=darks {
        write_fits(&darks_dir.join(format!("dark_{i:04}.fit")), Some(10.0));
    }
    for i in 1..=lights {
        write_fits(&lights_dir.join(format!("light_{i:04}.fit")), Some(10.0));
    }
    dir
}

/// Telescope-native capture: `*-dark*` frames in the root and signal frames
/// plus TIFF renders in `01-images-initial/`.
pub fn native_workdir(darks: usize, lights: usize, rgb_tiffs: usize, gray_tiffs: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    let lights_dir = dir.path().join("01-images-initial");
    fs::create_dir(&lights_dir).unwrap();
    for i in 1..=darks {
        write_fits(&dir.path().join(format!("m42-dark-{i:04}.fits")), Some(10.0));
    }
    for i in 1..=lights {
        write_fits(&lights_dir.join(format!("m42-{i:04}.fits")), Some(10.0));
    }
    for i in 1..=rgb_tiffs {
        write_rgb_tiff(&lights_dir.join(format!("m42-{i:04}.tif")));
    }
    for i in 1..=gray_tiffs {
        write_gray_tiff(&lights_dir.join(format!("m42-mono-{i:04}.tiff")));
    }
    dir
}

pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub fn artifact_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}
