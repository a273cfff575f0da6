//! Quick Prep: a short finishing pass over one already-stacked image.
//!
//! Load, then any of background extraction, plate solving, photometric
//! color calibration and denoising, then save next to the input. Plate
//! solving and the optional stretch launch are best-effort; every other
//! step failure aborts.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::consts::{BACKGROUND_SMOOTHING, PCC_LIMIT_MAGNITUDE};
use crate::engine::{Command, HostEngine};
use crate::error::{Result, VesperaError};
use crate::pipeline::driver::Driver;
use crate::pipeline::{EventSink, LogEntry, Outcome, PipelineStage, Severity};

/// Background samples used by the Siril RBF method in Quick Prep.
const PREP_BACKGROUND_SAMPLES: u32 = 20;
const PREP_BACKGROUND_TOLERANCE: f32 = 1.0;

const GRAXPERT_SCRIPT: &str = "GraXpert-AI.py";
const SILENTIUM_SCRIPT: &str = "VeraLux_Silentium.py";
const COSMIC_CLARITY_SCRIPT: &str = "CosmicClarity_Denoise.py";
const STRETCH_SCRIPT: &str = "VeraLux_HyperMetric_Stretch.py";

/// Suffix appended to the input file stem for the prepared image.
pub const PREP_OUTPUT_SUFFIX: &str = "_prep";

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum BackgroundMethod {
    #[default]
    None,
    SirilRbf,
    Graxpert { smoothing: f32 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum DenoiseMethod {
    #[default]
    None,
    Silentium,
    Graxpert { strength: f32 },
    CosmicClarity,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepOptions {
    pub background: BackgroundMethod,
    pub plate_solve: bool,
    pub color_calibration: bool,
    pub denoise: DenoiseMethod,
    /// Hand the result to the stretch script once saved.
    pub launch_stretch: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PrepStep {
    Background(BackgroundMethod),
    PlateSolve,
    ColorCalibrate,
    Denoise(DenoiseMethod),
}

impl PrepStep {
    fn label(self) -> String {
        match self {
            Self::Background(_) => "Extracting background".into(),
            Self::PlateSolve => "Plate solving".into(),
            Self::ColorCalibrate => "Color calibrating".into(),
            Self::Denoise(method) => format!("Denoising ({})", denoise_name(method)),
        }
    }

    fn command(self) -> Option<Command> {
        let command = match self {
            Self::Background(BackgroundMethod::None) | Self::Denoise(DenoiseMethod::None) => {
                return None
            }
            Self::Background(BackgroundMethod::SirilRbf) => Command::SubtractBackground {
                samples: PREP_BACKGROUND_SAMPLES,
                tolerance: PREP_BACKGROUND_TOLERANCE,
                smooth: BACKGROUND_SMOOTHING,
            },
            Self::Background(BackgroundMethod::Graxpert { smoothing }) => Command::PyScript {
                script: GRAXPERT_SCRIPT.into(),
                args: vec!["-bge".into(), format!("-smoothing={smoothing}")],
            },
            Self::PlateSolve => Command::PlateSolve,
            Self::ColorCalibrate => Command::ColorCalibrate {
                limit_magnitude: PCC_LIMIT_MAGNITUDE,
            },
            Self::Denoise(DenoiseMethod::Silentium) => Command::PyScript {
                script: SILENTIUM_SCRIPT.into(),
                args: Vec::new(),
            },
            Self::Denoise(DenoiseMethod::Graxpert { strength }) => Command::PyScript {
                script: GRAXPERT_SCRIPT.into(),
                args: vec!["-denoise".into(), format!("-strength={strength}")],
            },
            Self::Denoise(DenoiseMethod::CosmicClarity) => Command::PyScript {
                script: COSMIC_CLARITY_SCRIPT.into(),
                args: Vec::new(),
            },
        };
        Some(command)
    }
}

fn denoise_name(method: DenoiseMethod) -> &'static str {
    match method {
        DenoiseMethod::None => "none",
        DenoiseMethod::Silentium => "silentium",
        DenoiseMethod::Graxpert { .. } => "graxpert",
        DenoiseMethod::CosmicClarity => "cosmic",
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(VesperaError::Configuration(format!(
            "{name} must be between 0 and 1 (got {value})"
        )))
    }
}

impl PrepOptions {
    fn steps(&self) -> Result<Vec<PrepStep>> {
        if let BackgroundMethod::Graxpert { smoothing } = self.background {
            check_unit("background smoothing", smoothing)?;
        }
        if let DenoiseMethod::Graxpert { strength } = self.denoise {
            check_unit("denoise strength", strength)?;
        }

        let mut steps = Vec::new();
        if self.background != BackgroundMethod::None {
            steps.push(PrepStep::Background(self.background));
        }
        if self.plate_solve {
            steps.push(PrepStep::PlateSolve);
        }
        if self.color_calibration {
            steps.push(PrepStep::ColorCalibrate);
        }
        if self.denoise != DenoiseMethod::None {
            steps.push(PrepStep::Denoise(self.denoise));
        }
        if steps.is_empty() {
            return Err(VesperaError::Configuration(
                "no Quick Prep step selected".into(),
            ));
        }
        Ok(steps)
    }
}

/// Result of a successful Quick Prep run.
#[derive(Clone, Debug, PartialEq)]
pub struct PrepSummary {
    pub output: PathBuf,
    pub steps_applied: usize,
    /// Best-effort steps that did not succeed.
    pub notes: Vec<String>,
    pub log: Vec<LogEntry>,
    pub elapsed: Duration,
}

impl Outcome for PrepSummary {
    fn headline(&self) -> String {
        let name = self
            .output
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        format!("Image prepared successfully! Saved {name}")
    }
}

/// `<dir>/<stem>_prep`, the host save target for `image`.
pub fn output_path(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    image.with_file_name(format!("{stem}{PREP_OUTPUT_SUFFIX}"))
}

/// Run Quick Prep on `image`. Emits progress and log events; the terminal
/// event is left to the caller.
pub fn execute(
    image: &Path,
    options: &PrepOptions,
    engine: &mut dyn HostEngine,
    sink: &dyn EventSink,
) -> Result<PrepSummary> {
    let started = Instant::now();
    let steps = options.steps()?;
    if !image.is_file() {
        return Err(VesperaError::Configuration(format!(
            "image not found: {}",
            image.display()
        )));
    }
    let file_name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output = output_path(image);
    let output_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut driver = Driver::new(engine, sink);
    driver.enter(PipelineStage::PostProcess);
    driver.progress(0, &format!("Loading {file_name}"));
    if let Some(dir) = image.parent().filter(|d| !d.as_os_str().is_empty()) {
        driver.exec(Command::Cd(dir.to_string_lossy().into_owned()))?;
    }
    driver.exec(Command::Load(file_name))?;

    let total = steps.len();
    let mut notes = Vec::new();
    let mut applied = 0;
    for (index, step) in steps.iter().copied().enumerate() {
        let percent = ((index + 1) * 100 / total) as u8;
        let label = step.label();
        driver.progress(percent, &format!("{label}..."));
        let Some(command) = step.command() else {
            continue;
        };
        if step == PrepStep::PlateSolve {
            // Already-solved or star-poor images fail here; keep going.
            if let Err(e) = driver.try_exec(command) {
                let note = format!("Plate solve note: {e}");
                driver.log(Severity::Info, note.clone());
                notes.push(note);
                continue;
            }
        } else {
            driver.exec(command)?;
        }
        applied += 1;
        driver.success(format!("{label} done"));
    }

    driver.exec(Command::Save(output_name))?;
    driver.success(format!("Saved {}", output.display()));

    if options.launch_stretch {
        let stretch = Command::PyScript {
            script: STRETCH_SCRIPT.into(),
            args: Vec::new(),
        };
        if let Err(e) = driver.try_exec(stretch) {
            let note = format!("Could not launch the stretch script: {e}");
            driver.log(Severity::Info, note.clone());
            notes.push(note);
        }
    }

    driver.enter(PipelineStage::Done);
    driver.progress(100, "Complete!");
    let (log, _) = driver.into_records();
    Ok(PrepSummary {
        output,
        steps_applied: applied,
        notes,
        log,
        elapsed: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_selected_is_rejected() {
        let err = PrepOptions::default().steps().unwrap_err();
        assert!(matches!(err, VesperaError::Configuration(_)));
    }

    #[test]
    fn test_step_order_and_commands() {
        let options = PrepOptions {
            background: BackgroundMethod::Graxpert { smoothing: 0.1 },
            plate_solve: true,
            color_calibration: true,
            denoise: DenoiseMethod::Graxpert { strength: 0.5 },
            launch_stretch: false,
        };
        let lines: Vec<String> = options
            .steps()
            .unwrap()
            .into_iter()
            .filter_map(PrepStep::command)
            .map(|c| c.to_line())
            .collect();
        assert_eq!(
            lines,
            vec![
                "pyscript GraXpert-AI.py -bge -smoothing=0.1",
                "platesolve",
                "pcc -limitmag=12",
                "pyscript GraXpert-AI.py -denoise -strength=0.5",
            ]
        );
    }

    #[test]
    fn test_strength_out_of_range() {
        let options = PrepOptions {
            denoise: DenoiseMethod::Graxpert { strength: 1.5 },
            ..Default::default()
        };
        assert!(options.steps().is_err());
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/data/m42.tif")),
            PathBuf::from("/data/m42_prep")
        );
    }
}
