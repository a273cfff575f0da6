mod common;

use common::*;
use vespera_core::engine::Command;
use vespera_core::error::VesperaError;
use vespera_core::pipeline::PipelineStage;
use vespera_core::prep::{execute, BackgroundMethod, DenoiseMethod, PrepOptions};

fn image_dir() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::TempDir::new().unwrap();
    let image = dir.path().join("m42.tif");
    write_rgb_tiff(&image);
    (dir, image)
}

#[test]
fn test_full_prep_sequence() {
    let (dir, image) = image_dir();
    let engine = RecordingEngine::new();
    let sink = CollectingSink::default();
    let options = PrepOptions {
        background: BackgroundMethod::SirilRbf,
        plate_solve: true,
        color_calibration: true,
        denoise: DenoiseMethod::Silentium,
        launch_stretch: false,
    };

    let summary = execute(&image, &options, &mut engine.clone(), &sink).unwrap();

    assert_eq!(
        engine.lines(),
        vec![
            Command::Cd(path_arg(dir.path())).to_line(),
            "load m42.tif".into(),
            "subsky -rbf -samples=20 -tolerance=1 -smooth=0.5".into(),
            "platesolve".into(),
            "pcc -limitmag=12".into(),
            "pyscript VeraLux_Silentium.py".into(),
            "save m42_prep".into(),
        ]
    );
    assert_eq!(summary.steps_applied, 4);
    assert_eq!(sink.percents(), vec![0, 25, 50, 75, 100, 100]);
}

#[test]
fn test_plate_solve_failure_is_only_a_note() {
    let (_dir, image) = image_dir();
    let engine = RecordingEngine::failing_when(|c| *c == Command::PlateSolve);
    let options = PrepOptions {
        plate_solve: true,
        color_calibration: true,
        ..Default::default()
    };
    let summary = execute(&image, &options, &mut engine.clone(), &CollectingSink::default()).unwrap();
    assert_eq!(summary.notes.len(), 1);
    assert_eq!(summary.steps_applied, 1);
    assert_eq!(engine.count("save"), 1);
}

#[test]
fn test_denoise_failure_is_fatal() {
    let (_dir, image) = image_dir();
    let engine = RecordingEngine::failing_when(|c| c.name() == "pyscript");
    let options = PrepOptions {
        denoise: DenoiseMethod::CosmicClarity,
        ..Default::default()
    };
    let err = execute(&image, &options, &mut engine.clone(), &CollectingSink::default()).unwrap_err();
    assert!(matches!(
        err,
        VesperaError::StageExecution {
            stage: PipelineStage::PostProcess,
            ..
        }
    ));
    assert_eq!(engine.count("save"), 0);
}

#[test]
fn test_nothing_selected_makes_no_host_call() {
    let (_dir, image) = image_dir();
    let engine = RecordingEngine::new();
    let err = execute(
        &image,
        &PrepOptions::default(),
        &mut engine.clone(),
        &CollectingSink::default(),
    )
    .unwrap_err();
    assert!(matches!(err, VesperaError::Configuration(_)));
    assert!(engine.commands().is_empty());
}

#[test]
fn test_stretch_launch_failure_is_a_note() {
    let (_dir, image) = image_dir();
    let engine = RecordingEngine::failing_when(|c| {
        matches!(c, Command::PyScript { script, .. } if script.contains("Stretch"))
    });
    let options = PrepOptions {
        denoise: DenoiseMethod::Graxpert { strength: 0.5 },
        launch_stretch: true,
        ..Default::default()
    };
    let summary = execute(&image, &options, &mut engine.clone(), &CollectingSink::default()).unwrap();
    assert_eq!(summary.notes.len(), 1);
    assert!(engine
        .lines()
        .contains(&"pyscript GraXpert-AI.py -denoise -strength=0.5".to_string()));
}
