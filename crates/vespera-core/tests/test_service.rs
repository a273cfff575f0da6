mod common;

use std::sync::Arc;

use common::*;
use vespera_core::config::Configuration;
use vespera_core::error::VesperaError;
use vespera_core::pipeline::PipelineEvent;
use vespera_core::prep::{BackgroundMethod, PrepOptions};
use vespera_core::registry::Registry;
use vespera_core::service::PipelineService;

fn service() -> PipelineService {
    PipelineService::new(Arc::new(Registry::builtin()))
}

#[test]
fn test_events_arrive_in_order_and_finish_once() {
    let dir = organized_workdir(2, 2);
    let handle = service()
        .start(
            dir.path().to_path_buf(),
            Configuration::default(),
            Box::new(RecordingEngine::new()),
        )
        .unwrap();

    let mut events = Vec::new();
    let summary = handle.wait_with(|e| events.push(e)).unwrap();

    assert_eq!(summary.artifacts.len(), 1);
    let finished: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::Finished { .. }))
        .collect();
    assert_eq!(finished.len(), 1);
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::Finished { success: true, .. })
    ));
    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_malformed_header_card_does_not_kill_the_worker() {
    let dir = organized_workdir(2, 1);
    write_fits_with_cards(
        &dir.path().join("lights/light_0002.fit"),
        &["OBSERVA\u{e9}=   1", "EXPTIME =                 10.0"],
    );
    let handle = service()
        .start(
            dir.path().to_path_buf(),
            Configuration::default(),
            Box::new(RecordingEngine::new()),
        )
        .unwrap();

    let mut events = Vec::new();
    let summary = handle.wait_with(|e| events.push(e)).unwrap();
    let integration = summary.integration.unwrap();
    assert_eq!(integration.frames_with_exposure, 2);
    assert_eq!(integration.total_seconds, 20.0);
    let finished = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::Finished { success: true, .. }))
        .count();
    assert_eq!(finished, 1);
}

#[test]
fn test_second_start_is_rejected_while_running() {
    let dir = organized_workdir(2, 2);
    let service = service();
    let (engine, gate) = GatedEngine::new();
    let handle = service
        .start(dir.path().to_path_buf(), Configuration::default(), Box::new(engine))
        .unwrap();
    assert!(service.is_running());

    let second = service.start(
        dir.path().to_path_buf(),
        Configuration::default(),
        Box::new(RecordingEngine::new()),
    );
    assert!(matches!(second, Err(VesperaError::RunInProgress)));

    gate.send(()).unwrap();
    handle.join().unwrap();
    assert!(!service.is_running());

    // The slot is free again once the first run is over.
    let third = service
        .start(
            dir.path().to_path_buf(),
            Configuration::default(),
            Box::new(RecordingEngine::new()),
        )
        .unwrap();
    third.join().unwrap();
}

#[test]
fn test_failed_run_reports_failure_and_frees_slot() {
    let dir = tempfile::TempDir::new().unwrap();
    let service = service();
    let handle = service
        .start(
            dir.path().to_path_buf(),
            Configuration::default(),
            Box::new(RecordingEngine::new()),
        )
        .unwrap();

    let mut events = Vec::new();
    let err = handle.wait_with(|e| events.push(e)).unwrap_err();
    assert!(matches!(err, VesperaError::MissingInput { .. }));
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::Finished { success: false, .. })
    ));
    assert!(!service.is_running());
}

#[test]
fn test_prep_runs_through_the_service() {
    let dir = tempfile::TempDir::new().unwrap();
    let image = dir.path().join("m42.tif");
    write_rgb_tiff(&image);
    let engine = RecordingEngine::new();
    let options = PrepOptions {
        background: BackgroundMethod::SirilRbf,
        ..Default::default()
    };

    let summary = service()
        .start_prep(image, options, Box::new(engine.clone()))
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(summary.output, dir.path().join("m42_prep"));
    assert_eq!(engine.count("subsky"), 1);
}
