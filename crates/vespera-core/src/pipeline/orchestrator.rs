use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::{error, info};

use crate::config::Configuration;
use crate::consts::{MASTERS_DIR, PROCESS_DIR};
use crate::engine::HostEngine;
use crate::error::{Result, VesperaError};
use crate::io::fits::integration_estimate;
use crate::layout;
use crate::registry::Registry;

use super::driver::Driver;
use super::stages::{host_path, PipelineRun};
use super::types::{EventSink, NoOpSink, Outcome, PipelineStage, RunSummary, Severity};

/// Run the whole preprocessing sequence against `engine`.
///
/// Emits progress and log events but not the terminal `finished` event;
/// see [`report_outcome`] and [`run_pipeline_reported`].
pub fn execute(
    workdir: &Path,
    config: &Configuration,
    registry: &Registry,
    engine: &mut dyn HostEngine,
    sink: &dyn EventSink,
) -> Result<RunSummary> {
    let started = Instant::now();
    let resolved = config.resolve(registry)?;
    let layout = layout::resolve(workdir);
    if let Some(missing) = layout.missing() {
        return Err(VesperaError::MissingInput {
            missing,
            workdir: workdir.to_path_buf(),
        });
    }

    let mut driver = Driver::new(engine, sink);
    driver.info(format!("Working directory: {}", workdir.display()));
    driver.info(format!(
        "Filter: {} ({}), sky: {}, stacking: {}",
        resolved.filter.name, resolved.filter.kind, resolved.sky.name, resolved.stacking.name
    ));
    if resolved.feather > 0 || resolved.two_pass {
        driver.info(format!(
            "Feather: {} px, two-pass registration: {}",
            resolved.feather, resolved.two_pass
        ));
    }
    driver.info(format!(
        "Structure: {layout}, {} dark(s), {} light(s)",
        layout.dark_count(),
        layout.light_count()
    ));

    let estimate = integration_estimate(&layout.light_frames());
    let integration = (estimate.frames_with_exposure > 0).then_some(estimate);
    if let Some(estimate) = &integration {
        driver.info(format!(
            "Integration: {:.0}s over {} frame(s)",
            estimate.total_seconds, estimate.frames_with_exposure
        ));
    }
    info!(engine = driver.engine_name(), "Starting preprocessing");

    fs::create_dir_all(workdir.join(PROCESS_DIR))?;
    fs::create_dir_all(workdir.join(MASTERS_DIR))?;

    let mut run = PipelineRun::new(driver, workdir.to_path_buf(), layout, resolved);
    let outcome = run.drive();
    if outcome.is_err() {
        run.driver.enter(PipelineStage::Failed);
        run.driver.restore_directory(host_path(workdir));
    }
    outcome?;

    let PipelineRun {
        driver,
        artifacts,
        cleanup,
        ..
    } = run;
    let (log, warnings) = driver.into_records();
    Ok(RunSummary {
        artifacts,
        warnings,
        cleanup,
        log,
        elapsed: started.elapsed(),
        integration,
    })
}

/// Send the terminal event for a finished run.
pub fn report_outcome<T: Outcome>(sink: &dyn EventSink, outcome: &Result<T>) {
    match outcome {
        Ok(summary) => {
            let headline = summary.headline();
            info!("{headline}");
            sink.finished(true, &headline);
        }
        Err(e) => {
            // Stage failures were already logged with their command.
            if !matches!(e, VesperaError::StageExecution { .. }) {
                sink.log(&e.to_string(), Severity::Error);
            }
            error!(error = %e, "Run failed");
            sink.finished(false, &e.summary());
        }
    }
}

/// Run the pipeline and report its outcome to `sink`.
pub fn run_pipeline_reported(
    workdir: &Path,
    config: &Configuration,
    registry: &Registry,
    engine: &mut dyn HostEngine,
    sink: &dyn EventSink,
) -> Result<RunSummary> {
    let outcome = execute(workdir, config, registry, engine, sink);
    report_outcome(sink, &outcome);
    outcome
}

/// Run the pipeline without event reporting.
pub fn run_pipeline(
    workdir: &Path,
    config: &Configuration,
    registry: &Registry,
    engine: &mut dyn HostEngine,
) -> Result<RunSummary> {
    run_pipeline_reported(workdir, config, registry, engine, &NoOpSink)
}
