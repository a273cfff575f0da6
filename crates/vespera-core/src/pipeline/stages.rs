use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ResolvedConfig;
use crate::consts::{
    checkpoint, CALIBRATED_PREFIX, DARK_SEQUENCE, LIGHT_SEQUENCE, MASTERS_DIR, MASTER_DARK_NAME,
    NATIVE_DARK_STAGING_DIR, ORGANIZED_DARKS_DIR, PROCESS_DIR, REFERENCE_DIR, REGISTERED_PREFIX,
    STACK_RESULT_NAME,
};
use crate::engine::{Command, Framing, Normalization, StackParams};
use crate::error::Result;
use crate::io::frames::{clean_scratch_dir, is_frame_file, list_files, CleanupReport};
use crate::layout::{relocate_reference_images, relocate_stray_darks, InputLayout};

use super::driver::Driver;
use super::types::{Artifact, PipelineStage};

/// Host path argument for a local path.
pub(crate) fn host_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Mutable state of one preprocessing run. Owned by the orchestrator and
/// dropped when the run ends.
pub(crate) struct PipelineRun<'a> {
    pub(crate) driver: Driver<'a>,
    pub(crate) workdir: PathBuf,
    pub(crate) layout: InputLayout,
    pub(crate) config: ResolvedConfig,
    /// Name of the current signal sequence; grows a prefix per host stage.
    pub(crate) sequence: String,
    pub(crate) artifacts: Vec<Artifact>,
    /// Host save target (relative to the working directory) of the artifact
    /// post-processing acts on.
    pub(crate) final_target: Option<String>,
    pub(crate) cleanup: CleanupReport,
}

impl<'a> PipelineRun<'a> {
    pub(crate) fn new(
        driver: Driver<'a>,
        workdir: PathBuf,
        layout: InputLayout,
        config: ResolvedConfig,
    ) -> Self {
        Self {
            driver,
            workdir,
            layout,
            config,
            sequence: LIGHT_SEQUENCE.to_string(),
            artifacts: Vec::new(),
            final_target: None,
            cleanup: CleanupReport::default(),
        }
    }

    /// Every stage after Init, in order.
    pub(crate) fn drive(&mut self) -> Result<()> {
        self.driver.exec(Command::Cd(host_path(&self.workdir)))?;
        self.clean_temporary(PipelineStage::Cleanup, checkpoint::CLEANUP);
        self.prepare_master_dark()?;
        self.convert_lights()?;
        self.calibrate()?;
        self.register()?;
        self.stack()?;
        self.extract()?;
        self.post_process();
        self.clean_temporary(PipelineStage::FinalCleanup, checkpoint::FINAL_CLEANUP);

        self.driver.enter(PipelineStage::Done);
        self.driver.progress(checkpoint::DONE, "Processing complete");
        Ok(())
    }

    pub(crate) fn scratch_dir(&self, name: &str) -> PathBuf {
        self.workdir.join(name)
    }

    pub(crate) fn record_cleanup(&mut self, report: CleanupReport) {
        for warning in report.warnings.iter().cloned() {
            self.driver.warn(warning);
        }
        self.cleanup.merge(report);
    }

    fn clean_temporary(&mut self, stage: PipelineStage, percent: u8) {
        self.driver.enter(stage);
        self.driver.progress(percent, "Cleaning temporary files");
        if self.config.keep_temp_files {
            self.driver.info("Keeping temporary files");
            return;
        }
        let mut report = clean_scratch_dir(&self.scratch_dir(PROCESS_DIR));
        report.merge(clean_scratch_dir(&self.scratch_dir(MASTERS_DIR)));
        let (removed, failed) = (report.removed, report.failed);
        self.record_cleanup(report);
        self.driver
            .info(format!("Cleanup: {removed} item(s) removed, {failed} failed"));
    }

    fn prepare_master_dark(&mut self) -> Result<()> {
        self.driver.enter(PipelineStage::PrepareCalibrationMaster);
        let count = self.layout.dark_count();
        self.driver.progress(
            checkpoint::CALIBRATION_MASTER,
            &format!("Preparing master dark from {count} frame(s)"),
        );
        let master = format!("{MASTERS_DIR}/{MASTER_DARK_NAME}");

        // A single dark is the master as-is: stacking one frame is not
        // meaningful for the host.
        if count == 1 {
            let source = match &self.layout {
                InputLayout::Organized { darks_dir, .. } => list_files(darks_dir, is_frame_file)
                    .first()
                    .and_then(|p| p.file_name())
                    .map(|n| format!("{ORGANIZED_DARKS_DIR}/{}", n.to_string_lossy())),
                InputLayout::Native { dark_files, .. } => dark_files
                    .first()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned()),
                InputLayout::Unresolved { .. } => None,
            };
            let source = source.unwrap_or_default();
            self.driver.exec(Command::Load(source))?;
            self.driver.exec(Command::Save(master))?;
            self.driver.success("Single dark frame used as master dark");
            return Ok(());
        }

        let native_darks = match &self.layout {
            InputLayout::Native { dark_files, .. } => Some(dark_files.clone()),
            _ => None,
        };
        let (source_dir, out_dir, back_to_masters) = match native_darks {
            Some(dark_files) => {
                self.stage_native_darks(&dark_files)?;
                (format!("{MASTERS_DIR}/{NATIVE_DARK_STAGING_DIR}"), "..", "..")
            }
            None => (ORGANIZED_DARKS_DIR.to_string(), "../masters", "../masters"),
        };
        self.driver.exec(Command::Cd(source_dir))?;
        self.driver.exec(Command::Convert {
            base: DARK_SEQUENCE.into(),
            out_dir: Some(out_dir.into()),
        })?;
        self.driver.exec(Command::Cd(back_to_masters.into()))?;
        self.driver.exec(Command::Stack(StackParams {
            sequence: DARK_SEQUENCE.into(),
            sigma_low: self.config.sky.sigma_low,
            sigma_high: self.config.sky.sigma_high,
            normalization: Normalization::None,
            linear_output: false,
            feather: None,
            output: MASTER_DARK_NAME.into(),
        }))?;
        self.driver.exec(Command::Cd("..".into()))?;
        self.driver
            .success(format!("Master dark stacked from {count} frames"));
        Ok(())
    }

    /// Copy native darks into their own folder so conversion only sees them.
    fn stage_native_darks(&mut self, dark_files: &[PathBuf]) -> Result<()> {
        let staging = self.scratch_dir(MASTERS_DIR).join(NATIVE_DARK_STAGING_DIR);
        fs::create_dir_all(&staging)?;
        for file in dark_files {
            if let Some(name) = file.file_name() {
                fs::copy(file, staging.join(name))?;
            }
        }
        self.driver.info(format!(
            "Staged {} dark frames in {MASTERS_DIR}/{NATIVE_DARK_STAGING_DIR}",
            dark_files.len()
        ));
        Ok(())
    }

    fn convert_lights(&mut self) -> Result<()> {
        self.driver.enter(PipelineStage::ConvertSignalFrames);
        self.driver
            .progress(checkpoint::CONVERT, "Converting light frames");

        if let InputLayout::Native {
            reference_images,
            lights_dir,
            ..
        } = &self.layout
        {
            let lights_dir = lights_dir.clone();
            let references = relocate_reference_images(&self.workdir, reference_images);
            if !references.moved.is_empty() {
                self.driver.info(format!(
                    "Moved {} reference image(s) to {REFERENCE_DIR}/ ({} single-channel)",
                    references.moved.len(),
                    references.single_channel.len()
                ));
            }
            let darks = relocate_stray_darks(&self.workdir, &lights_dir);
            if !darks.moved.is_empty() {
                self.driver.info(format!(
                    "Moved {} dark frame(s) out of the light frames",
                    darks.moved.len()
                ));
            }
            for warning in references.warnings.into_iter().chain(darks.warnings) {
                self.driver.warn(warning);
            }
        }

        let lights = self
            .layout
            .lights_dir()
            .and_then(|d| d.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.driver.exec(Command::Cd(lights))?;
        self.driver.exec(Command::Convert {
            base: LIGHT_SEQUENCE.into(),
            out_dir: Some(format!("../{PROCESS_DIR}")),
        })?;
        self.driver.exec(Command::Cd(format!("../{PROCESS_DIR}")))?;
        self.sequence = LIGHT_SEQUENCE.to_string();
        let count = self.layout.light_count();
        self.driver
            .success(format!("Converted {count} light frames into sequence '{}'", self.sequence));
        Ok(())
    }

    fn calibrate(&mut self) -> Result<()> {
        self.driver.enter(PipelineStage::Calibrate);
        self.driver
            .progress(checkpoint::CALIBRATE, "Calibrating light frames");
        let debayer = !self.config.stacking.use_drizzle();
        self.driver.exec(Command::Calibrate {
            sequence: self.sequence.clone(),
            dark: format!("../{MASTERS_DIR}/{MASTER_DARK_NAME}"),
            debayer,
        })?;
        self.sequence = format!("{CALIBRATED_PREFIX}{}", self.sequence);
        Ok(())
    }

    fn register(&mut self) -> Result<()> {
        self.driver.enter(PipelineStage::Register);
        let drizzle = self.config.stacking.drizzle.clone();
        let message = match &drizzle {
            Some(d) => format!("Registering with drizzle (x{}, {} kernel)", d.scale, d.kernel),
            None => "Registering".to_string(),
        };
        self.driver.progress(checkpoint::REGISTER, &message);

        if self.config.two_pass {
            self.driver.exec(Command::Register {
                sequence: self.sequence.clone(),
                drizzle: None,
                two_pass: true,
            })?;
            self.driver.exec(Command::ApplyRegistration {
                sequence: self.sequence.clone(),
                drizzle,
                framing: Framing::Max,
            })?;
        } else {
            self.driver.exec(Command::Register {
                sequence: self.sequence.clone(),
                drizzle,
                two_pass: false,
            })?;
        }
        self.sequence = format!("{REGISTERED_PREFIX}{}", self.sequence);
        Ok(())
    }

    fn stack(&mut self) -> Result<()> {
        self.driver.enter(PipelineStage::Stack);
        self.driver.progress(checkpoint::STACK, "Stacking");
        let feather = (self.config.feather > 0).then_some(self.config.feather);
        self.driver.exec(Command::Stack(StackParams {
            sequence: self.sequence.clone(),
            sigma_low: self.config.sky.sigma_low,
            sigma_high: self.config.sky.sigma_high,
            normalization: Normalization::AdditiveScale,
            linear_output: true,
            feather,
            output: STACK_RESULT_NAME.into(),
        }))?;
        self.driver.success("Stacking complete");
        Ok(())
    }
}
