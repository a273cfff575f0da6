use crate::consts::{checkpoint, BACKGROUND_SMOOTHING, PCC_LIMIT_MAGNITUDE};
use crate::engine::Command;
use crate::error::Warning;

use super::stages::PipelineRun;
use super::types::PipelineStage;

impl PipelineRun<'_> {
    /// Optional background subtraction and color calibration on the image
    /// still loaded in the host. Never fails the run.
    pub(crate) fn post_process(&mut self) {
        let background = self.config.auto_background_extraction;
        let color = self.config.auto_color_calibration;
        if !background && !color {
            return;
        }
        self.driver.enter(PipelineStage::PostProcess);

        let Some(target) = self.final_target.clone() else {
            self.driver.warn(Warning::Skipped(
                "post-processing needs the HOO composite, which was not created".into(),
            ));
            return;
        };

        let mut changed = false;
        if background {
            self.driver
                .progress(checkpoint::BACKGROUND, "Removing background gradient");
            let sky = &self.config.sky;
            let command = Command::SubtractBackground {
                samples: sky.background_samples,
                tolerance: sky.background_tolerance,
                smooth: BACKGROUND_SMOOTHING,
            };
            match self.driver.try_exec(command) {
                Ok(()) => {
                    changed = true;
                    self.driver.success("Background extraction applied");
                }
                Err(e) => self.driver.warn(Warning::PostProcess {
                    step: "Background extraction".into(),
                    reason: e.to_string(),
                }),
            }
        }

        if color {
            self.driver
                .progress(checkpoint::COLOR_CALIBRATION, "Photometric color calibration");
            if self.config.filter.kind.is_monochrome() {
                self.driver.warn(Warning::Skipped(
                    "color calibration does not apply to a monochrome result".into(),
                ));
            } else {
                let command = Command::ColorCalibrate {
                    limit_magnitude: PCC_LIMIT_MAGNITUDE,
                };
                match self.driver.try_exec(command) {
                    Ok(()) => {
                        changed = true;
                        self.driver.success("Color calibration applied");
                    }
                    Err(e) => self.driver.warn(Warning::PostProcess {
                        step: "Color calibration".into(),
                        reason: e.to_string(),
                    }),
                }
            }
        }

        if changed {
            if let Err(e) = self.driver.try_exec(Command::Save(target)) {
                self.driver.warn(Warning::PostProcess {
                    step: "Saving post-processed result".into(),
                    reason: e.to_string(),
                });
            }
        }
    }
}
