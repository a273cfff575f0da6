//! Turning the stacked raster into deliverables, per filter kind.

use crate::consts::{checkpoint, LIVETIME_TOKEN, PROCESS_DIR, STACK_RESULT_NAME};
use crate::engine::Command;
use crate::error::{Result, Warning};
use crate::io::frames::remove_files;
use crate::registry::{EmissionLine, FilterKind};

use super::stages::PipelineRun;
use super::types::{Artifact, ArtifactKind, PipelineStage};

const DISCARDED_PLANES: [&str; 3] = ["discard_r", "discard_g", "discard_b"];
const COMPOSITE_NAME: &str = "HOO_composite";

fn plane_name(line: EmissionLine) -> String {
    format!("{line}_plane")
}

/// Split outputs keeping only the plane that carries `line`.
fn split_outputs(line: EmissionLine) -> [String; 3] {
    let mut outputs = DISCARDED_PLANES.map(String::from);
    outputs[line.plane_index()] = plane_name(line);
    outputs
}

/// Final-artifact save target, relative to the working directory.
fn timed_name(prefix: &str) -> String {
    format!("{prefix}_{LIVETIME_TOKEN}s")
}

impl PipelineRun<'_> {
    pub(crate) fn extract(&mut self) -> Result<()> {
        self.driver.enter(PipelineStage::ExtractOrCompose);
        let kind = self.config.filter.kind;
        match kind {
            FilterKind::Broadband | FilterKind::BroadbandLightPollution => {
                self.driver
                    .progress(checkpoint::EXTRACT, "Saving broadband result");
                self.driver.exec(Command::Load(STACK_RESULT_NAME.into()))?;
                self.finish_image(&timed_name("result"), ArtifactKind::Final)?;
            }
            FilterKind::SingleNarrowband(line) => {
                self.driver
                    .progress(checkpoint::EXTRACT, &format!("Extracting {line} channel"));
                self.split_channel(line)?;
                self.driver.exec(Command::Load(plane_name(line)))?;
                self.finish_image(&timed_name("result"), ArtifactKind::Final)?;
            }
            FilterKind::DualBand => self.extract_dual_band()?,
        }
        self.driver.exec(Command::Cd("..".into()))?;
        Ok(())
    }

    fn extract_dual_band(&mut self) -> Result<()> {
        self.driver
            .progress(checkpoint::EXTRACT, "Extracting Ha and OIII channels");
        for line in [EmissionLine::Ha, EmissionLine::Oiii] {
            self.split_channel(line)?;
        }
        for line in [EmissionLine::Ha, EmissionLine::Oiii] {
            self.driver.exec(Command::Load(plane_name(line)))?;
            self.driver.exec(Command::RemoveIccProfile)?;
            let name = format!("{line}_result");
            self.driver.exec(Command::Save(format!("../{name}")))?;
            self.record_artifact(&name, ArtifactKind::Channel(line));
        }

        self.driver
            .progress(checkpoint::COMPOSE, "Building HOO composite");
        match self.compose() {
            Ok(()) => self.driver.success("HOO composite created"),
            Err(e) => self.driver.warn(Warning::Composition(e.to_string())),
        }
        Ok(())
    }

    /// Ha to red, OIII to green and blue. Best-effort.
    fn compose(&mut self) -> std::result::Result<(), crate::engine::EngineError> {
        let ha = format!("../{}_result", EmissionLine::Ha);
        let oiii = format!("../{}_result", EmissionLine::Oiii);
        self.driver.try_exec(Command::Compose {
            inputs: [ha, oiii.clone(), oiii],
            output: COMPOSITE_NAME.into(),
        })?;
        self.driver.try_exec(Command::Load(COMPOSITE_NAME.into()))?;
        if self.config.sensor.bottom_up_readout {
            self.driver.try_exec(Command::MirrorX { bottom_up: true })?;
        }
        self.driver.try_exec(Command::RemoveIccProfile)?;
        let target = timed_name("HOO_result");
        self.driver.try_exec(Command::Save(format!("../{target}")))?;
        self.record_artifact(&target, ArtifactKind::Composite);
        self.final_target = Some(target);
        Ok(())
    }

    /// Load the stack, split it and drop the planes that are not kept.
    fn split_channel(&mut self, line: EmissionLine) -> Result<()> {
        self.driver.exec(Command::Load(STACK_RESULT_NAME.into()))?;
        let outputs = split_outputs(line);
        self.driver.exec(Command::Split {
            outputs: outputs.clone(),
        })?;

        let process = self.scratch_dir(PROCESS_DIR);
        let extension = self.config.output_extension.clone();
        let discarded: Vec<_> = outputs
            .iter()
            .filter(|name| DISCARDED_PLANES.contains(&name.as_str()))
            .map(|name| process.join(format!("{name}.{extension}")))
            .collect();
        let report = remove_files(&discarded);
        self.record_cleanup(report);
        self.driver.info(format!("{line} channel extracted"));
        Ok(())
    }

    /// Orient, strip the ICC profile and save the loaded image as `target`.
    fn finish_image(&mut self, target: &str, kind: ArtifactKind) -> Result<()> {
        if self.config.sensor.bottom_up_readout {
            self.driver.exec(Command::MirrorX { bottom_up: true })?;
        }
        self.driver.exec(Command::RemoveIccProfile)?;
        self.driver.exec(Command::Save(format!("../{target}")))?;
        self.record_artifact(target, kind);
        self.final_target = Some(target.to_string());
        Ok(())
    }

    fn record_artifact(&mut self, name: &str, kind: ArtifactKind) {
        let path = self
            .workdir
            .join(format!("{name}.{}", self.config.output_extension));
        let artifact = Artifact { kind, path };
        self.driver.success(format!("Saved {artifact}"));
        self.artifacts.push(artifact);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_outputs_keep_line_plane() {
        assert_eq!(
            split_outputs(EmissionLine::Ha),
            ["Ha_plane".to_string(), "discard_g".into(), "discard_b".into()]
        );
        assert_eq!(
            split_outputs(EmissionLine::Oiii),
            ["discard_r".to_string(), "discard_g".into(), "OIII_plane".into()]
        );
    }

    #[test]
    fn test_timed_name() {
        assert_eq!(timed_name("result"), "result_$LIVETIME:%d$s");
    }
}
