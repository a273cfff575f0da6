use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_OUTPUT_EXTENSION, MAX_FEATHER};
use crate::error::{Result, VesperaError};
use crate::registry::{FilterProfile, Registry, SensorProfile, SkyProfile, StackingProfile};

/// User selections for one preprocessing run. Preset fields hold registry
/// names; call [`Configuration::resolve`] before using them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub filter: String,
    pub sky_quality: String,
    pub stacking: String,
    /// Edge feathering radius in pixels (0 disables it).
    pub feather: u8,
    /// Register in two passes, then apply with maximum framing.
    pub two_pass: bool,
    pub auto_background_extraction: bool,
    pub auto_color_calibration: bool,
    pub keep_temp_files: bool,
    /// Extension the host writes FITS files with.
    pub output_extension: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            filter: "No Filter (Stock)".into(),
            sky_quality: "Bortle 3-4 (Rural)".into(),
            stacking: "Bayer Drizzle (Recommended)".into(),
            feather: 0,
            two_pass: false,
            auto_background_extraction: false,
            auto_color_calibration: false,
            keep_temp_files: false,
            output_extension: DEFAULT_OUTPUT_EXTENSION.into(),
        }
    }
}

impl Configuration {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Look up every preset and check the numeric options.
    pub fn resolve(&self, registry: &Registry) -> Result<ResolvedConfig> {
        let filter = registry
            .filter(&self.filter)
            .ok_or_else(|| unknown("filter", &self.filter))?;
        let sky = registry
            .sky(&self.sky_quality)
            .ok_or_else(|| unknown("sky quality", &self.sky_quality))?;
        let stacking = registry
            .stacking_method(&self.stacking)
            .ok_or_else(|| unknown("stacking method", &self.stacking))?;

        sky.validate()?;
        stacking.validate()?;

        if self.feather > MAX_FEATHER {
            return Err(VesperaError::Configuration(format!(
                "feather radius must be between 0 and {MAX_FEATHER} (got {})",
                self.feather
            )));
        }
        let extension = self.output_extension.trim_start_matches('.');
        if extension.is_empty() || extension.contains(['/', '\\']) {
            return Err(VesperaError::Configuration(format!(
                "invalid output extension '{}'",
                self.output_extension
            )));
        }

        Ok(ResolvedConfig {
            filter: filter.clone(),
            sky: sky.clone(),
            stacking: stacking.clone(),
            sensor: registry.sensor.clone(),
            feather: self.feather,
            two_pass: self.two_pass,
            auto_background_extraction: self.auto_background_extraction,
            auto_color_calibration: self.auto_color_calibration,
            keep_temp_files: self.keep_temp_files,
            output_extension: extension.to_string(),
        })
    }
}

fn unknown(kind: &str, name: &str) -> VesperaError {
    VesperaError::Configuration(format!("unknown {kind} preset '{name}'"))
}

/// A configuration whose presets have been looked up and validated.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    pub filter: FilterProfile,
    pub sky: SkyProfile,
    pub stacking: StackingProfile,
    pub sensor: SensorProfile,
    pub feather: u8,
    pub two_pass: bool,
    pub auto_background_extraction: bool,
    pub auto_color_calibration: bool,
    pub keep_temp_files: bool,
    pub output_extension: String,
}
