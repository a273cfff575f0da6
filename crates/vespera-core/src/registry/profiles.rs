use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VesperaError};

/// Emission line isolated by a narrowband filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmissionLine {
    Ha,
    Oiii,
}

impl EmissionLine {
    /// Index of the color plane carrying this line after a three-way split.
    pub fn plane_index(self) -> usize {
        match self {
            Self::Ha => 0,
            Self::Oiii => 2,
        }
    }
}

impl fmt::Display for EmissionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ha => write!(f, "Ha"),
            Self::Oiii => write!(f, "OIII"),
        }
    }
}

/// How a filter's stacked raster is turned into deliverables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Broadband,
    BroadbandLightPollution,
    DualBand,
    SingleNarrowband(EmissionLine),
}

impl FilterKind {
    /// True when the final artifact is a single monochrome plane.
    pub fn is_monochrome(self) -> bool {
        matches!(self, Self::SingleNarrowband(_))
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadband => write!(f, "Broadband"),
            Self::BroadbandLightPollution => write!(f, "Broadband (LP)"),
            Self::DualBand => write!(f, "Dual-band Ha/OIII"),
            Self::SingleNarrowband(line) => write!(f, "Narrowband {line}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterProfile {
    pub name: String,
    pub kind: FilterKind,
    #[serde(default)]
    pub description: String,
}

/// Rejection and background parameters tuned for a Bortle class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkyProfile {
    pub name: String,
    pub sigma_low: f32,
    pub sigma_high: f32,
    pub background_samples: u32,
    pub background_tolerance: f32,
    pub gradient_correction: bool,
    #[serde(default)]
    pub description: String,
}

impl SkyProfile {
    pub fn validate(&self) -> Result<()> {
        if !(self.sigma_low > 0.0 && self.sigma_high > 0.0) {
            return Err(VesperaError::Configuration(format!(
                "sky preset '{}': sigma thresholds must be positive",
                self.name
            )));
        }
        if self.background_samples == 0 {
            return Err(VesperaError::Configuration(format!(
                "sky preset '{}': background sample count must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrizzleKernel {
    Gaussian,
    Square,
}

impl DrizzleKernel {
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::Square => "square",
        }
    }
}

impl fmt::Display for DrizzleKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_arg())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Area,
    Nearest,
}

impl Interpolation {
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Area => "area",
            Self::Nearest => "nearest",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_arg())
    }
}

/// Bayer-drizzle resampling parameters passed to registration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrizzleParams {
    pub scale: f32,
    pub pixel_fraction: f32,
    pub kernel: DrizzleKernel,
    pub interpolation: Interpolation,
}

impl DrizzleParams {
    /// Up-scaling only integrates correctly with the square kernel.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.scale >= 1.0) {
            return Err(format!("drizzle scale must be >= 1.0 (got {})", self.scale));
        }
        if !(self.pixel_fraction > 0.0 && self.pixel_fraction <= 1.0) {
            return Err(format!(
                "drizzle pixel fraction must be in (0, 1] (got {})",
                self.pixel_fraction
            ));
        }
        if self.scale > 1.0 && self.kernel != DrizzleKernel::Square {
            return Err(format!(
                "drizzle scale {} requires the square kernel (got {})",
                self.scale, self.kernel
            ));
        }
        Ok(())
    }
}

impl Default for DrizzleParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pixel_fraction: 1.0,
            kernel: DrizzleKernel::Gaussian,
            interpolation: Interpolation::Area,
        }
    }
}

/// A stacking strategy. `drizzle: None` is the debayer-then-register path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackingProfile {
    pub name: String,
    #[serde(default)]
    pub drizzle: Option<DrizzleParams>,
    #[serde(default)]
    pub description: String,
}

impl StackingProfile {
    pub fn use_drizzle(&self) -> bool {
        self.drizzle.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        match &self.drizzle {
            Some(params) => params.validate().map_err(|reason| {
                VesperaError::Configuration(format!("stacking preset '{}': {reason}", self.name))
            }),
            None => Ok(()),
        }
    }
}

/// Static description of the telescope sensor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorProfile {
    pub name: String,
    pub bayer_pattern: String,
    pub pixel_size_um: f32,
    pub resolution: (u32, u32),
    pub bit_depth: u8,
    pub qe_peak: f32,
    /// R, G, B weights for luminance.
    pub luminance_weights: [f32; 3],
    /// The sensor reads rows bottom-up, so final artifacts are mirrored.
    pub bottom_up_readout: bool,
}
