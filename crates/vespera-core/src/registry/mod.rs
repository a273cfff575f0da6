//! Catalogs of named presets: filters, sky quality, stacking strategies and
//! the sensor profile.
//!
//! A [`Registry`] is built once (from the built-in tables or a TOML file),
//! validated, and then only ever read. Configurations reference presets by
//! name; [`crate::config::Configuration::resolve`] turns those names into the
//! typed profiles below.

mod builtin;
pub mod profiles;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VesperaError};

pub use profiles::{
    DrizzleKernel, DrizzleParams, EmissionLine, FilterKind, FilterProfile, Interpolation,
    SensorProfile, SkyProfile, StackingProfile,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    pub sensor: SensorProfile,
    #[serde(rename = "filter")]
    pub filters: Vec<FilterProfile>,
    #[serde(rename = "sky")]
    pub skies: Vec<SkyProfile>,
    pub stacking: Vec<StackingProfile>,
}

impl Registry {
    /// The presets shipped for the Vespera Pro.
    pub fn builtin() -> Self {
        builtin::builtin_registry()
    }

    /// Parse and validate a registry from TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let registry: Self = toml::from_str(contents)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every catalog: non-empty, unique names, valid parameters.
    pub fn validate(&self) -> Result<()> {
        check_names("filter", self.filters.iter().map(|p| p.name.as_str()))?;
        check_names("sky", self.skies.iter().map(|p| p.name.as_str()))?;
        check_names("stacking", self.stacking.iter().map(|p| p.name.as_str()))?;
        for sky in &self.skies {
            sky.validate()?;
        }
        for stacking in &self.stacking {
            stacking.validate()?;
        }
        Ok(())
    }

    pub fn filter(&self, name: &str) -> Option<&FilterProfile> {
        self.filters.iter().find(|p| p.name == name)
    }

    pub fn sky(&self, name: &str) -> Option<&SkyProfile> {
        self.skies.iter().find(|p| p.name == name)
    }

    pub fn stacking_method(&self, name: &str) -> Option<&StackingProfile> {
        self.stacking.iter().find(|p| p.name == name)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn check_names<'a>(catalog: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(VesperaError::Configuration(format!(
                "{catalog} catalog contains a preset with an empty name"
            )));
        }
        if !seen.insert(name) {
            return Err(VesperaError::Configuration(format!(
                "{catalog} catalog contains '{name}' more than once"
            )));
        }
    }
    if seen.is_empty() {
        return Err(VesperaError::Configuration(format!(
            "{catalog} catalog is empty"
        )));
    }
    Ok(())
}
