//! Input-folder detection.
//!
//! Two capture layouts are supported:
//!
//! - **Organized**: `darks/` and `lights/` subfolders, each holding FITS frames.
//! - **Native** (as written by the telescope): `*-dark*` FITS files in the
//!   working-directory root and signal frames in `01-images-initial/`, next to
//!   RGB TIFF reference renders.
//!
//! Organized always wins when both are detectable.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageDecoder, ImageReader};
use tracing::{debug, info};

use crate::consts::{
    NATIVE_DARK_MARKER, NATIVE_LIGHTS_DIR, ORGANIZED_DARKS_DIR, ORGANIZED_LIGHTS_DIR,
    REFERENCE_DIR,
};
use crate::error::{MissingFrames, Result, Warning};
use crate::io::frames::{file_name_lower, is_frame_file, is_reference_file, list_files};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputLayout {
    Organized {
        darks_dir: PathBuf,
        lights_dir: PathBuf,
        dark_count: usize,
        light_count: usize,
    },
    Native {
        dark_files: Vec<PathBuf>,
        lights_dir: PathBuf,
        dark_count: usize,
        light_count: usize,
        /// TIFF files in the lights folder, candidates for relocation.
        reference_images: Vec<PathBuf>,
    },
    /// Neither layout matched. Counts are the best found by either probe.
    Unresolved {
        dark_count: usize,
        light_count: usize,
    },
}

impl InputLayout {
    pub fn dark_count(&self) -> usize {
        match self {
            Self::Organized { dark_count, .. }
            | Self::Native { dark_count, .. }
            | Self::Unresolved { dark_count, .. } => *dark_count,
        }
    }

    pub fn light_count(&self) -> usize {
        match self {
            Self::Organized { light_count, .. }
            | Self::Native { light_count, .. }
            | Self::Unresolved { light_count, .. } => *light_count,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved { .. })
    }

    /// What is missing for an unresolved layout.
    ///
    /// Both counts are non-zero only when darks and lights were found by
    /// different probes.
    pub fn missing(&self) -> Option<MissingFrames> {
        match self {
            Self::Unresolved {
                dark_count,
                light_count,
            } => Some(
                MissingFrames::from_counts(*dark_count, *light_count)
                    .unwrap_or(MissingFrames::MixedLayouts),
            ),
            _ => None,
        }
    }

    pub fn lights_dir(&self) -> Option<&Path> {
        match self {
            Self::Organized { lights_dir, .. } | Self::Native { lights_dir, .. } => {
                Some(lights_dir)
            }
            Self::Unresolved { .. } => None,
        }
    }

    /// Signal frames as they are on disk now.
    pub fn light_frames(&self) -> Vec<PathBuf> {
        match self {
            Self::Organized { lights_dir, .. } => list_files(lights_dir, is_frame_file),
            Self::Native { lights_dir, .. } => list_files(lights_dir, is_native_light),
            Self::Unresolved { .. } => Vec::new(),
        }
    }
}

impl std::fmt::Display for InputLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Organized { .. } => write!(f, "organized (darks/, lights/)"),
            Self::Native { .. } => write!(f, "Vespera native"),
            Self::Unresolved { .. } => write!(f, "unresolved"),
        }
    }
}

fn has_dark_marker(path: &Path) -> bool {
    file_name_lower(path).contains(NATIVE_DARK_MARKER)
}

fn is_native_dark(path: &Path) -> bool {
    is_frame_file(path) && has_dark_marker(path)
}

fn is_native_light(path: &Path) -> bool {
    is_frame_file(path) && !has_dark_marker(path)
}

/// Classify `workdir`. Read-only; calling it twice on an unchanged directory
/// yields the same layout.
pub fn resolve(workdir: &Path) -> InputLayout {
    let darks_dir = workdir.join(ORGANIZED_DARKS_DIR);
    let lights_dir = workdir.join(ORGANIZED_LIGHTS_DIR);
    let organized_darks = list_files(&darks_dir, is_frame_file).len();
    let organized_lights = list_files(&lights_dir, is_frame_file).len();
    debug!(organized_darks, organized_lights, "Organized probe");

    if organized_darks > 0 && organized_lights > 0 {
        return InputLayout::Organized {
            darks_dir,
            lights_dir,
            dark_count: organized_darks,
            light_count: organized_lights,
        };
    }

    let native_lights_dir = workdir.join(NATIVE_LIGHTS_DIR);
    let dark_files = list_files(workdir, is_native_dark);
    let native_lights = list_files(&native_lights_dir, is_native_light).len();
    debug!(
        native_darks = dark_files.len(),
        native_lights, "Native probe"
    );

    if !dark_files.is_empty() && native_lights > 0 {
        let reference_images = list_files(&native_lights_dir, is_reference_file);
        return InputLayout::Native {
            dark_count: dark_files.len(),
            dark_files,
            lights_dir: native_lights_dir,
            light_count: native_lights,
            reference_images,
        };
    }

    InputLayout::Unresolved {
        dark_count: organized_darks.max(dark_files.len()),
        light_count: organized_lights.max(native_lights),
    }
}

/// Outcome of moving files out of the lights folder.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelocationReport {
    /// File names moved out.
    pub moved: Vec<String>,
    /// Moved references that probed as single-channel renders.
    pub single_channel: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl RelocationReport {
    /// Move `path` into `dest_dir` unless a file with the same name is
    /// already there.
    fn move_into(&mut self, path: &Path, dest_dir: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let destination = dest_dir.join(&file_name);
        if destination.exists() {
            let folder = dest_dir
                .file_name()
                .map(|n| format!("{}/", n.to_string_lossy()))
                .unwrap_or_else(|| "the working directory".into());
            self.warnings.push(Warning::Relocation {
                file: file_name,
                reason: format!("a file with that name already exists in {folder}"),
            });
            return None;
        }
        match fs::create_dir_all(dest_dir).and_then(|_| move_file(path, &destination)) {
            Ok(()) => {
                self.moved.push(file_name.clone());
                Some(file_name)
            }
            Err(e) => {
                self.warnings.push(Warning::Relocation {
                    file: file_name,
                    reason: e.to_string(),
                });
                None
            }
        }
    }
}

/// Whether a raster has more than one channel. Multi-channel references
/// cannot be calibrated together with single-channel CFA frames.
pub fn is_multi_channel(path: &Path) -> Result<bool> {
    let decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()?;
    Ok(decoder.color_type().channel_count() > 1)
}

/// Move every reference image into `<workdir>/reference/`, leaving only FITS
/// frames for conversion.
///
/// Existing destination files are never overwritten. Running it again finds
/// nothing left to move.
pub fn relocate_reference_images(workdir: &Path, candidates: &[PathBuf]) -> RelocationReport {
    let mut report = RelocationReport::default();
    let reference_dir = workdir.join(REFERENCE_DIR);

    for path in candidates.iter().filter(|p| p.is_file()) {
        let multi_channel = match is_multi_channel(path) {
            Ok(multi) => multi,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "Reference image not probeable");
                true
            }
        };
        if let Some(file_name) = report.move_into(path, &reference_dir) {
            info!(file = %file_name, multi_channel, "Moved reference image");
            if !multi_channel {
                report.single_channel.push(file_name);
            }
        }
    }
    report
}

/// Move dark frames found among the native light frames back to the
/// working-directory root, where the other native darks live.
pub fn relocate_stray_darks(workdir: &Path, lights_dir: &Path) -> RelocationReport {
    let mut report = RelocationReport::default();
    for path in list_files(lights_dir, is_native_dark) {
        if let Some(file_name) = report.move_into(&path, workdir) {
            info!(file = %file_name, "Moved dark frame out of the light frames");
        }
    }
    report
}

/// Rename, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
