use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::{FRAME_EXTENSIONS, HOST_TEMP_SUBDIRS, NATIVE_DARK_STAGING_DIR, REFERENCE_EXTENSIONS};
use crate::error::Warning;

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// `.fit` / `.fits`, any case.
pub fn is_frame_file(path: &Path) -> bool {
    has_extension(path, &FRAME_EXTENSIONS)
}

/// `.tif` / `.tiff`, any case.
pub fn is_reference_file(path: &Path) -> bool {
    has_extension(path, &REFERENCE_EXTENSIONS)
}

/// Lower-cased file name, used for marker matching.
pub fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Regular files directly inside `dir` that satisfy `keep`, sorted by path.
/// A missing or unreadable directory yields an empty list.
pub fn list_files(dir: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Directory not readable");
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && keep(path))
        .collect();
    files.sort();
    files
}

/// Outcome of a best-effort removal pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
    pub warnings: Vec<Warning>,
}

impl CleanupReport {
    pub fn merge(&mut self, other: CleanupReport) {
        self.removed += other.removed;
        self.failed += other.failed;
        self.warnings.extend(other.warnings);
    }

    fn record(&mut self, path: &Path, outcome: std::io::Result<()>) {
        match outcome {
            Ok(()) => self.removed += 1,
            Err(e) => {
                self.failed += 1;
                self.warnings.push(Warning::Cleanup {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

fn is_transient(path: &Path) -> bool {
    if is_frame_file(path) {
        return true;
    }
    let name = file_name_lower(path);
    name.ends_with(".seq") || name.ends_with("conversion.txt")
}

/// Remove transient frame/sequence files and host temp subfolders from a
/// scratch directory. Never fails; every failure is counted and reported.
pub fn clean_scratch_dir(dir: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();
    if !dir.is_dir() {
        return report;
    }
    for file in list_files(dir, is_transient) {
        report.record(&file, fs::remove_file(&file));
    }
    let subdirs = HOST_TEMP_SUBDIRS
        .iter()
        .copied()
        .chain(std::iter::once(NATIVE_DARK_STAGING_DIR));
    for name in subdirs {
        let sub = dir.join(name);
        if sub.is_dir() {
            report.record(&sub, fs::remove_dir_all(&sub));
        }
    }
    report
}

/// Remove specific files, skipping those that do not exist.
pub fn remove_files(paths: &[PathBuf]) -> CleanupReport {
    let mut report = CleanupReport::default();
    for path in paths.iter().filter(|p| p.exists()) {
        report.record(path, fs::remove_file(path));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_extension_case_insensitive() {
        assert!(is_frame_file(Path::new("a/img-0001.FIT")));
        assert!(is_frame_file(Path::new("a/img-0001.fits")));
        assert!(!is_frame_file(Path::new("a/img-0001.tif")));
        assert!(!is_frame_file(Path::new("a/fits")));
    }

    #[test]
    fn test_reference_extension() {
        assert!(is_reference_file(Path::new("x.TIFF")));
        assert!(is_reference_file(Path::new("x.tif")));
        assert!(!is_reference_file(Path::new("x.fit")));
    }

    #[test]
    fn test_clean_scratch_dir_counts() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["light_00001.fit", "light_.seq", "light_conversion.txt", "keep.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("cache")).unwrap();
        fs::write(dir.path().join("cache/tmp.bin"), b"x").unwrap();

        let report = clean_scratch_dir(dir.path());
        assert_eq!(report.removed, 4);
        assert_eq!(report.failed, 0);
        assert!(dir.path().join("keep.txt").exists());
        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn test_clean_missing_dir_is_empty_report() {
        let report = clean_scratch_dir(Path::new("/definitely/not/here"));
        assert_eq!(report, CleanupReport::default());
    }
}
