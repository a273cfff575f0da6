mod common;

use std::fs;

use common::*;
use vespera_core::error::{MissingFrames, Warning};
use vespera_core::layout::{
    is_multi_channel, relocate_reference_images, relocate_stray_darks, resolve, InputLayout,
};

// ---------------------------------------------------------------------------
// Structure resolution
// ---------------------------------------------------------------------------

#[test]
fn test_organized_layout_counts() {
    let dir = organized_workdir(3, 7);
    let layout = resolve(dir.path());
    assert!(matches!(layout, InputLayout::Organized { .. }));
    assert_eq!(layout.dark_count(), 3);
    assert_eq!(layout.light_count(), 7);
    assert_eq!(layout.missing(), None);
}

#[test]
fn test_frame_extension_is_case_insensitive() {
    let dir = organized_workdir(0, 0);
    fs::write(dir.path().join("darks/d1.FIT"), b"x").unwrap();
    fs::write(dir.path().join("lights/l1.Fits"), b"x").unwrap();
    fs::write(dir.path().join("lights/notes.txt"), b"x").unwrap();
    let layout = resolve(dir.path());
    assert_eq!((layout.dark_count(), layout.light_count()), (1, 1));
}

#[test]
fn test_native_layout_excludes_darks_from_lights() {
    let dir = native_workdir(2, 4, 1, 0);
    write_fits(&dir.path().join("01-images-initial/m42-dark-extra.fits"), None);
    let layout = resolve(dir.path());
    match &layout {
        InputLayout::Native {
            dark_files,
            reference_images,
            ..
        } => {
            assert_eq!(dark_files.len(), 2);
            assert_eq!(reference_images.len(), 1);
        }
        other => panic!("expected native layout, got {other}"),
    }
    assert_eq!(layout.light_count(), 4);
}

#[test]
fn test_organized_wins_over_native() {
    let dir = native_workdir(2, 2, 0, 0);
    fs::create_dir(dir.path().join("darks")).unwrap();
    fs::create_dir(dir.path().join("lights")).unwrap();
    write_fits(&dir.path().join("darks/d.fit"), None);
    write_fits(&dir.path().join("lights/l.fit"), None);
    assert!(matches!(resolve(dir.path()), InputLayout::Organized { .. }));
}

#[test]
fn test_resolution_is_idempotent() {
    let dir = native_workdir(2, 3, 2, 1);
    assert_eq!(resolve(dir.path()), resolve(dir.path()));
}

#[test]
fn test_unresolved_names_missing_frames() {
    let dir = tempfile::TempDir::new().unwrap();
    assert_eq!(resolve(dir.path()).missing(), Some(MissingFrames::Both));

    let lights_only = native_workdir(0, 3, 0, 0);
    let layout = resolve(lights_only.path());
    assert!(!layout.is_resolved());
    assert_eq!(layout.missing(), Some(MissingFrames::Darks));

    let darks_only = organized_workdir(2, 0);
    assert_eq!(resolve(darks_only.path()).missing(), Some(MissingFrames::Lights));
}

#[test]
fn test_frames_split_across_layouts_are_reported() {
    // Organized darks next to native lights: neither layout is complete.
    let dir = organized_workdir(2, 0);
    let native_lights = dir.path().join("01-images-initial");
    fs::create_dir(&native_lights).unwrap();
    write_fits(&native_lights.join("m42-0001.fits"), Some(10.0));

    let layout = resolve(dir.path());
    assert!(!layout.is_resolved());
    assert_eq!(layout.missing(), Some(MissingFrames::MixedLayouts));
    assert!(MissingFrames::MixedLayouts.to_string().contains("same layout"));
}

// ---------------------------------------------------------------------------
// Reference relocation
// ---------------------------------------------------------------------------

#[test]
fn test_channel_probe() {
    let dir = tempfile::TempDir::new().unwrap();
    let rgb = dir.path().join("rgb.tif");
    let gray = dir.path().join("gray.tif");
    write_rgb_tiff(&rgb);
    write_gray_tiff(&gray);
    assert!(is_multi_channel(&rgb).unwrap());
    assert!(!is_multi_channel(&gray).unwrap());
}

#[test]
fn test_relocation_moves_every_reference_image() {
    let dir = native_workdir(1, 2, 2, 1);
    let candidates = match resolve(dir.path()) {
        InputLayout::Native {
            reference_images, ..
        } => reference_images,
        other => panic!("expected native layout, got {other}"),
    };
    let report = relocate_reference_images(dir.path(), &candidates);
    assert_eq!(report.moved.len(), 3);
    assert_eq!(report.single_channel, vec!["m42-mono-0001.tiff".to_string()]);
    assert!(report.warnings.is_empty());
    assert_eq!(list_names(&dir.path().join("reference")).len(), 3);
    assert_eq!(
        list_names(&dir.path().join("01-images-initial")),
        vec!["m42-0001.fits".to_string(), "m42-0002.fits".into()]
    );
}

#[test]
fn test_unreadable_tiff_is_relocated() {
    let dir = native_workdir(1, 1, 0, 0);
    let broken = dir.path().join("01-images-initial/broken.tif");
    fs::write(&broken, b"not a tiff").unwrap();
    let report = relocate_reference_images(dir.path(), &[broken.clone()]);
    assert_eq!(report.moved, vec!["broken.tif".to_string()]);
    assert!(!broken.exists());
}

#[test]
fn test_relocation_is_idempotent_and_never_overwrites() {
    let dir = native_workdir(1, 1, 1, 0);
    let lights = dir.path().join("01-images-initial");
    let tiff = lights.join("m42-0001.tif");

    let first = relocate_reference_images(dir.path(), &[tiff.clone()]);
    assert_eq!(first.moved.len(), 1);
    let second = relocate_reference_images(dir.path(), &[tiff.clone()]);
    assert!(second.moved.is_empty() && second.warnings.is_empty());

    // A new render with the same name must not clobber the relocated one.
    write_rgb_tiff(&tiff);
    let third = relocate_reference_images(dir.path(), &[tiff.clone()]);
    assert!(third.moved.is_empty());
    assert!(matches!(third.warnings[..], [Warning::Relocation { .. }]));
    assert!(tiff.exists());
}

// ---------------------------------------------------------------------------
// Stray darks
// ---------------------------------------------------------------------------

#[test]
fn test_stray_darks_move_to_workdir_root() {
    let dir = native_workdir(1, 2, 0, 0);
    let lights = dir.path().join("01-images-initial");
    write_fits(&lights.join("m42-dark-0042.fits"), Some(10.0));

    let report = relocate_stray_darks(dir.path(), &lights);
    assert_eq!(report.moved, vec!["m42-dark-0042.fits".to_string()]);
    assert!(dir.path().join("m42-dark-0042.fits").exists());
    assert!(list_names(&lights).iter().all(|n| !n.contains("-dark")));

    let again = relocate_stray_darks(dir.path(), &lights);
    assert!(again.moved.is_empty() && again.warnings.is_empty());
}

#[test]
fn test_stray_dark_never_overwrites_root_dark() {
    let dir = native_workdir(1, 2, 0, 0);
    let lights = dir.path().join("01-images-initial");
    write_fits(&lights.join("m42-dark-0001.fits"), None);

    let report = relocate_stray_darks(dir.path(), &lights);
    assert!(report.moved.is_empty());
    assert!(matches!(report.warnings[..], [Warning::Relocation { .. }]));
    assert!(lights.join("m42-dark-0001.fits").exists());
}
