/// Scratch folder holding converted and intermediate sequence files.
pub const PROCESS_DIR: &str = "process";

/// Scratch folder holding the calibration master.
pub const MASTERS_DIR: &str = "masters";

/// Destination for multi-channel reference images found in a native capture.
pub const REFERENCE_DIR: &str = "reference";

/// Calibration frames of the organized layout.
pub const ORGANIZED_DARKS_DIR: &str = "darks";

/// Signal frames of the organized layout.
pub const ORGANIZED_LIGHTS_DIR: &str = "lights";

/// Signal frames of the native Vespera layout.
pub const NATIVE_LIGHTS_DIR: &str = "01-images-initial";

/// File-name marker of native calibration frames (matched case-insensitively).
pub const NATIVE_DARK_MARKER: &str = "-dark";

/// Staging folder (inside `masters/`) for native darks before conversion.
pub const NATIVE_DARK_STAGING_DIR: &str = "native_darks";

/// Extensions accepted as calibration/signal frames.
pub const FRAME_EXTENSIONS: [&str; 2] = ["fit", "fits"];

/// Extensions of reference rasters written next to native signal frames.
pub const REFERENCE_EXTENSIONS: [&str; 2] = ["tif", "tiff"];

/// Sequence base name of converted calibration frames.
pub const DARK_SEQUENCE: &str = "dark";

/// Sequence base name of converted signal frames.
pub const LIGHT_SEQUENCE: &str = "light";

/// Prefix the host adds to calibrated sequences.
pub const CALIBRATED_PREFIX: &str = "pp_";

/// Prefix the host adds to registered sequences.
pub const REGISTERED_PREFIX: &str = "r_";

/// File name (without extension) of the calibration master.
pub const MASTER_DARK_NAME: &str = "dark_stacked";

/// File name (without extension) of the stacked signal raster.
pub const STACK_RESULT_NAME: &str = "result";

/// Host-side token expanded to the total integration time in seconds.
pub const LIVETIME_TOKEN: &str = "$LIVETIME:%d$";

/// Default extension the host writes FITS files with.
pub const DEFAULT_OUTPUT_EXTENSION: &str = "fit";

/// Temporary subfolders the host creates inside scratch directories.
pub const HOST_TEMP_SUBDIRS: [&str; 3] = ["cache", "drizztmp", "other"];

/// Largest accepted feather radius in pixels.
pub const MAX_FEATHER: u8 = 100;

/// Star magnitude limit for photometric color calibration.
pub const PCC_LIMIT_MAGNITUDE: f32 = 12.0;

/// RBF smoothing used for background subtraction.
pub const BACKGROUND_SMOOTHING: f32 = 0.5;

/// Progress checkpoints (percent) of the preprocessing run.
pub mod checkpoint {
    pub const CLEANUP: u8 = 5;
    pub const CALIBRATION_MASTER: u8 = 10;
    pub const CONVERT: u8 = 20;
    pub const CALIBRATE: u8 = 30;
    pub const REGISTER: u8 = 50;
    pub const STACK: u8 = 75;
    pub const EXTRACT: u8 = 85;
    pub const COMPOSE: u8 = 88;
    pub const BACKGROUND: u8 = 92;
    pub const COLOR_CALIBRATION: u8 = 95;
    pub const FINAL_CLEANUP: u8 = 98;
    pub const DONE: u8 = 100;
}
