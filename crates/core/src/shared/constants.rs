/// Landmark count of the dense face-mesh topology (no iris refinement).
pub const FACE_MESH_LANDMARK_COUNT: usize = 468;

/// Face-detected frames averaged per verdict.
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Largest accepted window; about five minutes of 30 fps capture.
pub const MAX_WINDOW_SIZE: usize = 10_000;

/// Region is person-like when its window-average color ratio reaches this.
pub const DEFAULT_AVG_COLOR_RATIO: f64 = 0.16988;

/// Region is person-like when its window-average brightness ratio reaches this.
pub const DEFAULT_AVG_BRIGHTNESS_RATIO: f64 = 0.18;

/// Person-like regions needed for a `Person` verdict.
pub const DEFAULT_MIN_PERSON_REGIONS: usize = 3;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const CONFIG_DIR_NAME: &str = "PadLiveness";
pub const CONFIG_FILE_NAME: &str = "config.json";
