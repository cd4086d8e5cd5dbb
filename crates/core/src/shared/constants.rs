/// Frames between full tracking computations when not configured (no skipping).
pub const DEFAULT_SKIP_INTERVAL: usize = 1;

pub const DEFAULT_TARGET_FPS: f64 = 30.0;

/// Minimum template-match score accepted as a successful track.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.4;

/// Stored template resolution; small enough to keep blending cheap.
pub const DEFAULT_TEMPLATE_SIZE: (u32, u32) = (64, 64);

pub const DEFAULT_MAX_HISTORY: usize = 10;

pub const DEFAULT_SCALES: &[f64] = &[0.9, 1.0, 1.1];

/// Consecutive failed frames before the engine reports the target as lost.
pub const DEFAULT_MAX_LOST_FRAMES: u32 = 5;

/// Per-frame processing times kept for the FPS estimate.
pub const FRAME_TIME_WINDOW: usize = 100;

/// Confidence assigned to the user-supplied seed box.
pub const SEED_CONFIDENCE: f64 = 1.0;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
