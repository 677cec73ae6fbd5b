//! Global constants for the labeling engine.

/// Smallest width/height a box may have once committed (image pixels).
///
/// A drawn rectangle narrower or shorter than this at pointer-up is discarded.
pub const MIN_COMMIT_SIZE: f64 = 5.0;

/// Floor applied to width/height of the draft while the pointer is moving.
pub const MIN_DRAFT_SIZE: f64 = 2.0;

/// Pointer travel (image pixels) below which a release counts as a click.
pub const STAMP_CLICK_DISTANCE: f64 = 5.0;

/// Width/height of a draft right after pointer-down.
pub const INITIAL_DRAFT_SIZE: f64 = 1.0;

/// Largest class id tried when picking a free id for a new class.
pub const MAX_CLASS_ID: u32 = 99;

/// Number of digit hotkeys (1-9) mapped to class positions.
pub const CLASS_HOTKEY_COUNT: usize = 9;

/// Viewport zoom limits and step factors.
pub mod zoom {
    /// Maximum scale factor (2000%).
    pub const MAX: f64 = 20.0;
    /// Absolute lower bound for the scale factor.
    pub const MIN_FLOOR: f64 = 0.02;
    /// Lowest scale relative to the fit-to-screen scale.
    pub const MIN_FIT_RATIO: f64 = 0.2;
    /// Zoom step for Ctrl/Cmd + wheel.
    pub const WHEEL_FACTOR: f64 = 1.1;
    /// Zoom step for the toolbar buttons.
    pub const BUTTON_FACTOR: f64 = 1.2;
    /// Multiplier applied to raw wheel deltas when panning.
    pub const WHEEL_PAN_FACTOR: f64 = 0.9;
}

/// Transform handles drawn around the selected box (screen pixels).
pub mod handle {
    /// Grab radius around each handle.
    pub const HIT_RADIUS: f64 = 8.0;
    /// Distance of the rotate handle above the top edge.
    pub const ROTATE_OFFSET: f64 = 50.0;
}

/// Minimap sizing.
pub mod minimap {
    /// Maximum minimap width in screen pixels.
    pub const MAX_WIDTH: f64 = 200.0;
    /// Maximum minimap height in screen pixels.
    pub const MAX_HEIGHT: f64 = 140.0;
}

/// Auto-save timing.
pub mod auto_save {
    use std::time::Duration;

    /// Quiet period after the last edit before an image is persisted.
    pub const DEBOUNCE: Duration = Duration::from_millis(800);
}
