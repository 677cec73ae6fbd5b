//! Box editing and YOLO label export for object-detection datasets.
//!
//! The crate holds everything a labeling front end needs below the widget
//! layer: a pixel-space box model, a viewport that maps between screen and
//! image coordinates, a canvas state machine that turns pointer input into
//! box edits, per-image storage with debounced auto-save, and encoders for
//! the YOLO BBox and OBB text formats.
//!
//! Rendering is left to the host. It feeds pointer, wheel and key events in
//! and draws whatever [`canvas::Canvas`] reports.

pub mod auto_save;
pub mod canvas;
pub mod config;
pub mod constants;
pub mod format;
pub mod image_source;
pub mod keybindings;
pub mod model;
pub mod session;
pub mod store;
pub mod viewport;

pub use canvas::Canvas;
pub use config::AppConfig;
pub use session::{BoxPersistence, LabelingSession};
pub use viewport::Viewport;
