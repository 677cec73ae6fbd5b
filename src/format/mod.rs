//! YOLO label import/export.
//!
//! Both label formats implement the [`LabelFormat`] trait; pick one with
//! [`format_for`] or call [`export_bbox`]/[`export_obb`] directly.
//!
//! ## Supported Formats
//!
//! - **BBox**: `class cx cy w h`, axis-aligned, rotation dropped
//! - **OBB**: `class x1 y1 x2 y2 x3 y3 x4 y4`, the rotated box as a polygon
//!
//! ## Usage
//!
//! ```rust,ignore
//! use yolo_labeler::format::{DatasetExportOptions, ExportMode, export_dataset, write_zip};
//!
//! let result = export_dataset(images, &mut source, &classes, &DatasetExportOptions::new(ExportMode::Obb));
//! write_zip(&result, Path::new("labels_obb.zip"))?;
//! ```

mod dataset;
mod error;
mod stored;
mod traits;
mod yolo;

#[cfg(test)]
mod tests;

pub use dataset::{
    CLASSES_FILE, DatasetExportOptions, LABELS_DIR, archive_name, export_dataset, label_file_name,
    write_dir, write_zip, write_zip_to,
};
pub use error::FormatError;
pub use stored::{StoredAnnotation, boxes_to_stored, stored_to_boxes};
pub use traits::{ExportMode, ExportResult, FormatWarning, LabelFormat, WarningSeverity};
pub use yolo::{BBoxFormat, ObbFormat, export_bbox, export_obb, format_for, normalize};
