//! The codec seam shared by the BBox and OBB formats, and the export result
//! types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::format::error::FormatError;
use crate::model::{LabelBox, Size};

/// A YOLO label text format.
///
/// Encoding never fails: out-of-range coordinates are clamped to `[0, 1]`
/// and non-finite ones become `0`, so the output is always well formed.
pub trait LabelFormat {
    /// Which mode this format implements.
    fn mode(&self) -> ExportMode;

    /// Human-readable name for UI display.
    fn display_name(&self) -> &'static str;

    /// Number of whitespace-separated fields on a label line.
    fn field_count(&self) -> usize;

    /// Encode one box as a label line (no newline).
    fn encode_box(&self, b: &LabelBox, image: Size) -> String;

    /// Decode one label line back into a pixel-space box.
    ///
    /// `line_no` is 1-based and ends up in both the error and the box id.
    fn decode_line(&self, line: &str, line_no: usize, image: Size) -> Result<LabelBox, FormatError>;

    /// Encode every box, one line each, joined with `\n` (no trailing newline).
    fn encode(&self, boxes: &[LabelBox], image: Size) -> String {
        boxes
            .iter()
            .map(|b| self.encode_box(b, image))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Decode a whole label file. Blank lines are skipped.
    fn decode(&self, text: &str, image: Size) -> Result<Vec<LabelBox>, FormatError> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| self.decode_line(line, idx + 1, image))
            .collect()
    }
}

/// Which label format to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Axis-aligned `class cx cy w h`
    #[default]
    BBox,
    /// 4-point polygon `class x1 y1 ... x4 y4`
    Obb,
}

impl ExportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportMode::BBox => "bbox",
            ExportMode::Obb => "obb",
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportMode {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bbox" => Ok(ExportMode::BBox),
            "obb" => Ok(ExportMode::Obb),
            _ => Err(FormatError::UnknownMode(s.to_string())),
        }
    }
}

/// Result of a dataset export: label files in memory plus warnings.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Number of images exported.
    pub images_exported: usize,

    /// Number of boxes exported.
    pub boxes_exported: usize,

    /// File name -> contents, in a stable order.
    pub files: BTreeMap<String, String>,

    /// Warnings generated during export (e.g., skipped images).
    pub warnings: Vec<FormatWarning>,
}

impl ExportResult {
    /// Create a new export result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the result.
    pub fn add_warning(&mut self, warning: FormatWarning) {
        log::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if any image was skipped.
    pub fn has_errors(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w.severity, WarningSeverity::Error))
    }
}

/// Warning generated during export.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatWarning {
    /// Image this warning relates to (if applicable).
    pub image: Option<String>,

    /// Human-readable warning message.
    pub message: String,

    /// Severity level of the warning.
    pub severity: WarningSeverity,
}

impl FormatWarning {
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            image: None,
            message: message.into(),
            severity,
        }
    }

    /// Something was lost or modified, but the image was exported.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }

    /// The image was skipped.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Error)
    }

    /// Set the image this warning relates to.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Severity level for export warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Warning that something was dropped or modified.
    Warning,
    /// Error that caused an image to be skipped.
    Error,
}
