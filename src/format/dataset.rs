//! Multi-image label export.
//!
//! Every image becomes one `<basename>.txt` label file. Files are collected
//! in an [`ExportResult`] first and then bundled into a zip archive or
//! written into a directory.

use std::collections::btree_map::Entry;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::format::error::FormatError;
use crate::format::traits::{ExportMode, ExportResult, FormatWarning};
use crate::format::yolo::format_for;
use crate::image_source::ImageSource;
use crate::model::{ClassList, LabelBox};

/// Name of the class names file.
pub const CLASSES_FILE: &str = "classes.txt";

/// Directory name used when labels are written unbundled.
pub const LABELS_DIR: &str = "labels";

/// Options for a dataset export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetExportOptions {
    pub mode: ExportMode,
    /// Also emit `classes.txt`.
    pub include_classes: bool,
}

impl Default for DatasetExportOptions {
    fn default() -> Self {
        Self {
            mode: ExportMode::BBox,
            include_classes: true,
        }
    }
}

impl DatasetExportOptions {
    pub fn new(mode: ExportMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn include_classes(mut self, include: bool) -> Self {
        self.include_classes = include;
        self
    }
}

/// Label file name for an image key: the basename with its extension
/// replaced by `.txt`.
pub fn label_file_name(image_key: &str) -> String {
    let stem = Path::new(image_key)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(image_key);
    format!("{stem}.txt")
}

/// Default archive name for a mode, e.g. `labels_obb.zip`.
pub fn archive_name(mode: ExportMode) -> String {
    format!("labels_{}.zip", mode.as_str())
}

/// True if BBox export would lose this box's rotation.
fn loses_rotation(b: &LabelBox) -> bool {
    const EPS: f64 = 1e-9;
    let r = b.rotation.rem_euclid(180.0);
    r > EPS && 180.0 - r > EPS
}

/// Encode the labels of many images.
///
/// Images are processed in order. Each needs its dimensions from `source`;
/// when those are unavailable the image is skipped and an error-level warning
/// is recorded. Nothing here aborts the export.
pub fn export_dataset<'a, S>(
    images: impl IntoIterator<Item = (&'a str, &'a [LabelBox])>,
    source: &mut S,
    classes: &ClassList,
    options: &DatasetExportOptions,
) -> ExportResult
where
    S: ImageSource + ?Sized,
{
    let codec = format_for(options.mode);
    let mut result = ExportResult::new();

    for (key, boxes) in images {
        let size = match source.dimensions(key) {
            Ok(size) if size.is_usable() => size,
            Ok(_) => {
                result.add_warning(
                    FormatWarning::error(format!("Skipping '{key}': image has no usable size"))
                        .with_image(key),
                );
                continue;
            }
            Err(e) => {
                result.add_warning(
                    FormatWarning::error(format!("Skipping '{key}': {e}")).with_image(key),
                );
                continue;
            }
        };

        if options.mode == ExportMode::BBox {
            let rotated = boxes.iter().filter(|b| loses_rotation(b)).count();
            if rotated > 0 {
                result.add_warning(
                    FormatWarning::warning(format!(
                        "'{key}': rotation of {rotated} box(es) dropped in bbox export"
                    ))
                    .with_image(key),
                );
            }
        }

        let name = label_file_name(key);
        let text = codec.encode(boxes, size);
        match result.files.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(text);
            }
            Entry::Occupied(mut slot) => {
                let message = format!("'{key}': label file {} written twice", slot.key());
                slot.insert(text);
                result.add_warning(FormatWarning::warning(message).with_image(key));
            }
        }
        result.images_exported += 1;
        result.boxes_exported += boxes.len();
    }

    if options.include_classes {
        if result.files.contains_key(CLASSES_FILE) {
            // an image named `classes.*` already owns the file
            result.add_warning(FormatWarning::error(format!(
                "{CLASSES_FILE} not written: the name is taken by an image's label file"
            )));
        } else {
            result
                .files
                .insert(CLASSES_FILE.to_string(), classes.names().join("\n"));
        }
    }

    log::info!(
        "Exported {} images with {} boxes as {} ({} warnings)",
        result.images_exported,
        result.boxes_exported,
        options.mode,
        result.warnings.len()
    );
    result
}

/// Bundle the exported files into a zip archive written to `writer`.
pub fn write_zip_to<W: Write + Seek>(result: &ExportResult, writer: W) -> Result<W, FormatError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, text) in &result.files {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(text.as_bytes())?;
    }
    Ok(zip.finish()?)
}

/// Bundle the exported files into a zip archive at `path`.
pub fn write_zip(result: &ExportResult, path: &Path) -> Result<(), FormatError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_zip_to(result, file)?;
    log::info!("Wrote {} label files to {:?}", result.files.len(), path);
    Ok(())
}

/// Write the exported files into `dir`, creating it if needed.
pub fn write_dir(result: &ExportResult, dir: &Path) -> Result<Vec<PathBuf>, FormatError> {
    if dir.exists() && !dir.is_dir() {
        return Err(FormatError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(result.files.len());
    for (name, text) in &result.files {
        let path = dir.join(name);
        std::fs::write(&path, text)?;
        written.push(path);
    }
    log::info!("Wrote {} label files to {:?}", written.len(), dir);
    Ok(written)
}
