//! YOLO BBox and OBB label text.
//!
//! Both formats hold one box per line, a class id followed by coordinates
//! normalized by the image width (x) and height (y), each printed with six
//! decimals:
//!
//! ```text
//! bbox: class cx cy w h
//! obb:  class x1 y1 x2 y2 x3 y3 x4 y4
//! ```
//!
//! OBB corners come out in top-left, top-right, bottom-right, bottom-left
//! order of the box's unrotated frame and are not re-sorted after rotation.

use crate::format::error::FormatError;
use crate::format::traits::{ExportMode, LabelFormat};
use crate::model::{LabelBox, Point, Size};

/// Normalize a pixel coordinate by an image extent into `[0, 1]`.
///
/// Non-finite results (zero extent, NaN input) become `0`.
pub fn normalize(value: f64, extent: f64) -> f64 {
    let n = value / extent;
    if !n.is_finite() || n <= 0.0 {
        0.0
    } else {
        n.min(1.0)
    }
}

/// Axis-aligned YOLO boxes. Rotation is not representable and is dropped.
pub struct BBoxFormat;

/// Oriented YOLO boxes as 4-point polygons.
pub struct ObbFormat;

/// The codec for an export mode.
pub fn format_for(mode: ExportMode) -> &'static dyn LabelFormat {
    match mode {
        ExportMode::BBox => &BBoxFormat,
        ExportMode::Obb => &ObbFormat,
    }
}

/// Encode boxes as BBox label text.
pub fn export_bbox(boxes: &[LabelBox], image: Size) -> String {
    BBoxFormat.encode(boxes, image)
}

/// Encode boxes as OBB label text.
pub fn export_obb(boxes: &[LabelBox], image: Size) -> String {
    ObbFormat.encode(boxes, image)
}

impl LabelFormat for BBoxFormat {
    fn mode(&self) -> ExportMode {
        ExportMode::BBox
    }

    fn display_name(&self) -> &'static str {
        "YOLO BBox (TXT)"
    }

    fn field_count(&self) -> usize {
        5
    }

    fn encode_box(&self, b: &LabelBox, image: Size) -> String {
        format!(
            "{} {:.6} {:.6} {:.6} {:.6}",
            b.class_id,
            normalize(b.cx, image.width),
            normalize(b.cy, image.height),
            normalize(b.w, image.width),
            normalize(b.h, image.height)
        )
    }

    fn decode_line(&self, line: &str, line_no: usize, image: Size) -> Result<LabelBox, FormatError> {
        let (class_id, v) = split_fields(line, line_no, self.field_count(), image)?;
        let center = Point::new(v[0] * image.width, v[1] * image.height);
        Ok(LabelBox::new(
            imported_id(line_no),
            class_id,
            center,
            v[2] * image.width,
            v[3] * image.height,
        ))
    }
}

impl LabelFormat for ObbFormat {
    fn mode(&self) -> ExportMode {
        ExportMode::Obb
    }

    fn display_name(&self) -> &'static str {
        "YOLO OBB (TXT)"
    }

    fn field_count(&self) -> usize {
        9
    }

    fn encode_box(&self, b: &LabelBox, image: Size) -> String {
        let points = b
            .corners()
            .iter()
            .map(|p| {
                format!(
                    "{:.6} {:.6}",
                    normalize(p.x, image.width),
                    normalize(p.y, image.height)
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} {}", b.class_id, points)
    }

    /// Rebuild a rotated box from its polygon: the center is the mean of the
    /// four points, the width is the first edge, the height is the last edge
    /// and the rotation is the angle of the first edge.
    fn decode_line(&self, line: &str, line_no: usize, image: Size) -> Result<LabelBox, FormatError> {
        let (class_id, v) = split_fields(line, line_no, self.field_count(), image)?;
        let p: Vec<Point> = v
            .chunks_exact(2)
            .map(|xy| Point::new(xy[0] * image.width, xy[1] * image.height))
            .collect();

        let center = Point::new(
            p.iter().map(|q| q.x).sum::<f64>() / 4.0,
            p.iter().map(|q| q.y).sum::<f64>() / 4.0,
        );
        let w = p[0].distance_to(&p[1]);
        let h = p[0].distance_to(&p[3]);
        let rotation = (p[1].y - p[0].y).atan2(p[1].x - p[0].x).to_degrees();
        Ok(LabelBox::new(imported_id(line_no), class_id, center, w, h).with_rotation(rotation))
    }
}

fn imported_id(line_no: usize) -> String {
    format!("l{line_no}")
}

/// Split a label line into its class id and normalized numbers.
fn split_fields(
    line: &str,
    line_no: usize,
    expected: usize,
    image: Size,
) -> Result<(u32, Vec<f64>), FormatError> {
    if !image.is_usable() {
        return Err(FormatError::invalid_line(line_no, "image dimensions unknown"));
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != expected {
        return Err(FormatError::invalid_line(
            line_no,
            format!("expected {} fields, found {}", expected, fields.len()),
        ));
    }
    let class_id = fields[0]
        .parse::<u32>()
        .map_err(|_| FormatError::invalid_line(line_no, format!("bad class id '{}'", fields[0])))?;
    let values = fields[1..]
        .iter()
        .map(|f| match f.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(FormatError::invalid_line(line_no, format!("bad number '{f}'"))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((class_id, values))
}
