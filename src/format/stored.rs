//! Persisted annotation records.
//!
//! A stored record carries the normalized box (as the backing store expects)
//! and, alongside it, the original pixel values. Loading prefers the pixel
//! values so a box survives a round trip even when the image dimensions used
//! to normalize it were stale or zero.

use serde::{Deserialize, Serialize};

use crate::format::yolo::normalize;
use crate::model::{LabelBox, Point, Size};

/// One annotation as written to and read from the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnnotation {
    /// Record id assigned by the store, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub class_id: u32,
    /// Normalized center x in `[0, 1]`
    pub cx: f64,
    /// Normalized center y in `[0, 1]`
    pub cy: f64,
    /// Normalized width in `[0, 1]`
    pub width: f64,
    /// Normalized height in `[0, 1]`
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub px_cx: Option<f64>,
    #[serde(default)]
    pub px_cy: Option<f64>,
    #[serde(default)]
    pub px_width: Option<f64>,
    #[serde(default)]
    pub px_height: Option<f64>,
}

impl StoredAnnotation {
    /// Build a record from a pixel-space box.
    ///
    /// Normalized fields are clamped to `[0, 1]`, a zero image dimension gives
    /// `0`, and negative widths/heights are stored by magnitude.
    pub fn from_box(b: &LabelBox, image: Size) -> Self {
        Self {
            id: Some(b.id.clone()),
            class_id: b.class_id,
            cx: normalize(b.cx, image.width),
            cy: normalize(b.cy, image.height),
            width: normalize(b.w.abs(), image.width),
            height: normalize(b.h.abs(), image.height),
            rotation: b.rotation,
            px_cx: Some(b.cx),
            px_cy: Some(b.cy),
            px_width: Some(b.w),
            px_height: Some(b.h),
        }
    }

    /// Rebuild the pixel-space box. Each pixel field, when present, wins over
    /// re-scaling its normalized counterpart. `fallback_id` is used when the
    /// record has no id.
    pub fn to_box(&self, image: Size, fallback_id: &str) -> LabelBox {
        let id = self.id.clone().unwrap_or_else(|| fallback_id.to_string());
        let center = Point::new(
            self.px_cx.unwrap_or(self.cx * image.width),
            self.px_cy.unwrap_or(self.cy * image.height),
        );
        LabelBox::new(
            id,
            self.class_id,
            center,
            self.px_width.unwrap_or(self.width * image.width),
            self.px_height.unwrap_or(self.height * image.height),
        )
        .with_rotation(self.rotation)
    }
}

/// Convert a whole box list for storage.
pub fn boxes_to_stored(boxes: &[LabelBox], image: Size) -> Vec<StoredAnnotation> {
    boxes.iter().map(|b| StoredAnnotation::from_box(b, image)).collect()
}

/// Convert stored records back to boxes, giving id-less records unique ids.
pub fn stored_to_boxes(records: &[StoredAnnotation], image: Size) -> Vec<LabelBox> {
    records
        .iter()
        .enumerate()
        .map(|(idx, r)| r.to_box(image, &format!("s{idx}")))
        .collect()
}
