//! Box annotation type and the pure list operations that edit it.
//!
//! Boxes live in image pixel space, independent of the viewport. A box list
//! is treated as a value: every edit produces a new list through one of the
//! `with_*`/`without_*` functions below, so each interaction step can be
//! tested without any UI around it.

use serde::{Deserialize, Serialize};

use super::geometry::{ImageRect, Point};

/// Unique identifier for a box. Opaque to everything but equality.
pub type BoxId = String;

/// A possibly rotated rectangle with a class label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelBox {
    /// Unique identifier, fixed at creation.
    pub id: BoxId,
    /// Class this box is labeled with.
    #[serde(rename = "classId")]
    pub class_id: u32,
    /// Center X in image pixels.
    pub cx: f64,
    /// Center Y in image pixels.
    pub cy: f64,
    /// Width in image pixels.
    pub w: f64,
    /// Height in image pixels.
    pub h: f64,
    /// Rotation in degrees, clockwise on screen. Not range-limited.
    #[serde(default)]
    pub rotation: f64,
}

impl LabelBox {
    pub fn new(id: impl Into<BoxId>, class_id: u32, center: Point, w: f64, h: f64) -> Self {
        Self {
            id: id.into(),
            class_id,
            cx: center.x,
            cy: center.y,
            w,
            h,
            rotation: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn center(&self) -> Point {
        Point::new(self.cx, self.cy)
    }

    /// Render rectangle: top-left of the unrotated frame plus the rotation,
    /// which is applied about the box center.
    pub fn image_rect(&self) -> ImageRect {
        ImageRect {
            x: self.cx - self.w / 2.0,
            y: self.cy - self.h / 2.0,
            width: self.w,
            height: self.h,
            rotation: self.rotation,
        }
    }

    /// The four rotated corners (see [`ImageRect::corners`]).
    pub fn corners(&self) -> [Point; 4] {
        self.image_rect().corners()
    }

    /// Hit test in image space, honouring rotation.
    pub fn contains(&self, point: &Point) -> bool {
        self.image_rect().contains(point)
    }

    /// Size memory captured from this box.
    pub fn size(&self) -> BoxSize {
        BoxSize {
            w: self.w,
            h: self.h,
            rotation: self.rotation,
        }
    }
}

/// Width, height and rotation remembered from the last committed or
/// resized box ("last used size"), used by the stamp gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSize {
    pub w: f64,
    pub h: f64,
    pub rotation: f64,
}

impl BoxSize {
    /// A box of this size centered on `center`.
    pub fn place(&self, id: impl Into<BoxId>, class_id: u32, center: Point) -> LabelBox {
        LabelBox::new(id, class_id, center, self.w, self.h).with_rotation(self.rotation)
    }
}

/// Partial update for a box. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxPatch {
    pub class_id: Option<u32>,
    pub cx: Option<f64>,
    pub cy: Option<f64>,
    pub w: Option<f64>,
    pub h: Option<f64>,
    pub rotation: Option<f64>,
}

impl BoxPatch {
    pub fn class(class_id: u32) -> Self {
        Self {
            class_id: Some(class_id),
            ..Self::default()
        }
    }

    pub fn center(center: Point) -> Self {
        Self {
            cx: Some(center.x),
            cy: Some(center.y),
            ..Self::default()
        }
    }

    pub fn rotation(rotation: f64) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }

    /// Apply to a box, returning the updated copy.
    pub fn apply(&self, b: &LabelBox) -> LabelBox {
        LabelBox {
            id: b.id.clone(),
            class_id: self.class_id.unwrap_or(b.class_id),
            cx: self.cx.unwrap_or(b.cx),
            cy: self.cy.unwrap_or(b.cy),
            w: self.w.unwrap_or(b.w),
            h: self.h.unwrap_or(b.h),
            rotation: self.rotation.unwrap_or(b.rotation),
        }
    }
}

/// Append a box, returning the new list.
pub fn with_box(list: &[LabelBox], b: LabelBox) -> Vec<LabelBox> {
    let mut next = Vec::with_capacity(list.len() + 1);
    next.extend_from_slice(list);
    next.push(b);
    next
}

/// Apply a patch to the box with `id`. Unknown ids leave the list unchanged.
pub fn with_patch(list: &[LabelBox], id: &str, patch: &BoxPatch) -> Vec<LabelBox> {
    list.iter()
        .map(|b| if b.id == id { patch.apply(b) } else { b.clone() })
        .collect()
}

/// Remove the box with `id`, keeping the order of the rest.
pub fn without_box(list: &[LabelBox], id: &str) -> Vec<LabelBox> {
    list.iter().filter(|b| b.id != id).cloned().collect()
}

/// Topmost box under `point` (the last one in render order).
pub fn hit_test<'a>(list: &'a [LabelBox], point: &Point) -> Option<&'a LabelBox> {
    list.iter().rev().find(|b| b.contains(point))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<LabelBox> {
        vec![
            LabelBox::new("a", 0, Point::new(50.0, 50.0), 20.0, 10.0),
            LabelBox::new("b", 1, Point::new(55.0, 50.0), 20.0, 10.0),
            LabelBox::new("c", 0, Point::new(200.0, 200.0), 10.0, 10.0),
        ]
    }

    #[test]
    fn test_image_rect_top_left() {
        let b = LabelBox::new("x", 0, Point::new(50.0, 40.0), 20.0, 10.0).with_rotation(30.0);
        let rect = b.image_rect();
        assert_eq!(rect.x, 40.0);
        assert_eq!(rect.y, 35.0);
        assert_eq!(rect.width, 20.0);
        assert_eq!(rect.height, 10.0);
        assert_eq!(rect.rotation, 30.0);
        assert_eq!(rect.pivot(), b.center());
    }

    #[test]
    fn test_with_box_appends() {
        let list = sample();
        let next = with_box(&list, LabelBox::new("d", 2, Point::ORIGIN, 5.0, 5.0));
        assert_eq!(list.len(), 3);
        assert_eq!(next.len(), 4);
        assert_eq!(next.last().map(|b| b.id.as_str()), Some("d"));
    }

    #[test]
    fn test_with_patch_only_touches_target() {
        let list = sample();
        let next = with_patch(&list, "b", &BoxPatch::center(Point::new(1.0, 2.0)));
        assert_eq!(next[0], list[0]);
        assert_eq!(next[1].cx, 1.0);
        assert_eq!(next[1].cy, 2.0);
        assert_eq!(next[1].w, 20.0);
        assert_eq!(next[2], list[2]);
    }

    #[test]
    fn test_with_patch_unknown_id() {
        let list = sample();
        assert_eq!(with_patch(&list, "zzz", &BoxPatch::class(7)), list);
    }

    #[test]
    fn test_without_box_by_id() {
        let list = sample();
        let next = without_box(&list, "b");
        let ids: Vec<_> = next.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let list = sample();
        // (52, 50) lies in both "a" and "b"; "b" is drawn last
        assert_eq!(hit_test(&list, &Point::new(52.0, 50.0)).map(|b| b.id.as_str()), Some("b"));
        assert!(hit_test(&list, &Point::new(120.0, 120.0)).is_none());
    }

    #[test]
    fn test_size_place() {
        let size = BoxSize {
            w: 40.0,
            h: 30.0,
            rotation: 15.0,
        };
        let b = size.place("s", 3, Point::new(100.0, 100.0));
        assert_eq!(b.center(), Point::new(100.0, 100.0));
        assert_eq!(b.size(), size);
        assert_eq!(b.class_id, 3);
    }

    #[test]
    fn test_serde_has_no_transient_fields() {
        let b = LabelBox::new("j", 1, Point::new(1.0, 2.0), 3.0, 4.0);
        let json = serde_json::to_string(&b).expect("serialize");
        assert!(json.contains("\"classId\":1"));
        assert!(!json.contains("startX"));
        let back: LabelBox = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, b);
    }
}
