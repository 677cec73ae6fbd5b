//! Data models for the labeling engine.

mod annotation;
mod category;
mod geometry;

pub use annotation::{
    BoxId, BoxPatch, BoxSize, LabelBox, hit_test, with_box, with_patch, without_box,
};
pub use category::{ClassDef, ClassList, FALLBACK_COLOR};
pub use geometry::{ImageRect, Point, Size};
