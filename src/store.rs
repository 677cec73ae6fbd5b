//! Per-image box lists, keyed by a stable image key.
//!
//! Lists of different images are independent. The store does not decide when
//! anything is persisted; it records which images changed since they were
//! last marked clean and hands that set to whoever does.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::LabelBox;

/// Box lists for every image touched in this session.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    /// Image key -> box list
    boxes: BTreeMap<String, Vec<LabelBox>>,
    /// Images changed since they were last marked clean
    dirty: BTreeSet<String>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Box list for `key`; empty for unknown images.
    pub fn get_boxes(&self, key: &str) -> &[LabelBox] {
        self.boxes.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether boxes were ever loaded or set for `key`.
    pub fn is_loaded(&self, key: &str) -> bool {
        self.boxes.contains_key(key)
    }

    /// Replace the box list for `key`.
    ///
    /// Returns true and marks the image dirty if the list actually changed.
    pub fn set_boxes(&mut self, key: &str, boxes: Vec<LabelBox>) -> bool {
        if self.boxes.get(key).is_some_and(|current| *current == boxes) {
            return false;
        }
        log::debug!("Store: {} now has {} boxes", key, boxes.len());
        self.boxes.insert(key.to_string(), boxes);
        self.dirty.insert(key.to_string());
        true
    }

    /// Seed `key` with boxes loaded from the backing store. Not an edit.
    pub fn load(&mut self, key: &str, boxes: Vec<LabelBox>) {
        self.boxes.insert(key.to_string(), boxes);
        self.dirty.remove(key);
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        self.dirty.contains(key)
    }

    /// Changed images, in key order.
    pub fn dirty_keys(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    pub fn mark_clean(&mut self, key: &str) {
        self.dirty.remove(key);
    }

    /// All image keys with a box list, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.boxes.keys().map(String::as_str)
    }

    /// Number of images with at least one box.
    pub fn labeled_count(&self) -> usize {
        self.boxes.values().filter(|b| !b.is_empty()).count()
    }

    /// Every image with its boxes, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[LabelBox])> {
        self.boxes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
