//! Interaction state machine for one open image.
//!
//! A [`Canvas`] owns the box list of the current image, the selection, the
//! viewport and the gesture in progress. Input arrives in screen pixels and
//! is mapped to image pixels through the [`Viewport`] only. Every edit to the
//! box list goes through the replace-on-write helpers in [`crate::model`].
//!
//! Gestures:
//!
//! ```text
//! Idle --down on empty canvas--> Drawing --up/leave--> Idle (stamp | commit | discard)
//! Idle --down in pan mode------> Panning --up/leave--> Idle
//! Idle --down on a box---------> Moving  --up/leave--> Idle (commit translate)
//! Idle --down on a handle------> Transforming --up/leave--> Idle (commit resize/rotate)
//! ```

use crate::constants::{
    INITIAL_DRAFT_SIZE, MIN_COMMIT_SIZE, MIN_DRAFT_SIZE, STAMP_CLICK_DISTANCE, handle, zoom,
};
use crate::keybindings::Modifiers;
use crate::model::{
    BoxId, BoxPatch, BoxSize, ImageRect, LabelBox, Point, Size, hit_test, with_box, with_patch,
    without_box,
};
use crate::viewport::Viewport;

/// Transform handles around the selected box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    /// Rotation handle above the top edge.
    Rotate,
}

impl Handle {
    /// The eight resize anchors.
    pub const RESIZE: [Handle; 8] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
    ];

    /// Which edges this handle moves: -1 left/top, 1 right/bottom, 0 neither.
    fn signs(self) -> (f64, f64) {
        match self {
            Handle::TopLeft => (-1.0, -1.0),
            Handle::Top => (0.0, -1.0),
            Handle::TopRight => (1.0, -1.0),
            Handle::Right => (1.0, 0.0),
            Handle::BottomRight => (1.0, 1.0),
            Handle::Bottom => (0.0, 1.0),
            Handle::BottomLeft => (-1.0, 1.0),
            Handle::Left => (-1.0, 0.0),
            Handle::Rotate => (0.0, -1.0),
        }
    }

    /// Handle position in image pixels for a box shown at `scale`.
    ///
    /// Handles keep a constant on-screen distance, so the rotate handle
    /// offset shrinks in image space as the view zooms in.
    pub fn position(self, b: &LabelBox, scale: f64) -> Point {
        let (sx, sy) = self.signs();
        let mut local = Point::new(sx * b.w / 2.0, sy * b.h / 2.0);
        if self == Handle::Rotate {
            local.y -= handle::ROTATE_OFFSET / scale;
        }
        let r = local.rotated(b.rotation);
        b.center().offset(r.x, r.y)
    }
}

/// Handle of `b` under `point`, if any. The rotate handle wins ties.
pub fn handle_at(b: &LabelBox, point: &Point, scale: f64) -> Option<Handle> {
    let radius = handle::HIT_RADIUS / scale;
    std::iter::once(Handle::Rotate)
        .chain(Handle::RESIZE)
        .find(|h| h.position(b, scale).distance_to(point) <= radius)
}

/// Resize `original` by dragging `handle` to `pointer` (image pixels).
///
/// Works in the box's own rotated frame: the edges opposite the handle stay
/// put and the center follows. Width and height may drop below the commit
/// minimum while the gesture is in progress.
pub fn resize_from_handle(original: &LabelBox, handle: Handle, pointer: Point) -> LabelBox {
    let (sx, sy) = handle.signs();
    let c = original.center();
    let q = Point::new(pointer.x - c.x, pointer.y - c.y).rotated(-original.rotation);

    let span = |sign: f64, extent: f64, moving: f64| -> (f64, f64) {
        if sign == 0.0 {
            return (0.0, extent);
        }
        let fixed = -sign * extent / 2.0;
        ((fixed + moving) / 2.0, (moving - fixed).abs())
    };
    let (lcx, w) = span(sx, original.w, q.x);
    let (lcy, h) = span(sy, original.h, q.y);

    let offset = Point::new(lcx, lcy).rotated(original.rotation);
    LabelBox {
        cx: c.x + offset.x,
        cy: c.y + offset.y,
        w,
        h,
        ..original.clone()
    }
}

/// Rotate `original` so its rotate handle points at `pointer`.
pub fn rotate_toward(original: &LabelBox, pointer: Point) -> LabelBox {
    let dx = pointer.x - original.cx;
    let dy = pointer.y - original.cy;
    LabelBox {
        rotation: dy.atan2(dx).to_degrees() + 90.0,
        ..original.clone()
    }
}

/// State of a renderer-side transform node after the user let go of it.
///
/// `x`/`y` is the node position, which under the center-pivot convention is
/// the box center. `width`/`height` are the untransformed node size; the
/// transform itself lives in the scale factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation: f64,
}

/// What a finished draw gesture turns into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReleaseOutcome {
    /// Place a box of the remembered size at the release point.
    Stamp(BoxSize),
    /// Keep the drawn rectangle.
    Commit,
    /// Drop the draft.
    Discard,
}

/// Decide the end of a draw gesture from the pointer travel and the size
/// memory. Evaluated once, at release.
pub fn release_outcome(travel: f64, last_size: Option<BoxSize>, draft: &LabelBox) -> ReleaseOutcome {
    match (travel < STAMP_CLICK_DISTANCE, last_size) {
        (true, Some(size)) => ReleaseOutcome::Stamp(size),
        _ if draft.w < MIN_COMMIT_SIZE || draft.h < MIN_COMMIT_SIZE => ReleaseOutcome::Discard,
        _ => ReleaseOutcome::Commit,
    }
}

/// The gesture in progress. Only one can be active.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Drawing {
        /// Clamped image position at pointer-down; the fixed draft corner.
        anchor: Point,
        draft: LabelBox,
    },
    Panning {
        /// Screen position at pointer-down.
        anchor: Point,
        /// Pan offset at pointer-down.
        origin: Point,
    },
    Moving {
        id: BoxId,
        /// Image position where the box was grabbed.
        grab: Point,
        preview: LabelBox,
    },
    Transforming {
        id: BoxId,
        handle: Handle,
        original: LabelBox,
        preview: LabelBox,
    },
}

/// Raw wheel event data.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelInput {
    pub delta_x: f64,
    pub delta_y: f64,
    pub modifiers: Modifiers,
}

/// Editing state for the image currently on screen.
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    viewport: Viewport,
    boxes: Vec<LabelBox>,
    selected: Option<BoxId>,
    gesture: Gesture,
    pan_mode: bool,
    active_class: u32,
    last_size: Option<BoxSize>,
    /// Hover position for the stamp preview (image space).
    ghost: Option<Point>,
    /// Last pointer position seen (screen space).
    last_pointer: Option<Point>,
    /// Fit to screen on the next layout where both sizes are known.
    needs_fit: bool,
    changed: bool,
    next_id: u64,
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            needs_fit: true,
            ..Self::default()
        }
    }

    // ---- image lifecycle ----

    /// Switch to another image.
    ///
    /// Any gesture in progress is abandoned without committing, selection is
    /// cleared, and fit-to-screen is re-armed for the next layout. The size
    /// memory carries over so stamping works across images.
    pub fn load_image(&mut self, boxes: Vec<LabelBox>, image_size: Option<Size>) {
        if self.gesture != Gesture::Idle {
            log::debug!("Abandoning gesture on image switch");
        }
        self.boxes = boxes;
        self.selected = None;
        self.gesture = Gesture::Idle;
        self.ghost = None;
        self.changed = false;
        self.needs_fit = true;
        self.viewport.set_image_size(image_size.unwrap_or_default());
        self.fit_if_armed();
    }

    /// Record the decoded image dimensions once they are known.
    pub fn set_image_size(&mut self, size: Size) {
        self.viewport.set_image_size(size);
        self.fit_if_armed();
    }

    /// Record the viewport dimensions (layout pass).
    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport.set_viewport_size(size);
        self.fit_if_armed();
    }

    fn fit_if_armed(&mut self) {
        if self.needs_fit && self.viewport.is_ready() {
            self.viewport.fit_to_screen();
            self.needs_fit = false;
        }
    }

    // ---- accessors ----

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn boxes(&self) -> &[LabelBox] {
        &self.boxes
    }

    /// Replace the box list from outside (e.g. a reload). Does not count as
    /// an edit.
    pub fn set_boxes(&mut self, boxes: Vec<LabelBox>) {
        if let Some(id) = &self.selected {
            if !boxes.iter().any(|b| &b.id == id) {
                self.selected = None;
            }
        }
        self.boxes = boxes;
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_box(&self) -> Option<&LabelBox> {
        let id = self.selected.as_deref()?;
        self.boxes.iter().find(|b| b.id == id)
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn pan_mode(&self) -> bool {
        self.pan_mode
    }

    pub fn active_class(&self) -> u32 {
        self.active_class
    }

    pub fn last_size(&self) -> Option<BoxSize> {
        self.last_size
    }

    /// The in-progress draft while drawing.
    pub fn draft(&self) -> Option<&LabelBox> {
        match &self.gesture {
            Gesture::Drawing { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// The box being moved or transformed, as it should be drawn right now.
    pub fn edit_preview(&self) -> Option<&LabelBox> {
        match &self.gesture {
            Gesture::Moving { preview, .. } | Gesture::Transforming { preview, .. } => {
                Some(preview)
            }
            _ => None,
        }
    }

    /// Stamp preview under the pointer, when a click would stamp.
    pub fn ghost_rect(&self) -> Option<ImageRect> {
        if self.pan_mode || matches!(self.gesture, Gesture::Drawing { .. }) {
            return None;
        }
        let size = self.last_size?;
        let at = self.ghost?;
        Some(size.place("", self.active_class, at).image_rect())
    }

    /// True if the box list changed since the last call. Resets the flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    // ---- pointer input ----

    pub fn pointer_down(&mut self, screen: Point) {
        self.last_pointer = Some(screen);

        if self.pan_mode {
            self.gesture = Gesture::Panning {
                anchor: screen,
                origin: self.viewport.pan(),
            };
            log::debug!("Pan started at ({:.1}, {:.1})", screen.x, screen.y);
            return;
        }

        let image_size = self.viewport.image_size();
        if !image_size.is_usable() {
            return;
        }
        let p = self.viewport.screen_to_image(screen);
        let scale = self.viewport.scale();

        if let Some(selected) = self.selected_box().cloned() {
            if let Some(handle) = handle_at(&selected, &p, scale) {
                log::debug!("Transform {:?} on box {}", handle, selected.id);
                self.gesture = Gesture::Transforming {
                    id: selected.id.clone(),
                    handle,
                    original: selected.clone(),
                    preview: selected,
                };
                return;
            }
        }

        if let Some(hit) = hit_test(&self.boxes, &p) {
            log::debug!("Selected box {}", hit.id);
            self.selected = Some(hit.id.clone());
            self.gesture = Gesture::Moving {
                id: hit.id.clone(),
                grab: p,
                preview: hit.clone(),
            };
            return;
        }

        let anchor = p.clamped_to(image_size);
        self.selected = None;
        let id = self.fresh_id();
        self.gesture = Gesture::Drawing {
            anchor,
            draft: LabelBox::new(
                id,
                self.active_class,
                anchor,
                INITIAL_DRAFT_SIZE,
                INITIAL_DRAFT_SIZE,
            ),
        };
        log::debug!("Draw started at ({:.1}, {:.1})", anchor.x, anchor.y);
    }

    pub fn pointer_move(&mut self, screen: Point) {
        self.last_pointer = Some(screen);

        if let Gesture::Panning { anchor, origin } = self.gesture {
            self.viewport.set_pan(origin.offset(screen.x - anchor.x, screen.y - anchor.y));
            return;
        }

        let image_size = self.viewport.image_size();
        if !image_size.is_usable() {
            return;
        }
        let raw = self.viewport.screen_to_image(screen);
        let p = raw.clamped_to(image_size);
        log::trace!("Pointer at ({:.1}, {:.1})", p.x, p.y);

        match &mut self.gesture {
            Gesture::Idle => {
                if self.last_size.is_some() && !self.pan_mode {
                    self.ghost = Some(p);
                }
            }
            Gesture::Drawing { anchor, draft } => span_draft(draft, *anchor, p),
            Gesture::Moving { grab, preview, .. } => {
                let (dx, dy) = (raw.x - grab.x, raw.y - grab.y);
                if let Some(original) = self.boxes.iter().find(|b| b.id == preview.id) {
                    preview.cx = original.cx + dx;
                    preview.cy = original.cy + dy;
                }
            }
            Gesture::Transforming {
                handle,
                original,
                preview,
                ..
            } => {
                *preview = match handle {
                    Handle::Rotate => rotate_toward(original, raw),
                    h => resize_from_handle(original, *h, raw),
                };
            }
            Gesture::Panning { .. } => {}
        }
    }

    pub fn pointer_up(&mut self, screen: Point) {
        self.last_pointer = Some(screen);
        let gesture = std::mem::take(&mut self.gesture);
        match gesture {
            Gesture::Idle => {}
            Gesture::Panning { .. } => log::debug!("Pan ended"),
            Gesture::Drawing { anchor, mut draft } => {
                let image_size = self.viewport.image_size();
                let raw = self.viewport.screen_to_image(screen);
                span_draft(&mut draft, anchor, raw.clamped_to(image_size));
                self.finish_draw(anchor, raw, draft);
            }
            Gesture::Moving { id, preview, .. } => {
                let original = self.boxes.iter().find(|b| b.id == id);
                if original.is_some_and(|b| b.center() != preview.center()) {
                    self.boxes = with_patch(&self.boxes, &id, &BoxPatch::center(preview.center()));
                    self.changed = true;
                    log::info!("Moved box {} to ({:.1}, {:.1})", id, preview.cx, preview.cy);
                }
            }
            Gesture::Transforming {
                id,
                original,
                preview,
                ..
            } => {
                if preview == original {
                    log::debug!("Handle released without change on box {}", id);
                    return;
                }
                self.commit_transform(&id, preview.center(), preview.w, preview.h, preview.rotation);
            }
        }
    }

    /// Pointer left the canvas: ends the gesture exactly like a release at
    /// the last known position.
    pub fn pointer_leave(&mut self) {
        let at = self.last_pointer.or_else(|| {
            self.draft()
                .map(|d| self.viewport.image_to_screen(d.center()))
        });
        match at {
            Some(at) => self.pointer_up(at),
            None => self.gesture = Gesture::Idle,
        }
        self.ghost = None;
    }

    fn finish_draw(&mut self, down: Point, up: Point, draft: LabelBox) {
        let travel = up.distance_to(&down);
        match release_outcome(travel, self.last_size, &draft) {
            ReleaseOutcome::Stamp(size) => {
                let stamped = size.place(draft.id, self.active_class, up);
                log::info!(
                    "Stamped box {} at ({:.1}, {:.1}) size {:.1}x{:.1}",
                    stamped.id,
                    up.x,
                    up.y,
                    size.w,
                    size.h
                );
                self.selected = Some(stamped.id.clone());
                self.boxes = with_box(&self.boxes, stamped);
                self.changed = true;
            }
            ReleaseOutcome::Discard => {
                log::debug!("Discarded draft {:.1}x{:.1}", draft.w, draft.h);
            }
            ReleaseOutcome::Commit => {
                log::info!(
                    "Created box {} ({:.1}, {:.1}) {:.1}x{:.1}",
                    draft.id,
                    draft.cx,
                    draft.cy,
                    draft.w,
                    draft.h
                );
                self.last_size = Some(draft.size());
                self.selected = Some(draft.id.clone());
                self.boxes = with_box(&self.boxes, draft);
                self.changed = true;
            }
        }
    }

    fn commit_transform(&mut self, id: &str, center: Point, w: f64, h: f64, rotation: f64) {
        if !self.boxes.iter().any(|b| b.id == id) {
            return;
        }
        let patch = BoxPatch {
            cx: Some(center.x),
            cy: Some(center.y),
            w: Some(w.max(MIN_DRAFT_SIZE)),
            h: Some(h.max(MIN_DRAFT_SIZE)),
            rotation: Some(rotation),
            ..BoxPatch::default()
        };
        self.boxes = with_patch(&self.boxes, id, &patch);
        self.last_size = self.boxes.iter().find(|b| b.id == id).map(LabelBox::size);
        self.changed = true;
        log::info!("Transformed box {}", id);
    }

    /// Apply a finished renderer-side transform to box `id`.
    ///
    /// The node's scale factors are folded into the box width and height and
    /// then reset to 1, so the next transform starts from an unscaled node.
    pub fn apply_node_transform(&mut self, id: &str, node: &mut NodeTransform) {
        let w = node.width * node.scale_x;
        let h = node.height * node.scale_y;
        node.scale_x = 1.0;
        node.scale_y = 1.0;
        self.commit_transform(id, Point::new(node.x, node.y), w.abs(), h.abs(), node.rotation);
    }

    pub fn wheel(&mut self, input: WheelInput, screen: Point) {
        if input.modifiers.command() {
            let factor = if input.delta_y > 0.0 {
                1.0 / zoom::WHEEL_FACTOR
            } else {
                zoom::WHEEL_FACTOR
            };
            self.viewport.zoom_at(factor, screen);
            return;
        }
        let (dx, dy) = if input.modifiers.shift {
            (-input.delta_y * zoom::WHEEL_PAN_FACTOR, 0.0)
        } else {
            (
                -input.delta_x * zoom::WHEEL_PAN_FACTOR,
                -input.delta_y * zoom::WHEEL_PAN_FACTOR,
            )
        };
        self.viewport.pan_by(dx, dy);
    }

    pub fn double_click(&mut self) {
        self.fit();
    }

    // ---- editing ----

    /// Select a box by id. Unknown ids clear the selection.
    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id
            .filter(|id| self.boxes.iter().any(|b| b.id == *id))
            .map(str::to_string);
    }

    /// Change the active class; a selected box is re-tagged immediately.
    pub fn set_active_class(&mut self, class_id: u32) {
        self.active_class = class_id;
        let Some(id) = self.selected.clone() else {
            return;
        };
        if self.selected_box().is_some_and(|b| b.class_id != class_id) {
            self.boxes = with_patch(&self.boxes, &id, &BoxPatch::class(class_id));
            self.changed = true;
            log::info!("Re-tagged box {} as class {}", id, class_id);
        }
    }

    /// Remove the selected box and clear the selection.
    pub fn delete_selected(&mut self) -> Option<LabelBox> {
        let id = self.selected.take()?;
        let removed = self.boxes.iter().find(|b| b.id == id).cloned()?;
        self.boxes = without_box(&self.boxes, &id);
        self.changed = true;
        log::info!("Deleted box {}", id);
        Some(removed)
    }

    /// Turn pan mode on or off. Abandons a gesture in progress.
    pub fn set_pan_mode(&mut self, on: bool) {
        if self.pan_mode != on {
            self.pan_mode = on;
            self.gesture = Gesture::Idle;
            self.ghost = None;
            log::debug!("Pan mode {}", if on { "on" } else { "off" });
        }
    }

    pub fn toggle_pan_mode(&mut self) {
        self.set_pan_mode(!self.pan_mode);
    }

    // ---- view controls ----

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_at_center(zoom::BUTTON_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_at_center(1.0 / zoom::BUTTON_FACTOR);
    }

    pub fn fit(&mut self) {
        self.viewport.fit_to_screen();
    }

    pub fn actual_size(&mut self) {
        self.viewport.actual_size();
    }

    /// Center the view on an image point (minimap navigation).
    pub fn center_on_image_point(&mut self, p: Point) {
        self.viewport.center_on(p);
    }

    fn fresh_id(&mut self) -> BoxId {
        loop {
            self.next_id += 1;
            let id = format!("b{}", self.next_id);
            if !self.boxes.iter().any(|b| b.id == id) {
                return id;
            }
        }
    }
}

/// Reshape the draft into the axis-aligned rectangle spanning `anchor` and `p`.
fn span_draft(draft: &mut LabelBox, anchor: Point, p: Point) {
    let (left, right) = (anchor.x.min(p.x), anchor.x.max(p.x));
    let (top, bottom) = (anchor.y.min(p.y), anchor.y.max(p.y));
    draft.cx = (left + right) / 2.0;
    draft.cy = (top + bottom) / 2.0;
    draft.w = (right - left).max(MIN_DRAFT_SIZE);
    draft.h = (bottom - top).max(MIN_DRAFT_SIZE);
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    /// 1000x1000 image in a 1000x1000 viewport: screen and image coincide.
    fn canvas() -> Canvas {
        let mut c = Canvas::new();
        c.load_image(Vec::new(), Some(Size::new(1000.0, 1000.0)));
        c.set_viewport_size(Size::new(1000.0, 1000.0));
        c
    }

    fn drag(c: &mut Canvas, from: (f64, f64), to: (f64, f64)) {
        c.pointer_down(Point::new(from.0, from.1));
        c.pointer_move(Point::new(to.0, to.1));
        c.pointer_up(Point::new(to.0, to.1));
    }

    #[test]
    fn test_fit_on_first_layout() {
        let c = canvas();
        assert!(approx_eq(c.viewport().scale(), 1.0));
        assert_eq!(c.viewport().pan(), Point::ORIGIN);
    }

    #[test]
    fn test_draw_commits_and_selects() {
        let mut c = canvas();
        drag(&mut c, (100.0, 100.0), (150.0, 130.0));
        assert_eq!(c.boxes().len(), 1);
        let b = &c.boxes()[0];
        assert_eq!((b.cx, b.cy, b.w, b.h), (125.0, 115.0, 50.0, 30.0));
        assert_eq!(c.selected_id(), Some(b.id.as_str()));
        assert_eq!(
            c.last_size(),
            Some(BoxSize {
                w: 50.0,
                h: 30.0,
                rotation: 0.0
            })
        );
        assert!(c.take_changed());
        assert!(!c.take_changed());
    }

    #[test]
    fn test_draw_backwards() {
        let mut c = canvas();
        drag(&mut c, (150.0, 130.0), (100.0, 100.0));
        let b = &c.boxes()[0];
        assert_eq!((b.cx, b.cy, b.w, b.h), (125.0, 115.0, 50.0, 30.0));
    }

    #[test]
    fn test_stamp_uses_last_size() {
        let mut c = canvas();
        c.last_size = Some(BoxSize {
            w: 40.0,
            h: 30.0,
            rotation: 15.0,
        });
        c.pointer_down(Point::new(500.0, 500.0));
        c.pointer_up(Point::new(502.0, 501.0));
        assert_eq!(c.boxes().len(), 1);
        assert_eq!((c.boxes()[0].cx, c.boxes()[0].cy), (502.0, 501.0));

        c.pointer_down(Point::new(100.0, 100.0));
        c.pointer_up(Point::new(100.0, 100.0));
        let b = &c.boxes()[1];
        assert_eq!((b.cx, b.cy, b.w, b.h, b.rotation), (100.0, 100.0, 40.0, 30.0, 15.0));
        assert_eq!(c.selected_id(), Some(b.id.as_str()));
    }

    #[test]
    fn test_tiny_drag_discarded_without_size_memory() {
        let mut c = canvas();
        drag(&mut c, (100.0, 100.0), (103.0, 101.0));
        assert!(c.boxes().is_empty());
        // long but flat drag
        drag(&mut c, (100.0, 100.0), (200.0, 102.0));
        assert!(c.boxes().is_empty());
        assert!(!c.take_changed());
    }

    #[test]
    fn test_release_table() {
        let size = BoxSize {
            w: 10.0,
            h: 10.0,
            rotation: 0.0,
        };
        let small = LabelBox::new("d", 0, Point::ORIGIN, 1.0, 1.0);
        let big = LabelBox::new("d", 0, Point::ORIGIN, 50.0, 50.0);
        assert_eq!(release_outcome(1.0, Some(size), &small), ReleaseOutcome::Stamp(size));
        assert_eq!(release_outcome(1.0, None, &small), ReleaseOutcome::Discard);
        assert_eq!(release_outcome(80.0, Some(size), &small), ReleaseOutcome::Discard);
        assert_eq!(release_outcome(80.0, Some(size), &big), ReleaseOutcome::Commit);
    }

    #[test]
    fn test_draw_clamps_to_image() {
        let mut c = Canvas::new();
        c.load_image(Vec::new(), Some(Size::new(100.0, 100.0)));
        c.set_viewport_size(Size::new(100.0, 100.0));
        drag(&mut c, (80.0, 80.0), (140.0, 130.0));
        let b = &c.boxes()[0];
        assert_eq!((b.cx, b.cy, b.w, b.h), (90.0, 90.0, 20.0, 20.0));
    }

    #[test]
    fn test_no_draw_without_image_size() {
        let mut c = Canvas::new();
        c.load_image(Vec::new(), None);
        c.set_viewport_size(Size::new(800.0, 600.0));
        drag(&mut c, (10.0, 10.0), (100.0, 100.0));
        assert!(c.boxes().is_empty());
        assert_eq!(*c.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_image_switch_abandons_gesture() {
        let mut c = canvas();
        c.pointer_down(Point::new(10.0, 10.0));
        c.pointer_move(Point::new(200.0, 200.0));
        assert!(c.draft().is_some());
        c.load_image(Vec::new(), Some(Size::new(500.0, 500.0)));
        assert_eq!(*c.gesture(), Gesture::Idle);
        c.pointer_up(Point::new(200.0, 200.0));
        assert!(c.boxes().is_empty());
        assert!(c.selected_id().is_none());
        // fit is re-armed for the new image
        assert!(approx_eq(c.viewport().scale(), 2.0));
    }

    #[test]
    fn test_pointer_down_on_empty_clears_selection() {
        let mut c = canvas();
        drag(&mut c, (100.0, 100.0), (150.0, 150.0));
        assert!(c.selected_id().is_some());
        c.pointer_down(Point::new(600.0, 600.0));
        assert!(c.selected_id().is_none());
    }

    #[test]
    fn test_pointer_leave_finishes_draw() {
        let mut c = canvas();
        c.pointer_down(Point::new(100.0, 100.0));
        c.pointer_move(Point::new(160.0, 140.0));
        c.pointer_leave();
        assert_eq!(c.boxes().len(), 1);
        assert_eq!(*c.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_panning() {
        let mut c = canvas();
        c.set_pan_mode(true);
        c.pointer_down(Point::new(10.0, 10.0));
        c.pointer_move(Point::new(30.0, 50.0));
        assert_eq!(c.viewport().pan(), Point::new(20.0, 40.0));
        c.pointer_move(Point::new(0.0, 0.0));
        assert_eq!(c.viewport().pan(), Point::new(-10.0, -10.0));
        c.pointer_leave();
        assert_eq!(*c.gesture(), Gesture::Idle);
        assert!(c.boxes().is_empty());
    }

    #[test]
    fn test_move_selected_box() {
        let mut c = canvas();
        drag(&mut c, (100.0, 100.0), (150.0, 130.0));
        c.take_changed();
        drag(&mut c, (125.0, 115.0), (135.0, 120.0));
        let b = &c.boxes()[0];
        assert_eq!((b.cx, b.cy, b.w, b.h), (135.0, 120.0, 50.0, 30.0));
        assert!(c.take_changed());
    }

    #[test]
    fn test_click_selects_box() {
        let mut c = Canvas::new();
        let boxes = vec![LabelBox::new("x", 0, Point::new(300.0, 300.0), 40.0, 40.0)];
        c.load_image(boxes, Some(Size::new(1000.0, 1000.0)));
        c.set_viewport_size(Size::new(1000.0, 1000.0));
        c.pointer_down(Point::new(310.0, 305.0));
        c.pointer_up(Point::new(310.0, 305.0));
        assert_eq!(c.selected_id(), Some("x"));
        assert!(!c.take_changed());
    }

    #[test]
    fn test_resize_from_right_handle() {
        let mut c = canvas();
        drag(&mut c, (100.0, 100.0), (150.0, 130.0));
        drag(&mut c, (150.0, 115.0), (170.0, 115.0));
        let b = &c.boxes()[0];
        assert!(approx_eq(b.w, 70.0));
        assert!(approx_eq(b.cx, 135.0));
        assert!(approx_eq(b.h, 30.0));
        assert!(approx_eq(b.cy, 115.0));
        assert_eq!(c.last_size().map(|s| s.w), Some(b.w));
    }

    #[test]
    fn test_handle_click_without_drag_is_not_an_edit() {
        let mut c = canvas();
        drag(&mut c, (100.0, 100.0), (150.0, 130.0));
        drag(&mut c, (300.0, 300.0), (400.0, 340.0));
        assert!(c.take_changed());

        // select the first box, then press and release its right handle
        c.pointer_down(Point::new(125.0, 115.0));
        c.pointer_up(Point::new(125.0, 115.0));
        c.pointer_down(Point::new(150.0, 115.0));
        assert!(matches!(
            c.gesture(),
            Gesture::Transforming {
                handle: Handle::Right,
                ..
            }
        ));
        c.pointer_up(Point::new(150.0, 115.0));

        assert!(!c.take_changed());
        assert_eq!(c.last_size().map(|s| (s.w, s.h)), Some((100.0, 40.0)));
        assert_eq!((c.boxes()[0].w, c.boxes()[0].h), (50.0, 30.0));
    }

    #[test]
    fn test_resize_rotated_keeps_opposite_edge() {
        let original = LabelBox::new("r", 0, Point::new(50.0, 50.0), 20.0, 10.0).with_rotation(90.0);
        // Right handle of a 90 degree box sits below the center
        let right = Handle::Right.position(&original, 1.0);
        assert!(approx_eq(right.x, 50.0));
        assert!(approx_eq(right.y, 60.0));
        let resized = resize_from_handle(&original, Handle::Right, Point::new(50.0, 70.0));
        assert!(approx_eq(resized.w, 30.0));
        assert!(approx_eq(resized.cx, 50.0));
        assert!(approx_eq(resized.cy, 55.0));
        assert!(approx_eq(resized.h, 10.0));
    }

    #[test]
    fn test_rotate_handle() {
        let mut c = canvas();
        drag(&mut c, (100.0, 100.0), (150.0, 130.0));
        // rotate handle sits 50 screen px above the top edge
        c.pointer_down(Point::new(125.0, 50.0));
        assert!(matches!(
            c.gesture(),
            Gesture::Transforming {
                handle: Handle::Rotate,
                ..
            }
        ));
        c.pointer_move(Point::new(200.0, 115.0));
        c.pointer_up(Point::new(200.0, 115.0));
        let b = &c.boxes()[0];
        assert!(approx_eq(b.rotation, 90.0));
        assert_eq!((b.w, b.h), (50.0, 30.0));
        assert!(approx_eq(c.last_size().map(|s| s.rotation).unwrap_or(0.0), 90.0));
    }

    #[test]
    fn test_node_transform_resets_scale() {
        let mut c = canvas();
        drag(&mut c, (100.0, 100.0), (150.0, 130.0));
        let id = c.boxes()[0].id.clone();
        let mut node = NodeTransform {
            x: 200.0,
            y: 210.0,
            width: 50.0,
            height: 30.0,
            scale_x: 2.0,
            scale_y: 0.5,
            rotation: 30.0,
        };
        c.apply_node_transform(&id, &mut node);
        assert_eq!((node.scale_x, node.scale_y), (1.0, 1.0));
        let b = &c.boxes()[0];
        assert_eq!((b.cx, b.cy, b.w, b.h, b.rotation), (200.0, 210.0, 100.0, 15.0, 30.0));
        assert_eq!(
            c.last_size(),
            Some(BoxSize {
                w: 100.0,
                h: 15.0,
                rotation: 30.0
            })
        );
    }

    #[test]
    fn test_active_class_retags_selection() {
        let mut c = canvas();
        drag(&mut c, (100.0, 100.0), (150.0, 130.0));
        c.take_changed();
        c.set_active_class(3);
        assert_eq!(c.boxes()[0].class_id, 3);
        assert!(c.take_changed());

        c.select(None);
        c.set_active_class(1);
        assert_eq!(c.boxes()[0].class_id, 3);
        assert!(!c.take_changed());
    }

    #[test]
    fn test_delete_selected() {
        let mut c = canvas();
        drag(&mut c, (100.0, 100.0), (150.0, 130.0));
        drag(&mut c, (300.0, 300.0), (350.0, 350.0));
        let first = c.boxes()[0].id.clone();
        let removed = c.delete_selected().expect("removed");
        assert_ne!(removed.id, first);
        assert_eq!(c.boxes().len(), 1);
        assert_eq!(c.boxes()[0].id, first);
        assert!(c.selected_id().is_none());
        assert!(c.delete_selected().is_none());
    }

    #[test]
    fn test_ghost_preview() {
        let mut c = canvas();
        c.pointer_move(Point::new(10.0, 10.0));
        assert!(c.ghost_rect().is_none());
        drag(&mut c, (100.0, 100.0), (140.0, 130.0));
        c.pointer_move(Point::new(500.0, 500.0));
        let ghost = c.ghost_rect().expect("ghost");
        assert_eq!(ghost.pivot(), Point::new(500.0, 500.0));
        assert_eq!((ghost.width, ghost.height), (40.0, 30.0));
        c.set_pan_mode(true);
        assert!(c.ghost_rect().is_none());
    }

    #[test]
    fn test_wheel_zoom_keeps_cursor_point() {
        let mut c = canvas();
        let cursor = Point::new(321.0, 123.0);
        let before = c.viewport().screen_to_image(cursor);
        let ctrl = WheelInput {
            delta_y: -100.0,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
            ..WheelInput::default()
        };
        c.wheel(ctrl, cursor);
        assert!(approx_eq(c.viewport().scale(), 1.1));
        let after = c.viewport().screen_to_image(cursor);
        assert!((before.x - after.x).abs() < 1e-6);
        assert!((before.y - after.y).abs() < 1e-6);
    }

    #[test]
    fn test_wheel_pans() {
        let mut c = canvas();
        c.wheel(
            WheelInput {
                delta_x: 10.0,
                delta_y: 20.0,
                ..WheelInput::default()
            },
            Point::ORIGIN,
        );
        assert!(approx_eq(c.viewport().pan().x, -9.0));
        assert!(approx_eq(c.viewport().pan().y, -18.0));

        c.wheel(
            WheelInput {
                delta_y: 10.0,
                modifiers: Modifiers {
                    shift: true,
                    ..Modifiers::NONE
                },
                ..WheelInput::default()
            },
            Point::ORIGIN,
        );
        assert!(approx_eq(c.viewport().pan().x, -18.0));
        assert!(approx_eq(c.viewport().pan().y, -18.0));
    }

    #[test]
    fn test_zoom_buttons_and_double_click() {
        let mut c = canvas();
        c.zoom_in();
        assert!(approx_eq(c.viewport().scale(), 1.2));
        assert_eq!(c.viewport().zoom_percent(), 120);
        c.zoom_out();
        assert!(approx_eq(c.viewport().scale(), 1.0));
        c.zoom_in();
        c.double_click();
        assert!(approx_eq(c.viewport().scale(), 1.0));
        assert_eq!(c.viewport().pan(), Point::ORIGIN);
    }

    #[test]
    fn test_ids_are_unique_against_loaded_boxes() {
        let mut c = Canvas::new();
        let boxes = vec![LabelBox::new("b1", 0, Point::new(900.0, 900.0), 10.0, 10.0)];
        c.load_image(boxes, Some(Size::new(1000.0, 1000.0)));
        c.set_viewport_size(Size::new(1000.0, 1000.0));
        drag(&mut c, (100.0, 100.0), (150.0, 150.0));
        assert_eq!(c.boxes().len(), 2);
        assert_ne!(c.boxes()[0].id, c.boxes()[1].id);
    }
}
