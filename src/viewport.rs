//! Viewport controller: zoom, pan and the image/screen coordinate mapping.
//!
//! The mapping is a uniform scale followed by a translation:
//!
//! ```text
//! screen = image * scale + pan
//! ```
//!
//! Nothing outside this module does scale/pan arithmetic. Every mutating
//! operation is a no-op while the image or viewport size is unknown (zero),
//! which keeps NaN out of box geometry.

use crate::constants::{minimap, zoom};
use crate::model::{Point, Size};

/// Pan/zoom transform state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub pan: Point,
}

impl Transform {
    /// Create a new transform with the given scale and pan.
    pub fn new(scale: f64, pan: Point) -> Self {
        Self { scale, pan }
    }

    /// Create an identity transform (scale=1, no pan).
    pub fn identity() -> Self {
        Self::new(1.0, Point::ORIGIN)
    }

    pub fn image_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.pan.x, p.y * self.scale + self.pan.y)
    }

    pub fn screen_to_image(&self, p: Point) -> Point {
        Point::new((p.x - self.pan.x) / self.scale, (p.y - self.pan.y) / self.scale)
    }

    /// Calculate zoom-to-cursor transformation.
    ///
    /// The image point under `cursor` is computed with the current scale,
    /// then the pan is solved so the same image point sits under `cursor`
    /// at `new_scale`.
    pub fn zoom_to_cursor(&self, new_scale: f64, cursor: Point) -> Transform {
        let image_point = self.screen_to_image(cursor);
        Transform {
            scale: new_scale,
            pan: Point::new(
                cursor.x - image_point.x * new_scale,
                cursor.y - image_point.y * new_scale,
            ),
        }
    }

    /// Apply a pan delta to the transform.
    pub fn pan_by(&self, dx: f64, dy: f64) -> Transform {
        Transform {
            scale: self.scale,
            pan: self.pan.offset(dx, dy),
        }
    }

    /// Transform that shows `image` at `scale`, centered in `screen`.
    pub fn centered(image: Size, screen: Size, scale: f64) -> Transform {
        Transform {
            scale,
            pan: Point::new(
                (screen.width - image.width * scale) / 2.0,
                (screen.height - image.height * scale) / 2.0,
            ),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Region of the image currently visible, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Viewport state for one canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    transform: Transform,
    image: Size,
    screen: Size,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            transform: Transform::identity(),
            image: Size::default(),
            screen: Size::default(),
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn scale(&self) -> f64 {
        self.transform.scale
    }

    pub fn pan(&self) -> Point {
        self.transform.pan
    }

    pub fn image_size(&self) -> Size {
        self.image
    }

    pub fn viewport_size(&self) -> Size {
        self.screen
    }

    /// Record the decoded image dimensions (zero while unknown).
    pub fn set_image_size(&mut self, size: Size) {
        self.image = size;
    }

    /// Record the on-screen viewport dimensions.
    pub fn set_viewport_size(&mut self, size: Size) {
        self.screen = size;
    }

    /// True once both image and viewport sizes are known.
    pub fn is_ready(&self) -> bool {
        self.image.is_usable() && self.screen.is_usable()
    }

    /// Scale at which the whole image fits the viewport (1.0 while unknown).
    ///
    /// Not limited to downscaling: small images fit with a scale above 1.
    pub fn fit_scale(&self) -> f64 {
        if !self.is_ready() {
            return 1.0;
        }
        (self.screen.width / self.image.width).min(self.screen.height / self.image.height)
    }

    pub fn min_scale(&self) -> f64 {
        zoom::MIN_FLOOR.max(self.fit_scale() * zoom::MIN_FIT_RATIO)
    }

    pub fn max_scale(&self) -> f64 {
        zoom::MAX
    }

    /// Zoom level as a rounded percentage.
    pub fn zoom_percent(&self) -> i64 {
        (self.transform.scale * 100.0).round() as i64
    }

    /// Fit the image to the viewport and center it.
    pub fn fit_to_screen(&mut self) {
        if !self.is_ready() {
            return;
        }
        self.transform = Transform::centered(self.image, self.screen, self.fit_scale());
        log::debug!(
            "Fit to screen: scale {:.3}, pan ({:.1}, {:.1})",
            self.transform.scale,
            self.transform.pan.x,
            self.transform.pan.y
        );
    }

    /// Show the image at 100% and center it.
    pub fn actual_size(&mut self) {
        if !self.is_ready() {
            return;
        }
        self.transform = Transform::centered(self.image, self.screen, 1.0);
        log::debug!("Actual size");
    }

    /// Multiply the scale by `factor`, keeping the image point under
    /// `screen_point` fixed. The new scale is clamped to
    /// `[min_scale, max_scale]`.
    pub fn zoom_at(&mut self, factor: f64, screen_point: Point) {
        if !self.is_ready() || !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let next = (self.transform.scale * factor).clamp(self.min_scale(), self.max_scale());
        self.transform = self.transform.zoom_to_cursor(next, screen_point);
        log::trace!("Zoom at ({:.1}, {:.1}): {:.3}", screen_point.x, screen_point.y, next);
    }

    /// Zoom about the viewport center (toolbar buttons).
    pub fn zoom_at_center(&mut self, factor: f64) {
        let center = Point::new(self.screen.width / 2.0, self.screen.height / 2.0);
        self.zoom_at(factor, center);
    }

    /// Translate the pan offset by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if !self.is_ready() || !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.transform = self.transform.pan_by(dx, dy);
    }

    /// Replace the pan offset (used by drag-panning from a recorded origin).
    pub fn set_pan(&mut self, pan: Point) {
        if !self.is_ready() || !pan.x.is_finite() || !pan.y.is_finite() {
            return;
        }
        self.transform.pan = pan;
    }

    /// Pan so `image_point` sits at the viewport center.
    pub fn center_on(&mut self, image_point: Point) {
        let scale = self.transform.scale;
        self.set_pan(Point::new(
            self.screen.width / 2.0 - image_point.x * scale,
            self.screen.height / 2.0 - image_point.y * scale,
        ));
    }

    pub fn screen_to_image(&self, screen_point: Point) -> Point {
        self.transform.screen_to_image(screen_point)
    }

    pub fn image_to_screen(&self, image_point: Point) -> Point {
        self.transform.image_to_screen(image_point)
    }

    /// Part of the image currently on screen, clamped to the image bounds.
    pub fn visible_region(&self) -> Option<VisibleRegion> {
        if !self.image.is_usable() {
            return None;
        }
        let Transform { scale, pan } = self.transform;
        Some(VisibleRegion {
            x: (-pan.x / scale).clamp(0.0, self.image.width),
            y: (-pan.y / scale).clamp(0.0, self.image.height),
            width: (self.screen.width / scale).clamp(0.0, self.image.width),
            height: (self.screen.height / scale).clamp(0.0, self.image.height),
        })
    }
}

/// Thumbnail overview mapping for an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimap {
    /// Thumbnail pixels per image pixel.
    pub scale: f64,
    pub width: f64,
    pub height: f64,
}

impl Minimap {
    const MIN_WIDTH: f64 = 80.0;
    const MIN_HEIGHT: f64 = 60.0;

    pub fn for_image(image: Size) -> Option<Self> {
        if !image.is_usable() {
            return None;
        }
        let scale = (minimap::MAX_WIDTH / image.width).min(minimap::MAX_HEIGHT / image.height);
        Some(Self {
            scale,
            width: Self::MIN_WIDTH.max(image.width * scale),
            height: Self::MIN_HEIGHT.max(image.height * scale),
        })
    }

    /// Map a point inside the thumbnail to image pixels.
    pub fn to_image(&self, local: Point) -> Point {
        let clamped = local.clamped_to(Size::new(self.width, self.height));
        Point::new(clamped.x / self.scale, clamped.y / self.scale)
    }
}
