#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use crate::consts::{MAX_ZOOM, MIN_ZOOM, WHEEL_ZOOM_STEP, ZOOM_STEP};
use crate::geometry::Point;

/// Pan/zoom state mapping canvas space onto the screen.
///
/// `offset_x` / `offset_y` are in screen pixels.
/// `zoom` is a scale factor in `[MIN_ZOOM, MAX_ZOOM]` (1.0 = no zoom).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { zoom: 1.0, offset_x: 0.0, offset_y: 0.0 }
    }
}

impl Viewport {
    /// Convert a screen-space point (pixels) to canvas coordinates.
    #[must_use]
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        Point::new((screen.x - self.offset_x) / self.zoom, (screen.y - self.offset_y) / self.zoom)
    }

    /// Convert a canvas-space point to screen coordinates (pixels).
    #[must_use]
    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        Point::new(canvas.x.mul_add(self.zoom, self.offset_x), canvas.y.mul_add(self.zoom, self.offset_y))
    }

    /// Convert a screen-space distance (pixels) to canvas-space distance.
    #[must_use]
    pub fn screen_dist_to_canvas(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Set the zoom level, keeping `cursor` (screen space) fixed on screen.
    pub fn zoom_at(&mut self, cursor: Point, zoom: f64) {
        let next = clamp_zoom(zoom);
        let ratio = next / self.zoom;
        self.offset_x = cursor.x - (cursor.x - self.offset_x) * ratio;
        self.offset_y = cursor.y - (cursor.y - self.offset_y) * ratio;
        self.zoom = next;
    }

    /// Apply a wheel gesture at `cursor`. Negative `delta_y` (scrolling up) zooms in.
    pub fn wheel(&mut self, cursor: Point, delta_y: f64) {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }
        let factor = if delta_y < 0.0 { WHEEL_ZOOM_STEP } else { 1.0 / WHEEL_ZOOM_STEP };
        self.zoom_at(cursor, self.zoom * factor);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = clamp_zoom(self.zoom * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = clamp_zoom(self.zoom / ZOOM_STEP);
    }

    /// Shift the view by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Canvas-space rectangle currently visible on a `width` × `height` screen.
    #[must_use]
    pub fn visible_canvas(&self, width: f64, height: f64) -> (Point, Point) {
        (self.screen_to_canvas(Point::new(0.0, 0.0)), self.screen_to_canvas(Point::new(width, height)))
    }
}

fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() { zoom.clamp(MIN_ZOOM, MAX_ZOOM) } else { 1.0 }
}
