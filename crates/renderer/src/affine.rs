//! Canvas pixel mapping for the raster display.
//!
//! Two layers:
//! - [`CanvasMapping`]: native grid metres → canvas pixels, Y flipped.
//! - [`ViewTransform`]: interactive zoom/pan on top of canvas pixels.
//!
//! A click is converted back by inverting the view transform first and
//! then the canvas mapping.

use climate_common::GridExtent;
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 10.0;

/// Linear mapping of the grid extent onto a `width × height` canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasMapping {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    pub width: f64,
    pub height: f64,
}

impl CanvasMapping {
    pub fn new(extent: &GridExtent, width: f64, height: f64) -> Self {
        Self {
            x_min: extent.x_min,
            x_max: extent.x_max,
            y_min: extent.y_min,
            y_max: extent.y_max,
            width,
            height,
        }
    }

    /// Canvas of the given width whose height keeps the extent's shape.
    pub fn for_width(extent: &GridExtent, width: u32) -> Self {
        let height = canvas_height_for(extent, width);
        Self::new(extent, width as f64, height as f64)
    }

    pub fn native_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let px = (x - self.x_min) / (self.x_max - self.x_min) * self.width;
        let py = self.height - (y - self.y_min) / (self.y_max - self.y_min) * self.height;
        (px, py)
    }

    pub fn pixel_to_native(&self, px: f64, py: f64) -> (f64, f64) {
        let x = self.x_min + px / self.width * (self.x_max - self.x_min);
        let y = self.y_min + (self.height - py) / self.height * (self.y_max - self.y_min);
        (x, y)
    }

    pub fn contains_pixel(&self, px: f64, py: f64) -> bool {
        px >= 0.0 && px <= self.width && py >= 0.0 && py <= self.height
    }
}

/// Canvas height so that `H / W` equals the extent's height / width.
pub fn canvas_height_for(extent: &GridExtent, width: u32) -> u32 {
    ((width as f64 * extent.aspect_ratio()).round() as u32).max(1)
}

/// Zoom/pan applied as `screen = pixel * scale + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewTransform {
    pub fn identity() -> Self {
        Self {
            scale: MIN_ZOOM,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    pub fn apply(&self, px: f64, py: f64) -> (f64, f64) {
        (px * self.scale + self.pan_x, py * self.scale + self.pan_y)
    }

    pub fn invert(&self, sx: f64, sy: f64) -> (f64, f64) {
        ((sx - self.pan_x) / self.scale, (sy - self.pan_y) / self.scale)
    }

    /// Clamp the scale into range and drop any pan at scale 1.
    fn normalize(&mut self) {
        if !self.scale.is_finite() {
            self.scale = MIN_ZOOM;
        }
        self.scale = self.scale.clamp(MIN_ZOOM, MAX_ZOOM);
        if self.scale <= MIN_ZOOM {
            self.pan_x = 0.0;
            self.pan_y = 0.0;
        }
    }

    /// Multiply the scale by `factor`, keeping the screen point under the
    /// cursor fixed.
    pub fn zoom_at(&mut self, factor: f64, cursor_x: f64, cursor_y: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let old = self.scale;
        let new = (old * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let ratio = new / old;

        self.pan_x = cursor_x - (cursor_x - self.pan_x) * ratio;
        self.pan_y = cursor_y - (cursor_y - self.pan_y) * ratio;
        self.scale = new;
        self.normalize();
    }

    /// Two-finger pinch: the ratio of touch distances drives the scale, the
    /// midpoint between the touches stays fixed.
    pub fn pinch(&mut self, previous_distance: f64, current_distance: f64, mid_x: f64, mid_y: f64) {
        if previous_distance <= 0.0 {
            return;
        }
        self.zoom_at(current_distance / previous_distance, mid_x, mid_y);
    }

    /// Drag by a screen-space delta. Ignored while not zoomed in.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if self.scale > MIN_ZOOM {
            self.pan_x += dx;
            self.pan_y += dy;
        }
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
        self.normalize();
    }

    pub fn reset(&mut self) {
        *self = Self::identity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_coords_approx_eq;

    #[test]
    fn test_corners_map_with_y_flip() {
        let extent = GridExtent::haduk_1km();
        let m = CanvasMapping::new(&extent, 800.0, 1289.0);

        let (px, py) = m.native_to_pixel(extent.x_min, extent.y_min);
        assert_eq!((px, py), (0.0, 1289.0));
        let (px, py) = m.native_to_pixel(extent.x_max, extent.y_max);
        assert_eq!((px, py), (800.0, 0.0));
    }

    #[test]
    fn test_pixel_native_roundtrip() {
        let extent = GridExtent::haduk_1km();
        for &(w, h) in &[(800.0, 1289.0), (37.0, 3.5), (4096.0, 10.0)] {
            let m = CanvasMapping::new(&extent, w, h);
            for &(x, y) in &[(457_000.0, 166_000.0), (-199_500.0, 1_249_500.0), (12.5, -3.25)] {
                let (px, py) = m.native_to_pixel(x, y);
                let (x2, y2) = m.pixel_to_native(px, py);
                assert_coords_approx_eq!((x2, y2), (x, y), 1e-6);
            }
        }
    }

    #[test]
    fn test_canvas_height_keeps_aspect() {
        let extent = GridExtent::haduk_1km();
        assert_eq!(canvas_height_for(&extent, 800), 1289);
    }

    #[test]
    fn test_zoom_keeps_cursor_fixed() {
        let mut v = ViewTransform::identity();
        let cursor = (200.0, 300.0);
        let before = v.invert(cursor.0, cursor.1);

        v.zoom_at(2.5, cursor.0, cursor.1);
        let after = v.invert(cursor.0, cursor.1);

        assert_eq!(v.scale, 2.5);
        assert_coords_approx_eq!((after.0, after.1), (before.0, before.1), 1e-9);
    }

    #[test]
    fn test_zoom_bounds_and_pan_reset() {
        let mut v = ViewTransform::identity();
        v.zoom_at(50.0, 10.0, 10.0);
        assert_eq!(v.scale, MAX_ZOOM);

        v.pan_by(15.0, -4.0);
        v.zoom_at(0.01, 10.0, 10.0);
        assert_eq!(v, ViewTransform::identity());

        v.pan_by(5.0, 5.0);
        assert_eq!(v.pan_x, 0.0);
    }

    #[test]
    fn test_pinch_matches_wheel_zoom() {
        let mut wheel = ViewTransform::identity();
        let mut touch = ViewTransform::identity();
        wheel.zoom_at(2.0, 50.0, 60.0);
        touch.pinch(100.0, 200.0, 50.0, 60.0);
        assert_eq!(wheel, touch);
    }
}
