//! Placement of named-location markers on the canvas.

use climate_common::{Color, NamedLocation};

use crate::affine::{CanvasMapping, ViewTransform};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub radius: f32,
    pub builtin_fill: Color,
    pub custom_fill: Color,
    pub outline: Color,
    pub outline_width: f32,
    pub font_size: f32,
    /// Label anchor offset from the marker centre, in pixels
    pub label_offset: (f32, f32),
    pub label_padding: f32,
    pub label_background: Color,
    pub label_text: Color,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 5.0,
            builtin_fill: Color::rgb(0xd7, 0x30, 0x27),
            custom_fill: Color::rgb(0x45, 0x75, 0xb4),
            outline: Color::rgb(255, 255, 255),
            outline_width: 1.5,
            font_size: 12.0,
            label_offset: (8.0, -6.0),
            label_padding: 2.0,
            label_background: Color::new(255, 255, 255, 220),
            label_text: Color::rgb(0x22, 0x22, 0x22),
        }
    }
}

/// A location resolved to screen pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedMarker<'a> {
    pub location: &'a NamedLocation,
    pub x: f32,
    pub y: f32,
    pub label_x: f32,
    pub label_y: f32,
}

/// Map each location through the canvas mapping and the view transform,
/// keeping only those that land inside the canvas.
pub fn place_markers<'a>(
    locations: impl IntoIterator<Item = &'a NamedLocation>,
    mapping: &CanvasMapping,
    view: &ViewTransform,
    style: &MarkerStyle,
) -> Vec<PlacedMarker<'a>> {
    locations
        .into_iter()
        .filter_map(|location| {
            let (px, py) = mapping.native_to_pixel(location.x, location.y);
            let (sx, sy) = view.apply(px, py);
            if !mapping.contains_pixel(sx, sy) {
                return None;
            }
            let (x, y) = (sx as f32, sy as f32);
            Some(PlacedMarker {
                location,
                x,
                y,
                label_x: x + style.label_offset.0,
                label_y: y + style.label_offset.1,
            })
        })
        .collect()
}
