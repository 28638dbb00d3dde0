//! Raster compositor for the canvas display mode.
//!
//! Draws a dense raster frame stretched over the canvas (through the zoom/pan
//! transform), then the visible location markers with boxed labels.

use climate_common::{ClimateError, ClimateResult, Color, GridExtent, NamedLocation, RasterFrame};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke,
    Transform,
};

use crate::affine::{CanvasMapping, ViewTransform};
use crate::markers::{place_markers, MarkerStyle, PlacedMarker};

pub struct RasterCompositor {
    mapping: CanvasMapping,
    style: MarkerStyle,
    background: Color,
    font: Option<Font<'static>>,
}

impl RasterCompositor {
    /// Compositor for a canvas `width` pixels wide; the height follows the
    /// extent's aspect ratio.
    pub fn new(extent: &GridExtent, width: u32) -> Self {
        Self {
            mapping: CanvasMapping::for_width(extent, width),
            style: MarkerStyle::default(),
            background: Color::rgb(255, 255, 255),
            font: None,
        }
    }

    pub fn with_style(mut self, style: MarkerStyle) -> Self {
        self.style = style;
        self
    }

    /// Use a TrueType font for marker labels. Without one, labels are
    /// reduced to their background box.
    pub fn with_font_bytes(mut self, bytes: Vec<u8>) -> ClimateResult<Self> {
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| ClimateError::RenderError("unreadable TrueType font".to_string()))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn mapping(&self) -> &CanvasMapping {
        &self.mapping
    }

    pub fn size(&self) -> (u32, u32) {
        (self.mapping.width as u32, self.mapping.height as u32)
    }

    /// Screen click → native grid coordinates, undoing the view transform
    /// before the canvas mapping.
    pub fn click_to_native(&self, view: &ViewTransform, sx: f64, sy: f64) -> (f64, f64) {
        let (px, py) = view.invert(sx, sy);
        self.mapping.pixel_to_native(px, py)
    }

    pub fn render<'a>(
        &self,
        frame: Option<&RasterFrame>,
        view: &ViewTransform,
        locations: impl IntoIterator<Item = &'a NamedLocation>,
    ) -> ClimateResult<RasterFrame> {
        let (width, height) = self.size();
        let mut canvas = Pixmap::new(width, height).ok_or_else(|| {
            ClimateError::RenderError(format!("cannot allocate {}x{} canvas", width, height))
        })?;
        let bg = self.background;
        canvas.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));

        if let Some(frame) = frame {
            self.draw_frame(&mut canvas, frame, view)?;
        }

        let markers = place_markers(locations, &self.mapping, view, &self.style);
        let labels: Vec<LabelBox> = markers.iter().map(|m| self.draw_marker(&mut canvas, m)).collect();

        let mut image = to_rgba_image(&canvas);
        if let Some(font) = &self.font {
            let scale = Scale::uniform(self.style.font_size);
            let t = self.style.label_text;
            for label in &labels {
                draw_text_mut(
                    &mut image,
                    Rgba([t.r, t.g, t.b, t.a]),
                    label.text_x,
                    label.text_y,
                    scale,
                    font,
                    &label.text,
                );
            }
        }

        RasterFrame::new(width, height, image.into_raw())
    }

    fn draw_frame(&self, canvas: &mut Pixmap, frame: &RasterFrame, view: &ViewTransform) -> ClimateResult<()> {
        let mut source = Pixmap::new(frame.width, frame.height).ok_or_else(|| {
            ClimateError::RenderError(format!("cannot allocate {}x{} frame", frame.width, frame.height))
        })?;
        for (dst, src) in source.pixels_mut().iter_mut().zip(frame.pixels.chunks_exact(4)) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }

        let sx = self.mapping.width / frame.width as f64 * view.scale;
        let sy = self.mapping.height / frame.height as f64 * view.scale;
        let transform = Transform::from_row(
            sx as f32,
            0.0,
            0.0,
            sy as f32,
            view.pan_x as f32,
            view.pan_y as f32,
        );
        let paint = PixmapPaint {
            quality: FilterQuality::Nearest,
            ..PixmapPaint::default()
        };
        canvas.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
        Ok(())
    }

    fn draw_marker(&self, canvas: &mut Pixmap, marker: &PlacedMarker<'_>) -> LabelBox {
        let style = &self.style;
        let fill = if marker.location.is_custom {
            style.custom_fill
        } else {
            style.builtin_fill
        };

        if let Some(circle) = PathBuilder::from_circle(marker.x, marker.y, style.radius) {
            let mut paint = Paint::default();
            paint.anti_alias = true;
            paint.set_color_rgba8(fill.r, fill.g, fill.b, fill.a);
            canvas.fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);

            let o = style.outline;
            paint.set_color_rgba8(o.r, o.g, o.b, o.a);
            let stroke = Stroke {
                width: style.outline_width,
                ..Stroke::default()
            };
            canvas.stroke_path(&circle, &paint, &stroke, Transform::identity(), None);
        }

        let text = marker.location.name.clone();
        let (text_w, text_h) = match &self.font {
            Some(font) => {
                let (w, h) = text_size(Scale::uniform(style.font_size), font, &text);
                (w as f32, h as f32)
            }
            None => (text.chars().count() as f32 * style.font_size * 0.6, style.font_size),
        };

        let pad = style.label_padding;
        let top = marker.label_y - text_h / 2.0;
        if let Some(rect) = Rect::from_xywh(marker.label_x - pad, top - pad, text_w + 2.0 * pad, text_h + 2.0 * pad) {
            let b = style.label_background;
            let mut paint = Paint::default();
            paint.set_color_rgba8(b.r, b.g, b.b, b.a);
            canvas.fill_rect(rect, &paint, Transform::identity(), None);
        }

        LabelBox {
            text,
            text_x: marker.label_x.round() as i32,
            text_y: top.round() as i32,
        }
    }
}

struct LabelBox {
    text: String,
    text_x: i32,
    text_y: i32,
}

fn demultiplied(pixmap: &Pixmap) -> Vec<u8> {
    let mut raw = Vec::with_capacity(pixmap.data().len());
    for p in pixmap.pixels() {
        let c = p.demultiply();
        raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    raw
}

fn to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    // sizes come from the pixmap itself, so the buffer length always matches
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), demultiplied(pixmap))
        .unwrap_or_else(|| RgbaImage::new(pixmap.width(), pixmap.height()))
}

pub(crate) fn pixmap_to_frame(pixmap: &Pixmap) -> ClimateResult<RasterFrame> {
    RasterFrame::new(pixmap.width(), pixmap.height(), demultiplied(pixmap))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_extent() -> GridExtent {
        GridExtent::new(0.0, 4000.0, 0.0, 2000.0, 1000.0).unwrap()
    }

    #[test]
    fn test_canvas_height_follows_extent() {
        let c = RasterCompositor::new(&tiny_extent(), 400);
        assert_eq!(c.size(), (400, 200));
    }

    #[test]
    fn test_frame_is_stretched_with_north_up() {
        // 2x1 frame: left red, right blue
        let frame = RasterFrame::new(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap();
        let c = RasterCompositor::new(&tiny_extent(), 40);
        let out = c.render(Some(&frame), &ViewTransform::identity(), std::iter::empty()).unwrap();

        assert_eq!(out.pixel(5, 10), Some([255, 0, 0, 255]));
        assert_eq!(out.pixel(35, 10), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_zoomed_frame_shows_the_quadrant_under_the_cursor() {
        let frame = RasterFrame::new(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap();
        let c = RasterCompositor::new(&tiny_extent(), 40);
        let mut view = ViewTransform::identity();
        view.zoom_at(4.0, 40.0, 0.0);

        let out = c.render(Some(&frame), &view, std::iter::empty()).unwrap();
        assert_eq!(out.pixel(1, 1), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_click_roundtrip_through_view() {
        let c = RasterCompositor::new(&tiny_extent(), 400);
        let mut view = ViewTransform::identity();
        view.zoom_at(3.0, 120.0, 80.0);

        let (px, py) = c.mapping().native_to_pixel(2500.0, 500.0);
        let (sx, sy) = view.apply(px, py);
        let (x, y) = c.click_to_native(&view, sx, sy);
        assert!((x - 2500.0).abs() < 1e-6 && (y - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_marker_drawn_without_font() {
        let c = RasterCompositor::new(&tiny_extent(), 400);
        let loc = NamedLocation::custom("Here", 2000.0, 1000.0, "Custom");
        let out = c.render(None, &ViewTransform::identity(), [&loc]).unwrap();

        let fill = MarkerStyle::default().custom_fill;
        assert_eq!(out.pixel(200, 100), Some([fill.r, fill.g, fill.b, 255]));
    }
}
