//! Decoded dense raster frames.

use crate::{ClimateError, ClimateResult};

/// One pre-rendered time slice covering the whole grid extent.
///
/// Pixels are RGBA8, row-major, with row 0 at the northern edge of the
/// extent (image rows grow downward while native Y grows northward).
#[derive(Debug, Clone, PartialEq)]
pub struct RasterFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> ClimateResult<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(ClimateError::RenderError(format!(
                "raster frame {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Single-colour frame, mostly useful for tests and placeholders.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(RasterFrame::new(2, 2, vec![0; 16]).is_ok());
        assert!(RasterFrame::new(2, 2, vec![0; 15]).is_err());
        assert!(RasterFrame::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_filled_pixel() {
        let frame = RasterFrame::filled(3, 2, [1, 2, 3, 255]);
        assert_eq!(frame.pixel(2, 1), Some([1, 2, 3, 255]));
        assert_eq!(frame.pixel(3, 0), None);
    }
}
