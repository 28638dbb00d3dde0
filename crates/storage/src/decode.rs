//! Payload decoding. All failures are [`ClimateError::MalformedPayload`]
//! carrying the requested key.

use std::io::Read;

use climate_common::grid::NestedGrid;
use climate_common::{ClimateError, ClimateResult, GridExtent, ImageDimensions, RasterFrame, SparseGrid};
use flate2::read::GzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decode a PNG (or any format `image` recognises) into RGBA8.
pub fn decode_frame(key: &str, bytes: &[u8]) -> ClimateResult<RasterFrame> {
    let image = image::load_from_memory(bytes).map_err(|e| ClimateError::malformed(key, e))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    RasterFrame::new(width, height, rgba.into_raw()).map_err(|e| ClimateError::malformed(key, e))
}

/// Like [`decode_frame`], but every frame of a dataset must share the
/// dimensions declared in its metadata.
pub fn decode_frame_sized(key: &str, bytes: &[u8], expected: ImageDimensions) -> ClimateResult<RasterFrame> {
    let frame = decode_frame(key, bytes)?;
    if (frame.width, frame.height) != (expected.width, expected.height) {
        return Err(ClimateError::malformed(
            key,
            format!(
                "frame is {}x{}, dataset declares {}x{}",
                frame.width, frame.height, expected.width, expected.height
            ),
        ));
    }
    Ok(frame)
}

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Decode a nested X → Y → value JSON grid. Gzip compression is detected
/// from the magic bytes, so plain JSON is accepted too.
pub fn decode_grid(key: &str, bytes: &[u8], extent: &GridExtent) -> ClimateResult<SparseGrid> {
    let nested: NestedGrid = if is_gzip(bytes) {
        let mut json = Vec::with_capacity(bytes.len() * 4);
        GzDecoder::new(bytes)
            .read_to_end(&mut json)
            .map_err(|e| ClimateError::malformed(key, format!("gzip: {}", e)))?;
        serde_json::from_slice::<NestedGrid>(&json)
    } else {
        serde_json::from_slice::<NestedGrid>(bytes)
    }
    .map_err(|e| ClimateError::malformed(key, format!("json: {}", e)))?;

    SparseGrid::from_nested(nested, extent, key)
}
