//! PNG encoding for rendered output.
//!
//! Two colour types:
//! - **Indexed (type 3)** for overlay bitmaps: one byte per pixel into a
//!   small palette, with a `tRNS` chunk carrying per-entry alpha. Changing
//!   the overlay opacity only rewrites the palette alpha.
//! - **RGBA (type 6)** for composited canvas frames.

use std::io::Write;

use climate_common::{ClimateError, ClimateResult, RasterFrame};

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
const MAX_PALETTE_SIZE: usize = 256;

/// Indexed PNG from palette indices and RGBA palette entries.
pub fn encode_indexed(
    indices: &[u8],
    width: u32,
    height: u32,
    palette: &[(u8, u8, u8, u8)],
) -> ClimateResult<Vec<u8>> {
    if palette.is_empty() || palette.len() > MAX_PALETTE_SIZE {
        return Err(ClimateError::RenderError(format!(
            "palette must hold 1..={} entries, got {}",
            MAX_PALETTE_SIZE,
            palette.len()
        )));
    }
    check_len(indices.len(), width, height, 1)?;
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= palette.len()) {
        return Err(ClimateError::RenderError(format!(
            "index {} outside palette of {}",
            bad,
            palette.len()
        )));
    }

    let mut png = Vec::with_capacity(indices.len() / 4 + 1024);
    png.extend_from_slice(&SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|&(r, g, b, _)| [r, g, b]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if palette.iter().any(|&(_, _, _, a)| a < 255) {
        let trns: Vec<u8> = palette.iter().map(|&(_, _, _, a)| a).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    write_chunk(&mut png, b"IDAT", &deflate_scanlines(indices, width as usize)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Truecolour-with-alpha PNG from straight RGBA8 pixels.
pub fn encode_rgba(pixels: &[u8], width: u32, height: u32) -> ClimateResult<Vec<u8>> {
    check_len(pixels.len(), width, height, 4)?;

    let mut png = Vec::with_capacity(pixels.len() / 4 + 1024);
    png.extend_from_slice(&SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));
    write_chunk(&mut png, b"IDAT", &deflate_scanlines(pixels, width as usize * 4)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

pub fn encode_frame(frame: &RasterFrame) -> ClimateResult<Vec<u8>> {
    encode_rgba(&frame.pixels, frame.width, frame.height)
}

fn check_len(len: usize, width: u32, height: u32, bytes_per_pixel: usize) -> ClimateResult<()> {
    let expected = width as usize * height as usize * bytes_per_pixel;
    if width == 0 || height == 0 || len != expected {
        return Err(ClimateError::RenderError(format!(
            "{}x{} image needs {} bytes, got {}",
            width, height, expected, len
        )));
    }
    Ok(())
}

fn ihdr(width: u32, height: u32, color_type: u8) -> [u8; 13] {
    let mut data = [0u8; 13];
    data[0..4].copy_from_slice(&width.to_be_bytes());
    data[4..8].copy_from_slice(&height.to_be_bytes());
    data[8] = 8; // bit depth
    data[9] = color_type;
    // compression, filter and interlace methods stay 0
    data
}

/// Prefix each row with filter type 0 and zlib-compress.
fn deflate_scanlines(data: &[u8], row_bytes: usize) -> ClimateResult<Vec<u8>> {
    let mut raw = Vec::with_capacity(data.len() + data.len() / row_bytes.max(1));
    for row in data.chunks_exact(row_bytes) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder
        .write_all(&raw)
        .and_then(|_| encoder.finish())
        .map_err(|e| ClimateError::RenderError(format!("IDAT compression failed: {}", e)))
}

fn write_chunk(png: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(kind);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}
