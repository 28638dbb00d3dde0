//! PNG output decodes back with the `image` crate.

use image::GenericImageView;
use renderer::png::{encode_indexed, encode_rgba};

#[test]
fn test_indexed_png_decodes_with_palette_alpha() {
    let palette = [(0, 0, 0, 0), (255, 0, 0, 178), (0, 0, 255, 178)];
    let indices = [0u8, 1, 2, 1, 0, 2];
    let png = encode_indexed(&indices, 3, 2, &palette).unwrap();

    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!(decoded.dimensions(), (3, 2));
    let rgba = decoded.to_rgba8();
    assert_eq!(rgba.get_pixel(0, 0).0, [0, 0, 0, 0]);
    assert_eq!(rgba.get_pixel(1, 0).0, [255, 0, 0, 178]);
    assert_eq!(rgba.get_pixel(2, 1).0, [0, 0, 255, 178]);
}

#[test]
fn test_rgba_png_roundtrips_pixels() {
    let pixels: Vec<u8> = (0..4 * 5 * 4).map(|i| (i * 3 % 256) as u8).collect();
    let png = encode_rgba(&pixels, 4, 5).unwrap();

    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.into_raw(), pixels);
}

#[test]
fn test_out_of_palette_index_rejected() {
    assert!(encode_indexed(&[0, 3], 2, 1, &[(0, 0, 0, 0), (1, 1, 1, 255)]).is_err());
    assert!(encode_rgba(&[0; 7], 1, 2).is_err());
}
