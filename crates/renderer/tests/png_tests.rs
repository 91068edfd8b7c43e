//! Tests for PNG encoding.
//!
//! Encoded images are parsed back chunk by chunk and the image data is
//! inflated to check the pixels survive encoding.

use renderer::png::{encode_png, encode_png_with_text};
use renderer::RgbaRaster;
use test_utils::png::{decode_rgba, find_chunk as find, parse_chunks, text_chunk};

// ============================================================================
// Helper functions
// ============================================================================

fn quantized_tile() -> RgbaRaster {
    let mut raster = RgbaRaster::transparent(256, 256);
    for row in 0..256 {
        for col in 0..256 {
            if (row / 32 + col / 32) % 2 == 0 {
                raster.set_pixel(row, col, [(row / 32 * 30) as u8, 90, (col / 32 * 30) as u8, 255]);
            }
        }
    }
    raster
}

// ============================================================================
// Round trip through the decoder
// ============================================================================

#[test]
fn test_indexed_tile_decodes_to_same_pixels() {
    let raster = quantized_tile();
    let png = encode_png(&raster).unwrap();

    let chunks = parse_chunks(&png);
    assert_eq!(find(&chunks, b"IHDR").unwrap().data[9], 3);
    assert!(find(&chunks, b"tRNS").is_some());

    let (w, h, pixels) = decode_rgba(&png);
    assert_eq!((w, h), (256, 256));
    assert_eq!(pixels, raster.pixels());
}

#[test]
fn test_rgba_fallback_decodes_to_same_pixels() {
    let mut raster = RgbaRaster::transparent(32, 32);
    for row in 0..32 {
        for col in 0..32 {
            raster.set_pixel(row, col, [(row * 8) as u8, (col * 8) as u8, 77, 255]);
        }
    }
    let png = encode_png(&raster).unwrap();
    assert_eq!(find(&parse_chunks(&png), b"IHDR").unwrap().data[9], 6);

    let (_, _, pixels) = decode_rgba(&png);
    assert_eq!(pixels, raster.pixels());
}

// ============================================================================
// Chunk structure
// ============================================================================

#[test]
fn test_chunk_crcs_are_valid() {
    let png = encode_png_with_text(&quantized_tile(), &[("Title", "Temperature (Celsius)")]).unwrap();
    for chunk in parse_chunks(&png) {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&chunk.kind);
        hasher.update(&chunk.data);
        assert_eq!(hasher.finalize(), chunk.crc);
    }
}

#[test]
fn test_text_chunk_precedes_image_data() {
    let png = encode_png_with_text(&quantized_tile(), &[("Title", "Speed (m/s)")]).unwrap();
    let chunks = parse_chunks(&png);
    let kinds: Vec<&[u8; 4]> = chunks.iter().map(|c| &c.kind).collect();

    let text_pos = kinds.iter().position(|k| *k == b"tEXt").unwrap();
    let idat_pos = kinds.iter().position(|k| *k == b"IDAT").unwrap();
    assert!(text_pos < idat_pos);
    assert_eq!(kinds.last().unwrap(), &b"IEND");
    assert_eq!(chunks[text_pos].data, b"Title\0Speed (m/s)");
    assert_eq!(text_chunk(&png, "Title").as_deref(), Some("Speed (m/s)"));
}

#[test]
fn test_identical_input_gives_identical_bytes() {
    let a = encode_png(&quantized_tile()).unwrap();
    let b = encode_png(&quantized_tile()).unwrap();
    assert_eq!(a, b);
}
