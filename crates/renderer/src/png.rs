//! PNG encoding for RGBA rasters.
//!
//! Two encoding modes:
//! - **Indexed PNG (color type 3)** when the image has ≤256 unique colors.
//!   Contour overlays and legends almost always qualify.
//! - **RGBA PNG (color type 6)** otherwise.
//!
//! Both modes use the strongest zlib compression level. Optional `tEXt`
//! chunks carry metadata such as the legend title.

use crate::raster::RgbaRaster;
use ocean_common::{TileError, TileResult};
use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Write;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 4096; // 64x64 or larger

type Palette = Vec<(u8, u8, u8, u8)>;

/// Encode a raster, choosing indexed or RGBA mode automatically.
pub fn encode_png(raster: &RgbaRaster) -> TileResult<Vec<u8>> {
    encode_png_with_text(raster, &[])
}

/// Encode a raster with `tEXt` chunks, each a `(keyword, text)` pair.
///
/// Keywords must be 1-79 Latin-1 characters; text must not contain NUL.
pub fn encode_png_with_text(raster: &RgbaRaster, text: &[(&str, &str)]) -> TileResult<Vec<u8>> {
    let pixels = raster.pixels();
    let num_pixels = pixels.len() / 4;

    let palette_result = if num_pixels >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels)
    } else {
        extract_palette_sequential(pixels)
    };

    match palette_result {
        Some((palette, indices)) => {
            create_png_indexed(raster.width(), raster.height(), &palette, &indices, text)
        }
        None => create_png_rgba(pixels, raster.width(), raster.height(), text),
    }
}

/// Pack RGBA bytes into a u32 for faster hashing and comparison
#[inline(always)]
fn pack_color(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

#[inline(always)]
fn unpack_color(packed: u32) -> (u8, u8, u8, u8) {
    (
        packed as u8,
        (packed >> 8) as u8,
        (packed >> 16) as u8,
        (packed >> 24) as u8,
    )
}

fn extract_palette_sequential(pixels: &[u8]) -> Option<(Palette, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for chunk in pixels.chunks_exact(4) {
        let packed = pack_color(chunk[0], chunk[1], chunk[2], chunk[3]);

        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push((chunk[0], chunk[1], chunk[2], chunk[3]));
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Parallel palette extraction for larger images.
///
/// Palette order follows first occurrence in scan order so the output is
/// identical to the sequential path for the same pixels.
fn extract_palette_parallel(pixels: &[u8]) -> Option<(Palette, Vec<u8>)> {
    let chunk_size = (pixels.len() / 4 / rayon::current_num_threads()).max(256) * 4;

    // Unique colors per chunk in first-occurrence order; `None` once a chunk
    // alone exceeds the palette.
    let per_chunk: Vec<Option<Vec<u32>>> = pixels
        .par_chunks(chunk_size)
        .map(|chunk| {
            let mut seen: HashMap<u32, ()> = HashMap::with_capacity(MAX_PALETTE_SIZE);
            let mut ordered = Vec::new();
            for pixel in chunk.chunks_exact(4) {
                let packed = pack_color(pixel[0], pixel[1], pixel[2], pixel[3]);
                if seen.insert(packed, ()).is_none() {
                    ordered.push(packed);
                    if ordered.len() > MAX_PALETTE_SIZE {
                        return None;
                    }
                }
            }
            Some(ordered)
        })
        .collect();

    let mut global_colors: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    for chunk_colors in per_chunk {
        for packed in chunk_colors? {
            if global_colors.contains_key(&packed) {
                continue;
            }
            if palette.len() >= MAX_PALETTE_SIZE {
                return None;
            }
            global_colors.insert(packed, palette.len() as u8);
            palette.push(unpack_color(packed));
        }
    }

    let indices: Vec<u8> = pixels
        .par_chunks_exact(4)
        .map(|p| {
            let packed = pack_color(p[0], p[1], p[2], p[3]);
            global_colors.get(&packed).copied().unwrap_or(0)
        })
        .collect();

    Some((palette, indices))
}

fn write_header(png: &mut Vec<u8>, width: usize, height: usize, color_type: u8) {
    png.extend_from_slice(&PNG_SIGNATURE);

    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(color_type);
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(png, b"IHDR", &ihdr_data);
}

fn write_text_chunks(png: &mut Vec<u8>, text: &[(&str, &str)]) -> TileResult<()> {
    for (keyword, value) in text {
        if keyword.is_empty() || keyword.len() > 79 || keyword.contains('\0') {
            return Err(TileError::EncodeError(format!(
                "invalid tEXt keyword '{}'",
                keyword
            )));
        }
        if value.contains('\0') {
            return Err(TileError::EncodeError(format!(
                "tEXt value for '{}' contains NUL",
                keyword
            )));
        }
        let mut data = Vec::with_capacity(keyword.len() + 1 + value.len());
        data.extend(latin1(keyword));
        data.push(0);
        data.extend(latin1(value));
        write_chunk(png, b"tEXt", &data);
    }
    Ok(())
}

/// tEXt is Latin-1; characters outside it become '?'.
fn latin1(s: &str) -> impl Iterator<Item = u8> + '_ {
    s.chars()
        .map(|c| if (c as u32) < 256 { c as u32 as u8 } else { b'?' })
}

/// Create an indexed PNG (color type 3) from palette and indices.
fn create_png_indexed(
    width: usize,
    height: usize,
    palette: &[(u8, u8, u8, u8)],
    indices: &[u8],
    text: &[(&str, &str)],
) -> TileResult<Vec<u8>> {
    let mut png = Vec::new();
    write_header(&mut png, width, height, 3);

    let mut plte_data = Vec::with_capacity(palette.len() * 3);
    for (r, g, b, _) in palette {
        plte_data.extend_from_slice(&[*r, *g, *b]);
    }
    write_chunk(&mut png, b"PLTE", &plte_data);

    // tRNS only if any color has alpha < 255
    if palette.iter().any(|(_, _, _, a)| *a < 255) {
        let trns_data: Vec<u8> = palette.iter().map(|(_, _, _, a)| *a).collect();
        write_chunk(&mut png, b"tRNS", &trns_data);
    }

    write_text_chunks(&mut png, text)?;

    let idat_data = deflate_scanlines(indices, width, height, 1)?;
    write_chunk(&mut png, b"IDAT", &idat_data);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Create an RGBA PNG (color type 6).
fn create_png_rgba(
    pixels: &[u8],
    width: usize,
    height: usize,
    text: &[(&str, &str)],
) -> TileResult<Vec<u8>> {
    let mut png = Vec::new();
    write_header(&mut png, width, height, 6);
    write_text_chunks(&mut png, text)?;

    let idat_data = deflate_scanlines(pixels, width, height, 4)?;
    write_chunk(&mut png, b"IDAT", &idat_data);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix each scanline with filter byte 0 and deflate.
fn deflate_scanlines(
    data: &[u8],
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
) -> TileResult<Vec<u8>> {
    let stride = width * bytes_per_pixel;
    if data.len() < stride * height {
        return Err(TileError::EncodeError(format!(
            "image data too short: {} bytes for {}x{}",
            data.len(),
            width,
            height
        )));
    }

    let mut uncompressed = Vec::with_capacity(height * (1 + stride));
    for row in data.chunks_exact(stride.max(1)).take(height) {
        uncompressed.push(0);
        uncompressed.extend_from_slice(row);
    }

    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
    encoder
        .write_all(&uncompressed)
        .map_err(|e| TileError::EncodeError(format!("IDAT compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| TileError::EncodeError(format!("IDAT compression failed: {}", e)))
}
