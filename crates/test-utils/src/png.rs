//! Minimal PNG reader for checking encoder output.
//!
//! Handles exactly what the tile encoder writes: 8-bit RGBA or indexed
//! images with a single IDAT chunk and filter type 0 on every row.

use flate2::read::ZlibDecoder;
use std::io::Read;

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// One PNG chunk.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub kind: [u8; 4],
    pub data: Vec<u8>,
    pub crc: u32,
}

/// Split a PNG into chunks. Panics on a bad signature.
pub fn parse_chunks(png: &[u8]) -> Vec<Chunk> {
    assert_eq!(&png[..8], &SIGNATURE, "not a PNG");
    let be32 = |b: &[u8]| u32::from_be_bytes([b[0], b[1], b[2], b[3]]);

    let mut chunks = Vec::new();
    let mut pos = 8;
    while pos < png.len() {
        let len = be32(&png[pos..]) as usize;
        let mut kind = [0u8; 4];
        kind.copy_from_slice(&png[pos + 4..pos + 8]);
        let data = png[pos + 8..pos + 8 + len].to_vec();
        let crc = be32(&png[pos + 8 + len..]);
        chunks.push(Chunk { kind, data, crc });
        pos += 12 + len;
    }
    chunks
}

pub fn find_chunk<'a>(chunks: &'a [Chunk], kind: &[u8; 4]) -> Option<&'a Chunk> {
    chunks.iter().find(|c| &c.kind == kind)
}

/// Value of the `tEXt` chunk with the given keyword.
pub fn text_chunk(png: &[u8], keyword: &str) -> Option<String> {
    parse_chunks(png)
        .into_iter()
        .filter(|c| &c.kind == b"tEXt")
        .find_map(|c| {
            let nul = c.data.iter().position(|b| *b == 0)?;
            (&c.data[..nul] == keyword.as_bytes())
                .then(|| c.data[nul + 1..].iter().map(|&b| b as char).collect())
        })
}

/// Decode to `(width, height, rgba)`.
pub fn decode_rgba(png: &[u8]) -> (usize, usize, Vec<u8>) {
    let chunks = parse_chunks(png);
    let ihdr = find_chunk(&chunks, b"IHDR").expect("IHDR chunk");
    let width = u32::from_be_bytes([ihdr.data[0], ihdr.data[1], ihdr.data[2], ihdr.data[3]]) as usize;
    let height = u32::from_be_bytes([ihdr.data[4], ihdr.data[5], ihdr.data[6], ihdr.data[7]]) as usize;
    let indexed = ihdr.data[9] == 3;

    let mut raw = Vec::new();
    ZlibDecoder::new(&find_chunk(&chunks, b"IDAT").expect("IDAT chunk").data[..])
        .read_to_end(&mut raw)
        .expect("valid zlib stream");

    let palette = find_chunk(&chunks, b"PLTE").map(|c| c.data.clone());
    let alpha = find_chunk(&chunks, b"tRNS").map(|c| c.data.clone());

    let stride = width * if indexed { 1 } else { 4 } + 1;
    let mut out = Vec::with_capacity(width * height * 4);
    for row in raw.chunks_exact(stride) {
        assert_eq!(row[0], 0, "only filter type 0 is written");
        let body = &row[1..];
        if indexed {
            let plte = palette.as_ref().expect("PLTE chunk");
            for &idx in body {
                let i = idx as usize;
                let a = alpha.as_ref().and_then(|t| t.get(i).copied()).unwrap_or(255);
                out.extend_from_slice(&[plte[i * 3], plte[i * 3 + 1], plte[i * 3 + 2], a]);
            }
        } else {
            out.extend_from_slice(body);
        }
    }
    (width, height, out)
}

/// Pixel `(row, col)` of a decoded RGBA buffer.
pub fn pixel_at(rgba: &[u8], width: usize, row: usize, col: usize) -> [u8; 4] {
    let i = (row * width + col) * 4;
    [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
}
