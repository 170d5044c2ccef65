//! Deterministic byte fixtures for raster delivery tests.

use bytes::Bytes;

/// Little-endian TIFF magic, so fixture buffers look like the real thing to
/// anything that sniffs the header.
pub const TIFF_MAGIC: [u8; 4] = [0x49, 0x49, 0x2a, 0x00];

/// Deterministic pseudo-raster of `len` bytes seeded by `seed`.
///
/// Starts with the TIFF magic (when it fits) and fills the rest with a
/// cheap LCG stream, so distinct seeds give distinct payloads and any
/// truncation or reordering shows up in byte-for-byte comparisons.
pub fn synthetic_tiff(seed: u64, len: usize) -> Bytes {
    let mut data = Vec::with_capacity(len);
    data.extend_from_slice(&TIFF_MAGIC[..TIFF_MAGIC.len().min(len)]);
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    while data.len() < len {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        data.push((state >> 33) as u8);
    }
    Bytes::from(data)
}

/// Stable seed derived from an arbitrary string, for content-addressed
/// fixtures.
pub fn seed_from(name: &str) -> u64 {
    name.bytes()
        .fold(0xcbf29ce484222325u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
        })
}
