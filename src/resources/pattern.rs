//! Monochrome 8x8 patterns: `PAT ` and `PAT#` lists.

use alloc::vec::Vec;

use crate::binary::BinaryReader;
use crate::decode::DecodeContext;
use crate::error::QdError;
use crate::raster::Raster;

use super::{draw_bits, fit, trim_rows};

const SIZE: u32 = 8;
const PATTERN_LEN: usize = 8;

pub fn decode(data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let bits = BinaryReader::new(data).read_bytes(PATTERN_LEN)?;
    let mut raster = ctx.raster(SIZE, SIZE)?;
    draw_bits(&mut raster, bits, 1, SIZE, SIZE, 0, 0)?;
    Ok(raster)
}

/// Decode a `PAT#` as its patterns side by side, left to right.
pub fn decode_list(data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let mut reader = BinaryReader::new(data);
    let count = reader.read::<u16>()?;
    if count == 0 {
        return Err(QdError::invalid("pattern list holds no patterns"));
    }
    let bits = reader.read_bytes(usize::from(count) * PATTERN_LEN)?;
    let mut raster = ctx.raster(u32::from(count) * SIZE, SIZE)?;
    for (i, pattern) in bits.chunks_exact(PATTERN_LEN).enumerate() {
        draw_bits(&mut raster, pattern, 1, SIZE, SIZE, i as u32 * SIZE, 0)?;
    }
    Ok(raster)
}

/// Encode a `PAT `: set bits for dark opaque pixels.
pub fn encode(raster: &Raster) -> Result<Vec<u8>, QdError> {
    let raster = fit(raster, SIZE, SIZE, "pattern")?;
    let (bits, row_bytes) = crate::pixmap::build_monochrome(&raster)?;
    Ok(trim_rows(&bits, row_bytes, 1))
}
