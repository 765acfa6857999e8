//! Row expansion from packed pixel formats to RGBA8.

use crate::color::{ColorTable, PixelCursor, rgb555_to_rgb8};
use crate::error::QdError;
use rgb::{RGB8, RGBA8};

use super::PixelFormat;

/// Palette index of pixel `x` in a row of `depth`-bit indices, MSB first.
#[inline]
pub(crate) fn index_at(row: &[u8], depth: u8, x: usize) -> usize {
    let per_byte = 8 / usize::from(depth);
    let shift = 8 - usize::from(depth) * (x % per_byte + 1);
    let mask = (1u16 << depth) - 1;
    usize::from((u16::from(row[x / per_byte]) >> shift) & mask)
}

/// Expand `width` pixels of `row` into `out` (RGBA8, `width * 4` bytes).
pub(crate) fn unpack_row(
    format: PixelFormat,
    row: &[u8],
    width: usize,
    table: Option<&ColorTable>,
    out: &mut [u8],
) -> Result<(), QdError> {
    let mut cursor = PixelCursor::new(out);
    match format {
        PixelFormat::Indexed { depth } => {
            let table = table.ok_or_else(|| QdError::invalid("indexed row without a color table"))?;
            for x in 0..width {
                cursor.draw_rgb(table.lookup(index_at(row, depth, x))?);
            }
        }
        PixelFormat::Rgb555 => {
            for px in row.chunks_exact(2).take(width) {
                cursor.draw_rgb(rgb555_to_rgb8(u16::from_be_bytes([px[0], px[1]])));
            }
        }
        PixelFormat::Rgb24 => {
            for px in row.chunks_exact(3).take(width) {
                cursor.draw_rgb(RGB8::new(px[0], px[1], px[2]));
            }
        }
        PixelFormat::Xrgb32 { alpha } => {
            for px in row.chunks_exact(4).take(width) {
                let a = if alpha { px[0] } else { 255 };
                cursor.draw(RGBA8::new(px[1], px[2], px[3], a));
            }
        }
        PixelFormat::Planar { components: 3 } => {
            let (r, rest) = row.split_at(width);
            let (g, b) = rest.split_at(width);
            for x in 0..width {
                cursor.draw_rgb(RGB8::new(r[x], g[x], b[x]));
            }
        }
        PixelFormat::Planar { .. } => {
            let (a, rest) = row.split_at(width);
            let (r, rest) = rest.split_at(width);
            let (g, b) = rest.split_at(width);
            for x in 0..width {
                cursor.draw(RGBA8::new(r[x], g[x], b[x], a[x]));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_byte_indices_msb_first() {
        assert_eq!(index_at(&[0b1000_0001], 1, 0), 1);
        assert_eq!(index_at(&[0b1000_0001], 1, 6), 0);
        assert_eq!(index_at(&[0b1000_0001], 1, 7), 1);
        assert_eq!(index_at(&[0b1101_0010], 2, 0), 3);
        assert_eq!(index_at(&[0b1101_0010], 2, 3), 2);
        assert_eq!(index_at(&[0xA5], 4, 0), 0xA);
        assert_eq!(index_at(&[0xA5], 4, 1), 0x5);
        assert_eq!(index_at(&[0, 200], 8, 1), 200);
    }

    #[test]
    fn rgb555_row() {
        let mut out = [0u8; 8];
        unpack_row(PixelFormat::Rgb555, &[0x7C, 0x00, 0x00, 0x1F], 2, None, &mut out).unwrap();
        assert_eq!(out, [255, 0, 0, 255, 0, 0, 255, 255]);
    }

    #[test]
    fn planar_rows() {
        let mut out = [0u8; 8];
        unpack_row(PixelFormat::Planar { components: 3 }, &[1, 2, 3, 4, 5, 6], 2, None, &mut out).unwrap();
        assert_eq!(out, [1, 3, 5, 255, 2, 4, 6, 255]);

        unpack_row(
            PixelFormat::Planar { components: 4 },
            &[9, 8, 1, 2, 3, 4, 5, 6],
            2,
            None,
            &mut out,
        )
        .unwrap();
        assert_eq!(out, [1, 3, 5, 9, 2, 4, 6, 8]);
    }

    #[test]
    fn xrgb_alpha_is_optional() {
        let mut out = [0u8; 4];
        unpack_row(PixelFormat::Xrgb32 { alpha: false }, &[7, 1, 2, 3], 1, None, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 255]);
        unpack_row(PixelFormat::Xrgb32 { alpha: true }, &[7, 1, 2, 3], 1, None, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 7]);
    }
}
