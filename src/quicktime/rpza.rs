//! Apple Video (`rpza`) decoding.
//!
//! RGB555 4x4 blocks in raster order. Opcodes with the high bit set carry a
//! block count in their low 5 bits: `0x80` skip, `0xA0` fill, `0xC0` four
//! colors blended from two endpoints. With the high bit clear the opcode is
//! the first half of a color, and a peek at the following byte tells a
//! single four-color block apart from a sixteen-color literal block.

use crate::binary::BinaryReader;
use crate::color::rgb555_to_rgb8;
use crate::decode::DecodeContext;
use crate::error::QdError;
use crate::raster::Raster;
use rgb::{RGB8, RGBA8};

const CHUNK_MARKER: u8 = 0xE1;

struct Cursor<'r> {
    raster: &'r mut Raster,
    per_row: usize,
    total: usize,
    current: usize,
}

impl Cursor<'_> {
    fn advance(&mut self, n: usize) {
        self.current = (self.current + n).min(self.total);
    }

    /// Paint the current block; pixels outside the raster are dropped.
    fn paint(&mut self, mut pixel: impl FnMut(usize, usize) -> RGB8) {
        let bx = (self.current % self.per_row) * 4;
        let by = (self.current / self.per_row) * 4;
        let (w, h) = (self.raster.width as usize, self.raster.height as usize);
        for y in 0..4 {
            for x in 0..4 {
                let c = pixel(x, y);
                if bx + x < w && by + y < h {
                    self.raster.set_pixel(bx + x, by + y, RGBA8::new(c.r, c.g, c.b, 255));
                }
            }
        }
        self.current += 1;
    }
}

fn blend(a: u8, b: u8, wa: u32, wb: u32) -> u8 {
    ((wa * u32::from(a) + wb * u32::from(b)) >> 5) as u8
}

/// The four colors of a blended block: `B`, two mixes, `A`.
fn four_colors(a: RGB8, b: RGB8) -> [RGB8; 4] {
    let mix = |wa, wb| {
        RGB8::new(
            blend(a.r, b.r, wa, wb),
            blend(a.g, b.g, wa, wb),
            blend(a.b, b.b, wa, wb),
        )
    };
    [b, mix(11, 21), mix(21, 11), a]
}

/// Decode an `rpza` frame of `width x height`.
pub fn decode(data: &[u8], width: u16, height: u16, ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let mut raster = ctx.raster(u32::from(width), u32::from(height))?;
    let mut reader = BinaryReader::new(data);
    let marker = reader.peek_u8()?;
    if marker != CHUNK_MARKER {
        return Err(QdError::invalid(alloc::format!(
            "'rpza' chunk starts with {marker:#04x}"
        )));
    }
    let chunk_size = (reader.read::<u32>()? & 0x00FF_FFFF) as usize;
    if chunk_size != data.len() {
        log::warn!("'rpza' chunk size {chunk_size} != {} bytes of data", data.len());
    }

    let per_row = usize::from(width).div_ceil(4);
    let mut cursor = Cursor {
        per_row,
        total: per_row * usize::from(height).div_ceil(4),
        current: 0,
        raster: &mut raster,
    };

    while !reader.is_empty() && cursor.current < cursor.total {
        let mut opcode = reader.read::<u8>()?;
        let mut n_blocks = usize::from(opcode & 0x1F) + 1;
        let mut color_a = 0u16;
        if opcode & 0x80 == 0 {
            color_a = u16::from(opcode) << 8 | u16::from(reader.read::<u8>()?);
            opcode = 0;
            if reader.peek_u8().is_ok_and(|b| b & 0x80 != 0) {
                // A lone four-color block whose first endpoint was just read.
                opcode = 0x20;
                n_blocks = 1;
            }
        }
        let n_blocks = n_blocks.min(cursor.total - cursor.current);

        match opcode & 0xE0 {
            0x80 => cursor.advance(n_blocks),
            0xA0 => {
                let c = rgb555_to_rgb8(reader.read()?);
                for _ in 0..n_blocks {
                    cursor.paint(|_, _| c);
                }
            }
            0xC0 | 0x20 => {
                if opcode & 0xE0 == 0xC0 {
                    color_a = reader.read()?;
                }
                let color_b = reader.read::<u16>()?;
                let colors = four_colors(rgb555_to_rgb8(color_a), rgb555_to_rgb8(color_b));
                for _ in 0..n_blocks {
                    let rows = reader.read_array::<4>()?;
                    cursor.paint(|x, y| colors[usize::from((rows[y] >> (2 * (3 - x))) & 3)]);
                }
            }
            0x00 => {
                let mut colors = [RGB8::default(); 16];
                colors[0] = rgb555_to_rgb8(color_a);
                for c in &mut colors[1..] {
                    *c = rgb555_to_rgb8(reader.read()?);
                }
                cursor.paint(|x, y| colors[y * 4 + x]);
            }
            _ => {
                return Err(QdError::invalid(alloc::format!(
                    "'rpza' opcode {opcode:#04x}"
                )));
            }
        }
    }
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    const RED: u16 = 0x7C00;
    const BLUE: u16 = 0x001F;

    fn run(width: u16, height: u16, body: &[u8]) -> Result<Raster, QdError> {
        let mut data = vec![CHUNK_MARKER, 0, 0, 0];
        data.extend_from_slice(body);
        let len = data.len() as u32;
        data[1..4].copy_from_slice(&len.to_be_bytes()[1..]);
        decode(&data, width, height, &DecodeContext::default())
    }

    fn px(r: &Raster, x: usize, y: usize) -> RGB8 {
        let p = r.pixel(x, y);
        RGB8::new(p.r, p.g, p.b)
    }

    #[test]
    fn fill_then_skip() {
        let [hi, lo] = RED.to_be_bytes();
        let r = run(12, 4, &[0xA0, hi, lo, 0x80, 0xA0, hi, lo]).unwrap();
        assert_eq!(px(&r, 0, 0), RGB8::new(255, 0, 0));
        assert_eq!(r.pixel(5, 2), RGBA8::new(0, 0, 0, 0));
        assert_eq!(px(&r, 11, 3), RGB8::new(255, 0, 0));
    }

    #[test]
    fn four_color_block() {
        let [ah, al] = RED.to_be_bytes();
        let [bh, bl] = BLUE.to_be_bytes();
        // Row y uses index y for every pixel.
        let r = run(4, 4, &[0xC0, ah, al, bh, bl, 0x00, 0x55, 0xAA, 0xFF]).unwrap();
        assert_eq!(px(&r, 0, 0), RGB8::new(0, 0, 255));
        assert_eq!(px(&r, 3, 1), RGB8::new(87, 0, 167));
        assert_eq!(px(&r, 2, 2), RGB8::new(167, 0, 87));
        assert_eq!(px(&r, 1, 3), RGB8::new(255, 0, 0));
    }

    #[test]
    fn special_opcode_four_colors() {
        // MSB-clear color A followed by a byte with the MSB set: color B is
        // read next, then one block of indices.
        let [ah, al] = RED.to_be_bytes();
        let r = run(4, 4, &[ah, al, 0x80, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(px(&r, 0, 0), RGB8::new(255, 0, 0));
        assert_eq!(px(&r, 3, 3), RGB8::new(255, 0, 0));
    }

    #[test]
    fn sixteen_color_block() {
        let colors: Vec<u16> = (0..16).map(|i| i as u16).collect();
        let mut body = Vec::new();
        for c in &colors {
            body.extend_from_slice(&c.to_be_bytes());
        }
        let r = run(4, 4, &body).unwrap();
        for (i, &c) in colors.iter().enumerate() {
            assert_eq!(px(&r, i % 4, i / 4), rgb555_to_rgb8(c));
        }
    }

    #[test]
    fn wraps_to_next_band() {
        let [hi, lo] = BLUE.to_be_bytes();
        let r = run(4, 8, &[0x80, 0xA0, hi, lo]).unwrap();
        assert_eq!(r.pixel(0, 0).a, 0);
        assert_eq!(px(&r, 0, 4), RGB8::new(0, 0, 255));
    }

    #[test]
    fn bad_marker_fails() {
        assert!(decode(&[0x00, 0, 0, 4], 4, 4, &DecodeContext::default()).is_err());
    }

    #[test]
    fn truncated_block_fails() {
        assert!(run(4, 4, &[0xC0, 0x7C, 0x00, 0x00, 0x1F, 0x00]).is_err());
    }
}
