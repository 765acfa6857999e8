//! QuickTime Animation (`rle `) frame decoding.
//!
//! A frame starts with a 4-byte chunk size and 2-byte flags; flag `0x0008`
//! adds a start line and line count. Pixels are coded in groups: 16 pixels
//! (2 bytes) at 1 bit, 4 bytes at 2, 4 and 8 bits, and one pixel at 16, 24
//! and 32 bits. Only pixels covered by a run are drawn; skipped regions and
//! unchanged frames decode as `0,0,0,0` at every depth.

use crate::binary::BinaryReader;
use crate::error::QdError;

use super::Plane;

const FLAG_HAS_LINES: u16 = 0x0008;

fn group_bytes(depth: u16) -> Result<usize, QdError> {
    Ok(match depth {
        1 | 16 => 2,
        2 | 4 | 8 | 32 => 4,
        24 => 3,
        _ => {
            return Err(QdError::unsupported(alloc::format!("'rle ' at depth {depth}")));
        }
    })
}

/// Decode one `rle ` frame into a pixel plane of `depth` bits.
pub fn decode(data: &[u8], width: u16, height: u16, depth: u16) -> Result<Plane, QdError> {
    let group = group_bytes(depth)?;
    let mut plane = Plane::blank(width, height, depth, group)?;
    plane.track_writes();

    let mut reader = BinaryReader::new(data);
    if data.len() < 8 {
        return Ok(plane);
    }
    let chunk_size = (reader.read::<u32>()? & 0x3FFF_FFFF) as usize;
    if chunk_size <= 8 {
        return Ok(plane);
    }
    if chunk_size != data.len() {
        log::warn!("'rle ' chunk size {chunk_size} != {} bytes of data", data.len());
    }
    let flags = reader.read::<u16>()?;
    let (start, lines) = if flags & FLAG_HAS_LINES != 0 {
        let start = reader.read::<u16>()?;
        reader.skip(2)?;
        let lines = reader.read::<u16>()?;
        reader.skip(2)?;
        (usize::from(start), usize::from(lines))
    } else {
        (0, usize::from(height))
    };
    if start + lines > usize::from(height) {
        return Err(QdError::invalid(alloc::format!(
            "'rle ' lines {start}..{} exceed height {height}",
            start + lines
        )));
    }

    let mut frame = Frame {
        reader,
        plane: &mut plane,
        group,
    };
    if depth == 1 {
        frame.decode_mono(start, lines)?;
    } else {
        frame.decode_lines(start, lines)?;
    }
    Ok(plane)
}

struct Frame<'a, 'p> {
    reader: BinaryReader<'a>,
    plane: &'p mut Plane,
    group: usize,
}

impl Frame<'_, '_> {
    /// Literal groups (`count > 0`) or a repeated group (`count < 0`) at
    /// byte offset `x` of row `y`; returns the new offset.
    fn run(&mut self, y: usize, x: usize, count: i32) -> Result<usize, QdError> {
        let row_bytes = self.plane.row_bytes();
        let n = count.unsigned_abs() as usize * self.group;
        if x + n > row_bytes {
            return Err(QdError::invalid(alloc::format!(
                "'rle ' run of {n} bytes at offset {x} overflows {row_bytes}-byte row"
            )));
        }
        let row = &mut self.plane.pixels[y * row_bytes..(y + 1) * row_bytes];
        if count > 0 {
            row[x..x + n].copy_from_slice(self.reader.read_bytes(n)?);
        } else {
            let value = self.reader.read_bytes(self.group)?;
            for chunk in row[x..x + n].chunks_exact_mut(self.group) {
                chunk.copy_from_slice(value);
            }
        }
        self.plane.mark_bytes(y, x, x + n);
        Ok(x + n)
    }

    /// 2 to 32 bits: each line opens with a one-based skip count; code 0
    /// reads another skip, -1 ends the line. A zero skip ends the frame.
    fn decode_lines(&mut self, start: usize, lines: usize) -> Result<(), QdError> {
        for y in start..start + lines {
            if self.reader.is_empty() {
                break;
            }
            let skip = self.reader.read::<u8>()?;
            if skip == 0 {
                return Ok(());
            }
            let mut x = (usize::from(skip) - 1) * self.group;
            loop {
                match self.reader.read::<i8>()? {
                    -1 => break,
                    0 => {
                        let skip = self.reader.read::<u8>()?;
                        if skip == 0 {
                            return Ok(());
                        }
                        x += (usize::from(skip) - 1) * self.group;
                    }
                    code => x = self.run(y, x, i32::from(code))?,
                }
            }
        }
        Ok(())
    }

    /// 1 bit: `(skip, code)` pairs where a skip with the high bit set moves
    /// to the next line, and code 0 ends the frame.
    fn decode_mono(&mut self, start: usize, lines: usize) -> Result<(), QdError> {
        let mut y: Option<usize> = None;
        let mut x = 0;
        let mut new_lines = 0;
        while new_lines <= lines && self.reader.remaining() >= 2 {
            let skip = self.reader.read::<u8>()?;
            let code = self.reader.read::<i8>()?;
            if code == 0 {
                break;
            }
            if skip & 0x80 != 0 {
                new_lines += 1;
                y = Some(y.map_or(start, |y| y + 1));
                x = usize::from(skip & 0x7F) * self.group;
            } else {
                x += usize::from(skip) * self.group;
            }
            if code == -1 {
                continue;
            }
            let row = y
                .filter(|&y| y < start + lines)
                .ok_or_else(|| QdError::invalid("'rle ' data outside the changed lines"))?;
            x = self.run(row, x, i32::from(code))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryWriter;
    use crate::color::ColorTable;
    use crate::decode::DecodeContext;
    use rgb::{RGB8, RGBA8};

    fn frame(header_lines: Option<(u16, u16)>, body: &[u8]) -> alloc::vec::Vec<u8> {
        let mut w = BinaryWriter::new();
        let size = w.reserve::<u32>();
        match header_lines {
            Some((start, count)) => {
                w.write(FLAG_HAS_LINES);
                w.write(start);
                w.write(0u16);
                w.write(count);
                w.write(0u16);
            }
            None => w.write(0u16),
        }
        w.write_bytes(body);
        let len = w.position() as u32;
        w.backfill(size, len);
        w.into_inner()
    }

    #[test]
    fn skip_everything_is_all_zero() {
        let data = frame(Some((0, 3)), &[0x00]);
        let plane = decode(&data, 5, 3, 32).unwrap();
        let raster = plane.render(None, &DecodeContext::default()).unwrap();
        assert_eq!((raster.width, raster.height), (5, 3));
        assert!(raster.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn skipped_pixels_are_clear_at_every_depth() {
        let table = ColorTable::system(8).unwrap();
        for depth in [2, 4, 8, 16, 24] {
            let data = frame(Some((0, 3)), &[0x00]);
            let raster = decode(&data, 4, 3, depth)
                .unwrap()
                .render(Some(&table), &DecodeContext::default())
                .unwrap();
            assert!(raster.pixels().iter().all(|&b| b == 0), "depth {depth}");
        }
    }

    #[test]
    fn unchanged_frame() {
        let plane = decode(&[0, 0, 0, 8, 0, 0, 0, 0], 2, 2, 16).unwrap();
        assert!(plane.pixels.iter().all(|&b| b == 0));
        let raster = plane.render(None, &DecodeContext::default()).unwrap();
        assert!(raster.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn only_written_lines_are_opaque() {
        // Line 1 of 3: four pixels of index 0 (white in the 8-bit palette).
        let body = [1, 1, 0, 0, 0, 0, 0xFF];
        let table = ColorTable::system(8).unwrap();
        let raster = decode(&frame(Some((1, 1)), &body), 6, 3, 8)
            .unwrap()
            .render(Some(&table), &DecodeContext::default())
            .unwrap();
        for x in 0..4 {
            assert_eq!(raster.pixel(x, 1), RGBA8::new(255, 255, 255, 255));
        }
        assert_eq!(raster.pixel(4, 1), RGBA8::new(0, 0, 0, 0));
        assert_eq!(raster.pixel(0, 0), RGBA8::new(0, 0, 0, 0));
        assert_eq!(raster.pixel(0, 2), RGBA8::new(0, 0, 0, 0));
    }

    #[test]
    fn rgb555_written_black_stays_opaque() {
        let body = [1, 1, 0, 0, 0xFF];
        let raster = decode(&frame(None, &body), 2, 1, 16)
            .unwrap()
            .render(None, &DecodeContext::default())
            .unwrap();
        assert_eq!(raster.pixel(0, 0), RGBA8::new(0, 0, 0, 255));
        assert_eq!(raster.pixel(1, 0), RGBA8::new(0, 0, 0, 0));
    }

    #[test]
    fn rgb24_literal_and_repeat() {
        // Line 0: skip 1 (none), literal 1 pixel, repeat 2 pixels, end line.
        let body = [1, 1, 10, 20, 30, 0xFE, 40, 50, 60, 0xFF, 0];
        let plane = decode(&frame(None, &body), 3, 2, 24).unwrap();
        assert_eq!(&plane.pixels[..9], &[10, 20, 30, 40, 50, 60, 40, 50, 60]);
        assert!(plane.pixels[9..].iter().all(|&b| b == 0));
    }

    #[test]
    fn argb32_with_inline_skip() {
        // Skip 1 pixel via a mid-line skip code, then one literal pixel.
        let body = [1, 0, 2, 1, 255, 1, 2, 3, 0xFF];
        let plane = decode(&frame(Some((1, 1)), &body), 2, 2, 32).unwrap();
        let raster = plane.render(None, &DecodeContext::default()).unwrap();
        assert_eq!(raster.pixel(1, 1), RGBA8::new(1, 2, 3, 255));
        assert_eq!(raster.pixel(0, 1), RGBA8::new(0, 0, 0, 0));
    }

    #[test]
    fn indexed8_groups_of_four() {
        let body = [1, 1, 1, 1, 1, 1, 0xFF];
        let plane = decode(&frame(None, &body), 4, 1, 8).unwrap();
        let table = ColorTable::new(alloc::vec![RGB8::new(0, 0, 0), RGB8::new(200, 0, 0)]);
        let raster = plane.render(Some(&table), &DecodeContext::default()).unwrap();
        for x in 0..4 {
            assert_eq!(raster.pixel(x, 0), RGBA8::new(200, 0, 0, 255));
        }
    }

    #[test]
    fn mono_new_line_codes() {
        let body = [0x80, 0x01, 0xF0, 0xF0, 0x80, 0x01, 0x0F, 0x00, 0x00, 0x00];
        let plane = decode(&frame(None, &body), 16, 2, 1).unwrap();
        assert_eq!(plane.pixels, [0xF0, 0xF0, 0x0F, 0x00]);
    }

    #[test]
    fn overflowing_run_fails() {
        let body = [1, 0xF0, 1, 2, 3];
        assert!(decode(&frame(None, &body), 2, 1, 24).is_err());
    }
}
