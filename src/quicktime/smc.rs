//! Apple Graphics (`smc `) decoding.
//!
//! 8-bit indexed 4x4 blocks in raster order. The opcode's high nibble picks
//! the block operation; 2, 4 and 8 color blocks either carry their colors
//! (which are also appended to a 256-entry circular cache) or reference a
//! cached set by a single byte.

use alloc::vec;
use alloc::vec::Vec;

use crate::binary::BinaryReader;
use crate::color::ColorTable;
use crate::decode::DecodeContext;
use crate::error::QdError;
use crate::raster::Raster;

const CACHE_ENTRIES: usize = 256;

/// Circular cache of color sets of `N` palette indices each.
struct ColorCache<const N: usize> {
    sets: Vec<[u8; N]>,
    next: usize,
}

impl<const N: usize> ColorCache<N> {
    fn new() -> Self {
        Self {
            sets: vec![[0; N]; CACHE_ENTRIES],
            next: 0,
        }
    }

    /// Read a fresh set (`fresh`) into the next slot, or a cached one by index.
    fn fetch(&mut self, reader: &mut BinaryReader<'_>, fresh: bool) -> Result<[u8; N], QdError> {
        if fresh {
            let set = reader.read_array::<N>()?;
            self.sets[self.next] = set;
            self.next = (self.next + 1) % CACHE_ENTRIES;
            Ok(set)
        } else {
            Ok(self.sets[usize::from(reader.read::<u8>()?)])
        }
    }
}

/// Index buffer padded to whole blocks, plus the block cursor.
struct Blocks {
    indices: Vec<u8>,
    stride: usize,
    per_row: usize,
    total: usize,
    current: usize,
}

impl Blocks {
    fn new(width: usize, height: usize) -> Self {
        let per_row = width.div_ceil(4);
        let rows = height.div_ceil(4);
        Self {
            indices: vec![0; per_row * 4 * rows * 4],
            stride: per_row * 4,
            per_row,
            total: per_row * rows,
            current: 0,
        }
    }

    fn origin(&self, block: usize) -> usize {
        (block / self.per_row) * 4 * self.stride + (block % self.per_row) * 4
    }

    /// Write the current block pixel by pixel, then advance.
    fn emit(&mut self, mut pixel: impl FnMut(usize, usize) -> u8) -> Result<(), QdError> {
        if self.current >= self.total {
            return Err(QdError::invalid("'smc ' data runs past the last block"));
        }
        let origin = self.origin(self.current);
        for y in 0..4 {
            for x in 0..4 {
                self.indices[origin + y * self.stride + x] = pixel(x, y);
            }
        }
        self.current += 1;
        Ok(())
    }

    fn copy_from(&mut self, block: usize) -> Result<(), QdError> {
        let src = self.origin(block);
        let mut cells = [0u8; 16];
        for y in 0..4 {
            let row = src + y * self.stride;
            cells[y * 4..y * 4 + 4].copy_from_slice(&self.indices[row..row + 4]);
        }
        self.emit(|x, y| cells[y * 4 + x])
    }

    fn skip(&mut self, n: usize) -> Result<(), QdError> {
        if self.current + n > self.total {
            return Err(QdError::invalid("'smc ' skip runs past the last block"));
        }
        self.current += n;
        Ok(())
    }
}

/// Decode an `smc ` frame of `width x height` against an 8-bit palette.
pub fn decode(
    data: &[u8],
    width: u16,
    height: u16,
    table: &ColorTable,
    ctx: &DecodeContext<'_>,
) -> Result<Raster, QdError> {
    let (w, h) = (usize::from(width), usize::from(height));
    let mut raster = ctx.raster(u32::from(width), u32::from(height))?;
    let mut reader = BinaryReader::new(data);
    reader.skip(1)?;
    let chunk_size = {
        let b = reader.read_array::<3>()?;
        usize::from(b[0]) << 16 | usize::from(b[1]) << 8 | usize::from(b[2])
    };
    if chunk_size != data.len() {
        log::warn!("'smc ' chunk size {chunk_size} != {} bytes of data", data.len());
    }

    let mut blocks = Blocks::new(w, h);
    let mut pairs = ColorCache::<2>::new();
    let mut quads = ColorCache::<4>::new();
    let mut octets = ColorCache::<8>::new();

    while blocks.current < blocks.total {
        let opcode = reader.read::<u8>()?;
        let low_count = usize::from(opcode & 0x0F) + 1;
        let count = |reader: &mut BinaryReader<'_>| -> Result<usize, QdError> {
            if opcode & 0x10 != 0 {
                Ok(usize::from(reader.read::<u8>()?) + 1)
            } else {
                Ok(low_count)
            }
        };
        match opcode & 0xF0 {
            0x00 | 0x10 => {
                let n = count(&mut reader)?;
                blocks.skip(n)?;
            }
            0x20 | 0x30 => {
                let n = count(&mut reader)?;
                let prev = blocks
                    .current
                    .checked_sub(1)
                    .ok_or_else(|| QdError::invalid("'smc ' repeat before any block"))?;
                for _ in 0..n {
                    blocks.copy_from(prev)?;
                }
            }
            0x40 | 0x50 => {
                let n = count(&mut reader)?;
                let first = blocks
                    .current
                    .checked_sub(2)
                    .ok_or_else(|| QdError::invalid("'smc ' pair repeat before two blocks"))?;
                for _ in 0..n {
                    blocks.copy_from(first)?;
                    blocks.copy_from(first + 1)?;
                }
            }
            0x60 | 0x70 => {
                let n = count(&mut reader)?;
                let color = reader.read::<u8>()?;
                for _ in 0..n {
                    blocks.emit(|_, _| color)?;
                }
            }
            0x80 | 0x90 => {
                let colors = pairs.fetch(&mut reader, opcode & 0xF0 == 0x80)?;
                for _ in 0..low_count {
                    let flags = reader.read::<u16>()?;
                    blocks.emit(|x, y| {
                        let bit = 15 - (y * 4 + x);
                        colors[usize::from((flags >> bit) & 1)]
                    })?;
                }
            }
            0xA0 | 0xB0 => {
                let colors = quads.fetch(&mut reader, opcode & 0xF0 == 0xA0)?;
                for _ in 0..low_count {
                    let flags = reader.read::<u32>()?;
                    blocks.emit(|x, y| {
                        let shift = 30 - 2 * (y * 4 + x);
                        colors[((flags >> shift) & 3) as usize]
                    })?;
                }
            }
            0xC0 | 0xD0 => {
                let colors = octets.fetch(&mut reader, opcode & 0xF0 == 0xC0)?;
                for _ in 0..low_count {
                    // Three words `01 23 45 67 89 AB` hold rows 0-1 as
                    // 0 1 2 4 5 6 and rows 2-3 as 8 9 A 3 7 B.
                    let v1 = u32::from(reader.read::<u16>()?);
                    let v2 = u32::from(reader.read::<u16>()?);
                    let v3 = u32::from(reader.read::<u16>()?);
                    let flags_a = ((v1 & 0xFFF0) << 8) | (v2 >> 4);
                    let flags_b = ((v3 & 0xFFF0) << 8) | ((v1 & 0x0F) << 8) | ((v2 & 0x0F) << 4) | (v3 & 0x0F);
                    blocks.emit(|x, y| {
                        let flags = if y < 2 { flags_a } else { flags_b };
                        let shift = 21 - 3 * ((y % 2) * 4 + x);
                        colors[((flags >> shift) & 7) as usize]
                    })?;
                }
            }
            0xE0 => {
                for _ in 0..low_count {
                    let colors = reader.read_array::<16>()?;
                    blocks.emit(|x, y| colors[y * 4 + x])?;
                }
            }
            _ => {
                return Err(QdError::unsupported(alloc::format!(
                    "'smc ' opcode {opcode:#04x}"
                )));
            }
        }
    }

    for y in 0..h {
        let src = &blocks.indices[y * blocks.stride..y * blocks.stride + w];
        for (x, &idx) in src.iter().enumerate() {
            let c = table.lookup(usize::from(idx))?;
            raster.set_pixel(x, y, rgb::RGBA8::new(c.r, c.g, c.b, 255));
        }
    }
    Ok(raster)
}
