//! Color tables, standard system palettes, and QuickDraw color encodings.

use alloc::vec;
use alloc::vec::Vec;

use rgb::{RGB8, RGBA8};

use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::QdError;

const CT_FLAG_DEVICE: u16 = 0x8000;

// ── Color encodings ─────────────────────────────────────────────────

/// Expand a 5-bit channel to 8 bits by replicating its high bits.
#[inline]
fn expand5(c: u16) -> u8 {
    let c = (c & 0x1F) as u8;
    (c << 3) | (c >> 2)
}

/// Decode a 16-bit `x1r5g5b5` pixel.
#[inline]
pub fn rgb555_to_rgb8(v: u16) -> RGB8 {
    RGB8::new(expand5(v >> 10), expand5(v >> 5), expand5(v))
}

/// Encode an 8-bit color as `x1r5g5b5`, truncating the low 3 bits.
#[inline]
pub fn rgb8_to_rgb555(c: RGB8) -> u16 {
    (u16::from(c.r >> 3) << 10) | (u16::from(c.g >> 3) << 5) | u16::from(c.b >> 3)
}

/// Read a 48-bit QuickDraw `RGBColor`, keeping the high byte of each channel.
pub fn read_rgb_color(reader: &mut BinaryReader<'_>) -> Result<RGB8, QdError> {
    let r = reader.read::<u16>()?;
    let g = reader.read::<u16>()?;
    let b = reader.read::<u16>()?;
    Ok(RGB8::new((r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8))
}

/// Write a 48-bit `RGBColor`, duplicating each byte into both halves.
pub fn write_rgb_color(writer: &mut BinaryWriter, c: RGB8) {
    for ch in [c.r, c.g, c.b] {
        writer.write(u16::from(ch) * 0x0101);
    }
}

/// Writes RGBA8 pixels into a raster row, advancing by one pixel per draw.
pub(crate) struct PixelCursor<'a> {
    row: &'a mut [u8],
    pos: usize,
}

impl<'a> PixelCursor<'a> {
    pub(crate) fn new(row: &'a mut [u8]) -> Self {
        Self { row, pos: 0 }
    }

    #[inline]
    pub(crate) fn draw(&mut self, c: RGBA8) {
        self.row[self.pos..self.pos + 4].copy_from_slice(&[c.r, c.g, c.b, c.a]);
        self.pos += 4;
    }

    #[inline]
    pub(crate) fn draw_rgb(&mut self, c: RGB8) {
        self.draw(RGBA8::new(c.r, c.g, c.b, 255));
    }
}

// ── Color table ─────────────────────────────────────────────────────

/// A palette addressed by pixel value.
///
/// Entries decoded from a sparse (non-device) table sit at their encoded
/// index; unused slots below the highest index are black.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorTable {
    entries: Vec<RGB8>,
    device: bool,
}

impl ColorTable {
    pub fn new(entries: Vec<RGB8>) -> Self {
        Self {
            entries,
            device: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_device(&self) -> bool {
        self.device
    }

    pub fn colors(&self) -> &[RGB8] {
        &self.entries
    }

    /// Look up a pixel value. Out-of-range indices are corrupt input.
    #[inline]
    pub fn lookup(&self, index: usize) -> Result<RGB8, QdError> {
        self.entries.get(index).copied().ok_or_else(|| {
            QdError::invalid(alloc::format!(
                "palette index {index} out of range (table has {} entries)",
                self.entries.len()
            ))
        })
    }

    /// Index of the closest entry by squared RGB distance.
    pub fn nearest(&self, c: RGB8) -> usize {
        let dist = |e: &RGB8| {
            let dr = i32::from(e.r) - i32::from(c.r);
            let dg = i32::from(e.g) - i32::from(c.g);
            let db = i32::from(e.b) - i32::from(c.b);
            dr * dr + dg * dg + db * db
        };
        self.entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| dist(e))
            .map_or(0, |(i, _)| i)
    }

    /// Parse a `ColorTable` record.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self, QdError> {
        reader.skip(4)?; // ctSeed
        let flags = reader.read::<u16>()?;
        let device = flags & CT_FLAG_DEVICE != 0;
        let size = i32::from(reader.read::<i16>()?) + 1;
        if !(0..=256).contains(&size) {
            return Err(QdError::invalid(alloc::format!(
                "color table size {size} outside 0..=256"
            )));
        }

        let mut entries: Vec<RGB8> = Vec::with_capacity(size as usize);
        for position in 0..size as usize {
            let value = reader.read::<u16>()? as usize;
            let index = if device { position } else { value };
            if index > 255 {
                return Err(QdError::invalid(alloc::format!(
                    "color table entry index {index} exceeds 255"
                )));
            }
            let color = read_rgb_color(reader)?;
            if index >= entries.len() {
                entries.resize(index + 1, RGB8::default());
            }
            entries[index] = color;
        }
        Ok(Self { entries, device })
    }

    /// Serialize as a `ColorTable` record with sequential indices.
    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write(0u32); // ctSeed
        writer.write(0u16); // ctFlags
        writer.write(self.entries.len() as i16 - 1);
        for (i, c) in self.entries.iter().enumerate() {
            writer.write(i as u16);
            write_rgb_color(writer, *c);
        }
    }

    /// Encoded size of [`Self::write`] output.
    pub fn encoded_len(&self) -> usize {
        8 + self.entries.len() * 8
    }

    // ── System palettes ─────────────────────────────────────────────

    /// A well-known system `clut` by resource id: 1, 2, 4, 8 (standard
    /// color) and 33, 34, 36, 40 (grayscale, `32 + depth`).
    pub fn system(id: i16) -> Option<Self> {
        let mut table = match id {
            1 => Self::new(vec![RGB8::new(255, 255, 255), RGB8::new(0, 0, 0)]),
            2 => Self::new(vec![
                RGB8::new(0xFF, 0xFF, 0xFF),
                RGB8::new(0xAC, 0xAC, 0xAC),
                RGB8::new(0x55, 0x55, 0x55),
                RGB8::new(0x00, 0x00, 0x00),
            ]),
            4 => Self::new(STANDARD_16.iter().map(|&c| rgb_hex(c)).collect()),
            8 => Self::standard_256(),
            33 | 34 | 36 | 40 => Self::grayscale(1usize << (id - 32) as u32),
            _ => return None,
        };
        table.device = true;
        Some(table)
    }

    /// The default palette for an indexed depth.
    pub fn default_for_depth(depth: u16) -> Option<Self> {
        match depth {
            1 | 2 | 4 | 8 => Self::system(depth as i16),
            _ => None,
        }
    }

    /// A white-to-black ramp with `count` entries.
    pub fn grayscale(count: usize) -> Self {
        let step = 255 / (count.max(2) - 1);
        Self::new(
            (0..count)
                .map(|i| {
                    let v = 255 - (i * step).min(255) as u8;
                    RGB8::new(v, v, v)
                })
                .collect(),
        )
    }

    fn standard_256() -> Self {
        const LEVELS: [u8; 6] = [0xFF, 0xCC, 0x99, 0x66, 0x33, 0x00];
        const RAMP: [u8; 10] = [0xEE, 0xDD, 0xBB, 0xAA, 0x88, 0x77, 0x55, 0x44, 0x22, 0x11];
        let mut entries = Vec::with_capacity(256);
        for r in LEVELS {
            for g in LEVELS {
                for b in LEVELS {
                    entries.push(RGB8::new(r, g, b));
                }
            }
        }
        entries.pop(); // black moves to the last slot
        entries.extend(RAMP.iter().map(|&v| RGB8::new(v, 0, 0)));
        entries.extend(RAMP.iter().map(|&v| RGB8::new(0, v, 0)));
        entries.extend(RAMP.iter().map(|&v| RGB8::new(0, 0, v)));
        entries.extend(RAMP.iter().map(|&v| RGB8::new(v, v, v)));
        entries.push(RGB8::new(0, 0, 0));
        Self::new(entries)
    }
}

const STANDARD_16: [u32; 16] = [
    0xFFFFFF, 0xFCF305, 0xFF6402, 0xDD0806, 0xF20884, 0x4600A5, 0x0000D4, 0x02ABEA, 0x1FB714,
    0x006411, 0x562C05, 0x90713A, 0xC0C0C0, 0x808080, 0x404040, 0x000000,
];

const fn rgb_hex(v: u32) -> RGB8 {
    RGB8 {
        r: (v >> 16) as u8,
        g: (v >> 8) as u8,
        b: v as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(table: &ColorTable) -> ColorTable {
        let mut w = BinaryWriter::new();
        table.write(&mut w);
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), table.encoded_len());
        ColorTable::read(&mut BinaryReader::new(&bytes)).unwrap()
    }

    #[test]
    fn color_table_roundtrip_sizes() {
        for size in [1usize, 2, 256] {
            let table = ColorTable::new(
                (0..size)
                    .map(|i| RGB8::new(i as u8, (i * 7) as u8, 255 - i as u8))
                    .collect(),
            );
            assert_eq!(roundtrip(&table).colors(), table.colors());
        }
    }

    #[test]
    fn read_keeps_high_byte() {
        let bytes = [
            0, 0, 0, 0, // seed
            0, 0, // flags
            0, 0, // one entry
            0, 0, // value
            0x12, 0x99, 0xAB, 0x00, 0xFF, 0x01,
        ];
        let table = ColorTable::read(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(table.colors(), &[RGB8::new(0x12, 0xAB, 0xFF)]);
    }

    #[test]
    fn sparse_table_places_entries_by_value() {
        let bytes = [
            0, 0, 0, 0, 0, 0, 0, 0, // seed, flags, size-1 = 0
            0, 3, 0xFF, 0xFF, 0, 0, 0, 0, // index 3 = red
        ];
        let table = ColorTable::read(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup(3).unwrap(), RGB8::new(255, 0, 0));
        assert!(table.lookup(4).is_err());
    }

    #[test]
    fn oversized_table_rejected() {
        let bytes = [0, 0, 0, 0, 0x80, 0, 0x01, 0x00]; // size-1 = 256
        assert!(ColorTable::read(&mut BinaryReader::new(&bytes)).is_err());
    }

    #[test]
    fn empty_table_allowed() {
        let bytes = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF];
        let table = ColorTable::read(&mut BinaryReader::new(&bytes)).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn system_palettes() {
        assert_eq!(ColorTable::system(1).unwrap().len(), 2);
        assert_eq!(ColorTable::system(4).unwrap().len(), 16);
        let clut8 = ColorTable::system(8).unwrap();
        assert_eq!(clut8.len(), 256);
        assert_eq!(clut8.colors()[0], RGB8::new(255, 255, 255));
        assert_eq!(clut8.colors()[255], RGB8::new(0, 0, 0));
        assert_eq!(clut8.colors()[215], RGB8::new(0xEE, 0, 0));
        let gray = ColorTable::system(40).unwrap();
        assert_eq!(gray.colors()[0], RGB8::new(255, 255, 255));
        assert_eq!(gray.colors()[255], RGB8::new(0, 0, 0));
        assert!(ColorTable::system(3).is_none());
    }

    #[test]
    fn rgb555_replicates_high_bits() {
        assert_eq!(rgb555_to_rgb8(0x7FFF), RGB8::new(255, 255, 255));
        assert_eq!(rgb555_to_rgb8(0x7C00), RGB8::new(255, 0, 0));
        assert_eq!(rgb555_to_rgb8(0x0010), RGB8::new(0, 0, 0x84));
        let c = RGB8::new(0x84, 0x42, 0x21);
        assert_eq!(rgb555_to_rgb8(rgb8_to_rgb555(c)), c);
    }

    #[test]
    fn nearest_entry() {
        let clut = ColorTable::system(4).unwrap();
        assert_eq!(clut.nearest(RGB8::new(250, 250, 250)), 0);
        assert_eq!(clut.nearest(RGB8::new(3, 2, 1)), 15);
    }
}
