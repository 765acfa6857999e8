//! QuickDraw `PixMap`/`BitMap` headers and the blit engine shared by every
//! decoder in this crate.
//!
//! A pixel map header is parsed fresh from each resource, validated, and then
//! used to unpack raw or PackBits-compressed rows into an RGBA raster.

mod build;
mod unpack;

pub use build::{DirectImage, IndexedImage, build, build_direct, build_mask, build_monochrome};
pub(crate) use build::build_with_table;
pub(crate) use unpack::{index_at, unpack_row};

use alloc::vec;
use alloc::vec::Vec;

use crate::binary::{BinaryReader, BinaryWriter};
use crate::color::ColorTable;
use crate::error::QdError;
use crate::geometry::Rect;
use crate::packbits::{pack_bits, unpack_bits};
use crate::raster::Raster;

const PIXMAP_FLAG: u16 = 0x8000;
const ROW_BYTES_MASK: u16 = 0x3FFF;
/// 72 dpi as a 16.16 fixed-point value.
pub(crate) const DEFAULT_RES: u32 = 0x0048_0000;

/// `packType` field values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackType {
    /// PackBits with the natural element size for the depth.
    Default,
    None,
    /// 32-bit pixels stored as 24-bit, high byte dropped.
    DropPadByte,
    /// PackBits over 16-bit words.
    RunLength16,
    /// PackBits over separate component planes.
    ComponentRle,
}

impl PackType {
    fn from_i16(v: i16) -> Option<Self> {
        Some(match v {
            0 => Self::Default,
            1 => Self::None,
            2 => Self::DropPadByte,
            3 => Self::RunLength16,
            4 => Self::ComponentRle,
            _ => return None,
        })
    }

    fn to_i16(self) -> i16 {
        match self {
            Self::Default => 0,
            Self::None => 1,
            Self::DropPadByte => 2,
            Self::RunLength16 => 3,
            Self::ComponentRle => 4,
        }
    }
}

/// Resolved in-memory layout of one row of pixel data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Indexed { depth: u8 },
    Rgb555,
    Rgb24,
    Xrgb32 { alpha: bool },
    /// One plane per component within each row: `R G B` or `A R G B`.
    Planar { components: u8 },
}

/// A `PixMap` record, or a plain 1-bit `BitMap` when `is_pixmap` is false.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixMap {
    pub base_addr: u32,
    pub row_bytes: u16,
    pub is_pixmap: bool,
    pub bounds: Rect,
    pub version: i16,
    pub pack_type: PackType,
    pub pack_size: u32,
    pub h_res: u32,
    pub v_res: u32,
    pub pixel_type: i16,
    pub pixel_size: u16,
    pub cmp_count: u16,
    pub cmp_size: u16,
    pub plane_bytes: u32,
    /// `pmTable`: a handle placeholder, or an offset inside the resource.
    pub color_table: u32,
    pub reserved: u32,
}

impl PixMap {
    /// Size of a full `PixMap` record including the base address.
    pub const SIZE: usize = 50;
    /// Size of a `BitMap` record including the base address.
    pub const BITMAP_SIZE: usize = 14;

    /// A 1-bit `BitMap`.
    pub fn bitmap(bounds: Rect, row_bytes: u16) -> Self {
        Self {
            is_pixmap: false,
            ..Self::indexed(bounds, 1, row_bytes)
        }
    }

    /// An indexed pixmap of `depth` bits per pixel.
    pub fn indexed(bounds: Rect, depth: u16, row_bytes: u16) -> Self {
        Self {
            base_addr: 0,
            row_bytes,
            is_pixmap: true,
            bounds,
            version: 0,
            pack_type: PackType::Default,
            pack_size: 0,
            h_res: DEFAULT_RES,
            v_res: DEFAULT_RES,
            pixel_type: 0,
            pixel_size: depth,
            cmp_count: 1,
            cmp_size: depth,
            plane_bytes: 0,
            color_table: 0,
            reserved: 0,
        }
    }

    /// A direct (16/24/32-bit) pixmap.
    pub fn direct(bounds: Rect, pixel_size: u16, cmp_count: u16, row_bytes: u16, pack_type: PackType) -> Self {
        Self {
            pixel_type: 16,
            pixel_size,
            cmp_count,
            cmp_size: if pixel_size == 16 { 5 } else { 8 },
            pack_type,
            ..Self::indexed(bounds, pixel_size, row_bytes)
        }
    }

    /// Parse a `PixMap`/`BitMap` header. PICT bitmap opcodes omit the base
    /// address; resources such as `cicn` include it.
    pub fn read(reader: &mut BinaryReader<'_>, with_base_addr: bool) -> Result<Self, QdError> {
        let base_addr = if with_base_addr { reader.read()? } else { 0 };
        let raw_row_bytes = reader.read::<u16>()?;
        let bounds = Rect::read(reader)?;
        let row_bytes = raw_row_bytes & ROW_BYTES_MASK;
        let pm = if raw_row_bytes & PIXMAP_FLAG == 0 {
            Self {
                base_addr,
                ..Self::bitmap(bounds, row_bytes)
            }
        } else {
            let version = reader.read()?;
            let pack_raw = reader.read::<i16>()?;
            let pack_type = PackType::from_i16(pack_raw)
                .ok_or_else(|| QdError::invalid(alloc::format!("unknown pack type {pack_raw}")))?;
            Self {
                base_addr,
                row_bytes,
                is_pixmap: true,
                bounds,
                version,
                pack_type,
                pack_size: reader.read()?,
                h_res: reader.read()?,
                v_res: reader.read()?,
                pixel_type: reader.read()?,
                pixel_size: reader.read()?,
                cmp_count: reader.read()?,
                cmp_size: reader.read()?,
                plane_bytes: reader.read()?,
                color_table: reader.read()?,
                reserved: reader.read()?,
            }
        };
        pm.validate()?;
        Ok(pm)
    }

    /// Serialize the header; the mirror of [`Self::read`].
    pub fn write(&self, writer: &mut BinaryWriter, with_base_addr: bool) {
        if with_base_addr {
            writer.write(self.base_addr);
        }
        let flag = if self.is_pixmap { PIXMAP_FLAG } else { 0 };
        writer.write(self.row_bytes | flag);
        self.bounds.write(writer);
        if !self.is_pixmap {
            return;
        }
        writer.write(self.version);
        writer.write(self.pack_type.to_i16());
        writer.write(self.pack_size);
        writer.write(self.h_res);
        writer.write(self.v_res);
        writer.write(self.pixel_type);
        writer.write(self.pixel_size);
        writer.write(self.cmp_count);
        writer.write(self.cmp_size);
        writer.write(self.plane_bytes);
        writer.write(self.color_table);
        writer.write(self.reserved);
    }

    pub fn width(&self) -> usize {
        self.bounds.width() as usize
    }

    pub fn height(&self) -> usize {
        self.bounds.height() as usize
    }

    pub fn is_indexed(&self) -> bool {
        self.pixel_size <= 8
    }

    pub(crate) fn validate(&self) -> Result<(), QdError> {
        if !self.bounds.is_valid() {
            return Err(QdError::invalid(alloc::format!(
                "inverted pixmap bounds {:?}",
                self.bounds
            )));
        }
        if self.is_pixmap {
            if !matches!(self.version, 0 | 4) {
                return Err(QdError::invalid(alloc::format!(
                    "unsupported pixmap version {}",
                    self.version
                )));
            }
            match (self.pixel_type, self.pixel_size) {
                (0, 1 | 2 | 4 | 8) => {
                    if !matches!(self.pack_type, PackType::Default | PackType::None) {
                        return Err(self.bad_pack());
                    }
                }
                (16, 16 | 24 | 32) => {
                    if !matches!(self.cmp_count, 3 | 4) || !matches!(self.cmp_size, 5 | 8) {
                        return Err(QdError::invalid(alloc::format!(
                            "direct pixmap with {} components of {} bits",
                            self.cmp_count,
                            self.cmp_size
                        )));
                    }
                    let pack_ok = match self.pixel_size {
                        16 => matches!(
                            self.pack_type,
                            PackType::Default | PackType::None | PackType::RunLength16
                        ),
                        24 => matches!(self.pack_type, PackType::Default | PackType::None),
                        _ => !matches!(self.pack_type, PackType::RunLength16),
                    };
                    if !pack_ok {
                        return Err(self.bad_pack());
                    }
                }
                (t, s) => {
                    return Err(QdError::invalid(alloc::format!(
                        "unsupported pixel type {t} with pixel size {s}"
                    )));
                }
            }
        }
        let bits = self.width() * usize::from(self.pixel_size);
        if usize::from(self.row_bytes) * 8 < bits {
            return Err(QdError::invalid(alloc::format!(
                "row bytes {} too small for {} pixels of {} bits",
                self.row_bytes,
                self.width(),
                self.pixel_size
            )));
        }
        Ok(())
    }

    fn bad_pack(&self) -> QdError {
        QdError::invalid(alloc::format!(
            "pack type {:?} invalid for {}-bit pixels",
            self.pack_type,
            self.pixel_size
        ))
    }

    /// Layout of the unpacked rows.
    ///
    /// Rows under 8 bytes are never packed and hold chunky pixels. Otherwise
    /// 32-bit pixels packed by component (pack type 4, or the default 0) hold
    /// separate planes per row: R, G, B with 3 components, which takes
    /// precedence over dropping the pad byte, else A, R, G, B. Dropping the
    /// pad byte yields interleaved 24-bit pixels.
    pub(crate) fn pixel_format(&self) -> PixelFormat {
        match self.pixel_size {
            1 | 2 | 4 | 8 => PixelFormat::Indexed {
                depth: self.pixel_size as u8,
            },
            16 => PixelFormat::Rgb555,
            24 => PixelFormat::Rgb24,
            _ if self.row_bytes < 8 => PixelFormat::Xrgb32 {
                alpha: self.cmp_count == 4,
            },
            _ => match self.pack_type {
                PackType::ComponentRle | PackType::Default if self.cmp_count == 3 => {
                    PixelFormat::Planar { components: 3 }
                }
                PackType::DropPadByte => PixelFormat::Rgb24,
                PackType::ComponentRle | PackType::Default => PixelFormat::Planar { components: 4 },
                _ => PixelFormat::Xrgb32 {
                    alpha: self.cmp_count == 4,
                },
            },
        }
    }

    /// Bytes per unpacked row, which differs from `row_bytes` for 32-bit
    /// pixels stored as 3 or 4 component planes or without the pad byte.
    pub fn resolved_row_bytes(&self) -> usize {
        match self.pixel_format() {
            PixelFormat::Planar { components } => self.width() * usize::from(components),
            PixelFormat::Rgb24 if self.pixel_size == 32 => self.width() * 3,
            _ => usize::from(self.row_bytes),
        }
    }

    /// The same pixmap describing rows stored raw, as in `cicn`, `ppat`
    /// and `crsr` resources and unpacked PICT bitmaps.
    pub fn as_unpacked(&self) -> Self {
        Self {
            pack_type: PackType::None,
            ..self.clone()
        }
    }

    /// Whether rows are stored with per-row PackBits byte counts.
    fn rows_packed(&self) -> bool {
        self.row_bytes >= 8
            && !matches!(self.pack_type, PackType::None | PackType::DropPadByte)
    }

    /// Unpacked size of all rows.
    pub fn data_len(&self) -> usize {
        self.resolved_row_bytes() * self.height()
    }

    /// Read the pixel data following a PICT bitmap opcode. With `packed`
    /// (PackBitsRect/DirectBits) and `rowBytes >= 8`, each row is prefixed by
    /// its compressed length: one byte when `rowBytes <= 250`, two otherwise.
    pub fn read_pixel_data(&self, reader: &mut BinaryReader<'_>, packed: bool) -> Result<Vec<u8>, QdError> {
        let row_len = self.resolved_row_bytes();
        let height = self.height();
        if !packed || !self.rows_packed() {
            return Ok(reader.read_bytes(row_len * height)?.to_vec());
        }

        let elem_width = if self.pixel_size == 16 { 2 } else { 1 };
        let mut out = vec![0u8; row_len * height];
        for row in out.chunks_exact_mut(row_len.max(1)).take(height) {
            let count = if self.row_bytes > 250 {
                usize::from(reader.read::<u16>()?)
            } else {
                usize::from(reader.read::<u8>()?)
            };
            let mut packed_row = reader.sub_reader(count)?;
            unpack_bits(&mut packed_row, row, elem_width)?;
        }
        Ok(out)
    }

    /// Write pixel data in the layout [`Self::read_pixel_data`] expects.
    pub fn write_pixel_data(&self, writer: &mut BinaryWriter, pixels: &[u8], packed: bool) {
        let row_len = self.resolved_row_bytes();
        if !packed || !self.rows_packed() {
            writer.write_bytes(&pixels[..row_len * self.height()]);
            return;
        }
        let elem_width = if self.pixel_size == 16 { 2 } else { 1 };
        for row in pixels.chunks_exact(row_len.max(1)).take(self.height()) {
            let packed_row = pack_bits(row, elem_width);
            if self.row_bytes > 250 {
                writer.write(packed_row.len() as u16);
            } else {
                writer.write(packed_row.len() as u8);
            }
            writer.write_bytes(&packed_row);
        }
    }

    /// Blit unpacked pixel data onto `raster`.
    ///
    /// `dest` must lie inside the raster and `src` (default: the whole
    /// bounds) inside this pixmap's bounds. Differently sized rects are
    /// scaled nearest-neighbour through an intermediate raster.
    pub fn draw(
        &self,
        pixels: &[u8],
        table: Option<&ColorTable>,
        raster: &mut Raster,
        dest: Rect,
        src: Option<Rect>,
    ) -> Result<(), QdError> {
        if !dest.is_valid()
            || dest.top < 0
            || dest.left < 0
            || i64::from(dest.right) > i64::from(raster.width)
            || i64::from(dest.bottom) > i64::from(raster.height)
        {
            return Err(QdError::invalid(alloc::format!(
                "destination {dest:?} outside {}x{} raster",
                raster.width,
                raster.height
            )));
        }
        let src = src.unwrap_or(self.bounds);
        if !src.is_valid() || !self.bounds.contains_rect(&src) {
            return Err(QdError::invalid(alloc::format!(
                "source {src:?} outside pixmap bounds {:?}",
                self.bounds
            )));
        }
        let src = src.align_to(self.bounds.top_left())?;
        if dest.is_empty() || src.is_empty() {
            return Ok(());
        }

        let needed = self.data_len();
        if pixels.len() < needed {
            return Err(QdError::InsufficientData {
                needed,
                remaining: pixels.len(),
            });
        }
        let default_table;
        let table = match (self.pixel_format(), table) {
            (PixelFormat::Indexed { .. }, None) => {
                default_table = ColorTable::default_for_depth(self.pixel_size)
                    .ok_or_else(|| QdError::invalid("indexed pixmap without a color table"))?;
                Some(&default_table)
            }
            (_, t) => t,
        };

        if dest.width() == src.width() && dest.height() == src.height() {
            self.copy_rows(pixels, table, raster, &src, dest.left as usize, dest.top as usize)
        } else {
            let mut tmp = Raster::new(src.width() as u32, src.height() as u32)?;
            self.copy_rows(pixels, table, &mut tmp, &src, 0, 0)?;
            tmp.scale_into(
                raster,
                dest.left as usize,
                dest.top as usize,
                dest.width() as usize,
                dest.height() as usize,
            );
            Ok(())
        }
    }

    fn copy_rows(
        &self,
        pixels: &[u8],
        table: Option<&ColorTable>,
        raster: &mut Raster,
        src: &Rect,
        left: usize,
        top: usize,
    ) -> Result<(), QdError> {
        let format = self.pixel_format();
        let row_len = self.resolved_row_bytes();
        let width = self.width();
        let (sx0, sx1) = (src.left as usize * 4, src.right as usize * 4);
        let mut scratch = vec![0u8; width * 4];
        for y in 0..src.height() as usize {
            let sy = src.top as usize + y;
            let row = &pixels[sy * row_len..(sy + 1) * row_len];
            unpack_row(format, row, width, table, &mut scratch)?;
            let out = raster.row_mut(top + y);
            out[left * 4..left * 4 + (sx1 - sx0)].copy_from_slice(&scratch[sx0..sx1]);
        }
        Ok(())
    }
}

/// Set alpha from a 1-bit, row-padded mask covering the raster from its
/// top-left corner: 1 = opaque, 0 = fully transparent (color cleared).
pub fn apply_mask(raster: &mut Raster, mask: &[u8], mask_row_bytes: usize) -> Result<(), QdError> {
    let (w, h) = (raster.width as usize, raster.height as usize);
    if mask_row_bytes * 8 < w || mask.len() < mask_row_bytes * h {
        return Err(QdError::invalid(alloc::format!(
            "mask of {} bytes ({mask_row_bytes} per row) too small for {w}x{h}",
            mask.len()
        )));
    }
    for y in 0..h {
        let bits = &mask[y * mask_row_bytes..];
        for (x, p) in raster.row_mut(y).chunks_exact_mut(4).enumerate() {
            if bits[x / 8] & (0x80 >> (x % 8)) != 0 {
                p[3] = 255;
            } else {
                p.fill(0);
            }
        }
    }
    Ok(())
}

/// Row bytes for `width` pixels of `depth` bits, padded to an even count.
pub fn padded_row_bytes(width: usize, depth: usize) -> usize {
    (width * depth).div_ceil(16) * 2
}
