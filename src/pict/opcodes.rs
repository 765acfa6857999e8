//! The picture opcode table and handlers.
//!
//! Data lengths follow Inside Macintosh: Imaging With QuickDraw, appendix A.

use crate::binary::BinaryReader;
use crate::color::ColorTable;
use crate::decode::DecodeContext;
use crate::error::QdError;
use crate::geometry::{Point, Rect};
use crate::pixmap::PixMap;
use crate::quicktime::{self, ImageDescription};

use super::{PictEncoding, PictState, V2_HEADER_OP};

const NOP: u16 = 0x0000;
const CLIP_RGN: u16 = 0x0001;
const ORIGIN: u16 = 0x000C;
const BK_PIX_PAT: u16 = 0x0012;
const FILL_PIX_PAT: u16 = 0x0014;
const BITS_RECT: u16 = 0x0090;
const BITS_RGN: u16 = 0x0091;
const PACK_BITS_RECT: u16 = 0x0098;
const PACK_BITS_RGN: u16 = 0x0099;
const DIRECT_BITS_RECT: u16 = 0x009A;
const DIRECT_BITS_RGN: u16 = 0x009B;
const LONG_COMMENT: u16 = 0x00A1;
const END_PIC: u16 = 0x00FF;
const COMPRESSED_QUICKTIME: u16 = 0x8200;
const UNCOMPRESSED_QUICKTIME: u16 = 0x8201;

/// What follows an opcode that has no handler of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Payload {
    Fixed(usize),
    /// Region or polygon: a length word that counts itself.
    SelfSized,
    /// Text drawing: fixed prefix, then a Pascal string.
    Text(usize),
    WordLength,
    LongLength,
}

fn payload(op: u16, version: u8) -> Option<Payload> {
    use Payload::*;
    Some(match op {
        0x0000 | 0x0017..=0x0019 | 0x001C | 0x001E => Fixed(0),
        0x0038..=0x003F | 0x0048..=0x004F | 0x0058..=0x005F => Fixed(0),
        0x0078..=0x007F | 0x0088..=0x008F | 0x00B0..=0x00CF | 0x8000..=0x80FF => Fixed(0),
        0x0004 => Fixed(1),
        0x0011 => Fixed(if version == 1 { 1 } else { 2 }),
        0x0003 | 0x0005 | 0x0008 | 0x000D | 0x0015 | 0x0016 | 0x0023 | 0x00A0 => Fixed(2),
        0x0006 | 0x0007 | 0x000B | 0x000E | 0x000F | 0x0021 | 0x0068..=0x006F => Fixed(4),
        0x001A | 0x001B | 0x001D | 0x001F | 0x0022 => Fixed(6),
        0x0002 | 0x0009 | 0x000A | 0x0010 | 0x0020 => Fixed(8),
        0x0030..=0x0037 | 0x0040..=0x0047 | 0x0050..=0x0057 => Fixed(8),
        0x0060..=0x0067 => Fixed(12),
        0x0070..=0x0077 | 0x0080..=0x0087 => SelfSized,
        0x0028 => Text(4),
        0x0029 | 0x002A => Text(1),
        0x002B => Text(2),
        0x0024..=0x0027 | 0x002C..=0x002F => WordLength,
        0x0092..=0x0097 | 0x009C..=0x009F | 0x00A2..=0x00AF => WordLength,
        0x00D0..=0x00FE | 0x8100..=0xFFFF => LongLength,
        0x0100..=0x7FFF => Fixed(usize::from(op >> 8) * 2),
        _ => return None,
    })
}

/// Opcodes Apple reserved for future use. Their data length is implied by
/// the range, so they can be stepped over.
fn is_reserved(op: u16) -> bool {
    op != V2_HEADER_OP && matches!(op, 0x00D0..=0x00FE | 0x0100..=0x7FFF | 0x8100..=0xFFFF)
}

/// Opcodes defined for version 1 pictures.
fn is_v1_opcode(op: u16) -> bool {
    match op {
        0x00..=0x11 | 0x20..=0x23 | 0x28..=0x2B => true,
        0x30..=0x8F => op & 0x07 <= 4,
        BITS_RECT | BITS_RGN | PACK_BITS_RECT | PACK_BITS_RGN => true,
        0xA0 | LONG_COMMENT | END_PIC => true,
        _ => false,
    }
}

fn skip_payload(reader: &mut BinaryReader<'_>, op: u16, version: u8) -> Result<(), QdError> {
    let payload = payload(op, version)
        .ok_or_else(|| QdError::invalid(alloc::format!("no length known for opcode {op:#06x}")))?;
    if is_reserved(op) {
        log::warn!("skipping reserved opcode {op:#06x}");
    }
    match payload {
        Payload::Fixed(n) => reader.skip(n),
        Payload::SelfSized => skip_region(reader),
        Payload::Text(prefix) => {
            reader.skip(prefix)?;
            reader.read_pstring().map(|_| ())
        }
        Payload::WordLength => {
            let n = reader.read::<u16>()?;
            reader.skip(usize::from(n))
        }
        Payload::LongLength => {
            let n = reader.read::<u32>()?;
            reader.skip(n as usize)
        }
    }
}

/// Read a region, returning its bounding box.
fn read_region(reader: &mut BinaryReader<'_>) -> Result<Rect, QdError> {
    let size = usize::from(reader.read::<u16>()?);
    if size < 10 {
        return Err(QdError::invalid(alloc::format!("region of {size} bytes")));
    }
    let rect = Rect::read(reader)?;
    reader.skip(size - 10)?;
    Ok(rect)
}

fn skip_region(reader: &mut BinaryReader<'_>) -> Result<(), QdError> {
    let size = usize::from(reader.peek_u16()?);
    if size < 2 {
        return Err(QdError::invalid(alloc::format!("region or polygon of {size} bytes")));
    }
    reader.skip(size)
}

/// Pixel patterns: an old-style 8x8 pattern, then for color patterns a
/// pixmap, color table and packed pixel data, or an RGB color for dithered
/// ones.
fn skip_pixel_pattern(reader: &mut BinaryReader<'_>) -> Result<(), QdError> {
    let pat_type = reader.read::<u16>()?;
    reader.skip(8)?;
    match pat_type {
        1 => {
            let pixmap = PixMap::read(reader, false)?;
            ColorTable::read(reader)?;
            pixmap.read_pixel_data(reader, true)?;
        }
        2 => reader.skip(6)?,
        _ => {}
    }
    Ok(())
}

/// Run opcodes until the end opcode or a QuickTime image replaces the
/// picture.
pub(super) fn run(reader: &mut BinaryReader<'_>, state: &mut PictState<'_>, ctx: &DecodeContext<'_>) -> Result<(), QdError> {
    let op_len = if state.version == 1 { 1 } else { 2 };
    loop {
        let pad = if state.version == 2 { reader.position() % 2 } else { 0 };
        if state.drew && reader.remaining() < pad + op_len {
            log::warn!("picture ends without an end opcode");
            return Ok(());
        }
        reader.skip(pad)?;
        let op = if state.version == 1 {
            u16::from(reader.read::<u8>()?)
        } else {
            reader.read::<u16>()?
        };
        log::trace!("opcode {op:#06x} at offset {}", reader.position() - op_len);

        if state.version == 1 && !is_v1_opcode(op) {
            return Err(QdError::unsupported(alloc::format!(
                "opcode {op:#04x} in a version 1 picture"
            )));
        }
        match op {
            END_PIC => return Ok(()),
            NOP => {}
            CLIP_RGN => {
                state.clip = read_region(reader)?.align_to(state.origin)?;
                log::trace!("clip {:?}", state.clip);
            }
            ORIGIN => {
                let dh = reader.read::<i16>()?;
                let dv = reader.read::<i16>()?;
                let shift = |c: i16, d: i16| {
                    c.checked_add(d)
                        .ok_or_else(|| QdError::invalid("picture origin out of range"))
                };
                state.origin = Point::new(shift(state.origin.h, dh)?, shift(state.origin.v, dv)?);
                log::trace!("origin {:?}", state.origin);
            }
            BK_PIX_PAT..=FILL_PIX_PAT => skip_pixel_pattern(reader)?,
            BITS_RECT | BITS_RGN | PACK_BITS_RECT | PACK_BITS_RGN | DIRECT_BITS_RECT | DIRECT_BITS_RGN => {
                bits(reader, state, op)?;
            }
            LONG_COMMENT => {
                let kind = reader.read::<u16>()?;
                let len = reader.read::<u16>()?;
                log::trace!("picture comment {kind} ({len} bytes)");
                reader.skip(usize::from(len))?;
            }
            COMPRESSED_QUICKTIME => {
                compressed_quicktime(reader, state, ctx)?;
                return Ok(());
            }
            UNCOMPRESSED_QUICKTIME => {
                log::debug!("skipping uncompressed QuickTime opcode");
                skip_payload(reader, op, state.version)?;
            }
            _ => skip_payload(reader, op, state.version)?,
        }
    }
}

/// `BitsRect`, `PackBitsRect`, `DirectBitsRect` and their region variants.
fn bits(reader: &mut BinaryReader<'_>, state: &mut PictState<'_>, op: u16) -> Result<(), QdError> {
    let direct = matches!(op, DIRECT_BITS_RECT | DIRECT_BITS_RGN);
    let packed = !matches!(op, BITS_RECT | BITS_RGN);
    let pixmap = PixMap::read(reader, direct)?;
    if direct && pixmap.is_indexed() {
        return Err(QdError::invalid(alloc::format!(
            "direct bits opcode with {}-bit pixels",
            pixmap.pixel_size
        )));
    }
    let table = if !direct && pixmap.is_pixmap {
        Some(ColorTable::read(reader)?)
    } else {
        None
    };
    let src = Rect::read(reader)?;
    let dst = Rect::read(reader)?;
    reader.skip(2)?;
    if matches!(op, BITS_RGN | PACK_BITS_RGN | DIRECT_BITS_RGN) {
        read_region(reader)?;
    }
    let pixmap = if packed { pixmap } else { pixmap.as_unpacked() };
    state.format.encoding = Some(if direct {
        PictEncoding::Direct {
            depth: pixmap.pixel_size,
        }
    } else {
        PictEncoding::Bits {
            depth: pixmap.pixel_size,
            packed,
        }
    });
    log::trace!(
        "{}-bit bits {src:?} -> {dst:?}, pack type {:?}",
        pixmap.pixel_size,
        pixmap.pack_type
    );
    let pixels = pixmap.read_pixel_data(reader, packed)?;
    state.blit(&pixmap, &pixels, table.as_ref(), src, dst)
}

/// `CompressedQuickTime`: an image description and data that replace the
/// whole picture.
fn compressed_quicktime(reader: &mut BinaryReader<'_>, state: &mut PictState<'_>, ctx: &DecodeContext<'_>) -> Result<(), QdError> {
    let len = reader.read::<u32>()? as usize;
    let mut body = reader.sub_reader(len)?;
    // Version, then a 3x3 fixed-point matrix.
    body.skip(2 + 36)?;
    let matte_size = body.read::<u32>()? as usize;
    // Matte rect, transfer mode, source rect, accuracy.
    body.skip(8 + 2 + 8 + 4)?;
    let mask_size = body.read::<u32>()? as usize;
    body.skip(matte_size)?;
    body.skip(mask_size)?;

    let desc = ImageDescription::read(&mut body)?;
    state.format.encoding = Some(PictEncoding::QuickTime(desc.compressor));
    let data = body.read_rest();
    let data = match desc.data_size as usize {
        n if n > 0 && n <= data.len() => &data[..n],
        _ => data,
    };
    state.raster = quicktime::decode_image(&desc, data, &ctx.nested()?)?;
    state.drew = true;
    Ok(())
}
