//! QuickDraw `PICT` pictures.
//!
//! A picture is a size word, a frame rect and a stream of drawing opcodes.
//! Only the raster opcodes produce pixels; everything else is parsed just
//! far enough to be skipped. Version 1 pictures use byte opcodes, version 2
//! word opcodes aligned to even offsets.
//!
//! Pictures saved as files carry a 512-byte application header, which is
//! detected and skipped.

mod encode;
mod opcodes;

pub use encode::encode_picture;

use core::fmt;

use crate::binary::BinaryReader;
use crate::color::ColorTable;
use crate::decode::DecodeContext;
use crate::error::QdError;
use crate::geometry::{Point, Rect};
use crate::limits::Limits;
use crate::lookup::{FourCC, NoLookup, ResourceLookup, fourcc_str};
use crate::pixmap::PixMap;
use crate::raster::Raster;

const FILE_HEADER_LEN: usize = 512;
const V2_HEADER_OP: u16 = 0x0C00;

// ── Format label ────────────────────────────────────────────────────

/// How the picture's pixels were stored, from the last raster opcode seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PictEncoding {
    /// `BitsRect`/`PackBitsRect` (and the region variants).
    Bits { depth: u16, packed: bool },
    /// `DirectBitsRect`/`DirectBitsRgn`.
    Direct { depth: u16 },
    /// `CompressedQuickTime` with the named compressor.
    QuickTime(FourCC),
}

/// Best-effort description of a picture, filled in as decoding proceeds so
/// that it is still available when decoding fails.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PictFormat {
    /// 1 or 2; 0 before the header is parsed.
    pub version: u8,
    /// Version 2 picture with the extended (resolution-carrying) header.
    pub extended: bool,
    pub encoding: Option<PictEncoding>,
}

impl fmt::Display for PictFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PICT")?;
        if self.version != 0 {
            write!(f, " v{}", self.version)?;
        }
        if self.extended {
            f.write_str(" extended")?;
        }
        match self.encoding {
            Some(PictEncoding::Bits { depth, packed }) => {
                write!(f, ", {depth}-bit indexed")?;
                if packed {
                    f.write_str(" PackBits")?;
                }
            }
            Some(PictEncoding::Direct { depth }) => write!(f, ", {depth}-bit direct")?,
            Some(PictEncoding::QuickTime(c)) => write!(f, ", QuickTime '{}'", fourcc_str(c))?,
            None => {}
        }
        Ok(())
    }
}

// ── PictReader ──────────────────────────────────────────────────────

/// Decodes a picture and keeps its [`PictFormat`] afterwards, including
/// after a failure.
///
/// ```
/// use zenpict::{PictReader, Raster, encode_picture};
///
/// let raster = Raster::new(3, 2)?;
/// let bytes = encode_picture(&raster)?;
/// let mut reader = PictReader::new(&bytes);
/// let decoded = reader.decode()?;
/// assert_eq!((decoded.width, decoded.height), (3, 2));
/// assert_eq!(reader.format().version, 2);
/// # Ok::<(), zenpict::QdError>(())
/// ```
pub struct PictReader<'a> {
    data: &'a [u8],
    limits: Option<&'a Limits>,
    lookup: &'a dyn ResourceLookup,
    format: PictFormat,
}

impl<'a> PictReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            limits: None,
            lookup: &NoLookup,
            format: PictFormat::default(),
        }
    }

    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Source for `clut` resources named by embedded QuickTime images.
    pub fn with_lookup(mut self, lookup: &'a dyn ResourceLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn decode(&mut self) -> Result<Raster, QdError> {
        self.format = PictFormat::default();
        let ctx = DecodeContext::new(self.limits, self.lookup);
        let result = decode_picture(self.data, &ctx, &mut self.format);
        if let Err(e) = &result {
            log::debug!("{} failed to decode: {e}", self.format);
        }
        result
    }

    pub fn format(&self) -> &PictFormat {
        &self.format
    }
}

// ── Decoding ────────────────────────────────────────────────────────

/// Decoding state threaded through the opcode handlers.
pub(crate) struct PictState<'f> {
    pub(crate) version: u8,
    pub(crate) frame: Rect,
    /// Clip rect in picture coordinates, origin already applied.
    pub(crate) clip: Rect,
    /// Accumulated coordinate offset from `Origin` opcodes.
    pub(crate) origin: Point,
    pub(crate) raster: Raster,
    pub(crate) drew: bool,
    pub(crate) format: &'f mut PictFormat,
}

impl PictState<'_> {
    /// Blit a decoded bitmap opcode: translate the destination by the
    /// origin, clip it to the clip rect and the raster, and shrink the source
    /// rect by the same proportion.
    pub(crate) fn blit(
        &mut self,
        pixmap: &PixMap,
        pixels: &[u8],
        table: Option<&ColorTable>,
        src: Rect,
        dst: Rect,
    ) -> Result<(), QdError> {
        if !src.is_valid() || !dst.is_valid() {
            return Err(QdError::invalid(alloc::format!(
                "inverted blit rects {src:?} -> {dst:?}"
            )));
        }
        if src.is_empty() || dst.is_empty() {
            return Ok(());
        }
        let dst = dst.align_to(self.origin)?;
        let Some(visible) = dst
            .intersect(&self.clip)
            .and_then(|r| r.intersect(&self.frame))
        else {
            log::trace!("blit to {dst:?} is fully clipped");
            return Ok(());
        };

        let (sw, sh) = (src.width(), src.height());
        let (dw, dh) = (dst.width(), dst.height());
        let shift = |edge: i16, delta: i32, s: i32, d: i32| {
            i16::try_from(i32::from(edge) + delta * s / d)
                .map_err(|_| QdError::invalid("source rect out of range"))
        };
        let src = Rect {
            top: shift(src.top, i32::from(visible.top) - i32::from(dst.top), sh, dh)?,
            left: shift(src.left, i32::from(visible.left) - i32::from(dst.left), sw, dw)?,
            bottom: shift(src.bottom, i32::from(visible.bottom) - i32::from(dst.bottom), sh, dh)?,
            right: shift(src.right, i32::from(visible.right) - i32::from(dst.right), sw, dw)?,
        };
        let dest = visible.align_to(self.frame.top_left())?;
        self.drew = true;
        pixmap.draw(pixels, table, &mut self.raster, dest, Some(src))
    }
}

/// Skip the 512-byte header of a picture file when the data does not start
/// with a picture but does after the header.
fn strip_file_header(data: &[u8]) -> &[u8] {
    let starts_picture = |d: &[u8]| {
        d.get(10..12) == Some(&[0x11, 0x01][..]) || d.get(10..14) == Some(&[0x00, 0x11, 0x02, 0xFF][..])
    };
    if !starts_picture(data) && data.len() > FILE_HEADER_LEN && starts_picture(&data[FILE_HEADER_LEN..]) {
        log::debug!("skipping {FILE_HEADER_LEN}-byte picture file header");
        &data[FILE_HEADER_LEN..]
    } else {
        data
    }
}

/// Parse the picture header, returning the version and the frame.
fn read_header(reader: &mut BinaryReader<'_>, format: &mut PictFormat) -> Result<(u8, Rect), QdError> {
    reader.skip(2)?;
    let mut frame = Rect::read_valid(reader)?;
    if reader.peek_u16()? == 0x1101 {
        reader.skip(2)?;
        format.version = 1;
        return Ok((1, frame));
    }

    let version_op = reader.read::<u16>()?;
    let version = reader.read::<u16>()?;
    if version_op != 0x0011 || version != 0x02FF {
        return Err(QdError::invalid(alloc::format!(
            "unknown picture version {version_op:#06x} {version:#06x}"
        )));
    }
    format.version = 2;
    let header_op = reader.read::<u16>()?;
    if header_op != V2_HEADER_OP {
        return Err(QdError::invalid(alloc::format!(
            "version 2 picture starts with opcode {header_op:#06x}, not the header"
        )));
    }
    match reader.read::<i16>()? {
        -1 => reader.skip(2 + 16 + 4)?,
        -2 => {
            reader.skip(2)?;
            let h_res = reader.read::<u32>()?;
            let v_res = reader.read::<u32>()?;
            frame = Rect::read_valid(reader)?;
            reader.skip(4)?;
            format.extended = true;
            log::debug!(
                "extended picture header, {}x{} dpi",
                h_res >> 16,
                v_res >> 16
            );
        }
        v => {
            return Err(QdError::invalid(alloc::format!(
                "unknown picture header version {v}"
            )));
        }
    }
    Ok((2, frame))
}

fn decode_picture(data: &[u8], ctx: &DecodeContext<'_>, format: &mut PictFormat) -> Result<Raster, QdError> {
    let data = strip_file_header(data);
    let mut reader = BinaryReader::new(data);
    let (version, frame) = read_header(&mut reader, format)?;
    if frame.is_empty() {
        return Err(QdError::invalid(alloc::format!("empty picture frame {frame:?}")));
    }
    log::debug!("PICT v{version}, frame {frame:?}");
    let raster = ctx.raster(frame.width() as u32, frame.height() as u32)?;

    let mut state = PictState {
        version,
        frame,
        clip: frame,
        origin: Point::default(),
        raster,
        drew: false,
        format,
    };
    opcodes::run(&mut reader, &mut state, ctx)?;
    if !state.drew {
        return Err(QdError::invalid("picture contains no bitmap data"));
    }
    Ok(state.raster)
}

/// Decode a picture embedded in another image (`qdrw` QuickTime data) or
/// requested directly.
pub(crate) fn decode_nested(data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    decode_picture(data, ctx, &mut PictFormat::default())
}
