//! QuickTime image descriptions and compressor dispatch.
//!
//! An image description names a compressor by fourCC. `qdrw`, `raw `,
//! `rle `, `smc `, `rpza` and `8BPS` are decoded here; anything else goes to
//! the platform decoder when the `platform` feature is enabled.

pub mod planar;
pub mod rle;
pub mod rpza;
pub mod smc;

use alloc::vec::Vec;

use crate::binary::BinaryReader;
use crate::color::ColorTable;
use crate::decode::DecodeContext;
use crate::error::QdError;
use crate::geometry::Rect;
use crate::lookup::{FourCC, ResourceLookup, fourcc_str};
use crate::pixmap::{PackType, PixMap};
use crate::raster::Raster;
use rgb::RGBA8;

/// An `ImageDescription` record (`idsc`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDescription {
    /// Declared size of the whole record, including trailing atoms.
    pub size: u32,
    pub compressor: FourCC,
    pub data_ref_index: u16,
    pub version: i16,
    pub revision: i16,
    pub vendor: FourCC,
    pub temporal_quality: u32,
    pub spatial_quality: u32,
    pub width: u16,
    pub height: u16,
    pub h_res: u32,
    pub v_res: u32,
    pub data_size: u32,
    pub frame_count: u16,
    /// Compressor name, MacRoman.
    pub name: Vec<u8>,
    /// Declared depth; values above 32 mean grayscale at `depth - 32`.
    pub depth: i16,
    pub clut_id: i16,
    pub color_table: Option<ColorTable>,
    /// Extension atoms following the fixed record, as `(type, payload)`.
    pub extensions: Vec<(FourCC, Vec<u8>)>,
}

impl ImageDescription {
    /// Size of the fixed part of the record.
    pub const FIXED_SIZE: usize = 86;

    /// Parse a description, leaving the reader just past its declared size.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self, QdError> {
        let size = reader.read::<u32>()?;
        if (size as usize) < Self::FIXED_SIZE {
            return Err(QdError::invalid(alloc::format!(
                "image description of {size} bytes is shorter than its fixed fields"
            )));
        }
        let mut body = reader.sub_reader(size as usize - 4)?;

        let compressor = body.read_array::<4>()?;
        body.skip(6)?;
        let data_ref_index = body.read()?;
        let version = body.read()?;
        let revision = body.read()?;
        let vendor = body.read_array::<4>()?;
        let temporal_quality = body.read()?;
        let spatial_quality = body.read()?;
        let width = body.read()?;
        let height = body.read()?;
        let h_res = body.read()?;
        let v_res = body.read()?;
        let data_size = body.read()?;
        let frame_count = body.read()?;
        let name = body.read_pstring_fixed(31)?.to_vec();
        let depth = body.read()?;
        let clut_id = body.read()?;

        let mut desc = Self {
            size,
            compressor,
            data_ref_index,
            version,
            revision,
            vendor,
            temporal_quality,
            spatial_quality,
            width,
            height,
            h_res,
            v_res,
            data_size,
            frame_count,
            name,
            depth,
            clut_id,
            color_table: None,
            extensions: Vec::new(),
        };
        if clut_id == 0 && desc.bit_depth() <= 8 && !body.is_empty() {
            desc.color_table = Some(ColorTable::read(&mut body)?);
        }
        while body.remaining() >= 8 {
            let atom_size = body.read::<u32>()? as usize;
            let kind = body.read_array::<4>()?;
            if atom_size < 8 || atom_size - 8 > body.remaining() {
                log::warn!(
                    "ignoring malformed '{}' extension atom of {atom_size} bytes",
                    fourcc_str(kind)
                );
                break;
            }
            desc.extensions.push((kind, body.read_bytes(atom_size - 8)?.to_vec()));
        }

        Ok(desc)
    }

    /// Effective bits per pixel.
    pub fn bit_depth(&self) -> u16 {
        if self.depth > 32 {
            (self.depth - 32) as u16
        } else {
            self.depth.max(0) as u16
        }
    }

    pub fn is_grayscale(&self) -> bool {
        self.depth > 32
    }

    /// Payload of the first extension atom of type `kind`.
    pub fn extension(&self, kind: FourCC) -> Option<&[u8]> {
        self.extensions
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, d)| d.as_slice())
    }

    /// The palette for indexed depths: inline table, grayscale ramp, default
    /// for the depth (clut id -1 or 0), a system palette, then a `clut`
    /// resource from `lookup`. `None` for direct depths.
    pub fn resolve_color_table(&self, lookup: &dyn ResourceLookup) -> Result<Option<ColorTable>, QdError> {
        let bits = self.bit_depth();
        if bits > 8 {
            return Ok(None);
        }
        if let Some(table) = &self.color_table {
            return Ok(Some(table.clone()));
        }
        if self.is_grayscale() {
            return ColorTable::system(self.depth)
                .map(Some)
                .ok_or_else(|| QdError::unsupported(alloc::format!("grayscale depth {}", self.depth)));
        }
        if matches!(self.clut_id, -1 | 0) {
            return ColorTable::default_for_depth(bits)
                .map(Some)
                .ok_or_else(|| QdError::unsupported(alloc::format!("indexed depth {bits}")));
        }
        if let Some(table) = ColorTable::system(self.clut_id) {
            return Ok(Some(table));
        }
        if let Some(data) = lookup.find_resource(*b"clut", self.clut_id) {
            return ColorTable::read(&mut BinaryReader::new(&data)).map(Some);
        }
        Err(QdError::unsupported(alloc::format!(
            "color table id {}",
            self.clut_id
        )))
    }
}

/// Unpacked pixel rows plus the pixmap describing them, ready to blit.
#[derive(Clone, Debug)]
pub struct Plane {
    pub pixmap: PixMap,
    pub pixels: Vec<u8>,
    /// Pixels actually written by the codec, when it tracks them. Untouched
    /// pixels render as `0,0,0,0` whatever the depth.
    pub written: Option<Vec<bool>>,
}

impl Plane {
    /// A zeroed plane of `width x height` pixels at `depth` bits, rows
    /// padded to `row_align` bytes.
    pub(crate) fn blank(width: u16, height: u16, depth: u16, row_align: usize) -> Result<Self, QdError> {
        let bounds = Rect::from_size(u32::from(width), u32::from(height))?;
        let bits = usize::from(width) * usize::from(depth);
        let row_bytes = bits.div_ceil(8).div_ceil(row_align) * row_align;
        let pixmap = plane_pixmap(bounds, depth, row_bytes)?;
        Ok(Self {
            pixels: alloc::vec![0u8; row_bytes * usize::from(height)],
            pixmap,
            written: None,
        })
    }

    /// Start recording which pixels get written.
    pub(crate) fn track_writes(&mut self) {
        let count = self.pixmap.width() * self.pixmap.height();
        self.written = Some(alloc::vec![false; count]);
    }

    /// Mark the pixels covered by bytes `start..end` of row `y`.
    pub(crate) fn mark_bytes(&mut self, y: usize, start: usize, end: usize) {
        let width = self.pixmap.width();
        let bits = usize::from(self.pixmap.pixel_size);
        if let Some(written) = &mut self.written {
            let first = (start * 8 / bits).min(width);
            let last = (end * 8 / bits).min(width);
            written[y * width + first..y * width + last].fill(true);
        }
    }

    pub fn row_bytes(&self) -> usize {
        usize::from(self.pixmap.row_bytes)
    }

    /// Blit the whole plane onto a fresh raster.
    pub(crate) fn render(&self, table: Option<&ColorTable>, ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
        let mut raster = ctx.raster(self.pixmap.width() as u32, self.pixmap.height() as u32)?;
        let dest = Rect::from_size(raster.width, raster.height)?;
        self.pixmap.draw(&self.pixels, table, &mut raster, dest, None)?;
        if let Some(written) = &self.written {
            let width = raster.width as usize;
            for (i, _) in written.iter().enumerate().filter(|(_, w)| !**w) {
                raster.set_pixel(i % width, i / width, RGBA8::new(0, 0, 0, 0));
            }
        }
        Ok(raster)
    }
}

fn plane_pixmap(bounds: Rect, depth: u16, row_bytes: usize) -> Result<PixMap, QdError> {
    let row_bytes = u16::try_from(row_bytes)
        .ok()
        .filter(|&rb| rb <= 0x3FFF)
        .ok_or_else(|| QdError::invalid(alloc::format!("{row_bytes} bytes per row")))?;
    Ok(match depth {
        1 | 2 | 4 | 8 => PixMap::indexed(bounds, depth, row_bytes),
        16 | 24 => PixMap::direct(bounds, depth, 3, row_bytes, PackType::None),
        32 => PixMap::direct(bounds, 32, 4, row_bytes, PackType::None),
        _ => {
            return Err(QdError::unsupported(alloc::format!("{depth}-bit pixels")));
        }
    })
}

/// Decode compressed image data according to its description.
pub(crate) fn decode_image(desc: &ImageDescription, data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let (w, h) = (desc.width, desc.height);
    log::debug!(
        "QuickTime '{}' {w}x{h}, depth {}, {} bytes",
        fourcc_str(desc.compressor),
        desc.depth,
        data.len()
    );
    ctx.check(u32::from(w), u32::from(h))?;
    match &desc.compressor {
        b"qdrw" => crate::pict::decode_nested(data, ctx),
        b"raw " => {
            let table = desc.resolve_color_table(ctx.lookup())?;
            decode_raw(desc, data)?.render(table.as_ref(), ctx)
        }
        b"rle " => {
            let table = desc.resolve_color_table(ctx.lookup())?;
            rle::decode(data, w, h, desc.bit_depth())?.render(table.as_ref(), ctx)
        }
        b"smc " => {
            let table = desc
                .resolve_color_table(ctx.lookup())?
                .ok_or_else(|| QdError::invalid("'smc ' data needs an 8-bit palette"))?;
            smc::decode(data, w, h, &table, ctx)
        }
        b"rpza" => rpza::decode(data, w, h, ctx),
        b"8BPS" => planar::decode(desc, data, ctx),
        _ => decode_platform(desc, data, ctx),
    }
}

/// `raw `: uncompressed rows of `data_size / height` bytes.
fn decode_raw(desc: &ImageDescription, data: &[u8]) -> Result<Plane, QdError> {
    if desc.height == 0 {
        return Plane::blank(desc.width, 0, desc.bit_depth(), 1);
    }
    let size = if desc.data_size == 0 { data.len() } else { desc.data_size as usize };
    let row_bytes = size / usize::from(desc.height);
    let bounds = Rect::from_size(u32::from(desc.width), u32::from(desc.height))?;
    let pixmap = plane_pixmap(bounds, desc.bit_depth(), row_bytes)?;
    pixmap.validate()?;
    let needed = pixmap.data_len();
    let pixels = data
        .get(..needed)
        .ok_or(QdError::InsufficientData {
            needed,
            remaining: data.len(),
        })?
        .to_vec();
    Ok(Plane {
        pixmap,
        pixels,
        written: None,
    })
}

#[cfg(feature = "platform")]
fn decode_platform(desc: &ImageDescription, data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let img = image::load_from_memory(data)?.to_rgba8();
    let (w, h) = img.dimensions();
    ctx.check(w, h)?;
    let mut raster = Raster::from_rgba(w, h, img.into_raw())?;
    // QuickTime wrote PNG payloads as RGBX before 6.5; the fourth channel
    // is not alpha.
    if &desc.compressor == b"png " && desc.bit_depth() <= 24 {
        log::debug!("forcing opaque PNG payload at depth {}", desc.depth);
        raster.drop_alpha();
    }
    Ok(raster)
}

#[cfg(not(feature = "platform"))]
fn decode_platform(desc: &ImageDescription, _data: &[u8], _ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    Err(QdError::unsupported(alloc::format!(
        "QuickTime compressor '{}'",
        fourcc_str(desc.compressor)
    )))
}

/// Decode an image description immediately followed by its data.
pub(crate) fn decode_described(data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let mut reader = BinaryReader::new(data);
    let desc = ImageDescription::read(&mut reader)?;
    let payload = reader.read_rest();
    let payload = match desc.data_size as usize {
        0 => payload,
        n if n <= payload.len() => &payload[..n],
        n => {
            log::warn!("image data is {} bytes, description declares {n}", payload.len());
            payload
        }
    };
    decode_image(&desc, payload, ctx)
}

/// Decode a QuickTime Image File: top-level atoms with an `idsc`
/// description and `idat` data.
pub(crate) fn decode_qtif(data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let mut reader = BinaryReader::new(data);
    let mut desc = None;
    let mut idat = None;
    while reader.remaining() >= 8 {
        let size32 = reader.read::<u32>()?;
        let kind = reader.read_array::<4>()?;
        let payload_len = match size32 {
            0 => reader.remaining(),
            1 => {
                let size64 = reader.read::<u64>()?;
                usize::try_from(size64)
                    .ok()
                    .and_then(|s| s.checked_sub(16))
                    .ok_or_else(|| QdError::invalid(alloc::format!("atom size {size64}")))?
            }
            n => (n as usize)
                .checked_sub(8)
                .ok_or_else(|| QdError::invalid(alloc::format!("atom size {n}")))?,
        };
        let payload = reader.read_bytes(payload_len)?;
        log::trace!("QTIF atom '{}' ({payload_len} bytes)", fourcc_str(kind));
        match &kind {
            b"idsc" => desc = Some(ImageDescription::read(&mut BinaryReader::new(payload))?),
            b"idat" => idat = Some(payload),
            _ => {}
        }
    }
    match (desc, idat) {
        (Some(desc), Some(idat)) => decode_image(&desc, idat, ctx),
        _ => Err(QdError::invalid("QTIF file lacks 'idsc' or 'idat' atom")),
    }
}
