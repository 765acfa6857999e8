//! The classic icon family and `SICN` lists.
//!
//! Every member has a fixed size and depth. Monochrome lists (`ICN#`,
//! `ics#`, `icm#`) hold the image bits followed by a mask of the same size;
//! the color members (`icl4` .. `icm8`) hold only pixels in the system
//! palette for their depth and borrow the mask of the list with the same id.

use alloc::vec::Vec;

use crate::color::ColorTable;
use crate::decode::{DecodeContext, ResourceKind};
use crate::error::QdError;
use crate::geometry::Rect;
use crate::lookup::{FourCC, fourcc_str};
use crate::pixmap::{PixMap, apply_mask, build_mask, build_monochrome, build_with_table, padded_row_bytes};
use crate::raster::Raster;

use super::{draw_bits, fit};

const SICN_SIZE: u32 = 16;
const SICN_LEN: usize = 32;

#[derive(Clone, Copy, Debug)]
struct IconFormat {
    width: u32,
    height: u32,
    depth: u8,
    /// Whether the data carries its own mask after the image bits.
    inline_mask: bool,
    /// Monochrome list holding the mask of a color icon.
    mask_source: Option<FourCC>,
}

impl IconFormat {
    const fn mono(width: u32, height: u32, inline_mask: bool) -> Self {
        Self {
            width,
            height,
            depth: 1,
            inline_mask,
            mask_source: None,
        }
    }

    const fn color(width: u32, height: u32, depth: u8, mask_source: FourCC) -> Self {
        Self {
            width,
            height,
            depth,
            inline_mask: false,
            mask_source: Some(mask_source),
        }
    }

    fn of(kind: ResourceKind) -> Option<Self> {
        Some(match kind {
            ResourceKind::Icon => Self::mono(32, 32, false),
            ResourceKind::IconList => Self::mono(32, 32, true),
            ResourceKind::SmallIconList => Self::mono(16, 16, true),
            ResourceKind::MiniIconList => Self::mono(16, 12, true),
            ResourceKind::LargeIcon4 => Self::color(32, 32, 4, *b"ICN#"),
            ResourceKind::LargeIcon8 => Self::color(32, 32, 8, *b"ICN#"),
            ResourceKind::SmallIcon4 => Self::color(16, 16, 4, *b"ics#"),
            ResourceKind::SmallIcon8 => Self::color(16, 16, 8, *b"ics#"),
            ResourceKind::MiniIcon4 => Self::color(16, 12, 4, *b"icm#"),
            ResourceKind::MiniIcon8 => Self::color(16, 12, 8, *b"icm#"),
            _ => return None,
        })
    }

    fn row_bytes(&self) -> usize {
        padded_row_bytes(self.width as usize, usize::from(self.depth))
    }

    /// Bytes of one 1-bit plane (image or mask).
    fn plane_len(&self) -> usize {
        padded_row_bytes(self.width as usize, 1) * self.height as usize
    }

    fn image_len(&self) -> usize {
        self.row_bytes() * self.height as usize
    }
}

fn format_of(kind: ResourceKind) -> Result<IconFormat, QdError> {
    IconFormat::of(kind).ok_or_else(|| QdError::unsupported(alloc::format!("{kind:?} is not an icon")))
}

/// The fixed `(width, height)` of an icon kind.
pub fn dimensions(kind: ResourceKind) -> Option<(u32, u32)> {
    IconFormat::of(kind).map(|f| (f.width, f.height))
}

/// Decode a member of the icon family. `id` selects the sibling mask of a
/// color icon; without one the icon is fully opaque.
pub fn decode(kind: ResourceKind, data: &[u8], id: i16, ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let format = format_of(kind)?;
    let image_len = format.image_len();
    if data.len() < image_len {
        return Err(QdError::InsufficientData {
            needed: image_len,
            remaining: data.len(),
        });
    }
    let mut raster = ctx.raster(format.width, format.height)?;
    let bounds = Rect::from_size(format.width, format.height)?;
    let row_bytes = format.row_bytes() as u16;

    if format.depth == 1 {
        draw_bits(&mut raster, &data[..image_len], row_bytes, format.width, format.height, 0, 0)?;
        if format.inline_mask {
            match data.get(image_len..image_len + format.plane_len()) {
                Some(mask) => apply_mask(&mut raster, mask, usize::from(row_bytes))?,
                None => log::debug!("{kind:?} #{id} has no mask, leaving it opaque"),
            }
        }
        return Ok(raster);
    }

    let table = ColorTable::system(i16::from(format.depth))
        .ok_or_else(|| QdError::unsupported(alloc::format!("{}-bit icons", format.depth)))?;
    let pixmap = PixMap::indexed(bounds, u16::from(format.depth), row_bytes);
    pixmap.draw(&data[..image_len], Some(&table), &mut raster, bounds, None)?;

    if let Some(source) = format.mask_source {
        match ctx.lookup().find_resource(source, id) {
            Some(list) => {
                let plane = format.plane_len();
                match list.get(plane..2 * plane) {
                    Some(mask) => apply_mask(&mut raster, mask, padded_row_bytes(format.width as usize, 1))?,
                    None => log::warn!(
                        "'{}' #{id} is {} bytes, too short to hold a mask",
                        fourcc_str(source),
                        list.len()
                    ),
                }
            }
            None => log::debug!("no '{}' #{id} mask for {kind:?}", fourcc_str(source)),
        }
    }
    Ok(raster)
}

/// Decode a `SICN` list as its 16x16 icons stacked top to bottom.
pub fn decode_small_icon_set(data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let count = data.len() / SICN_LEN;
    if count == 0 {
        return Err(QdError::invalid("small icon list holds no icons"));
    }
    if data.len() % SICN_LEN != 0 {
        log::warn!("ignoring {} trailing bytes of small icon list", data.len() % SICN_LEN);
    }
    let height = u32::try_from(count)
        .ok()
        .and_then(|n| n.checked_mul(SICN_SIZE))
        .ok_or_else(|| QdError::invalid(alloc::format!("{count} small icons")))?;
    let mut raster = ctx.raster(SICN_SIZE, height)?;
    for (i, icon) in data.chunks_exact(SICN_LEN).enumerate() {
        draw_bits(&mut raster, icon, 2, SICN_SIZE, SICN_SIZE, 0, i as u32 * SICN_SIZE)?;
    }
    Ok(raster)
}

/// Encode a member of the icon family. Smaller images are padded with
/// transparency, larger ones are rejected.
///
/// Color icons store only pixels, mapped to the nearest system palette
/// entry; write their mask with the matching monochrome list.
pub fn encode(kind: ResourceKind, raster: &Raster) -> Result<Vec<u8>, QdError> {
    let format = format_of(kind)?;
    let raster = fit(raster, format.width, format.height, "icon")?;
    if format.depth != 1 {
        let table = ColorTable::system(i16::from(format.depth))
            .ok_or_else(|| QdError::unsupported(alloc::format!("{}-bit icons", format.depth)))?;
        return build_with_table(&raster, &table, format.depth);
    }
    let (mut bits, _) = build_monochrome(&raster)?;
    if format.inline_mask {
        let (mask, _) = build_mask(&raster)?;
        bits.extend_from_slice(&mask);
    }
    Ok(bits)
}
