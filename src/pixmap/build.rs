//! Raster to pixel map conversion for the encoders.

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use rgb::RGB8;

use crate::color::{ColorTable, rgb8_to_rgb555};
use crate::error::QdError;
use crate::geometry::Rect;
use crate::raster::Raster;

use super::{PackType, PixMap, padded_row_bytes};

/// Largest row byte count the `rowBytes` field can hold.
const MAX_ROW_BYTES: usize = 0x3FFE;

/// An indexed pixel map ready to serialize.
#[derive(Clone, Debug)]
pub struct IndexedImage {
    pub pixmap: PixMap,
    pub table: ColorTable,
    pub pixels: Vec<u8>,
}

/// A direct pixel map. 32-bit rows are stored as R, G and B planes.
#[derive(Clone, Debug)]
pub struct DirectImage {
    pub pixmap: PixMap,
    pub pixels: Vec<u8>,
}

fn checked_row_bytes(width: usize, depth: usize) -> Result<u16, QdError> {
    let rb = padded_row_bytes(width, depth);
    if rb > MAX_ROW_BYTES {
        return Err(QdError::TooBig(alloc::format!(
            "{width} pixels at {depth} bits need {rb} bytes per row"
        )));
    }
    Ok(rb as u16)
}

#[inline]
fn is_opaque(p: &[u8]) -> bool {
    p[3] >= 0x80
}

/// Build an indexed pixmap from `raster` using the smallest depth of 1, 2,
/// 4 or 8 bits that fits its distinct colors.
///
/// Transparent pixels do not contribute colors and are stored as index 0;
/// pair the result with [`build_mask`] to keep them transparent.
pub fn build(raster: &Raster) -> Result<IndexedImage, QdError> {
    let bounds = Rect::from_size(raster.width, raster.height)?;
    let (w, h) = (raster.width as usize, raster.height as usize);

    let mut palette: Vec<RGB8> = Vec::new();
    let mut lookup: BTreeMap<[u8; 3], u8> = BTreeMap::new();
    let mut indices = Vec::with_capacity(w * h);
    for y in 0..h {
        for p in raster.row(y).chunks_exact(4) {
            if !is_opaque(p) {
                indices.push(0u8);
                continue;
            }
            let key = [p[0], p[1], p[2]];
            let idx = match lookup.get(&key) {
                Some(&i) => i,
                None => {
                    if palette.len() == 256 {
                        return Err(QdError::TooManyColors(count_colors(raster)));
                    }
                    let i = palette.len() as u8;
                    palette.push(RGB8::new(p[0], p[1], p[2]));
                    lookup.insert(key, i);
                    i
                }
            };
            indices.push(idx);
        }
    }
    if palette.is_empty() {
        palette.push(RGB8::new(0, 0, 0));
    }

    let depth: u16 = match palette.len() {
        0..=2 => 1,
        3..=4 => 2,
        5..=16 => 4,
        _ => 8,
    };
    let row_bytes = checked_row_bytes(w, usize::from(depth))?;
    let pixels = pack_indices(&indices, w, h, depth as u8, usize::from(row_bytes));
    Ok(IndexedImage {
        pixmap: PixMap::indexed(bounds, depth, row_bytes),
        table: ColorTable::new(palette),
        pixels,
    })
}

/// Build an indexed pixmap at a fixed `depth` against a fixed palette,
/// mapping each color to its nearest entry.
pub(crate) fn build_with_table(raster: &Raster, table: &ColorTable, depth: u8) -> Result<Vec<u8>, QdError> {
    let (w, h) = (raster.width as usize, raster.height as usize);
    let mut indices = Vec::with_capacity(w * h);
    for y in 0..h {
        for p in raster.row(y).chunks_exact(4) {
            let idx = if is_opaque(p) {
                table.nearest(RGB8::new(p[0], p[1], p[2]))
            } else {
                0
            };
            indices.push(idx as u8);
        }
    }
    let row_bytes = checked_row_bytes(w, usize::from(depth))?;
    Ok(pack_indices(&indices, w, h, depth, usize::from(row_bytes)))
}

fn count_colors(raster: &Raster) -> usize {
    let mut seen = BTreeMap::new();
    for y in 0..raster.height as usize {
        for p in raster.row(y).chunks_exact(4).filter(|p| is_opaque(p)) {
            seen.insert([p[0], p[1], p[2]], ());
        }
    }
    seen.len()
}

fn pack_indices(indices: &[u8], w: usize, h: usize, depth: u8, row_bytes: usize) -> Vec<u8> {
    let mut out = vec![0u8; row_bytes * h];
    let per_byte = 8 / usize::from(depth);
    for y in 0..h {
        let row = &mut out[y * row_bytes..(y + 1) * row_bytes];
        for (x, &idx) in indices[y * w..(y + 1) * w].iter().enumerate() {
            let shift = 8 - usize::from(depth) * (x % per_byte + 1);
            row[x / per_byte] |= idx << shift;
        }
    }
    out
}

/// Build a direct pixmap of `depth` 16 (RGB555 words, PackBits over words)
/// or 32 (component run-length packing, three planes per row). Alpha is not
/// stored.
pub fn build_direct(raster: &Raster, depth: u16) -> Result<DirectImage, QdError> {
    let bounds = Rect::from_size(raster.width, raster.height)?;
    let (w, h) = (raster.width as usize, raster.height as usize);
    match depth {
        16 => {
            let row_bytes = checked_row_bytes(w, 16)?;
            let pixmap = PixMap::direct(bounds, 16, 3, row_bytes, PackType::Default);
            let rb = usize::from(row_bytes);
            let mut pixels = vec![0u8; rb * h];
            for y in 0..h {
                let out = &mut pixels[y * rb..(y + 1) * rb];
                for (x, p) in raster.row(y).chunks_exact(4).enumerate() {
                    let v = rgb8_to_rgb555(RGB8::new(p[0], p[1], p[2]));
                    out[x * 2..x * 2 + 2].copy_from_slice(&v.to_be_bytes());
                }
            }
            Ok(DirectImage { pixmap, pixels })
        }
        32 => {
            let row_bytes = checked_row_bytes(w, 32)?;
            let pixmap = PixMap::direct(bounds, 32, 3, row_bytes, PackType::ComponentRle);
            if row_bytes < 8 {
                // Too narrow to pack: one chunky xRGB pixel per row.
                let pixels = raster
                    .pixels()
                    .chunks_exact(4)
                    .flat_map(|p| [0, p[0], p[1], p[2]])
                    .collect();
                return Ok(DirectImage { pixmap, pixels });
            }
            let mut pixels = vec![0u8; w * 3 * h];
            for y in 0..h {
                let planes = &mut pixels[y * w * 3..(y + 1) * w * 3];
                for (x, p) in raster.row(y).chunks_exact(4).enumerate() {
                    planes[x] = p[0];
                    planes[w + x] = p[1];
                    planes[2 * w + x] = p[2];
                }
            }
            Ok(DirectImage { pixmap, pixels })
        }
        _ => Err(QdError::unsupported(alloc::format!(
            "direct pixmaps of {depth} bits"
        ))),
    }
}

/// A 1-bit mask of the raster's alpha (set = opaque) and its row bytes.
pub fn build_mask(raster: &Raster) -> Result<(Vec<u8>, usize), QdError> {
    build_bits(raster, is_opaque)
}

/// A 1-bit rendering (set = black) of opaque dark pixels and its row bytes.
pub fn build_monochrome(raster: &Raster) -> Result<(Vec<u8>, usize), QdError> {
    build_bits(raster, |p| {
        let luma = (u32::from(p[0]) * 299 + u32::from(p[1]) * 587 + u32::from(p[2]) * 114) / 1000;
        is_opaque(p) && luma < 128
    })
}

fn build_bits(raster: &Raster, set: impl Fn(&[u8]) -> bool) -> Result<(Vec<u8>, usize), QdError> {
    let (w, h) = (raster.width as usize, raster.height as usize);
    let row_bytes = usize::from(checked_row_bytes(w, 1)?);
    let mut out = vec![0u8; row_bytes * h];
    for y in 0..h {
        let row = &mut out[y * row_bytes..(y + 1) * row_bytes];
        for (x, p) in raster.row(y).chunks_exact(4).enumerate() {
            if set(p) {
                row[x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    Ok((out, row_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    fn raster_of(colors: &[RGBA8], w: u32) -> Raster {
        let h = colors.len() as u32 / w;
        let mut r = Raster::new(w, h).unwrap();
        for (i, c) in colors.iter().enumerate() {
            r.set_pixel(i % w as usize, i / w as usize, *c);
        }
        r
    }

    #[test]
    fn depth_follows_color_count() {
        let two = raster_of(&[RGBA8::new(1, 1, 1, 255), RGBA8::new(2, 2, 2, 255)], 2);
        assert_eq!(build(&two).unwrap().pixmap.pixel_size, 1);

        let five: Vec<RGBA8> = (0..5).map(|i| RGBA8::new(i, 0, 0, 255)).collect();
        let img = build(&raster_of(&five, 5)).unwrap();
        assert_eq!(img.pixmap.pixel_size, 4);
        assert_eq!(img.table.len(), 5);
        assert_eq!(img.pixmap.row_bytes, 4);
        assert_eq!(&img.pixels[..3], &[0x01, 0x23, 0x40]);

        let many: Vec<RGBA8> = (0..=255).map(|i| RGBA8::new(i, 0, 0, 255)).collect();
        assert_eq!(build(&raster_of(&many, 16)).unwrap().pixmap.pixel_size, 8);
    }

    #[test]
    fn too_many_colors() {
        let many: Vec<RGBA8> = (0..300u32)
            .map(|i| RGBA8::new(i as u8, (i >> 8) as u8, 0, 255))
            .collect();
        let err = build(&raster_of(&many, 30)).unwrap_err();
        assert!(matches!(err, QdError::TooManyColors(300)));
    }

    #[test]
    fn transparent_pixels_skip_the_palette() {
        let r = raster_of(&[RGBA8::new(0, 0, 0, 0), RGBA8::new(9, 9, 9, 255)], 2);
        let img = build(&r).unwrap();
        assert_eq!(img.table.colors(), &[RGB8::new(9, 9, 9)]);
        let (mask, rb) = build_mask(&r).unwrap();
        assert_eq!(rb, 2);
        assert_eq!(mask, [0b0100_0000, 0]);
    }

    #[test]
    fn direct_planes() {
        let r = raster_of(&[RGBA8::new(1, 2, 3, 255), RGBA8::new(4, 5, 6, 255)], 2);
        let img = build_direct(&r, 32).unwrap();
        assert_eq!(img.pixels, [1, 4, 2, 5, 3, 6]);
        assert_eq!(img.pixmap.resolved_row_bytes(), 6);

        let rb = raster_of(&[RGBA8::new(255, 0, 0, 255), RGBA8::new(0, 0, 255, 255)], 2);
        let img = build_direct(&rb, 16).unwrap();
        assert_eq!(img.pixmap.row_bytes, 4);
        assert_eq!(img.pixels, [0x7C, 0x00, 0x00, 0x1F]);
        assert!(build_direct(&r, 24).is_err());
    }

    #[test]
    fn monochrome_marks_dark_pixels() {
        let r = raster_of(
            &[RGBA8::new(0, 0, 0, 255), RGBA8::new(255, 255, 255, 255), RGBA8::new(0, 0, 0, 0)],
            3,
        );
        let (bits, _) = build_monochrome(&r).unwrap();
        assert_eq!(bits[0], 0b1000_0000);
    }

    #[test]
    fn oversized_rows_are_rejected() {
        let r = Raster::new(5000, 1).unwrap();
        assert!(matches!(build_direct(&r, 32), Err(QdError::TooBig(_))));
    }
}
