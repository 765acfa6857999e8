//! Appearance pixmap lists (`pxm#`).
//!
//! A 20-byte header (version, image count, shared bounds, pixel size,
//! `clut` id, mask flag) is followed by each image's unpacked indexed rows
//! and, when the mask flag is set, its 1-bit mask. The images decode
//! stacked top to bottom.

use crate::binary::BinaryReader;
use crate::color::ColorTable;
use crate::decode::DecodeContext;
use crate::error::QdError;
use crate::geometry::Rect;
use crate::pixmap::{PixMap, apply_mask, padded_row_bytes};
use crate::raster::Raster;

const VERSION: u16 = 1;

/// The palette named by `clut_id`: a system table, a `clut` found through
/// the lookup, or the default for the depth.
fn palette(clut_id: i16, depth: u16, ctx: &DecodeContext<'_>) -> Result<ColorTable, QdError> {
    if let Some(table) = ColorTable::system(clut_id) {
        return Ok(table);
    }
    if let Some(data) = ctx.lookup().find_resource(*b"clut", clut_id) {
        return ColorTable::read(&mut BinaryReader::new(&data));
    }
    log::debug!("'clut' #{clut_id} not found, using the {depth}-bit system palette");
    ColorTable::default_for_depth(depth)
        .ok_or_else(|| QdError::invalid(alloc::format!("no palette for {depth}-bit pixmap list")))
}

pub fn decode(data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let mut reader = BinaryReader::new(data);
    let version = reader.read::<u16>()?;
    if version != VERSION {
        return Err(QdError::unsupported(alloc::format!("pixmap list version {version}")));
    }
    let count = reader.read::<u16>()?;
    let bounds = Rect::read_valid(&mut reader)?;
    let depth = reader.read::<u16>()?;
    let clut_id = reader.read::<i16>()?;
    let masked = reader.read::<u16>()? != 0;
    reader.skip(2)?;

    if count == 0 {
        return Err(QdError::invalid("pixmap list holds no images"));
    }
    if !matches!(depth, 1 | 2 | 4 | 8) {
        return Err(QdError::unsupported(alloc::format!("{depth}-bit pixmap lists")));
    }
    let (width, height) = (bounds.width() as u32, bounds.height() as u32);
    let total_height = height
        .checked_mul(u32::from(count))
        .ok_or_else(|| QdError::invalid("pixmap list too tall"))?;
    let mut raster = ctx.raster(width, total_height)?;

    let row_bytes = u16::try_from(padded_row_bytes(width as usize, usize::from(depth)))
        .map_err(|_| QdError::invalid(alloc::format!("{width}-pixel rows")))?;
    let mask_row_bytes = padded_row_bytes(width as usize, 1);
    let pixmap = PixMap::indexed(Rect::from_size(width, height)?, depth, row_bytes);
    let table = palette(clut_id, depth, ctx)?;

    for i in 0..u32::from(count) {
        let pixels = reader.read_bytes(pixmap.data_len())?;
        let top = i * height;
        let dest = Rect::from_size(width, height)?.offset(0, top as i32)?;
        if masked {
            let mask = reader.read_bytes(mask_row_bytes * height as usize)?;
            let mut image = Raster::new(width, height)?;
            pixmap.draw(pixels, Some(&table), &mut image, Rect::from_size(width, height)?, None)?;
            apply_mask(&mut image, mask, mask_row_bytes)?;
            let stride = image.stride();
            for y in 0..height as usize {
                raster
                    .row_mut(top as usize + y)
                    .copy_from_slice(&image.pixels()[y * stride..(y + 1) * stride]);
            }
        } else {
            pixmap.draw(pixels, Some(&table), &mut raster, dest, None)?;
        }
    }
    if !reader.is_empty() {
        log::debug!("{} bytes after the last pixmap", reader.remaining());
    }
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryWriter;
    use crate::lookup::FourCC;
    use alloc::vec::Vec;
    use rgb::{RGB8, RGBA8};

    fn header(count: u16, width: i16, height: i16, depth: u16, clut: i16, masked: bool) -> BinaryWriter {
        let mut w = BinaryWriter::new();
        w.write(VERSION);
        w.write(count);
        Rect::new(0, 0, height, width).write(&mut w);
        w.write(depth);
        w.write(clut);
        w.write(u16::from(masked));
        w.write(0u16);
        w
    }

    #[test]
    fn images_stack_vertically() {
        let mut w = header(2, 2, 1, 8, 8, false);
        // Two 2x1 8-bit images, rows padded to 2 bytes.
        w.write_bytes(&[0, 255, 35, 0]);
        let r = decode(&w.into_inner(), &DecodeContext::default()).unwrap();
        assert_eq!((r.width, r.height), (2, 2));
        assert_eq!(r.pixel(0, 0), RGBA8::new(255, 255, 255, 255));
        assert_eq!(r.pixel(1, 0), RGBA8::new(0, 0, 0, 255));
        assert_eq!(r.pixel(0, 1), RGBA8::new(255, 0, 0, 255));
    }

    #[test]
    fn masks_clear_pixels() {
        let mut w = header(1, 2, 1, 1, 1, true);
        w.write_bytes(&[0b1100_0000, 0]);
        w.write_bytes(&[0b1000_0000, 0]);
        let r = decode(&w.into_inner(), &DecodeContext::default()).unwrap();
        assert_eq!(r.pixel(0, 0), RGBA8::new(0, 0, 0, 255));
        assert_eq!(r.pixel(1, 0), RGBA8::new(0, 0, 0, 0));
    }

    #[test]
    fn custom_clut_through_lookup() {
        let mut table = BinaryWriter::new();
        ColorTable::new(alloc::vec![RGB8::new(1, 2, 3), RGB8::new(4, 5, 6)]).write(&mut table);
        let table = table.into_inner();
        let lookup = |kind: FourCC, id: i16| -> Option<Vec<u8>> { (kind == *b"clut" && id == 300).then(|| table.clone()) };

        let mut w = header(1, 1, 1, 1, 300, false);
        w.write_bytes(&[0x80, 0]);
        let ctx = DecodeContext::new(None, &lookup);
        let r = decode(&w.into_inner(), &ctx).unwrap();
        assert_eq!(r.pixel(0, 0), RGBA8::new(4, 5, 6, 255));
    }

    #[test]
    fn rejects_bad_headers() {
        let ctx = DecodeContext::default();
        let empty = header(0, 1, 1, 8, 8, false).into_inner();
        assert!(decode(&empty, &ctx).is_err());
        let direct = header(1, 1, 1, 16, 8, false).into_inner();
        assert!(matches!(decode(&direct, &ctx), Err(QdError::Unsupported(_))));
        let short = header(1, 4, 4, 8, 8, false).into_inner();
        assert!(decode(&short, &ctx).is_err());
    }
}
