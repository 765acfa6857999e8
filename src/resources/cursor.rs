//! Cursors: monochrome `CURS` and color `crsr`.
//!
//! A `CURS` is 32 bytes of 16x16 image bits, 32 bytes of mask and a hot
//! spot. A `crsr` starts with a 96-byte `CCrsr` record holding the same
//! monochrome cursor plus offsets to its `PixMap` and pixel data; the
//! pixmap's `pmTable` field holds the offset of the color table.

use alloc::vec::Vec;

use crate::binary::{BinaryReader, BinaryWriter};
use crate::color::ColorTable;
use crate::decode::{DecodeContext, ResourceKind};
use crate::error::QdError;
use crate::geometry::{Point, Rect};
use crate::pixmap::{PixMap, apply_mask, build, build_mask, build_monochrome};
use crate::raster::Raster;

use super::{draw_bits, fit, reader_at};

const SIZE: u32 = 16;
const BITS_LEN: usize = 32;
const CURS_LEN: usize = 2 * BITS_LEN + 4;
const CCRSR_SIZE: usize = 96;
const CCRSR_TYPE: u16 = 0x8001;
/// Offset of `crsr1Data` inside `CCrsr`.
const CCRSR_BITS_AT: usize = 20;
const CCRSR_HOT_SPOT_AT: usize = CCRSR_BITS_AT + 2 * BITS_LEN;

/// A 16x16 cursor from its image bits and mask.
fn mono(bits: &[u8], mask: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let mut raster = ctx.raster(SIZE, SIZE)?;
    draw_bits(&mut raster, bits, 2, SIZE, SIZE, 0, 0)?;
    apply_mask(&mut raster, mask, 2)?;
    Ok(raster)
}

/// Decode a `CURS`. Pixels outside the mask, including ones the cursor
/// would invert, are transparent.
pub fn decode_mono(data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let mut reader = BinaryReader::new(data);
    let bits = reader.read_bytes(BITS_LEN)?;
    let mask = reader.read_bytes(BITS_LEN)?;
    mono(bits, mask, ctx)
}

/// Decode a `crsr`, using its color image when present.
pub fn decode_color(data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let mut reader = BinaryReader::new(data);
    let kind = reader.read::<u16>()?;
    let map_at = reader.read::<u32>()?;
    let data_at = reader.read::<u32>()?;
    reader.seek(CCRSR_BITS_AT)?;
    let bits = reader.read_bytes(BITS_LEN)?;
    let mask = reader.read_bytes(BITS_LEN)?;

    if kind != CCRSR_TYPE || map_at == 0 {
        log::debug!("color cursor of type {kind:#06x} without a pixmap, using its 1-bit image");
        return mono(bits, mask, ctx);
    }
    let pixmap = PixMap::read(&mut reader_at(data, map_at, "cursor pixmap")?, true)?.as_unpacked();
    let table = if pixmap.is_indexed() {
        Some(ColorTable::read(&mut reader_at(data, pixmap.color_table, "cursor color table")?)?)
    } else {
        None
    };
    let pixels = reader_at(data, data_at, "cursor pixel data")?.read_bytes(pixmap.data_len())?;
    let mut raster = ctx.raster(pixmap.width() as u32, pixmap.height() as u32)?;
    let dest = Rect::from_size(raster.width, raster.height)?;
    pixmap.draw(pixels, table.as_ref(), &mut raster, dest, None)?;
    apply_mask(&mut raster, mask, 2)?;
    Ok(raster)
}

/// The hot spot of a `CURS` or `crsr`.
pub fn hot_spot(kind: ResourceKind, data: &[u8]) -> Result<Point, QdError> {
    let at = match kind {
        ResourceKind::Cursor => 2 * BITS_LEN,
        ResourceKind::ColorCursor => CCRSR_HOT_SPOT_AT,
        _ => {
            return Err(QdError::unsupported(alloc::format!("hot spot of a {kind:?}")));
        }
    };
    let mut reader = BinaryReader::new(data);
    reader.seek(at)?;
    Point::read(&mut reader)
}

fn check_hot_spot(hot_spot: Point) -> Result<(), QdError> {
    let bounds = Rect::from_size(SIZE, SIZE)?;
    if !bounds.contains_point(hot_spot) {
        return Err(QdError::invalid(alloc::format!(
            "hot spot {hot_spot:?} outside the cursor"
        )));
    }
    Ok(())
}

/// 1-bit image and mask bits of a cursor image, two bytes per row.
fn mono_bits(raster: &Raster) -> Result<(Vec<u8>, Vec<u8>), QdError> {
    let (bits, _) = build_monochrome(raster)?;
    let (mask, _) = build_mask(raster)?;
    Ok((bits, mask))
}

/// Encode a `CURS`: black for dark opaque pixels, white for light ones.
pub fn encode_mono(raster: &Raster, hot_spot: Point) -> Result<Vec<u8>, QdError> {
    check_hot_spot(hot_spot)?;
    let raster = fit(raster, SIZE, SIZE, "cursor")?;
    let (bits, mask) = mono_bits(&raster)?;
    let mut w = BinaryWriter::with_capacity(CURS_LEN);
    w.write_bytes(&bits);
    w.write_bytes(&mask);
    hot_spot.write(&mut w);
    Ok(w.into_inner())
}

/// Encode a `crsr` with an indexed color image and a 1-bit fallback.
pub fn encode_color(raster: &Raster, hot_spot: Point) -> Result<Vec<u8>, QdError> {
    check_hot_spot(hot_spot)?;
    let raster = fit(raster, SIZE, SIZE, "cursor")?;
    let (bits, mask) = mono_bits(&raster)?;
    let mut image = build(&raster)?;

    let map_at = CCRSR_SIZE;
    let data_at = map_at + PixMap::SIZE;
    let table_at = data_at + image.pixels.len();
    image.pixmap.color_table = table_at as u32;

    let mut w = BinaryWriter::with_capacity(table_at + image.table.encoded_len());
    w.write(CCRSR_TYPE);
    w.write(map_at as u32);
    w.write(data_at as u32);
    // crsrXData, crsrXValid, crsrXHandle
    w.write(0u32);
    w.write(0i16);
    w.write(0u32);
    w.write_bytes(&bits);
    w.write_bytes(&mask);
    hot_spot.write(&mut w);
    // crsrXTable, crsrID
    w.write(0u32);
    w.write(0u32);
    image.pixmap.write(&mut w, true);
    w.write_bytes(&image.pixels);
    image.table.write(&mut w);
    Ok(w.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    fn arrow() -> Raster {
        let mut r = Raster::new(16, 16).unwrap();
        for y in 0..10 {
            for x in 0..=y {
                let c = if x == 0 || x == y { RGBA8::new(0, 0, 0, 255) } else { RGBA8::new(255, 255, 255, 255) };
                r.set_pixel(x, y, c);
            }
        }
        r
    }

    #[test]
    fn mono_roundtrip() {
        let raster = arrow();
        let bytes = encode_mono(&raster, Point::new(1, 2)).unwrap();
        assert_eq!(bytes.len(), CURS_LEN);
        assert_eq!(decode_mono(&bytes, &DecodeContext::default()).unwrap(), raster);
        assert_eq!(hot_spot(ResourceKind::Cursor, &bytes).unwrap(), Point::new(1, 2));
    }

    #[test]
    fn color_roundtrip() {
        let mut raster = arrow();
        raster.set_pixel(3, 5, RGBA8::new(255, 0, 0, 255));
        let bytes = encode_color(&raster, Point::new(0, 0)).unwrap();
        assert_eq!(decode_color(&bytes, &DecodeContext::default()).unwrap(), raster);
        assert_eq!(hot_spot(ResourceKind::ColorCursor, &bytes).unwrap(), Point::new(0, 0));
    }

    #[test]
    fn color_cursor_without_pixmap_uses_bits() {
        let mut bytes = encode_color(&arrow(), Point::new(0, 0)).unwrap();
        bytes[2..6].copy_from_slice(&0u32.to_be_bytes());
        let r = decode_color(&bytes, &DecodeContext::default()).unwrap();
        assert_eq!(r, arrow());
    }

    #[test]
    fn small_images_are_padded() {
        let r = Raster::from_rgba(1, 1, alloc::vec![0, 0, 0, 255]).unwrap();
        let bytes = encode_mono(&r, Point::new(0, 0)).unwrap();
        assert_eq!(&bytes[..2], &[0x80, 0]);
        assert_eq!(&bytes[BITS_LEN..BITS_LEN + 2], &[0x80, 0]);
    }

    #[test]
    fn rejects_oversize_and_bad_hot_spot() {
        let big = Raster::new(17, 16).unwrap();
        assert!(matches!(encode_mono(&big, Point::new(0, 0)), Err(QdError::TooBig(_))));
        assert!(encode_color(&arrow(), Point::new(16, 0)).is_err());
    }
}
