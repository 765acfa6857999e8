//! Color icons (`cicn`).
//!
//! Layout: the icon `PixMap`, a mask `BitMap`, a 1-bit icon `BitMap`, a
//! handle placeholder, then the mask bits, the 1-bit icon bits, the color
//! table and the unpacked pixel data.

use alloc::vec::Vec;

use crate::binary::{BinaryReader, BinaryWriter};
use crate::color::ColorTable;
use crate::decode::DecodeContext;
use crate::error::QdError;
use crate::geometry::Rect;
use crate::pixmap::{PixMap, apply_mask, build, build_mask, build_monochrome};
use crate::raster::Raster;

/// Offset of the mask bits.
const HEADER_SIZE: usize = PixMap::SIZE + 2 * PixMap::BITMAP_SIZE + 4;

pub fn decode(data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let mut reader = BinaryReader::new(data);
    let pixmap = PixMap::read(&mut reader, true)?.as_unpacked();
    let mask = PixMap::read(&mut reader, true)?;
    let bitmap = PixMap::read(&mut reader, true)?;
    reader.skip(4)?;
    if !pixmap.is_pixmap {
        return Err(QdError::invalid("color icon without a pixel map"));
    }

    let mask_bits = reader.read_bytes(usize::from(mask.row_bytes) * mask.height())?;
    let icon_bits = reader.read_bytes(usize::from(bitmap.row_bytes) * bitmap.height())?;

    let mut raster = ctx.raster(pixmap.width() as u32, pixmap.height() as u32)?;
    let dest = Rect::from_size(raster.width, raster.height)?;
    if reader.is_empty() {
        log::debug!("color icon has no color data, using its 1-bit image");
        bitmap.draw(icon_bits, None, &mut raster, dest, None)?;
    } else {
        let table = ColorTable::read(&mut reader)?;
        let pixels = reader.read_bytes(pixmap.data_len())?;
        pixmap.draw(pixels, Some(&table), &mut raster, dest, None)?;
    }
    if mask.row_bytes > 0 {
        apply_mask(&mut raster, mask_bits, usize::from(mask.row_bytes))?;
    }
    Ok(raster)
}

/// Encode a color icon; transparency is kept in the mask and the 1-bit
/// image marks the dark opaque pixels.
pub fn encode(raster: &Raster) -> Result<Vec<u8>, QdError> {
    let image = build(raster)?;
    let (mask, mask_row_bytes) = build_mask(raster)?;
    let (bits, bits_row_bytes) = build_monochrome(raster)?;
    let bounds = image.pixmap.bounds;

    let mut w = BinaryWriter::with_capacity(
        HEADER_SIZE + mask.len() + bits.len() + image.table.encoded_len() + image.pixels.len(),
    );
    image.pixmap.write(&mut w, true);
    PixMap::bitmap(bounds, mask_row_bytes as u16).write(&mut w, true);
    PixMap::bitmap(bounds, bits_row_bytes as u16).write(&mut w, true);
    w.write(0u32);
    w.write_bytes(&mask);
    w.write_bytes(&bits);
    image.table.write(&mut w);
    image.pixmap.write_pixel_data(&mut w, &image.pixels, false);
    Ok(w.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    fn sample() -> Raster {
        let mut r = Raster::new(5, 3).unwrap();
        r.set_pixel(0, 0, RGBA8::new(255, 0, 0, 255));
        r.set_pixel(1, 0, RGBA8::new(0, 0, 0, 255));
        r.set_pixel(4, 2, RGBA8::new(200, 220, 240, 255));
        r
    }

    #[test]
    fn roundtrip_keeps_transparency() {
        let raster = sample();
        let bytes = encode(&raster).unwrap();
        let back = decode(&bytes, &DecodeContext::default()).unwrap();
        assert_eq!(back, raster);
    }

    #[test]
    fn header_offsets() {
        let bytes = encode(&sample()).unwrap();
        // Mask and 1-bit rows are 2 bytes for a 5-pixel-wide icon.
        let table_at = HEADER_SIZE + 6 + 6;
        let table = ColorTable::read(&mut BinaryReader::new(&bytes[table_at..])).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(bytes[HEADER_SIZE], 0b1100_0000);
        // Red is dark enough to be black in the 1-bit image.
        assert_eq!(bytes[HEADER_SIZE + 6], 0b1100_0000);
    }

    #[test]
    fn falls_back_to_one_bit_image() {
        let bytes = encode(&sample()).unwrap();
        let table_at = HEADER_SIZE + 6 + 6;
        let back = decode(&bytes[..table_at], &DecodeContext::default()).unwrap();
        assert_eq!(back.pixel(0, 0), RGBA8::new(0, 0, 0, 255));
        assert_eq!(back.pixel(4, 2), RGBA8::new(255, 255, 255, 255));
        assert_eq!(back.pixel(2, 0).a, 0);
    }

    #[test]
    fn too_many_colors() {
        let pixels: Vec<u8> = (0..300u32).flat_map(|i| [i as u8, (i >> 8) as u8, 0, 255]).collect();
        let raster = Raster::from_rgba(300, 1, pixels).unwrap();
        assert!(matches!(encode(&raster), Err(QdError::TooManyColors(300))));
    }
}
