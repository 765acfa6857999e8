//! Pixel patterns (`ppat`).
//!
//! A `PixPat` record links by offset to its `PixMap` (`patMap`) and pixel
//! data (`patData`); the pixmap's `pmTable` field holds the offset of the
//! color table. Type 0 patterns only have the 8x8 `pat1Data` bits.

use alloc::vec::Vec;

use crate::binary::{BinaryReader, BinaryWriter};
use crate::color::ColorTable;
use crate::decode::DecodeContext;
use crate::error::QdError;
use crate::geometry::Rect;
use crate::pixmap::{PackType, PixMap, build, build_monochrome};
use crate::raster::Raster;

use super::{draw_bits, reader_at};

const PIXPAT_SIZE: usize = 28;
const TYPE_MONO: i16 = 0;
const TYPE_COLOR: i16 = 1;
const TYPE_RGB: i16 = 2;

pub fn decode(data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let mut reader = BinaryReader::new(data);
    let pat_type = reader.read::<i16>()?;
    let pat_map = reader.read::<u32>()?;
    let pat_data = reader.read::<u32>()?;
    reader.skip(4 + 2 + 4)?;
    let pat1 = reader.read_array::<8>()?;

    match pat_type {
        TYPE_MONO => {
            let mut raster = ctx.raster(8, 8)?;
            draw_bits(&mut raster, &pat1, 1, 8, 8, 0, 0)?;
            Ok(raster)
        }
        TYPE_COLOR | TYPE_RGB => {
            let pixmap = PixMap::read(&mut reader_at(data, pat_map, "pattern pixmap")?, true)?.as_unpacked();
            let table = if pixmap.is_indexed() {
                Some(ColorTable::read(&mut reader_at(data, pixmap.color_table, "pattern color table")?)?)
            } else {
                None
            };
            let pixels = reader_at(data, pat_data, "pattern data")?.read_bytes(pixmap.data_len())?;
            let mut raster = ctx.raster(pixmap.width() as u32, pixmap.height() as u32)?;
            let dest = Rect::from_size(raster.width, raster.height)?;
            pixmap.draw(pixels, table.as_ref(), &mut raster, dest, None)?;
            Ok(raster)
        }
        t => Err(QdError::unsupported(alloc::format!("pixel pattern type {t}"))),
    }
}

/// Encode a full-color pattern. Images with more than 256 colors are stored
/// as unpacked 32-bit pixels. `pat1Data` gets a 1-bit rendering of the
/// top-left 8x8 corner. Patterns have no mask, so alpha is dropped first.
pub fn encode(raster: &Raster) -> Result<Vec<u8>, QdError> {
    let mut opaque = raster.clone();
    if opaque.has_alpha() {
        log::warn!("dropping alpha channel: pixel patterns are always opaque");
    }
    opaque.drop_alpha();
    let raster = &opaque;
    let corner = raster.crop_or_pad(0, 0, 8, 8)?;
    let (mono, mono_row_bytes) = build_monochrome(&corner)?;

    let (mut pixmap, pixels, table) = match build(raster) {
        Ok(image) => (image.pixmap, image.pixels, image.table),
        Err(QdError::TooManyColors(n)) => {
            log::debug!("pattern has {n} colors, storing 32-bit pixels");
            direct(raster)?
        }
        Err(e) => return Err(e),
    };

    let pixmap_at = PIXPAT_SIZE;
    let data_at = pixmap_at + PixMap::SIZE;
    let table_at = data_at + pixels.len();
    pixmap.color_table = table_at as u32;

    let mut w = BinaryWriter::with_capacity(table_at + table.encoded_len());
    w.write(TYPE_COLOR);
    w.write(pixmap_at as u32);
    w.write(data_at as u32);
    w.write(0u32);
    w.write(-1i16);
    w.write(0u32);
    for row in mono.chunks_exact(mono_row_bytes) {
        w.write(row[0]);
    }
    pixmap.write(&mut w, true);
    w.write_bytes(&pixels);
    table.write(&mut w);
    Ok(w.into_inner())
}

/// Unpacked 32-bit xRGB rows and an empty color table.
fn direct(raster: &Raster) -> Result<(PixMap, Vec<u8>, ColorTable), QdError> {
    let bounds = Rect::from_size(raster.width, raster.height)?;
    let row_bytes = u16::try_from(raster.width as usize * 4)
        .ok()
        .filter(|&rb| rb <= 0x3FFE)
        .ok_or_else(|| QdError::TooBig(alloc::format!("{} pixels per row", raster.width)))?;
    let pixels = raster
        .pixels()
        .chunks_exact(4)
        .flat_map(|p| [0, p[0], p[1], p[2]])
        .collect();
    let pixmap = PixMap::direct(bounds, 32, 3, row_bytes, PackType::None);
    Ok((pixmap, pixels, ColorTable::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    fn opaque(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 3]) -> Raster {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .flat_map(|(x, y)| {
                let [r, g, b] = f(x, y);
                [r, g, b, 255]
            })
            .collect();
        Raster::from_rgba(width, height, pixels).unwrap()
    }

    #[test]
    fn indexed_roundtrip() {
        let raster = opaque(8, 8, |x, y| if (x + y) % 3 == 0 { [255, 0, 0] } else { [0, 0, 255] });
        let bytes = encode(&raster).unwrap();
        assert_eq!(decode(&bytes, &DecodeContext::default()).unwrap(), raster);
    }

    #[test]
    fn direct_fallback_roundtrip() {
        let raster = opaque(20, 16, |x, y| [x as u8 * 10, y as u8 * 10, 3]);
        let bytes = encode(&raster).unwrap();
        let pixmap = PixMap::read(&mut BinaryReader::new(&bytes[PIXPAT_SIZE..]), true).unwrap();
        assert_eq!(pixmap.pixel_size, 32);
        assert_eq!(decode(&bytes, &DecodeContext::default()).unwrap(), raster);
    }

    #[test]
    fn transparent_pixels_keep_their_color() {
        let mut raster = opaque(4, 2, |x, _| if x < 2 { [200, 0, 0] } else { [0, 0, 200] });
        raster.set_pixel(0, 0, RGBA8::new(0, 0, 0, 0));
        raster.set_pixel(3, 1, RGBA8::new(0, 0, 200, 0));
        let decoded = decode(&encode(&raster).unwrap(), &DecodeContext::default()).unwrap();
        assert_eq!(decoded.pixel(0, 0), RGBA8::new(0, 0, 0, 255));
        assert_eq!(decoded.pixel(1, 0), RGBA8::new(200, 0, 0, 255));
        assert_eq!(decoded.pixel(3, 1), RGBA8::new(0, 0, 200, 255));
        assert!(!decoded.has_alpha());
    }

    #[test]
    fn mono_pattern() {
        let mut data = alloc::vec![0u8; PIXPAT_SIZE];
        data[20..28].copy_from_slice(&[0xFF, 0, 0, 0, 0, 0, 0, 0x01]);
        let r = decode(&data, &DecodeContext::default()).unwrap();
        assert_eq!(r.pixel(3, 0), RGBA8::new(0, 0, 0, 255));
        assert_eq!(r.pixel(3, 1), RGBA8::new(255, 255, 255, 255));
        assert_eq!(r.pixel(7, 7), RGBA8::new(0, 0, 0, 255));
    }

    #[test]
    fn pat1_data_is_the_corner() {
        let raster = opaque(8, 8, |x, _| if x == 0 { [0, 0, 0] } else { [255, 255, 255] });
        let bytes = encode(&raster).unwrap();
        assert!(bytes[20..28].iter().all(|&b| b == 0x80));
    }

    #[test]
    fn bad_offsets_fail() {
        let raster = opaque(2, 2, |_, _| [1, 2, 3]);
        let mut bytes = encode(&raster).unwrap();
        bytes[2..6].copy_from_slice(&0xFFFFu32.to_be_bytes());
        assert!(decode(&bytes, &DecodeContext::default()).is_err());
    }
}
