//! Version 2 picture writer.

use alloc::vec::Vec;

use crate::binary::BinaryWriter;
use crate::error::QdError;
use crate::geometry::Rect;
use crate::pixmap::{DEFAULT_RES, build, build_direct};
use crate::raster::Raster;

use super::V2_HEADER_OP;

const CLIP_RGN: u16 = 0x0001;
const PACK_BITS_RECT: u16 = 0x0098;
const DIRECT_BITS_RECT: u16 = 0x009A;
const END_PIC: u16 = 0x00FF;
/// `srcCopy` transfer mode.
const SRC_COPY: u16 = 0;
/// Placeholder base address written before direct pixmaps.
const DIRECT_BASE_ADDR: u32 = 0xFF;

/// Encode a raster as a version 2 picture with the extended header.
///
/// Pictures have no alpha channel, so the raster is made opaque first.
/// Images with at most 256 colors are stored as one indexed `PackBitsRect`,
/// anything else as a 32-bit `DirectBitsRect` with per-component runs.
pub fn encode_picture(raster: &Raster) -> Result<Vec<u8>, QdError> {
    let frame = Rect::from_size(raster.width, raster.height)?;
    let mut opaque = raster.clone();
    if opaque.has_alpha() {
        log::warn!("dropping alpha channel: pictures are always opaque");
    }
    opaque.drop_alpha();

    let mut w = BinaryWriter::with_capacity(raster.pixels().len() / 2 + 1024);
    let size = w.reserve::<u16>();
    frame.write(&mut w);
    w.write(0x0011u16);
    w.write(0x02FFu16);
    w.write(V2_HEADER_OP);
    w.write(-2i16);
    w.write(0u16);
    w.write(DEFAULT_RES);
    w.write(DEFAULT_RES);
    frame.write(&mut w);
    w.write(0u32);

    w.write(CLIP_RGN);
    w.write(10u16);
    frame.write(&mut w);

    match build(&opaque) {
        Ok(image) => {
            log::debug!(
                "encoding {}x{} picture as {}-bit indexed",
                raster.width,
                raster.height,
                image.pixmap.pixel_size
            );
            w.write(PACK_BITS_RECT);
            image.pixmap.write(&mut w, false);
            image.table.write(&mut w);
            frame.write(&mut w);
            frame.write(&mut w);
            w.write(SRC_COPY);
            image.pixmap.write_pixel_data(&mut w, &image.pixels, true);
        }
        Err(QdError::TooManyColors(n)) => {
            log::debug!(
                "encoding {}x{} picture as 32-bit direct ({n} colors)",
                raster.width,
                raster.height
            );
            let image = build_direct(&opaque, 32)?;
            w.write(DIRECT_BITS_RECT);
            w.write(DIRECT_BASE_ADDR);
            image.pixmap.write(&mut w, false);
            frame.write(&mut w);
            frame.write(&mut w);
            w.write(SRC_COPY);
            image.pixmap.write_pixel_data(&mut w, &image.pixels, true);
        }
        Err(e) => return Err(e),
    }

    w.align(2);
    w.write(END_PIC);
    // The size word only holds the low 16 bits of large pictures.
    let len = w.position() as u16;
    w.backfill(size, len);
    Ok(w.into_inner())
}
