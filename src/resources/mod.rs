//! Classic Mac OS image resources: color icons, pixel patterns, cursors,
//! the icon family, patterns and Appearance pixmap lists.
//!
//! Every decoder takes the raw resource bytes and produces a [`Raster`];
//! the encoders write the same layouts back.

pub mod cicn;
pub mod cursor;
pub mod icons;
pub mod pattern;
pub mod ppat;
pub mod pxm;

use alloc::borrow::Cow;

use crate::binary::BinaryReader;
use crate::error::QdError;
use crate::geometry::Rect;
use crate::pixmap::PixMap;
use crate::raster::Raster;

/// A reader positioned `offset` bytes into a resource whose records link to
/// each other by offset.
pub(crate) fn reader_at<'a>(data: &'a [u8], offset: u32, what: &str) -> Result<BinaryReader<'a>, QdError> {
    let mut reader = BinaryReader::new(data);
    reader.seek(offset as usize).map_err(|_| {
        QdError::invalid(alloc::format!(
            "{what} at offset {offset} beyond the {}-byte resource",
            data.len()
        ))
    })?;
    Ok(reader)
}

/// The raster padded with transparency to a fixed resource size; larger
/// rasters do not fit.
pub(crate) fn fit<'r>(raster: &'r Raster, width: u32, height: u32, what: &str) -> Result<Cow<'r, Raster>, QdError> {
    if raster.width > width || raster.height > height {
        return Err(QdError::TooBig(alloc::format!(
            "{}x{} image does not fit a {width}x{height} {what}",
            raster.width,
            raster.height
        )));
    }
    if raster.width == width && raster.height == height {
        return Ok(Cow::Borrowed(raster));
    }
    Ok(Cow::Owned(raster.crop_or_pad(0, 0, width, height)?))
}

/// Draw 1-bit rows (set = black) of `width x height` at `(left, top)`.
pub(crate) fn draw_bits(
    raster: &mut Raster,
    bits: &[u8],
    row_bytes: u16,
    width: u32,
    height: u32,
    left: u32,
    top: u32,
) -> Result<(), QdError> {
    let bounds = Rect::from_size(width, height)?;
    let dest = bounds.offset(left as i32, top as i32)?;
    PixMap::bitmap(bounds, row_bytes).draw(bits, None, raster, dest, None)
}

/// Keep the first `bytes` bytes of each `row_bytes`-wide row.
pub(crate) fn trim_rows(data: &[u8], row_bytes: usize, bytes: usize) -> alloc::vec::Vec<u8> {
    data.chunks_exact(row_bytes.max(1))
        .flat_map(|row| &row[..bytes])
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    #[test]
    fn fit_pads_smaller_rasters() {
        let r = Raster::from_rgba(1, 1, alloc::vec![1, 2, 3, 255]).unwrap();
        let fitted = fit(&r, 2, 2, "icon").unwrap();
        assert_eq!((fitted.width, fitted.height), (2, 2));
        assert_eq!(fitted.pixel(0, 0), RGBA8::new(1, 2, 3, 255));
        assert_eq!(fitted.pixel(1, 1), RGBA8::new(0, 0, 0, 0));
        assert!(matches!(fit(&fitted, 1, 2, "icon"), Err(QdError::TooBig(_))));
    }

    #[test]
    fn reader_at_checks_offsets() {
        assert!(reader_at(&[0; 4], 4, "table").is_ok());
        assert!(reader_at(&[0; 4], 5, "table").is_err());
    }
}
