//! Planar RGB (`8BPS`) decoding.
//!
//! Each channel is stored as a separate plane. Data is either raw, or a
//! table of u16 compressed row lengths (planes x height entries) followed by
//! PackBits rows, plane after plane.

use alloc::vec;
use alloc::vec::Vec;

use crate::binary::BinaryReader;
use crate::decode::DecodeContext;
use crate::error::QdError;
use crate::geometry::Rect;
use crate::packbits::unpack_bits;
use crate::pixmap::PixMap;
use crate::raster::Raster;

use super::{ImageDescription, Plane};

/// Extension atom overriding the channel count.
const CHANNEL_COUNT_ATOM: [u8; 4] = *b"chct";

fn channel_count(desc: &ImageDescription) -> Result<usize, QdError> {
    if let Some(atom) = desc.extension(CHANNEL_COUNT_ATOM) {
        let count = BinaryReader::new(atom).read::<u16>()?;
        log::debug!("'8BPS' channel count {count} from extension atom");
        return Ok(usize::from(count));
    }
    Ok(match desc.bit_depth() {
        1 | 8 => 1,
        24 => 3,
        32 => 4,
        d => return Err(QdError::unsupported(alloc::format!("'8BPS' at depth {d}"))),
    })
}

/// Unpack every plane into one buffer, plane after plane.
fn read_planes(data: &[u8], planes: usize, row_bytes: usize, height: usize) -> Result<Vec<u8>, QdError> {
    let plane_size = row_bytes * height;
    let total = planes * plane_size;
    if data.len() == total {
        return Ok(data.to_vec());
    }

    let mut reader = BinaryReader::new(data);
    let mut lengths = Vec::with_capacity(planes * height);
    for _ in 0..planes * height {
        lengths.push(usize::from(reader.read::<u16>()?));
    }
    let mut out = vec![0u8; total];
    for (row, &len) in out.chunks_exact_mut(row_bytes.max(1)).zip(&lengths) {
        let mut packed = reader.sub_reader(len)?;
        unpack_bits(&mut packed, row, 1)?;
    }
    Ok(out)
}

pub(crate) fn decode(desc: &ImageDescription, data: &[u8], ctx: &DecodeContext<'_>) -> Result<Raster, QdError> {
    let (w, h) = (usize::from(desc.width), usize::from(desc.height));
    let depth = desc.bit_depth();
    let planes = channel_count(desc)?;
    match depth {
        1 | 8 => {
            let row_bytes = if depth == 1 { w.div_ceil(8) } else { w };
            let pixels = read_planes(data, planes.max(1), row_bytes, h)?;
            let row_bytes = u16::try_from(row_bytes)
                .map_err(|_| QdError::invalid(alloc::format!("'8BPS' row of {row_bytes} bytes")))?;
            let bounds = Rect::from_size(u32::from(desc.width), u32::from(desc.height))?;
            let plane = Plane {
                pixmap: PixMap::indexed(bounds, depth, row_bytes),
                pixels,
                written: None,
            };
            let table = desc.resolve_color_table(ctx.lookup())?;
            plane.render(table.as_ref(), ctx)
        }
        24 | 32 => {
            if planes < 3 {
                return Err(QdError::invalid(alloc::format!(
                    "'8BPS' RGB data with {planes} channels"
                )));
            }
            let mut raster = ctx.raster(u32::from(desc.width), u32::from(desc.height))?;
            let pixels = read_planes(data, planes, w, h)?;
            let plane_size = w * h;
            let (r, rest) = pixels.split_at(plane_size);
            let (g, rest) = rest.split_at(plane_size);
            let b = &rest[..plane_size];
            for y in 0..h {
                for (x, px) in raster.row_mut(y).chunks_exact_mut(4).enumerate() {
                    let i = y * w + x;
                    px.copy_from_slice(&[r[i], g[i], b[i], 255]);
                }
            }
            Ok(raster)
        }
        d => Err(QdError::unsupported(alloc::format!("'8BPS' at depth {d}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryWriter;
    use crate::packbits::pack_bits;
    use crate::quicktime::tests::description_bytes;
    use rgb::RGBA8;

    fn desc(depth: i16, atoms: &[u8]) -> ImageDescription {
        let mut bytes = description_bytes(b"8BPS", 2, 2, depth, -1, None, 0);
        bytes.extend_from_slice(atoms);
        let size = bytes.len() as u32;
        bytes[..4].copy_from_slice(&size.to_be_bytes());
        ImageDescription::read(&mut BinaryReader::new(&bytes)).unwrap()
    }

    #[test]
    fn raw_rgb_planes() {
        let data = [
            255, 0, 0, 10, // R
            0, 255, 0, 20, // G
            0, 0, 255, 30, // B
        ];
        let r = decode(&desc(24, &[]), &data, &DecodeContext::default()).unwrap();
        assert_eq!(r.pixel(0, 0), RGBA8::new(255, 0, 0, 255));
        assert_eq!(r.pixel(1, 0), RGBA8::new(0, 255, 0, 255));
        assert_eq!(r.pixel(0, 1), RGBA8::new(0, 0, 255, 255));
        assert_eq!(r.pixel(1, 1), RGBA8::new(10, 20, 30, 255));
    }

    #[test]
    fn packed_planes_drop_alpha_channel() {
        let rows: [[u8; 2]; 8] = [[1, 1], [2, 2], [3, 3], [4, 4], [5, 5], [6, 6], [9, 9], [9, 9]];
        let packed: Vec<Vec<u8>> = rows.iter().map(|r| pack_bits(r, 1)).collect();
        let mut w = BinaryWriter::new();
        for p in &packed {
            w.write(p.len() as u16);
        }
        for p in &packed {
            w.write_bytes(p);
        }
        let r = decode(&desc(32, &[]), &w.into_inner(), &DecodeContext::default()).unwrap();
        assert_eq!(r.pixel(0, 0), RGBA8::new(1, 3, 5, 255));
        assert_eq!(r.pixel(1, 1), RGBA8::new(2, 4, 6, 255));
    }

    #[test]
    fn channel_atom_overrides_depth() {
        let atom = [0, 0, 0, 10, b'c', b'h', b'c', b't', 0, 3];
        let d = desc(32, &atom);
        assert_eq!(channel_count(&d).unwrap(), 3);
        let data = [7u8; 12];
        let r = decode(&d, &data, &DecodeContext::default()).unwrap();
        assert_eq!(r.pixel(1, 1), RGBA8::new(7, 7, 7, 255));
    }

    #[test]
    fn indexed_plane_uses_palette() {
        let r = decode(&desc(8, &[]), &[0, 255, 255, 0], &DecodeContext::default()).unwrap();
        assert_eq!(r.pixel(0, 0), RGBA8::new(255, 255, 255, 255));
        assert_eq!(r.pixel(1, 0), RGBA8::new(0, 0, 0, 255));
    }
}
