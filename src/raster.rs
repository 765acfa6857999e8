use alloc::vec;
use alloc::vec::Vec;

#[cfg(feature = "imgref")]
use rgb::AsPixels as _;
use rgb::RGBA8;

use crate::error::QdError;

/// An 8-bit RGBA image with a byte stride, the in/out currency of every
/// decoder and encoder in this crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    stride: usize,
}

impl Raster {
    /// A fully transparent raster.
    pub fn new(width: u32, height: u32) -> Result<Self, QdError> {
        let stride = (width as usize)
            .checked_mul(4)
            .ok_or(QdError::DimensionsTooLarge { width, height })?;
        let len = stride
            .checked_mul(height as usize)
            .ok_or(QdError::DimensionsTooLarge { width, height })?;
        Ok(Self {
            pixels: vec![0u8; len],
            width,
            height,
            stride,
        })
    }

    /// Wrap tightly packed RGBA8 pixels.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, QdError> {
        let needed = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(QdError::DimensionsTooLarge { width, height })?;
        if pixels.len() != needed {
            return Err(QdError::invalid(alloc::format!(
                "RGBA buffer is {} bytes, expected {needed} for {width}x{height}",
                pixels.len()
            )));
        }
        Ok(Self {
            pixels,
            width,
            height,
            stride: width as usize * 4,
        })
    }

    /// Access the pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.pixels[start..start + self.width as usize * 4]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        let end = start + self.width as usize * 4;
        &mut self.pixels[start..end]
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> RGBA8 {
        let off = y * self.stride + x * 4;
        let p = &self.pixels[off..off + 4];
        RGBA8::new(p[0], p[1], p[2], p[3])
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, c: RGBA8) {
        let off = y * self.stride + x * 4;
        self.pixels[off..off + 4].copy_from_slice(&[c.r, c.g, c.b, c.a]);
    }

    /// Whether any pixel is not fully opaque.
    pub fn has_alpha(&self) -> bool {
        (0..self.height as usize).any(|y| self.row(y).chunks_exact(4).any(|p| p[3] != 255))
    }

    /// Force every pixel opaque.
    pub fn drop_alpha(&mut self) {
        for y in 0..self.height as usize {
            for p in self.row_mut(y).chunks_exact_mut(4) {
                p[3] = 255;
            }
        }
    }

    /// Canonical form used by encoders: fully transparent pixels carry no
    /// color, so they become `0,0,0,0`.
    pub fn normalize(&mut self) {
        for y in 0..self.height as usize {
            for p in self.row_mut(y).chunks_exact_mut(4) {
                if p[3] == 0 {
                    p.fill(0);
                }
            }
        }
    }

    /// Nearest-neighbour scale the whole of `self` onto `dest` at
    /// `(left, top)` with size `width x height`. The caller guarantees the
    /// target area is inside `dest`.
    pub(crate) fn scale_into(
        &self,
        dest: &mut Raster,
        left: usize,
        top: usize,
        width: usize,
        height: usize,
    ) {
        let (sw, sh) = (self.width as usize, self.height as usize);
        if sw == 0 || sh == 0 {
            return;
        }
        for dy in 0..height {
            let sy = dy * sh / height;
            for dx in 0..width {
                let sx = dx * sw / width;
                dest.set_pixel(left + dx, top + dy, self.pixel(sx, sy));
            }
        }
    }

    /// Copy of the region `(left, top, width, height)`, extended with
    /// transparent pixels where it overhangs the raster.
    pub fn crop_or_pad(&self, left: usize, top: usize, width: u32, height: u32) -> Result<Raster, QdError> {
        let mut out = Raster::new(width, height)?;
        for y in 0..height as usize {
            let sy = top + y;
            if sy >= self.height as usize {
                break;
            }
            for x in 0..width as usize {
                let sx = left + x;
                if sx >= self.width as usize {
                    break;
                }
                out.set_pixel(x, y, self.pixel(sx, sy));
            }
        }
        Ok(out)
    }

    /// Zero-copy view as an [`imgref::ImgRef`] of RGBA8 pixels.
    #[cfg(feature = "imgref")]
    pub fn as_imgref(&self) -> imgref::ImgRef<'_, RGBA8> {
        let pixels: &[RGBA8] = self.pixels.as_pixels();
        imgref::ImgRef::new_stride(
            pixels,
            self.width as usize,
            self.height as usize,
            self.stride / 4,
        )
    }

    /// Convert to an owned [`imgref::ImgVec`] of RGBA8 pixels.
    #[cfg(feature = "imgref")]
    pub fn to_imgvec(&self) -> imgref::ImgVec<RGBA8> {
        let pixels: &[RGBA8] = self.pixels.as_pixels();
        imgref::ImgVec::new_stride(
            pixels.to_vec(),
            self.width as usize,
            self.height as usize,
            self.stride / 4,
        )
    }

    /// Build a raster from typed RGBA8 pixels.
    #[cfg(feature = "imgref")]
    pub fn from_imgref(img: imgref::ImgRef<'_, RGBA8>) -> Result<Self, QdError> {
        let mut out = Raster::new(img.width() as u32, img.height() as u32)?;
        for (y, row) in img.rows().enumerate() {
            for (x, px) in row.iter().enumerate() {
                out.set_pixel(x, y, *px);
            }
        }
        Ok(out)
    }
}
