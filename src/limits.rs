/// Resource limits for decode operations.
///
/// All fields default to `None` (no limit).
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height).
    pub max_pixels: Option<u64>,
    /// Maximum memory bytes for the output raster.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// Check raster dimensions and the RGBA8 allocation they imply.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), crate::QdError> {
        if let Some(max_w) = self.max_width {
            if u64::from(width) > max_w {
                return Err(crate::QdError::LimitExceeded(alloc::format!(
                    "width {width} exceeds limit {max_w}"
                )));
            }
        }
        if let Some(max_h) = self.max_height {
            if u64::from(height) > max_h {
                return Err(crate::QdError::LimitExceeded(alloc::format!(
                    "height {height} exceeds limit {max_h}"
                )));
            }
        }
        let pixels = u64::from(width) * u64::from(height);
        if let Some(max_px) = self.max_pixels {
            if pixels > max_px {
                return Err(crate::QdError::LimitExceeded(alloc::format!(
                    "pixel count {pixels} exceeds limit {max_px}"
                )));
            }
        }
        if let Some(max_mem) = self.max_memory_bytes {
            let bytes = pixels * 4;
            if bytes > max_mem {
                return Err(crate::QdError::LimitExceeded(alloc::format!(
                    "raster of {bytes} bytes exceeds memory limit {max_mem}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unlimited() {
        assert!(Limits::default().check(u16::MAX as u32, u16::MAX as u32).is_ok());
    }

    #[test]
    fn memory_limit_counts_rgba_bytes() {
        let limits = Limits {
            max_memory_bytes: Some(64),
            ..Default::default()
        };
        assert!(limits.check(4, 4).is_ok());
        assert!(limits.check(5, 4).is_err());
    }
}
