//! Encode requests: write a raster back as one of the supported resources.

use alloc::vec::Vec;

use crate::decode::ResourceKind;
use crate::error::QdError;
use crate::geometry::Point;
use crate::lookup::fourcc_str;
use crate::pict;
use crate::raster::Raster;
use crate::resources::{cicn, cursor, icons, pattern, ppat};

/// Encode a raster as a resource of the given kind.
///
/// ```
/// use zenpict::{DecodeRequest, EncodeRequest, Raster, ResourceKind};
///
/// let raster = Raster::from_rgba(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255])?;
/// let bytes = EncodeRequest::new(ResourceKind::ColorIcon).encode(&raster)?;
/// let back = DecodeRequest::new(ResourceKind::ColorIcon, &bytes).decode()?;
/// assert_eq!(back, raster);
/// # Ok::<(), zenpict::QdError>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct EncodeRequest {
    kind: ResourceKind,
    hot_spot: Point,
}

impl EncodeRequest {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            hot_spot: Point::new(0, 0),
        }
    }

    /// Hot spot of a cursor, `(0, 0)` by default.
    pub fn with_hot_spot(mut self, hot_spot: Point) -> Self {
        self.hot_spot = hot_spot;
        self
    }

    pub fn encode(&self, raster: &Raster) -> Result<Vec<u8>, QdError> {
        log::debug!(
            "encoding {}x{} image as '{}'",
            raster.width,
            raster.height,
            fourcc_str(self.kind.code())
        );
        match self.kind {
            ResourceKind::Pict => pict::encode_picture(raster),
            ResourceKind::ColorIcon => cicn::encode(raster),
            ResourceKind::PixelPattern => ppat::encode(raster),
            ResourceKind::ColorCursor => cursor::encode_color(raster, self.hot_spot),
            ResourceKind::Cursor => cursor::encode_mono(raster, self.hot_spot),
            ResourceKind::Pattern => pattern::encode(raster),
            ResourceKind::Icon
            | ResourceKind::IconList
            | ResourceKind::SmallIconList
            | ResourceKind::MiniIconList
            | ResourceKind::LargeIcon4
            | ResourceKind::LargeIcon8
            | ResourceKind::SmallIcon4
            | ResourceKind::SmallIcon8
            | ResourceKind::MiniIcon4
            | ResourceKind::MiniIcon8 => icons::encode(self.kind, raster),
            kind => Err(QdError::unsupported(alloc::format!(
                "encoding '{}' resources",
                fourcc_str(kind.code())
            ))),
        }
    }
}
