//! Decode requests and the per-call context threaded through every decoder.

use crate::error::QdError;
use crate::limits::Limits;
use crate::lookup::{FourCC, NoLookup, ResourceLookup, fourcc_str};
use crate::raster::Raster;
use crate::resources::{cicn, cursor, icons, pattern, ppat, pxm};
use crate::{pict, quicktime};

/// How deep `qdrw` pictures may nest inside QuickTime inside pictures.
const MAX_NESTING: u8 = 4;

// ── ResourceKind ────────────────────────────────────────────────────

/// The resource types this crate reads, keyed by their type code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ResourceKind {
    /// `PICT`
    Pict,
    /// `cicn` color icon
    ColorIcon,
    /// `ppat` pixel pattern
    PixelPattern,
    /// `crsr` color cursor
    ColorCursor,
    /// `CURS` monochrome cursor
    Cursor,
    /// `ICON` 32x32 1-bit icon
    Icon,
    /// `ICN#` 32x32 icon and mask
    IconList,
    /// `ics#` 16x16 icon and mask
    SmallIconList,
    /// `icm#` 16x12 icon and mask
    MiniIconList,
    /// `icl4`
    LargeIcon4,
    /// `icl8`
    LargeIcon8,
    /// `ics4`
    SmallIcon4,
    /// `ics8`
    SmallIcon8,
    /// `icm4`
    MiniIcon4,
    /// `icm8`
    MiniIcon8,
    /// `SICN` list of 16x16 1-bit icons
    SmallIconSet,
    /// `PAT ` 8x8 1-bit pattern
    Pattern,
    /// `PAT#` pattern list
    PatternList,
    /// `pxm#` Appearance pixmap list
    PixmapList,
    /// A QuickTime image description immediately followed by its data.
    QuickTimeImage,
    /// A QuickTime Image File (`idsc` and `idat` atoms).
    QuickTimeFile,
}

impl ResourceKind {
    const CODES: [(FourCC, ResourceKind); 21] = [
        (*b"PICT", Self::Pict),
        (*b"cicn", Self::ColorIcon),
        (*b"ppat", Self::PixelPattern),
        (*b"crsr", Self::ColorCursor),
        (*b"CURS", Self::Cursor),
        (*b"ICON", Self::Icon),
        (*b"ICN#", Self::IconList),
        (*b"ics#", Self::SmallIconList),
        (*b"icm#", Self::MiniIconList),
        (*b"icl4", Self::LargeIcon4),
        (*b"icl8", Self::LargeIcon8),
        (*b"ics4", Self::SmallIcon4),
        (*b"ics8", Self::SmallIcon8),
        (*b"icm4", Self::MiniIcon4),
        (*b"icm8", Self::MiniIcon8),
        (*b"SICN", Self::SmallIconSet),
        (*b"PAT ", Self::Pattern),
        (*b"PAT#", Self::PatternList),
        (*b"pxm#", Self::PixmapList),
        (*b"idsc", Self::QuickTimeImage),
        (*b"qtif", Self::QuickTimeFile),
    ];

    /// Look up a kind by resource type code.
    pub fn from_code(code: FourCC) -> Option<Self> {
        Self::CODES.iter().find(|(c, _)| *c == code).map(|&(_, k)| k)
    }

    /// The resource type code. QuickTime images use `idsc`, QTIF files
    /// `qtif`.
    pub fn code(self) -> FourCC {
        Self::CODES
            .iter()
            .find(|(_, k)| *k == self)
            .map_or(*b"????", |&(c, _)| c)
    }

    /// Whether [`crate::EncodeRequest`] can write this kind.
    pub fn can_encode(self) -> bool {
        !matches!(
            self,
            Self::SmallIconSet
                | Self::PatternList
                | Self::PixmapList
                | Self::QuickTimeImage
                | Self::QuickTimeFile
        )
    }
}

// ── DecodeContext ───────────────────────────────────────────────────

/// Limits, resource lookup and nesting depth for one decode call.
#[derive(Clone, Copy)]
pub(crate) struct DecodeContext<'a> {
    limits: Option<&'a Limits>,
    lookup: &'a dyn ResourceLookup,
    nesting: u8,
}

impl Default for DecodeContext<'_> {
    fn default() -> Self {
        Self::new(None, &NoLookup)
    }
}

impl<'a> DecodeContext<'a> {
    pub(crate) fn new(limits: Option<&'a Limits>, lookup: &'a dyn ResourceLookup) -> Self {
        Self {
            limits,
            lookup,
            nesting: 0,
        }
    }

    /// Check output dimensions against the limits.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), QdError> {
        match self.limits {
            Some(limits) => limits.check(width, height),
            None => Ok(()),
        }
    }

    /// A transparent raster, after checking limits.
    pub(crate) fn raster(&self, width: u32, height: u32) -> Result<Raster, QdError> {
        self.check(width, height)?;
        Raster::new(width, height)
    }

    pub(crate) fn lookup(&self) -> &'a dyn ResourceLookup {
        self.lookup
    }

    /// Context for a picture embedded in another image.
    pub(crate) fn nested(&self) -> Result<Self, QdError> {
        if self.nesting >= MAX_NESTING {
            return Err(QdError::invalid(alloc::format!(
                "pictures nested more than {MAX_NESTING} deep"
            )));
        }
        Ok(Self {
            nesting: self.nesting + 1,
            ..*self
        })
    }
}

// ── DecodeRequest ───────────────────────────────────────────────────

/// Decode one resource into an RGBA raster.
///
/// ```
/// use zenpict::{DecodeRequest, Limits, ResourceKind};
///
/// let limits = Limits { max_pixels: Some(1 << 20), ..Default::default() };
/// let pattern = [0xAAu8, 0x55, 0xAA, 0x55, 0xAA, 0x55, 0xAA, 0x55];
/// let raster = DecodeRequest::new(ResourceKind::Pattern, &pattern)
///     .with_limits(&limits)
///     .decode()?;
/// assert_eq!((raster.width, raster.height), (8, 8));
/// # Ok::<(), zenpict::QdError>(())
/// ```
#[derive(Clone, Copy)]
pub struct DecodeRequest<'a> {
    kind: ResourceKind,
    data: &'a [u8],
    id: i16,
    limits: Option<&'a Limits>,
    lookup: &'a dyn ResourceLookup,
}

impl<'a> DecodeRequest<'a> {
    pub fn new(kind: ResourceKind, data: &'a [u8]) -> Self {
        Self {
            kind,
            data,
            id: 0,
            limits: None,
            lookup: &NoLookup,
        }
    }

    /// The resource id, used to find sibling resources such as the mask of
    /// a color icon.
    pub fn with_id(mut self, id: i16) -> Self {
        self.id = id;
        self
    }

    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Source for `clut` and icon mask resources.
    pub fn with_lookup(mut self, lookup: &'a dyn ResourceLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn decode(&self) -> Result<Raster, QdError> {
        let ctx = DecodeContext::new(self.limits, self.lookup);
        log::debug!(
            "decoding '{}' #{} ({} bytes)",
            fourcc_str(self.kind.code()),
            self.id,
            self.data.len()
        );
        let data = self.data;
        match self.kind {
            ResourceKind::Pict => pict::decode_nested(data, &ctx),
            ResourceKind::ColorIcon => cicn::decode(data, &ctx),
            ResourceKind::PixelPattern => ppat::decode(data, &ctx),
            ResourceKind::ColorCursor => cursor::decode_color(data, &ctx),
            ResourceKind::Cursor => cursor::decode_mono(data, &ctx),
            ResourceKind::Icon
            | ResourceKind::IconList
            | ResourceKind::SmallIconList
            | ResourceKind::MiniIconList
            | ResourceKind::LargeIcon4
            | ResourceKind::LargeIcon8
            | ResourceKind::SmallIcon4
            | ResourceKind::SmallIcon8
            | ResourceKind::MiniIcon4
            | ResourceKind::MiniIcon8 => icons::decode(self.kind, data, self.id, &ctx),
            ResourceKind::SmallIconSet => icons::decode_small_icon_set(data, &ctx),
            ResourceKind::Pattern => pattern::decode(data, &ctx),
            ResourceKind::PatternList => pattern::decode_list(data, &ctx),
            ResourceKind::PixmapList => pxm::decode(data, &ctx),
            ResourceKind::QuickTimeImage => quicktime::decode_described(data, &ctx),
            ResourceKind::QuickTimeFile => quicktime::decode_qtif(data, &ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for (code, kind) in ResourceKind::CODES {
            assert_eq!(ResourceKind::from_code(code), Some(kind));
            assert_eq!(kind.code(), code);
        }
        assert_eq!(ResourceKind::from_code(*b"snd "), None);
    }

    #[test]
    fn nesting_is_bounded() {
        let mut ctx = DecodeContext::default();
        for _ in 0..MAX_NESTING {
            ctx = ctx.nested().unwrap();
        }
        assert!(ctx.nested().is_err());
    }

    #[test]
    fn limits_apply_before_allocation() {
        let limits = Limits {
            max_width: Some(4),
            ..Default::default()
        };
        let ctx = DecodeContext::new(Some(&limits), &NoLookup);
        assert!(ctx.raster(4, 100).is_ok());
        assert!(matches!(ctx.raster(5, 1), Err(QdError::LimitExceeded(_))));
    }
}
