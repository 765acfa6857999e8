use alloc::string::String;

/// Errors from QuickDraw/QuickTime decoding and encoding.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QdError {
    #[error("insufficient data: need {needed} bytes, {remaining} remaining")]
    InsufficientData { needed: usize, remaining: usize },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("too many colors: {0} (max 256)")]
    TooManyColors(usize),

    #[error("image too big: {0}")]
    TooBig(String),

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("platform decoder failed: {0}")]
    Platform(String),
}

impl QdError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Whether this error was raised by an encoder because the image exceeds
    /// a hard limit of the target format.
    pub fn is_encode_limit(&self) -> bool {
        matches!(self, Self::TooManyColors(_) | Self::TooBig(_))
    }
}

#[cfg(feature = "platform")]
impl From<image::ImageError> for QdError {
    fn from(e: image::ImageError) -> Self {
        QdError::Platform(alloc::format!("{e}"))
    }
}
