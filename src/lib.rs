//! # zenpict
//!
//! Decoder and encoder for classic Macintosh QuickDraw and QuickTime
//! raster images.
//!
//! Every decoder takes the bytes of one resource (or a `PICT` file) and
//! produces an RGBA8 [`Raster`]. Resource containers are out of scope:
//! sibling resources such as icon masks and color tables are fetched
//! through a caller-supplied [`ResourceLookup`].
//!
//! ## Supported Formats
//!
//! ### Pictures
//! - **PICT** version 1 and 2 (with or without the 512-byte file header):
//!   clipping, origin, `BitsRect`/`PackBitsRect`/`DirectBitsRect` at 1 to 32
//!   bits, and QuickTime-compressed images
//!
//! ### Resources
//! - **cicn**, **ppat**, **crsr**, **CURS**
//! - the icon family: **ICON**, **ICN#**, **ics#**, **icm#**, **icl4**,
//!   **icl8**, **ics4**, **ics8**, **icm4**, **icm8**, plus **SICN**
//! - **PAT** and **PAT#** patterns, **pxm#** Appearance pixmap lists
//!
//! ### QuickTime
//! - image descriptions (alone or in QTIF files) compressed with `rle `,
//!   `smc `, `rpza`, `8BPS`, `raw ` or `qdrw`
//! - other compressors through the `image` crate (`platform` feature)
//!
//! ## Non-Goals
//!
//! - Resource fork parsing
//! - Vector drawing operations (lines, text, regions as shapes)
//! - Animated or multi-frame QuickTime
//!
//! ## Usage
//!
//! ```
//! use zenpict::{PictReader, Raster, encode_picture};
//!
//! let raster = Raster::from_rgba(2, 2, vec![
//!     255, 0, 0, 255,   0, 255, 0, 255,
//!     0, 0, 255, 255,   255, 255, 255, 255,
//! ])?;
//! let pict = encode_picture(&raster)?;
//!
//! let mut reader = PictReader::new(&pict);
//! let decoded = reader.decode()?;
//! assert_eq!(decoded, raster);
//! println!("{}", reader.format());
//! # Ok::<(), zenpict::QdError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod binary;
mod color;
mod decode;
mod encode;
mod error;
mod geometry;
mod limits;
mod lookup;
mod packbits;
mod pict;
mod quicktime;
mod raster;
mod resources;

pub mod pixmap;

// Re-exports
pub use binary::{BinaryReader, BinaryWriter};
pub use color::ColorTable;
pub use decode::{DecodeRequest, ResourceKind};
pub use encode::EncodeRequest;
pub use error::QdError;
pub use geometry::{Point, Rect};
pub use limits::Limits;
pub use lookup::{FourCC, NoLookup, ResourceLookup};
pub use packbits::{pack_bits, unpack_bits_slice};
pub use pict::{PictEncoding, PictFormat, PictReader, encode_picture};
pub use pixmap::{PackType, PixMap};
pub use quicktime::ImageDescription;
pub use raster::Raster;
pub use resources::cursor::hot_spot;
pub use resources::icons::dimensions as icon_dimensions;
