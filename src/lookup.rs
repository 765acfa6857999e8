//! Access to sibling resources needed during decode.

use alloc::vec::Vec;

/// A four-character resource type code such as `*b"clut"`.
pub type FourCC = [u8; 4];

/// Fetches auxiliary resources from the file being decoded: the monochrome
/// mask paired with a color icon, or a `clut` named by an image description.
pub trait ResourceLookup {
    fn find_resource(&self, kind: FourCC, id: i16) -> Option<Vec<u8>>;
}

/// A lookup that never finds anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLookup;

impl ResourceLookup for NoLookup {
    fn find_resource(&self, _kind: FourCC, _id: i16) -> Option<Vec<u8>> {
        None
    }
}

impl<F> ResourceLookup for F
where
    F: Fn(FourCC, i16) -> Option<Vec<u8>>,
{
    fn find_resource(&self, kind: FourCC, id: i16) -> Option<Vec<u8>> {
        self(kind, id)
    }
}

/// Render a fourCC for messages, replacing non-printable bytes.
pub(crate) fn fourcc_str(code: FourCC) -> alloc::string::String {
    code.iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
        .collect()
}
