//! Sequential big-endian byte reader and writer.
//!
//! Every resource layout handled by this crate is big-endian (68k byte
//! order). The reader fails with [`QdError::InsufficientData`] instead of
//! padding short input, so a truncated resource always aborts the decode.

use alloc::vec::Vec;
use core::marker::PhantomData;

use crate::error::QdError;

/// Byte order override for [`BinaryReader::read_endian`] and
/// [`BinaryWriter::write_endian`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// Fixed-width integers the cursor can read and write.
pub trait Int: Copy {
    const SIZE: usize;
    fn from_bytes(bytes: &[u8], endian: Endian) -> Self;
    fn put_bytes(self, out: &mut [u8], endian: Endian);
}

macro_rules! impl_int {
    ($($t:ty),*) => {$(
        impl Int for $t {
            const SIZE: usize = core::mem::size_of::<$t>();

            #[inline]
            fn from_bytes(bytes: &[u8], endian: Endian) -> Self {
                let mut buf = [0u8; core::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..Self::SIZE]);
                match endian {
                    Endian::Big => <$t>::from_be_bytes(buf),
                    Endian::Little => <$t>::from_le_bytes(buf),
                }
            }

            #[inline]
            fn put_bytes(self, out: &mut [u8], endian: Endian) {
                let bytes = match endian {
                    Endian::Big => self.to_be_bytes(),
                    Endian::Little => self.to_le_bytes(),
                };
                out[..Self::SIZE].copy_from_slice(&bytes);
            }
        }
    )*};
}

impl_int!(u8, i8, u16, i16, u32, i32, u64, i64);

// ── Reader ──────────────────────────────────────────────────────────

/// Bounds-checked cursor over a borrowed byte slice.
#[derive(Clone, Debug)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The whole underlying buffer, independent of position.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the current position.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn require(&self, n: usize) -> Result<(), QdError> {
        if n > self.remaining() {
            return Err(QdError::InsufficientData {
                needed: n,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Read a big-endian integer.
    #[inline]
    pub fn read<T: Int>(&mut self) -> Result<T, QdError> {
        self.read_endian(Endian::Big)
    }

    /// Read an integer with an explicit byte order.
    pub fn read_endian<T: Int>(&mut self, endian: Endian) -> Result<T, QdError> {
        self.require(T::SIZE)?;
        let v = T::from_bytes(&self.data[self.pos..], endian);
        self.pos += T::SIZE;
        Ok(v)
    }

    pub fn peek_u8(&self) -> Result<u8, QdError> {
        self.require(1)?;
        Ok(self.data[self.pos])
    }

    pub fn peek_u16(&self) -> Result<u16, QdError> {
        self.require(2)?;
        Ok(u16::from_bytes(&self.data[self.pos..], Endian::Big))
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], QdError> {
        self.require(n)?;
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], QdError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    /// Borrow all bytes from the current position to the end.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    pub fn skip(&mut self, n: usize) -> Result<(), QdError> {
        self.require(n)?;
        self.pos += n;
        Ok(())
    }

    /// Move to an absolute offset. Seeking to the very end is allowed.
    pub fn seek(&mut self, pos: usize) -> Result<(), QdError> {
        if pos > self.data.len() {
            return Err(QdError::InsufficientData {
                needed: pos - self.pos.min(pos),
                remaining: self.remaining(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Advance to the next multiple of `n` (relative to the buffer start).
    pub fn align(&mut self, n: usize) -> Result<(), QdError> {
        let pad = (n - self.pos % n) % n;
        self.skip(pad)
    }

    /// Read a Pascal string (length byte followed by that many bytes).
    pub fn read_pstring(&mut self) -> Result<&'a [u8], QdError> {
        let len = self.read::<u8>()? as usize;
        self.read_bytes(len)
    }

    /// Read a fixed-capacity Pascal string field such as `Str31`, consuming
    /// `capacity + 1` bytes regardless of the stored length.
    pub fn read_pstring_fixed(&mut self, capacity: usize) -> Result<&'a [u8], QdError> {
        let field = self.read_bytes(capacity + 1)?;
        let len = (field[0] as usize).min(capacity);
        Ok(&field[1..1 + len])
    }

    /// A reader over the next `n` bytes; this reader skips past them.
    pub fn sub_reader(&mut self, n: usize) -> Result<BinaryReader<'a>, QdError> {
        Ok(BinaryReader::new(self.read_bytes(n)?))
    }
}

// ── Writer ──────────────────────────────────────────────────────────

/// Placeholder for a value that is written after the data following it.
#[must_use]
#[derive(Debug)]
pub struct Reservation<T> {
    offset: usize,
    _marker: PhantomData<T>,
}

/// Growable big-endian byte writer.
#[derive(Clone, Debug, Default)]
pub struct BinaryWriter {
    out: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
        }
    }

    pub fn position(&self) -> usize {
        self.out.len()
    }

    #[inline]
    pub fn write<T: Int>(&mut self, value: T) {
        self.write_endian(value, Endian::Big);
    }

    pub fn write_endian<T: Int>(&mut self, value: T, endian: Endian) {
        let start = self.out.len();
        self.out.resize(start + T::SIZE, 0);
        value.put_bytes(&mut self.out[start..], endian);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    pub fn write_zeros(&mut self, n: usize) {
        self.out.resize(self.out.len() + n, 0);
    }

    /// Zero-pad to the next multiple of `n`.
    pub fn align(&mut self, n: usize) {
        let pad = (n - self.out.len() % n) % n;
        self.write_zeros(pad);
    }

    /// Write a zeroed slot for a `T` to be filled in by [`Self::backfill`].
    pub fn reserve<T: Int>(&mut self) -> Reservation<T> {
        let offset = self.out.len();
        self.write_zeros(T::SIZE);
        Reservation {
            offset,
            _marker: PhantomData,
        }
    }

    pub fn backfill<T: Int>(&mut self, slot: Reservation<T>, value: T) {
        value.put_bytes(&mut self.out[slot.offset..], Endian::Big);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.out
    }
}
