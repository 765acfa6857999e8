//! PackBits run-length coding, parameterized by element width.
//!
//! A length byte `n` in `0..0x80` copies the next `n + 1` elements, `n >
//! 0x80` repeats the following element `257 - n` times, and `0x80` is a
//! no-op. Pixel maps use 1-byte elements, except 16-bit pixels (pack type 3)
//! which run over 2-byte words.

use alloc::vec::Vec;

use crate::binary::BinaryReader;
use crate::error::QdError;

/// Decode one PackBits stream until `out` is full.
///
/// Fails when the input runs out first or when a run would write past the
/// end of `out`. Trailing input after `out` is full is left unread.
pub fn unpack_bits(
    reader: &mut BinaryReader<'_>,
    out: &mut [u8],
    elem_width: usize,
) -> Result<(), QdError> {
    let mut pos = 0;
    while pos < out.len() {
        let n = reader.read::<u8>()?;
        match n {
            0x80 => {}
            0..0x80 => {
                let len = (usize::from(n) + 1) * elem_width;
                if pos + len > out.len() {
                    return Err(overrun(pos + len, out.len()));
                }
                out[pos..pos + len].copy_from_slice(reader.read_bytes(len)?);
                pos += len;
            }
            _ => {
                let count = 257 - usize::from(n);
                let len = count * elem_width;
                if pos + len > out.len() {
                    return Err(overrun(pos + len, out.len()));
                }
                let elem = reader.read_bytes(elem_width)?;
                for chunk in out[pos..pos + len].chunks_exact_mut(elem_width) {
                    chunk.copy_from_slice(elem);
                }
                pos += len;
            }
        }
    }
    Ok(())
}

/// Decode a PackBits buffer into `out_len` bytes.
pub fn unpack_bits_slice(input: &[u8], out_len: usize, elem_width: usize) -> Result<Vec<u8>, QdError> {
    let mut out = alloc::vec![0u8; out_len];
    unpack_bits(&mut BinaryReader::new(input), &mut out, elem_width)?;
    Ok(out)
}

fn overrun(wanted: usize, row: usize) -> QdError {
    QdError::invalid(alloc::format!(
        "PackBits run reaches {wanted} bytes in a {row}-byte row"
    ))
}

/// Encode one row. `row.len()` must be a multiple of `elem_width`.
pub fn pack_bits(row: &[u8], elem_width: usize) -> Vec<u8> {
    debug_assert_eq!(row.len() % elem_width, 0);
    let n = row.len() / elem_width;
    let elem = |i: usize| &row[i * elem_width..(i + 1) * elem_width];
    let run_at = |i: usize| {
        let mut run = 1;
        while i + run < n && run < 128 && elem(i + run) == elem(i) {
            run += 1;
        }
        run
    };

    let mut out = Vec::with_capacity(row.len() + row.len() / 64 + 2);
    let mut i = 0;
    while i < n {
        let run = run_at(i);
        if run >= 3 || (run == 2 && i + 2 == n) {
            out.push((257 - run) as u8);
            out.extend_from_slice(elem(i));
            i += run;
            continue;
        }
        let start = i;
        while i < n && i - start < 128 {
            if i + 2 < n && run_at(i) >= 3 {
                break;
            }
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&row[start * elem_width..i * elem_width]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_run() {
        let out = unpack_bits_slice(&[0x02, 0x11, 0x22, 0x33], 3, 1).unwrap();
        assert_eq!(out, [0x11, 0x22, 0x33]);
    }

    #[test]
    fn repeat_run() {
        let out = unpack_bits_slice(&[0xFF, 0x7F], 2, 1).unwrap();
        assert_eq!(out, [0x7F, 0x7F]);
    }

    #[test]
    fn noop_is_skipped() {
        let out = unpack_bits_slice(&[0x80, 0x00, 0xEE], 1, 1).unwrap();
        assert_eq!(out, [0xEE]);
    }

    #[test]
    fn word_elements() {
        let out = unpack_bits_slice(&[0xFE, 0x12, 0x34, 0x00, 0xAB, 0xCD], 8, 2).unwrap();
        assert_eq!(out, [0x12, 0x34, 0x12, 0x34, 0x12, 0x34, 0xAB, 0xCD]);
    }

    #[test]
    fn run_past_row_end_fails() {
        // 0x81 asks for 128 copies in a 4-byte row.
        assert!(unpack_bits_slice(&[0x81, 0x00], 4, 1).is_err());
        // Literal of 5 into a 4-byte row.
        assert!(unpack_bits_slice(&[0x04, 1, 2, 3, 4, 5], 4, 1).is_err());
    }

    #[test]
    fn truncated_input_fails() {
        assert!(unpack_bits_slice(&[0x03, 1, 2], 4, 1).is_err());
        assert!(unpack_bits_slice(&[], 1, 1).is_err());
    }

    fn roundtrip(row: &[u8], w: usize) {
        let packed = pack_bits(row, w);
        assert_eq!(unpack_bits_slice(&packed, row.len(), w).unwrap(), row);
    }

    #[test]
    fn pack_roundtrip_bytes() {
        roundtrip(&[7u8; 300], 1);
        roundtrip(&(0..=255u8).collect::<Vec<_>>(), 1);
        let mut mixed = Vec::new();
        for i in 0..40u8 {
            mixed.extend_from_slice(&[i, i, i, i, i.wrapping_mul(3), i.wrapping_add(1)]);
        }
        roundtrip(&mixed, 1);
        roundtrip(&[1, 1], 1);
        roundtrip(&[1, 2, 2], 1);
    }

    #[test]
    fn pack_roundtrip_words() {
        roundtrip(&[0xAB, 0xCD].repeat(200), 2);
        let distinct: Vec<u8> = (0..200u16).flat_map(|v| v.to_be_bytes()).collect();
        roundtrip(&distinct, 2);
        let mut mixed = Vec::new();
        for i in 0..50u16 {
            for _ in 0..(i % 5) + 1 {
                mixed.extend_from_slice(&i.to_be_bytes());
            }
        }
        roundtrip(&mixed, 2);
    }

    #[test]
    fn all_same_packs_small() {
        assert_eq!(pack_bits(&[5u8; 128], 1), [0x81, 5]);
    }
}
