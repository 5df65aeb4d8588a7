//! Variable-length integer codec used for every embedded count and index.
//!
//! A 32-bit value is written in 1, 3, or 5 bytes, always the minimal form
//! that represents the value unsigned:
//!
//! - `0x00..=0x7F` — one byte, the value itself (high bit clear).
//! - up to 16 bits — marker `0x80`, then the value big-endian in two bytes.
//! - otherwise — marker `0x81`, then the value big-endian in four bytes.
//!
//! No other marker bytes are ever produced; any other marker on decode is a
//! fatal format error.

use crate::ir::error::IrError;

/// Marker byte for the three-byte (16-bit) form.
const MARKER_U16: u8 = 0x80;
/// Marker byte for the five-byte (32-bit) form.
const MARKER_U32: u8 = 0x81;

/// Appends the minimal varint encoding of `value` to `buf`.
pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let bits = value as u32;
    if bits <= 0x7F {
        buf.push(bits as u8);
    } else if bits <= 0xFFFF {
        buf.push(MARKER_U16);
        buf.push((bits >> 8) as u8);
        buf.push(bits as u8);
    } else {
        buf.push(MARKER_U32);
        buf.push((bits >> 24) as u8);
        buf.push((bits >> 16) as u8);
        buf.push((bits >> 8) as u8);
        buf.push(bits as u8);
    }
}

/// Returns the encoded length in bytes for `value` without writing it.
pub fn varint_len(value: i32) -> usize {
    let bits = value as u32;
    if bits <= 0x7F {
        1
    } else if bits <= 0xFFFF {
        3
    } else {
        5
    }
}

/// Reads one byte at `pos`, reporting truncation as `UnexpectedEnd`.
fn read_u8(bytes: &[u8], pos: usize) -> Result<u8, IrError> {
    bytes
        .get(pos)
        .copied()
        .ok_or_else(|| IrError::unexpected_end(pos, "byte expected inside varint"))
}

/// Decodes a varint at `pos`, returning the value and the cursor after it.
pub fn read_varint(bytes: &[u8], pos: usize) -> Result<(i32, usize), IrError> {
    let marker = read_u8(bytes, pos)?;
    if marker < 0x80 {
        return Ok((marker as i32, pos + 1));
    }
    match marker {
        MARKER_U16 => {
            let hi = read_u8(bytes, pos + 1)?;
            let lo = read_u8(bytes, pos + 2)?;
            Ok((((hi as u32) << 8 | lo as u32) as i32, pos + 3))
        }
        MARKER_U32 => {
            let b0 = read_u8(bytes, pos + 1)?;
            let b1 = read_u8(bytes, pos + 2)?;
            let b2 = read_u8(bytes, pos + 3)?;
            let b3 = read_u8(bytes, pos + 4)?;
            let bits =
                (b0 as u32) << 24 | (b1 as u32) << 16 | (b2 as u32) << 8 | b3 as u32;
            Ok((bits as i32, pos + 5))
        }
        other => Err(IrError::invalid_varint(pos, other)),
    }
}
