//! Variable-length signed coordinate words.
//!
//! A coordinate is either one byte (bit 7 clear, 7-bit two's complement, class 0) or a
//! big-endian two-byte word with bit 15 set, a 3-bit class in bits 14..12 and a 12-bit
//! two's complement value. `0xFF` ends a layer. The word `0xFEB0` (class 7, low bits
//! `0xEB0`) is not a coordinate: it introduces a colour change.

use std::io::{Read, Seek, Write};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{CodecError, Result};
use crate::format::STOP_BYTE;

/// Smallest value a coordinate may carry.
pub const MIN_VALUE: i16 = -1024;
/// Largest value a coordinate may carry.
pub const MAX_VALUE: i16 = 1023;

const SHORT_MIN: i16 = -64;
const SHORT_MAX: i16 = 63;
const LONG_FLAG: u16 = 0x8000;
const COLOR_CLASS: u8 = 7;
const COLOR_LOW_BITS: u16 = 0x0EB0;

/// One decoded coordinate word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordWord {
    /// The `0xFF` end-of-sequence byte.
    End,
    /// The reserved class-7 pattern that introduces a colour change.
    ColorMarker,
    Value { class: u8, value: i16 },
}

fn sign_extend(raw: u16, bits: u32) -> i16 {
    let shift = 16 - bits;
    ((raw << shift) as i16) >> shift
}

/// Decode one coordinate word.
pub fn decode<R: Read + Seek>(r: &mut ByteReader<R>) -> Result<CoordWord> {
    let offset = r.offset();
    let b1 = r.read_u8()?;
    if b1 == STOP_BYTE {
        return Ok(CoordWord::End);
    }
    if b1 & 0x80 == 0 {
        return Ok(CoordWord::Value {
            class: 0,
            value: sign_extend(u16::from(b1), 7),
        });
    }
    let b2 = r.read_u8()?;
    let word = u16::from_be_bytes([b1, b2]);
    let class = ((word >> 12) & 0x7) as u8;
    let low = word & 0x0FFF;
    if class == COLOR_CLASS && low == COLOR_LOW_BITS {
        return Ok(CoordWord::ColorMarker);
    }
    let value = sign_extend(low, 12);
    if !(MIN_VALUE..=MAX_VALUE).contains(&value) {
        return Err(CodecError::InvalidCoordinateRange {
            class,
            value: i32::from(value),
            offset,
        });
    }
    Ok(CoordWord::Value { class, value })
}

/// Encode one coordinate. The short form is used only for class 0 values in [-64, 63].
///
/// Fails on values outside [-1024, 1023], classes above 7, the reserved colour-change
/// pattern, and class-7 words whose first byte would read back as the end marker.
pub fn encode<W: Write + Seek>(w: &mut ByteWriter<W>, class: u8, value: i16) -> Result<()> {
    let offset = w.offset();
    let invalid = || CodecError::InvalidCoordinateRange {
        class,
        value: i32::from(value),
        offset,
    };
    if class > COLOR_CLASS || !(MIN_VALUE..=MAX_VALUE).contains(&value) {
        return Err(invalid());
    }
    if class == 0 && (SHORT_MIN..=SHORT_MAX).contains(&value) {
        return w.write_u8((value as u8) & 0x7F);
    }
    let low = (value as u16) & 0x0FFF;
    let word = LONG_FLAG | (u16::from(class) << 12) | low;
    if class == COLOR_CLASS && (low == COLOR_LOW_BITS || word >> 8 == u16::from(STOP_BYTE)) {
        return Err(invalid());
    }
    w.write_u16_be(word)
}
