//! Offset-tracking binary cursor: the scalar field codec every section is built on.
//!
//! `ByteReader` and `ByteWriter` wrap any `Read + Seek` / `Write + Seek` stream and
//! know the exact width and byte order of every primitive field in the format. They
//! are public so a diagnostic dumper can walk a file with the same field codecs
//! (`offset`, `seek`, `read_bytes`, `remaining`) instead of re-implementing them.

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use crate::error::{CodecError, Result};
use crate::format::TAGGED_STRING_MARKER;

/// Reading half of the scalar field codec.
pub struct ByteReader<R> {
    inner: R,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> ByteReader<R> {
    /// Wrap a stream, keeping its current position as the starting offset.
    pub fn new(mut inner: R) -> Result<Self> {
        let pos = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(pos))?;
        Ok(Self { inner, pos, len })
    }

    /// Absolute offset of the next byte to be read.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.pos
    }

    /// Bytes left between the current offset and the end of the stream.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    /// Move to an absolute offset. Seeking past the end is a truncation error.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.len {
            return Err(CodecError::TruncatedInput { offset });
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.pos;
        if (buf.len() as u64) > self.remaining() {
            return Err(CodecError::TruncatedInput { offset: start });
        }
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                CodecError::TruncatedInput { offset: start }
            } else {
                CodecError::Io(e)
            }
        })?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if (n as u64) > self.remaining() {
            return Err(CodecError::TruncatedInput { offset: self.pos });
        }
        let mut buf = vec![0u8; n];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    /// Read a fixed-size opaque blob.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    /// Read `literal.len()` bytes and fail unless they equal `literal`.
    pub fn expect_bytes(&mut self, literal: &[u8], what: &'static str) -> Result<()> {
        let offset = self.pos;
        let found = self.read_bytes(literal.len())?;
        if found != literal {
            return Err(CodecError::malformed(what, offset));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    /// Three-byte little-endian unsigned integer.
    pub fn read_u24(&mut self) -> Result<u32> {
        let [b0, b1, b2] = self.read_array()?;
        Ok(u32::from_le_bytes([b0, b1, b2, 0]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Read a u32 and fail unless it equals `literal`.
    pub fn expect_u32(&mut self, literal: u32, what: &'static str) -> Result<()> {
        let offset = self.pos;
        if self.read_u32()? != literal {
            return Err(CodecError::malformed(what, offset));
        }
        Ok(())
    }

    /// Read a u16 and fail unless it equals `literal`.
    pub fn expect_u16(&mut self, literal: u16, what: &'static str) -> Result<()> {
        let offset = self.pos;
        if self.read_u16()? != literal {
            return Err(CodecError::malformed(what, offset));
        }
        Ok(())
    }

    /// Two-byte boolean. Only 0 and 1 are accepted so the value re-encodes exactly.
    pub fn read_bool16(&mut self, what: &'static str) -> Result<bool> {
        let offset = self.pos;
        match self.read_u16()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::malformed(what, offset)),
        }
    }

    pub fn read_i16_array<const N: usize>(&mut self) -> Result<[i16; N]> {
        let mut out = [0i16; N];
        for v in &mut out {
            *v = self.read_i16()?;
        }
        Ok(out)
    }

    pub fn read_f32_array<const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut out = [0f32; N];
        for v in &mut out {
            *v = self.read_f32()?;
        }
        Ok(out)
    }

    /// Fixed-length Latin-1 text.
    pub fn read_text(&mut self, len: usize) -> Result<String> {
        Ok(self.read_bytes(len)?.into_iter().map(char::from).collect())
    }

    /// UTF-8 text with a one-byte length prefix.
    pub fn read_utf8(&mut self, field: &'static str) -> Result<String> {
        let len = self.read_u8()? as usize;
        self.read_utf8_body(len, field)
    }

    /// UTF-8 text with a two-byte length prefix (object type names and tags).
    pub fn read_utf8_u16(&mut self, field: &'static str) -> Result<String> {
        let len = self.read_u16()? as usize;
        self.read_utf8_body(len, field)
    }

    fn read_utf8_body(&mut self, len: usize, field: &'static str) -> Result<String> {
        let offset = self.pos;
        String::from_utf8(self.read_bytes(len)?)
            .map_err(|_| CodecError::InvalidText { field, offset })
    }

    /// Tagged string: `FF FE FF` marker, unit count, UTF-16LE code units.
    pub fn read_tagged(&mut self, field: &'static str) -> Result<String> {
        let offset = self.pos;
        if self.read_u24()? != TAGGED_STRING_MARKER {
            return Err(CodecError::malformed("tagged string marker", offset));
        }
        let count = self.read_u8()? as usize;
        let body = self.pos;
        let mut units = Vec::with_capacity(count);
        for _ in 0..count {
            units.push(self.read_u16()?);
        }
        String::from_utf16(&units).map_err(|_| CodecError::InvalidText {
            field,
            offset: body,
        })
    }
}

/// Writing half of the scalar field codec.
pub struct ByteWriter<W> {
    inner: W,
    pos: u64,
}

impl<W: Write + Seek> ByteWriter<W> {
    /// Wrap a stream, keeping its current position as the starting offset.
    pub fn new(mut inner: W) -> Result<Self> {
        let pos = inner.stream_position()?;
        Ok(Self { inner, pos })
    }

    /// Absolute offset of the next byte to be written.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.pos
    }

    /// Flush and hand back the underlying stream.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.pos += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_bytes(&[v])
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u16_be(&mut self, v: u16) -> Result<()> {
        self.write_bytes(&v.to_be_bytes())
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Three-byte little-endian unsigned integer; values of 2^24 and above are rejected.
    pub fn write_u24(&mut self, v: u32, field: &'static str) -> Result<()> {
        if v > 0x00FF_FFFF {
            return Err(CodecError::overflow(field, u64::from(v), self.pos));
        }
        let b = v.to_le_bytes();
        self.write_bytes(&b[..3])
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_bool16(&mut self, v: bool) -> Result<()> {
        self.write_u16(u16::from(v))
    }

    pub fn write_i16_slice(&mut self, values: &[i16]) -> Result<()> {
        values.iter().try_for_each(|v| self.write_i16(*v))
    }

    pub fn write_f32_slice(&mut self, values: &[f32]) -> Result<()> {
        values.iter().try_for_each(|v| self.write_f32(*v))
    }

    /// Write `len`-byte Latin-1 text, space-padded.
    pub fn write_text(&mut self, value: &str, len: usize, field: &'static str) -> Result<()> {
        let mut bytes = Vec::with_capacity(len);
        for c in value.chars() {
            let b = u8::try_from(u32::from(c)).map_err(|_| CodecError::InvalidText {
                field,
                offset: self.pos,
            })?;
            bytes.push(b);
        }
        if bytes.len() > len {
            return Err(CodecError::overflow(field, bytes.len() as u64, self.pos));
        }
        bytes.resize(len, b' ');
        self.write_bytes(&bytes)
    }

    /// UTF-8 text with a one-byte length prefix.
    pub fn write_utf8(&mut self, value: &str, field: &'static str) -> Result<()> {
        let len = u8::try_from(value.len())
            .map_err(|_| CodecError::overflow(field, value.len() as u64, self.pos))?;
        self.write_u8(len)?;
        self.write_bytes(value.as_bytes())
    }

    /// UTF-8 text with a two-byte length prefix.
    pub fn write_utf8_u16(&mut self, value: &str, field: &'static str) -> Result<()> {
        let len = u16::try_from(value.len())
            .map_err(|_| CodecError::overflow(field, value.len() as u64, self.pos))?;
        self.write_u16(len)?;
        self.write_bytes(value.as_bytes())
    }

    /// Tagged string: `FF FE FF` marker, unit count, UTF-16LE code units.
    pub fn write_tagged(&mut self, value: &str, field: &'static str) -> Result<()> {
        let units: Vec<u16> = value.encode_utf16().collect();
        let count = u8::try_from(units.len())
            .map_err(|_| CodecError::overflow(field, units.len() as u64, self.pos))?;
        self.write_u24(TAGGED_STRING_MARKER, field)?;
        self.write_u8(count)?;
        units.iter().try_for_each(|u| self.write_u16(*u))
    }

    /// Overwrite a previously reserved u24 at `at`, then return to the write position.
    pub fn patch_u24(&mut self, at: u64, v: u32, field: &'static str) -> Result<()> {
        if v > 0x00FF_FFFF {
            return Err(CodecError::overflow(field, u64::from(v), at));
        }
        self.patch(at, &v.to_le_bytes()[..3])
    }

    /// Overwrite a previously reserved u32 at `at`, then return to the write position.
    pub fn patch_u32(&mut self, at: u64, v: u32) -> Result<()> {
        self.patch(at, &v.to_le_bytes())
    }

    fn patch(&mut self, at: u64, bytes: &[u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(at))?;
        self.inner.write_all(bytes)?;
        self.inner.seek(SeekFrom::Start(self.pos))?;
        Ok(())
    }
}
