//! 1-bit-per-pixel thumbnails stored as packed scanlines.

use std::io::{Read, Seek, Write};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{CodecError, Result};
use crate::format::Geometry;

/// A monochrome raster. Pixel `x` of a scanline is bit `x % 8` of byte `x / 8`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawBitmap"))]
pub struct ThumbnailBitmap {
    geometry: Geometry,
    data: Vec<u8>,
}

/// Unchecked serde form; the data length is validated on conversion.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawBitmap {
    geometry: Geometry,
    data: Vec<u8>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawBitmap> for ThumbnailBitmap {
    type Error = CodecError;

    fn try_from(raw: RawBitmap) -> Result<Self> {
        Self::from_bytes(raw.geometry, raw.data)
    }
}

impl ThumbnailBitmap {
    /// All-clear bitmap of the given class.
    #[must_use]
    pub fn blank(geometry: Geometry) -> Self {
        Self {
            geometry,
            data: vec![0; geometry.byte_len()],
        }
    }

    /// Wrap raw scanline bytes; `data` must be exactly `stride * height` long.
    pub fn from_bytes(geometry: Geometry, data: Vec<u8>) -> Result<Self> {
        if data.len() != geometry.byte_len() {
            return Err(CodecError::InconsistentLength {
                field: "bitmap bytes",
                expected: geometry.byte_len(),
                found: data.len(),
                offset: 0,
            });
        }
        Ok(Self { geometry, data })
    }

    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.geometry.stride * 8
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.geometry.height
    }

    #[must_use]
    pub fn scanline(&self, y: usize) -> &[u8] {
        let stride = self.geometry.stride;
        &self.data[y * stride..(y + 1) * stride]
    }

    /// Pixel value; coordinates outside the raster read as clear.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if x >= self.width() || y >= self.height() {
            return false;
        }
        (self.scanline(y)[x / 8] >> (x % 8)) & 1 == 1
    }

    /// Set or clear a pixel; coordinates outside the raster are ignored.
    pub fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        if x >= self.width() || y >= self.height() {
            return;
        }
        let byte = &mut self.data[y * self.geometry.stride + x / 8];
        let mask = 1u8 << (x % 8);
        if on {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    pub fn decode<R: Read + Seek>(r: &mut ByteReader<R>, geometry: Geometry) -> Result<Self> {
        let data = r.read_bytes(geometry.byte_len())?;
        Ok(Self { geometry, data })
    }

    /// Write the scanlines. Fails if this bitmap is not of the `expected` class.
    pub fn encode<W: Write + Seek>(&self, w: &mut ByteWriter<W>, expected: Geometry) -> Result<()> {
        if self.geometry != expected || self.data.len() != expected.byte_len() {
            return Err(CodecError::InconsistentLength {
                field: "bitmap bytes",
                expected: expected.byte_len(),
                found: self.data.len(),
                offset: w.offset(),
            });
        }
        w.write_bytes(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::THREAD_BITMAP;

    #[test]
    fn pixels_are_lsb_first() {
        let mut bmp = ThumbnailBitmap::blank(THREAD_BITMAP);
        bmp.set_pixel(0, 0, true);
        bmp.set_pixel(9, 0, true);
        bmp.set_pixel(47, 23, true);
        assert_eq!(bmp.scanline(0), &[0x01, 0x02, 0, 0, 0, 0]);
        assert_eq!(bmp.scanline(23)[5], 0x80);
        assert!(bmp.pixel(9, 0));
        assert!(!bmp.pixel(8, 0));
        assert!(!bmp.pixel(48, 0));
        bmp.set_pixel(9, 0, false);
        assert!(!bmp.pixel(9, 0));
    }

    #[test]
    fn from_bytes_checks_length() {
        assert!(ThumbnailBitmap::from_bytes(THREAD_BITMAP, vec![0; 10]).is_err());
        assert!(ThumbnailBitmap::from_bytes(THREAD_BITMAP, vec![0; 144]).is_ok());
    }
}
