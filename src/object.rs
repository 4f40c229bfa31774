//! Design objects and the closed registry of their stored type names.
//!
//! Every object starts with a common header, then the type name that selects how the
//! rest of the object is decoded. Only names in [`KNOWN_VARIANTS`] are accepted.

use std::io::{Read, Seek, Write};

use tracing::trace;

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{CodecError, Result};
use crate::format::{BLOCK_CONTINUATION, END_MARKER};

/// Object variants the codec understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    StitchSegment,
}

/// Stored type name → variant.
pub const KNOWN_VARIANTS: &[(&str, ObjectKind)] = &[("CSewSeg", ObjectKind::StitchSegment)];

impl ObjectKind {
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        KNOWN_VARIANTS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, kind)| *kind)
    }

    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::StitchSegment => "CSewSeg",
        }
    }
}

/// Placement and size fields shared by every object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectHeader {
    pub extents1: [i16; 4],
    pub extents2: [i16; 4],
    /// 2×3 affine matrix.
    pub transform: [f32; 6],
    pub unknown_after_transform: [u8; 2],
    pub x_translation: i16,
    pub y_translation: i16,
    pub width: i16,
    pub height: i16,
    pub unknown_after_size: [u8; 8],
}

impl Default for ObjectHeader {
    fn default() -> Self {
        Self {
            extents1: [0; 4],
            extents2: [0; 4],
            transform: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            unknown_after_transform: [0; 2],
            x_translation: 0,
            y_translation: 0,
            width: 0,
            height: 0,
            unknown_after_size: [0; 8],
        }
    }
}

/// Run of stitches of one type and thread, in absolute coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StitchBlock {
    pub stitch_type: u16,
    pub thread_index: u16,
    pub points: Vec<[i16; 2]>,
}

/// Block at which a thread takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorEntry {
    pub block_index: u16,
    pub thread_index: u16,
}

/// The `CSewSeg` object: stitch blocks plus their colour list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StitchSegment {
    pub header: ObjectHeader,
    pub blocks: Vec<StitchBlock>,
    pub colors: Vec<ColorEntry>,
    /// Trailing bytes after the colour list, kept verbatim. `8 + 8 * colors.len()` long.
    pub epilogue: Vec<u8>,
}

impl StitchSegment {
    /// Segment with the epilogue files are observed to carry: two zero words, then a
    /// `(0, i)` pair of u32 per colour entry.
    #[must_use]
    pub fn new(header: ObjectHeader, blocks: Vec<StitchBlock>, colors: Vec<ColorEntry>) -> Self {
        let mut epilogue = vec![0u8; 8];
        for i in 0..colors.len() as u32 {
            epilogue.extend_from_slice(&0u32.to_le_bytes());
            epilogue.extend_from_slice(&i.to_le_bytes());
        }
        Self {
            header,
            blocks,
            colors,
            epilogue,
        }
    }

    fn epilogue_len(n_colors: usize) -> usize {
        8 + 8 * n_colors
    }

    fn decode_body<R: Read + Seek>(
        r: &mut ByteReader<R>,
        header: ObjectHeader,
        n_blocks: usize,
    ) -> Result<Self> {
        let mut blocks = Vec::with_capacity(n_blocks);
        for i in 0..n_blocks {
            let stitch_type = r.read_u16()?;
            let thread_index = r.read_u16()?;
            let n_points = usize::from(r.read_u16()?);
            let mut points = Vec::with_capacity(n_points);
            for _ in 0..n_points {
                points.push(r.read_i16_array::<2>()?);
            }
            blocks.push(StitchBlock {
                stitch_type,
                thread_index,
                points,
            });
            if i + 1 < n_blocks {
                r.expect_u16(BLOCK_CONTINUATION, "block continuation code")?;
            }
        }

        let n_colors = usize::from(r.read_u16()?);
        let mut colors = Vec::with_capacity(n_colors);
        for _ in 0..n_colors {
            colors.push(ColorEntry {
                block_index: r.read_u16()?,
                thread_index: r.read_u16()?,
            });
        }
        let epilogue = r.read_bytes(Self::epilogue_len(n_colors))?;
        trace!(n_blocks, n_colors, "decoded stitch segment");
        Ok(Self {
            header,
            blocks,
            colors,
            epilogue,
        })
    }

    fn encode_body<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        for (i, block) in self.blocks.iter().enumerate() {
            w.write_u16(block.stitch_type)?;
            w.write_u16(block.thread_index)?;
            w.write_u16(count_u16("stitch block points", block.points.len(), w.offset())?)?;
            for point in &block.points {
                w.write_i16_slice(point)?;
            }
            if i + 1 < self.blocks.len() {
                w.write_u16(BLOCK_CONTINUATION)?;
            }
        }

        w.write_u16(count_u16("colour list", self.colors.len(), w.offset())?)?;
        for color in &self.colors {
            w.write_u16(color.block_index)?;
            w.write_u16(color.thread_index)?;
        }
        let expected = Self::epilogue_len(self.colors.len());
        if self.epilogue.len() != expected {
            return Err(CodecError::InconsistentLength {
                field: "stitch segment epilogue",
                expected,
                found: self.epilogue.len(),
                offset: w.offset(),
            });
        }
        w.write_bytes(&self.epilogue)
    }
}

/// A design object, its variant chosen by the type name stored in the file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DesignObject {
    StitchSegment(StitchSegment),
}

impl DesignObject {
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::StitchSegment(_) => ObjectKind::StitchSegment,
        }
    }

    #[must_use]
    pub fn header(&self) -> &ObjectHeader {
        match self {
            Self::StitchSegment(seg) => &seg.header,
        }
    }

    fn body_count(&self) -> usize {
        match self {
            Self::StitchSegment(seg) => seg.blocks.len(),
        }
    }

    pub fn decode<R: Read + Seek>(r: &mut ByteReader<R>) -> Result<Self> {
        let header = ObjectHeader {
            extents1: r.read_i16_array()?,
            extents2: r.read_i16_array()?,
            transform: r.read_f32_array()?,
            unknown_after_transform: r.read_array()?,
            x_translation: r.read_i16()?,
            y_translation: r.read_i16()?,
            width: r.read_i16()?,
            height: r.read_i16()?,
            unknown_after_size: r.read_array()?,
        };
        let n_blocks = usize::from(r.read_u16()?);
        r.expect_u32(END_MARKER, "object header end marker")?;

        let name_at = r.offset();
        let name = r.read_utf8_u16("object type name")?;
        match ObjectKind::from_type_name(&name) {
            Some(ObjectKind::StitchSegment) => Ok(Self::StitchSegment(StitchSegment::decode_body(
                r, header, n_blocks,
            )?)),
            None => Err(CodecError::UnsupportedVariant {
                name,
                offset: name_at,
            }),
        }
    }

    pub fn encode<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        let h = self.header();
        w.write_i16_slice(&h.extents1)?;
        w.write_i16_slice(&h.extents2)?;
        w.write_f32_slice(&h.transform)?;
        w.write_bytes(&h.unknown_after_transform)?;
        w.write_i16(h.x_translation)?;
        w.write_i16(h.y_translation)?;
        w.write_i16(h.width)?;
        w.write_i16(h.height)?;
        w.write_bytes(&h.unknown_after_size)?;
        w.write_u16(count_u16("object block count", self.body_count(), w.offset())?)?;
        w.write_u32(END_MARKER)?;
        w.write_utf8_u16(self.kind().type_name(), "object type name")?;
        match self {
            Self::StitchSegment(seg) => seg.encode_body(w),
        }
    }
}

fn count_u16(field: &'static str, n: usize, offset: u64) -> Result<u16> {
    u16::try_from(n).map_err(|_| CodecError::overflow(field, n as u64, offset))
}
