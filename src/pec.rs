//! PEC machine sub-document.
//!
//! A machine document is split on disk: its prologue (header, full thread index
//! table, stitch layers, header thumbnails) is contiguous, but its redundant index
//! table, thread bitmaps, thread colours and thread specifications are written in
//! separate passes after every co-resident prologue. The per-pass methods here are
//! driven in order by [`crate::batch::PecBatch`].

use std::io::{Read, Seek, Write};

use tracing::{debug, trace};

use crate::bitmap::ThumbnailBitmap;
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{CodecError, Result};
use crate::format::{
    Geometry, FULL_INDEX_LEN, HEADER_THUMBNAIL, INDEX_PADDING, PEC_LABEL_LEN, PEC_LABEL_MARKER,
    PEC_LABEL_TERMINATOR, REDUNDANT_INDEX_LEN, THREAD_BITMAP,
};
use crate::stitch::{self, Instruction, Layer};

/// Thread colour as stored in a machine document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn decode<R: Read + Seek>(r: &mut ByteReader<R>) -> Result<Self> {
        let [red, green, blue] = r.read_array()?;
        Ok(Self::new(red, green, blue))
    }

    pub fn encode<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        w.write_bytes(&[self.r, self.g, self.b])
    }
}

/// Thread type and catalogue code, one per layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThreadSpec {
    pub kind: u8,
    pub code: u16,
}

/// Layer-ordinal to colour-ordinal mapping.
///
/// Always [`FULL_INDEX_LEN`] bytes; only the first `n_layers` entries are meaningful,
/// the rest is padding kept verbatim. The on-disk redundant table is the first
/// [`REDUNDANT_INDEX_LEN`] bytes of this one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawIndexTable"))]
pub struct ThreadIndexTable {
    entries: Vec<u8>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawIndexTable {
    entries: Vec<u8>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawIndexTable> for ThreadIndexTable {
    type Error = CodecError;

    fn try_from(raw: RawIndexTable) -> Result<Self> {
        if raw.entries.len() != FULL_INDEX_LEN {
            return Err(CodecError::InconsistentLength {
                field: "thread index table",
                expected: FULL_INDEX_LEN,
                found: raw.entries.len(),
                offset: 0,
            });
        }
        Ok(Self {
            entries: raw.entries,
        })
    }
}

impl ThreadIndexTable {
    /// Table mapping layer `i` to `layer_colors[i]`, space-padded.
    pub fn new(layer_colors: &[u8]) -> Result<Self> {
        if layer_colors.len() > FULL_INDEX_LEN {
            return Err(CodecError::overflow(
                "thread index table",
                layer_colors.len() as u64,
                0,
            ));
        }
        let mut entries = layer_colors.to_vec();
        entries.resize(FULL_INDEX_LEN, INDEX_PADDING);
        Ok(Self { entries })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.entries
    }

    /// Colour ordinal of a layer.
    #[must_use]
    pub fn color_for_layer(&self, layer: usize) -> Option<u8> {
        self.entries.get(layer).copied()
    }

    /// The redundant copy: a length-bounded prefix of the full table.
    #[must_use]
    pub fn redundant(&self) -> &[u8] {
        &self.entries[..REDUNDANT_INDEX_LEN.min(self.entries.len())]
    }
}

/// One embedded machine document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineDocument {
    /// Fixed 16-character label, padding included.
    pub label: String,
    pub unknown_after_label: [u8; 14],
    /// Geometry of the header thumbnails.
    pub thumbnail_geometry: Geometry,
    pub unknown_after_geometry: [u8; 2],
    pub hoop_position: [i8; 2],
    pub unknown_after_hoop: [u8; 8],
    pub index_table: ThreadIndexTable,
    pub unknown_before_offset: [u8; 2],
    pub unknown_after_offset: [u8; 3],
    pub width: u16,
    pub height: u16,
    pub unknown_width: u16,
    pub unknown_height: u16,
    pub layers: Vec<Layer>,
    /// Overall thumbnail followed by one per layer.
    pub thumbnails: Vec<ThumbnailBitmap>,
    pub thread_bitmaps: Vec<ThumbnailBitmap>,
    pub thread_colors: Vec<Rgb>,
    pub thread_specs: Vec<ThreadSpec>,
}

impl MachineDocument {
    /// Build a document from its layers and one colour per layer.
    ///
    /// Layer `i` maps to colour `i`; thumbnails and bitmaps start blank and the design
    /// extent is computed from the stitch deltas.
    pub fn new(label: &str, layers: Vec<Layer>, thread_colors: Vec<Rgb>) -> Result<Self> {
        if layers.is_empty() || layers.len() != thread_colors.len() {
            return Err(CodecError::InconsistentLength {
                field: "thread colours",
                expected: layers.len(),
                found: thread_colors.len(),
                offset: 0,
            });
        }
        let n = layers.len();
        let ordinals: Vec<u8> = (0..n)
            .map(|i| u8::try_from(i).map_err(|_| CodecError::overflow("layer count", n as u64, 0)))
            .collect::<Result<_>>()?;
        let (width, height) = design_extent(&layers);
        Ok(Self {
            label: label.to_string(),
            unknown_after_label: [0x20; 14],
            thumbnail_geometry: HEADER_THUMBNAIL,
            unknown_after_geometry: [0; 2],
            hoop_position: [0; 2],
            unknown_after_hoop: [0; 8],
            index_table: ThreadIndexTable::new(&ordinals)?,
            unknown_before_offset: [0; 2],
            unknown_after_offset: [0; 3],
            width,
            height,
            unknown_width: width,
            unknown_height: height,
            layers,
            thumbnails: vec![ThumbnailBitmap::blank(HEADER_THUMBNAIL); n + 1],
            thread_bitmaps: vec![ThumbnailBitmap::blank(THREAD_BITMAP); n],
            thread_colors,
            thread_specs: vec![ThreadSpec::default(); n],
        })
    }

    /// Number of layers, which is one more than the number of colour changes.
    #[must_use]
    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    /// Colour of each layer, resolved through the index table.
    #[must_use]
    pub fn layer_colors(&self) -> Vec<Option<Rgb>> {
        (0..self.n_layers())
            .map(|i| {
                self.index_table
                    .color_for_layer(i)
                    .and_then(|c| self.thread_colors.get(usize::from(c)).copied())
            })
            .collect()
    }

    fn n_changes(&self, offset: u64) -> Result<u8> {
        let n = self.n_layers();
        if n == 0 {
            return Err(CodecError::InconsistentLength {
                field: "layers",
                expected: 1,
                found: 0,
                offset,
            });
        }
        u8::try_from(n - 1)
            .map_err(|_| CodecError::overflow("colour changes", (n - 1) as u64, offset))
    }

    fn check_len(field: &'static str, expected: usize, found: usize, offset: u64) -> Result<()> {
        if expected != found {
            return Err(CodecError::InconsistentLength {
                field,
                expected,
                found,
                offset,
            });
        }
        Ok(())
    }

    /// Check the per-layer tables agree in length before anything is written.
    pub(crate) fn validate(&self, offset: u64) -> Result<()> {
        let n = self.n_layers();
        self.n_changes(offset)?;
        Self::check_len("thumbnails", n + 1, self.thumbnails.len(), offset)?;
        Self::check_len("thread bitmaps", n, self.thread_bitmaps.len(), offset)?;
        Self::check_len("thread colours", n, self.thread_colors.len(), offset)?;
        Self::check_len("thread specifications", n, self.thread_specs.len(), offset)?;
        Self::check_len(
            "thread index table",
            FULL_INDEX_LEN,
            self.index_table.entries.len(),
            offset,
        )
    }

    /// Pass 1: header, index table, layers and header thumbnails.
    pub fn decode_prologue<R: Read + Seek>(r: &mut ByteReader<R>) -> Result<Self> {
        let start = r.offset();
        r.expect_bytes(&PEC_LABEL_MARKER, "PEC label marker")?;
        let label = r.read_text(PEC_LABEL_LEN)?;
        r.expect_bytes(&[PEC_LABEL_TERMINATOR], "PEC label terminator")?;
        let unknown_after_label = r.read_array()?;
        let stride = r.read_u8()?;
        let rows = r.read_u8()?;
        let thumbnail_geometry = Geometry::new(usize::from(stride), usize::from(rows));
        let unknown_after_geometry = r.read_array()?;
        let hoop_position = [r.read_i8()?, r.read_i8()?];
        let unknown_after_hoop = r.read_array()?;

        let n_layers = usize::from(r.read_u8()?) + 1;
        let index_table = ThreadIndexTable {
            entries: r.read_bytes(FULL_INDEX_LEN)?,
        };
        let index_end = r.offset();

        let unknown_before_offset = r.read_array()?;
        let stored_offset = u64::from(r.read_u24()?);
        let unknown_after_offset = r.read_array()?;
        let width = r.read_u16()?;
        let height = r.read_u16()?;
        let unknown_width = r.read_u16()?;
        let unknown_height = r.read_u16()?;

        let mut layers = Vec::with_capacity(n_layers);
        for i in 0..n_layers {
            let layer = stitch::decode_layer(r)?;
            trace!(layer = i, instructions = layer.len(), "decoded layer");
            layers.push(layer);
        }

        let computed = r.offset() - index_end;
        if computed != stored_offset {
            return Err(CodecError::OffsetInconsistency {
                section: "PEC thumbnail",
                stored: stored_offset,
                computed,
                offset: r.offset(),
            });
        }

        let thumbnails = (0..=n_layers)
            .map(|_| ThumbnailBitmap::decode(r, thumbnail_geometry))
            .collect::<Result<Vec<_>>>()?;

        debug!(start, n_layers, width, height, "decoded PEC prologue");
        Ok(Self {
            label,
            unknown_after_label,
            thumbnail_geometry,
            unknown_after_geometry,
            hoop_position,
            unknown_after_hoop,
            index_table,
            unknown_before_offset,
            unknown_after_offset,
            width,
            height,
            unknown_width,
            unknown_height,
            layers,
            thumbnails,
            thread_bitmaps: Vec::new(),
            thread_colors: Vec::new(),
            thread_specs: Vec::new(),
        })
    }

    /// Pass 1 inverse. The thumbnail offset is recomputed from the bytes written.
    pub fn encode_prologue<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        let start = w.offset();
        self.validate(start)?;
        let n_changes = self.n_changes(start)?;
        let Geometry { stride, height } = self.thumbnail_geometry;
        let stride = u8::try_from(stride)
            .map_err(|_| CodecError::overflow("thumbnail stride", stride as u64, start))?;
        let rows = u8::try_from(height)
            .map_err(|_| CodecError::overflow("thumbnail height", height as u64, start))?;

        w.write_bytes(&PEC_LABEL_MARKER)?;
        w.write_text(&self.label, PEC_LABEL_LEN, "PEC label")?;
        w.write_u8(PEC_LABEL_TERMINATOR)?;
        w.write_bytes(&self.unknown_after_label)?;
        w.write_u8(stride)?;
        w.write_u8(rows)?;
        w.write_bytes(&self.unknown_after_geometry)?;
        w.write_i8(self.hoop_position[0])?;
        w.write_i8(self.hoop_position[1])?;
        w.write_bytes(&self.unknown_after_hoop)?;

        w.write_u8(n_changes)?;
        w.write_bytes(self.index_table.as_bytes())?;
        let index_end = w.offset();

        w.write_bytes(&self.unknown_before_offset)?;
        let offset_at = w.offset();
        w.write_u24(0, "PEC thumbnail offset")?;
        w.write_bytes(&self.unknown_after_offset)?;
        w.write_u16(self.width)?;
        w.write_u16(self.height)?;
        w.write_u16(self.unknown_width)?;
        w.write_u16(self.unknown_height)?;

        for layer in &self.layers {
            stitch::encode_layer(w, layer)?;
        }

        let thumbnail_offset = w.offset() - index_end;
        let thumbnail_offset = u32::try_from(thumbnail_offset)
            .map_err(|_| CodecError::overflow("PEC thumbnail offset", thumbnail_offset, offset_at))?;
        w.patch_u24(offset_at, thumbnail_offset, "PEC thumbnail offset")?;

        for thumb in &self.thumbnails {
            thumb.encode(w, self.thumbnail_geometry)?;
        }
        debug!(start, n_layers = self.n_layers(), thumbnail_offset, "encoded PEC prologue");
        Ok(())
    }

    /// Pass 2: colour-change count again, then the first 127 index entries.
    pub fn decode_redundant_indexes<R: Read + Seek>(&self, r: &mut ByteReader<R>) -> Result<()> {
        let offset = r.offset();
        if r.read_u8()? != self.n_changes(offset)? {
            return Err(CodecError::malformed("redundant colour change count", offset));
        }
        let table_at = r.offset();
        if r.read_bytes(REDUNDANT_INDEX_LEN)? != self.index_table.redundant() {
            return Err(CodecError::IndexTableMismatch { offset: table_at });
        }
        Ok(())
    }

    pub fn encode_redundant_indexes<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        w.write_u8(self.n_changes(w.offset())?)?;
        w.write_bytes(self.index_table.redundant())
    }

    /// Pass 3: one 6×24 bitmap per layer.
    pub fn decode_thread_bitmaps<R: Read + Seek>(&mut self, r: &mut ByteReader<R>) -> Result<()> {
        self.thread_bitmaps = (0..self.n_layers())
            .map(|_| ThumbnailBitmap::decode(r, THREAD_BITMAP))
            .collect::<Result<_>>()?;
        Ok(())
    }

    pub fn encode_thread_bitmaps<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        self.thread_bitmaps
            .iter()
            .try_for_each(|bmp| bmp.encode(w, THREAD_BITMAP))
    }

    /// Pass 4: one rgb triple per layer.
    pub fn decode_thread_colors<R: Read + Seek>(&mut self, r: &mut ByteReader<R>) -> Result<()> {
        self.thread_colors = (0..self.n_layers())
            .map(|_| Rgb::decode(r))
            .collect::<Result<_>>()?;
        Ok(())
    }

    pub fn encode_thread_colors<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        self.thread_colors.iter().try_for_each(|c| c.encode(w))
    }

    /// Pass 6: thread type and code per layer.
    pub fn decode_thread_specs<R: Read + Seek>(&mut self, r: &mut ByteReader<R>) -> Result<()> {
        let mut specs = Vec::with_capacity(self.n_layers());
        for _ in 0..self.n_layers() {
            specs.push(ThreadSpec {
                kind: r.read_u8()?,
                code: r.read_u16()?,
            });
        }
        self.thread_specs = specs;
        Ok(())
    }

    pub fn encode_thread_specs<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        for spec in &self.thread_specs {
            w.write_u8(spec.kind)?;
            w.write_u16(spec.code)?;
        }
        Ok(())
    }
}

/// Width and height of the box swept by the movement deltas, saturated to u16.
fn design_extent(layers: &[Layer]) -> (u16, u16) {
    let (mut x, mut y) = (0i32, 0i32);
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (0i32, 0i32, 0i32, 0i32);
    for ins in layers.iter().flatten() {
        let (dx, dy) = match *ins {
            Instruction::Stitch { dx, dy }
            | Instruction::Jump { dx, dy }
            | Instruction::Trim { dx, dy } => (dx, dy),
            Instruction::ColorChange(_) | Instruction::Stop => continue,
        };
        x += i32::from(dx);
        y += i32::from(dy);
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    let clamp = |v: i32| u16::try_from(v).unwrap_or(u16::MAX);
    (clamp(max_x - min_x), clamp(max_y - min_y))
}
