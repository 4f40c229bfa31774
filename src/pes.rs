//! PES v6 design document: header, thread catalogue, design objects and the
//! embedded machine-document batch.

use std::io::{Read, Seek, Write};

use tracing::debug;

use crate::batch::PecBatch;
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{CodecError, Result};
use crate::format::{END_MARKER, OBJECT_LIST_TAG, PES_MAGIC, PES_V6_VERSION};
use crate::object::DesignObject;
use crate::thread::Thread;

/// Header metadata of a design document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesignHeader {
    /// Two-character hoop size code.
    pub hoop_size: String,
    pub name: String,
    pub category: String,
    pub author: String,
    pub keywords: String,
    pub comments: String,
    pub optimize_hoop_change: bool,
    pub custom_design_page: bool,
    pub hoop_width: u16,
    pub hoop_height: u16,
    pub design_page_area: u16,
    pub design_width: u16,
    pub design_height: u16,
    pub section_width: u16,
    pub section_height: u16,
    pub unknown_after_section: [u8; 2],
    pub background_color: u16,
    pub foreground_color: u16,
    pub show_grid: bool,
    pub with_axes: bool,
    pub snap_to_grid: bool,
    pub grid_interval: u16,
    pub unknown_after_grid: [u8; 2],
    pub optimize_entry_exit_points: bool,
    pub from_image: String,
    pub transform: [f32; 6],
}

impl Default for DesignHeader {
    fn default() -> Self {
        Self {
            hoop_size: "00".to_string(),
            name: String::new(),
            category: String::new(),
            author: String::new(),
            keywords: String::new(),
            comments: String::new(),
            optimize_hoop_change: false,
            custom_design_page: false,
            hoop_width: 100,
            hoop_height: 100,
            design_page_area: 0,
            design_width: 100,
            design_height: 100,
            section_width: 100,
            section_height: 100,
            unknown_after_section: [0; 2],
            background_color: 0,
            foreground_color: 0,
            show_grid: false,
            with_axes: false,
            snap_to_grid: false,
            grid_interval: 15,
            unknown_after_grid: [0; 2],
            optimize_entry_exit_points: false,
            from_image: String::new(),
            transform: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        }
    }
}

impl DesignHeader {
    fn decode<R: Read + Seek>(r: &mut ByteReader<R>) -> Result<Self> {
        Ok(Self {
            hoop_size: r.read_text(2)?,
            name: r.read_utf8("design name")?,
            category: r.read_utf8("design category")?,
            author: r.read_utf8("design author")?,
            keywords: r.read_utf8("design keywords")?,
            comments: r.read_utf8("design comments")?,
            optimize_hoop_change: r.read_bool16("optimize hoop change")?,
            custom_design_page: r.read_bool16("custom design page")?,
            hoop_width: r.read_u16()?,
            hoop_height: r.read_u16()?,
            design_page_area: r.read_u16()?,
            design_width: r.read_u16()?,
            design_height: r.read_u16()?,
            section_width: r.read_u16()?,
            section_height: r.read_u16()?,
            unknown_after_section: r.read_array()?,
            background_color: r.read_u16()?,
            foreground_color: r.read_u16()?,
            show_grid: r.read_bool16("show grid")?,
            with_axes: r.read_bool16("with axes")?,
            snap_to_grid: r.read_bool16("snap to grid")?,
            grid_interval: r.read_u16()?,
            unknown_after_grid: r.read_array()?,
            optimize_entry_exit_points: r.read_bool16("optimize entry/exit points")?,
            from_image: r.read_utf8("from image")?,
            transform: r.read_f32_array()?,
        })
    }

    fn encode<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        w.write_text(&self.hoop_size, 2, "hoop size")?;
        w.write_utf8(&self.name, "design name")?;
        w.write_utf8(&self.category, "design category")?;
        w.write_utf8(&self.author, "design author")?;
        w.write_utf8(&self.keywords, "design keywords")?;
        w.write_utf8(&self.comments, "design comments")?;
        w.write_bool16(self.optimize_hoop_change)?;
        w.write_bool16(self.custom_design_page)?;
        w.write_u16(self.hoop_width)?;
        w.write_u16(self.hoop_height)?;
        w.write_u16(self.design_page_area)?;
        w.write_u16(self.design_width)?;
        w.write_u16(self.design_height)?;
        w.write_u16(self.section_width)?;
        w.write_u16(self.section_height)?;
        w.write_bytes(&self.unknown_after_section)?;
        w.write_u16(self.background_color)?;
        w.write_u16(self.foreground_color)?;
        w.write_bool16(self.show_grid)?;
        w.write_bool16(self.with_axes)?;
        w.write_bool16(self.snap_to_grid)?;
        w.write_u16(self.grid_interval)?;
        w.write_bytes(&self.unknown_after_grid)?;
        w.write_bool16(self.optimize_entry_exit_points)?;
        w.write_utf8(&self.from_image, "from image")?;
        w.write_f32_slice(&self.transform)
    }
}

/// A complete PES v6 design.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesignDocument {
    pub header: DesignHeader,
    pub threads: Vec<Thread>,
    pub objects: Vec<DesignObject>,
    /// Bytes between the last object and the embedded batch, kept verbatim.
    pub gap: Vec<u8>,
    pub batch: PecBatch,
    /// Bytes after the batch, kept verbatim.
    pub trailing: Vec<u8>,
}

/// Position of the stored embedded-batch offset, relative to the version literal.
pub const EMBEDDED_OFFSET_FIELD: u64 = 8;

const PATTERN_COUNT_FIELDS: [&str; 3] = [
    "fill pattern count",
    "motif pattern count",
    "feather pattern count",
];

impl DesignDocument {
    #[must_use]
    pub fn new(
        header: DesignHeader,
        threads: Vec<Thread>,
        objects: Vec<DesignObject>,
        batch: PecBatch,
    ) -> Self {
        Self {
            header,
            threads,
            objects,
            gap: Vec::new(),
            batch,
            trailing: Vec::new(),
        }
    }

    pub fn decode<R: Read + Seek>(r: &mut ByteReader<R>) -> Result<Self> {
        let start = r.offset();
        let version: [u8; 8] = r.read_array()?;
        if version != PES_V6_VERSION {
            return Err(if version[..4] == PES_MAGIC {
                CodecError::UnsupportedVersion {
                    version: String::from_utf8_lossy(&version).into_owned(),
                    offset: start,
                }
            } else {
                CodecError::malformed("PES version literal", start)
            });
        }

        let embedded_offset = u64::from(r.read_u32()?);
        let batch_at = start + embedded_offset;
        let n_pecs = usize::from(r.read_u16()?);
        let header = DesignHeader::decode(r)?;
        for field in PATTERN_COUNT_FIELDS {
            r.expect_u16(0, field)?;
        }

        let n_threads = usize::from(r.read_u16()?);
        let threads = (0..n_threads)
            .map(|_| Thread::decode(r))
            .collect::<Result<Vec<_>>>()?;
        let n_objects = usize::from(r.read_u16()?);
        r.expect_u32(END_MARKER, "end of header marker")?;
        debug!(n_pecs, n_threads, n_objects, "decoded PES header");

        let tag_at = r.offset();
        if r.read_utf8_u16("object list tag")? != OBJECT_LIST_TAG {
            return Err(CodecError::malformed("object list tag", tag_at));
        }
        let objects = (0..n_objects)
            .map(|_| DesignObject::decode(r))
            .collect::<Result<Vec<_>>>()?;

        let objects_end = r.offset();
        if batch_at < objects_end {
            return Err(CodecError::OffsetInconsistency {
                section: "embedded PEC",
                stored: embedded_offset,
                computed: objects_end - start,
                offset: start + EMBEDDED_OFFSET_FIELD,
            });
        }
        let gap_len = usize::try_from(batch_at - objects_end)
            .map_err(|_| CodecError::TruncatedInput { offset: objects_end })?;
        let gap = r.read_bytes(gap_len)?;
        debug!(embedded_offset, gap = gap.len(), "resolved embedded PEC offset");

        let batch = PecBatch::decode(r, n_pecs)?;
        let trailing_len = usize::try_from(r.remaining())
            .map_err(|_| CodecError::TruncatedInput { offset: r.offset() })?;
        let trailing = r.read_bytes(trailing_len)?;
        Ok(Self {
            header,
            threads,
            objects,
            gap,
            batch,
            trailing,
        })
    }

    /// Encode the document. The embedded-batch offset is back-patched with the number
    /// of bytes written before the batch.
    pub fn encode<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        let start = w.offset();
        let n_pecs = u16::try_from(self.batch.documents.len())
            .map_err(|_| CodecError::overflow("PEC count", self.batch.documents.len() as u64, start))?;
        let n_threads = u16::try_from(self.threads.len())
            .map_err(|_| CodecError::overflow("thread count", self.threads.len() as u64, start))?;
        let n_objects = u16::try_from(self.objects.len())
            .map_err(|_| CodecError::overflow("object count", self.objects.len() as u64, start))?;

        w.write_bytes(&PES_V6_VERSION)?;
        let offset_at = w.offset();
        w.write_u32(0)?;
        w.write_u16(n_pecs)?;
        self.header.encode(w)?;
        for _ in PATTERN_COUNT_FIELDS {
            w.write_u16(0)?;
        }

        w.write_u16(n_threads)?;
        for thread in &self.threads {
            thread.encode(w)?;
        }
        w.write_u16(n_objects)?;
        w.write_u32(END_MARKER)?;

        w.write_utf8_u16(OBJECT_LIST_TAG, "object list tag")?;
        for object in &self.objects {
            object.encode(w)?;
        }
        w.write_bytes(&self.gap)?;

        let before_batch = w.offset() - start;
        let embedded_offset = u32::try_from(before_batch)
            .map_err(|_| CodecError::overflow("embedded PEC offset", before_batch, offset_at))?;
        w.patch_u32(offset_at, embedded_offset)?;
        debug!(embedded_offset, "encoding embedded PEC batch");

        self.batch.encode(w)?;
        w.write_bytes(&self.trailing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pec::{MachineDocument, Rgb};
    use crate::stitch::Instruction;
    use std::io::Cursor;

    fn design() -> DesignDocument {
        let machine = MachineDocument::new(
            "unit",
            vec![vec![Instruction::Stitch { dx: 1, dy: 2 }, Instruction::Stop]],
            vec![Rgb::new(10, 20, 30)],
        )
        .unwrap();
        DesignDocument::new(
            DesignHeader {
                name: "unit".into(),
                ..DesignHeader::default()
            },
            vec![Thread::default()],
            Vec::new(),
            PecBatch::new(vec![machine]),
        )
    }

    fn encode(doc: &DesignDocument) -> Vec<u8> {
        let mut w = ByteWriter::new(Cursor::new(Vec::new())).unwrap();
        doc.encode(&mut w).unwrap();
        w.finish().unwrap().into_inner()
    }

    fn stored_offset(bytes: &[u8]) -> usize {
        u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize
    }

    #[test]
    fn embedded_offset_points_at_batch() {
        let bytes = encode(&design());
        let at = stored_offset(&bytes);
        assert_eq!(&bytes[at..at + 3], b"LA:");
    }

    #[test]
    fn gap_moves_the_embedded_offset() {
        let plain = encode(&design());
        let mut doc = design();
        doc.gap = vec![0xEE; 5];
        let padded = encode(&doc);
        assert_eq!(stored_offset(&padded), stored_offset(&plain) + 5);

        let mut r = ByteReader::new(Cursor::new(padded)).unwrap();
        assert_eq!(DesignDocument::decode(&mut r).unwrap().gap, vec![0xEE; 5]);
    }

    #[test]
    fn nonzero_pattern_count_is_malformed() {
        let mut bytes = encode(&design());
        let mut r = ByteReader::new(Cursor::new(bytes.clone())).unwrap();
        r.seek(14).unwrap();
        DesignHeader::decode(&mut r).unwrap();
        let fill_at = r.offset() as usize;
        bytes[fill_at] = 1;
        let mut r = ByteReader::new(Cursor::new(bytes)).unwrap();
        match DesignDocument::decode(&mut r) {
            Err(CodecError::MalformedHeader { what, offset }) => {
                assert_eq!(what, "fill pattern count");
                assert_eq!(offset, fill_at as u64);
            }
            other => panic!("expected malformed header, got {other:?}"),
        }
    }

    #[test]
    fn embedded_offset_inside_objects_is_inconsistent() {
        let mut bytes = encode(&design());
        bytes[8..12].copy_from_slice(&4u32.to_le_bytes());
        let mut r = ByteReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            DesignDocument::decode(&mut r),
            Err(CodecError::OffsetInconsistency { stored: 4, .. })
        ));
    }

    #[test]
    fn embedded_offset_is_relative_to_document_start() {
        let plain = encode(&design());
        let mut out = Cursor::new(vec![0x55; 3]);
        out.set_position(3);
        let mut w = ByteWriter::new(out).unwrap();
        design().encode(&mut w).unwrap();
        let shifted = w.finish().unwrap().into_inner();
        assert_eq!(&shifted[3..], plain.as_slice());

        let mut stream = Cursor::new(shifted);
        stream.set_position(3);
        let mut r = ByteReader::new(stream).unwrap();
        let back = DesignDocument::decode(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
        assert_eq!(encode(&back), plain);
    }

    #[test]
    fn inconsistent_offset_is_reported_at_its_field() {
        let mut bytes = vec![0u8; 5];
        bytes.extend(encode(&design()));
        bytes[13..17].copy_from_slice(&4u32.to_le_bytes());
        let mut stream = Cursor::new(bytes);
        stream.set_position(5);
        let mut r = ByteReader::new(stream).unwrap();
        assert!(matches!(
            DesignDocument::decode(&mut r),
            Err(CodecError::OffsetInconsistency { stored: 4, offset: 13, .. })
        ));
    }

    #[test]
    fn other_pes_versions_are_unsupported() {
        let mut bytes = encode(&design());
        bytes[..8].copy_from_slice(b"#PES0001");
        let mut r = ByteReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            DesignDocument::decode(&mut r),
            Err(CodecError::UnsupportedVersion { ref version, offset: 0 }) if version == "#PES0001"
        ));
    }
}
