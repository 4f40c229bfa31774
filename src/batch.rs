//! Fixed-order pass orchestrator over co-resident machine documents.
//!
//! Layout of a batch of N documents:
//! 1. N prologues
//! 2. N redundant index tables
//! 3. N thread bitmap tables
//! 4. N thread colour tables
//! 5. one shared section-thumbnail block, present only if its count is nonzero
//! 6. N thread specification tables
//!
//! The passes always run sequentially against one cursor.

use std::io::{Read, Seek, Write};

use tracing::debug;

use crate::bitmap::ThumbnailBitmap;
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{CodecError, Result};
use crate::format::{
    FULL_THUMBNAIL, HUGE_THUMBNAIL, PARTIAL_THUMBNAIL, PEC_MAGIC, PEC_V1_VERSION,
};
use crate::pec::{MachineDocument, Rgb};

/// One partial thumbnail of the shared block and its colour.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartialThumbnail {
    pub bitmap: ThumbnailBitmap,
    pub color: Rgb,
}

/// The shared extra-thumbnail block written once per batch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectionThumbnails {
    pub partials: Vec<PartialThumbnail>,
    pub full: ThumbnailBitmap,
    pub physical_width: i16,
    pub physical_height: i16,
    pub huge: ThumbnailBitmap,
}

impl SectionThumbnails {
    fn decode<R: Read + Seek>(r: &mut ByteReader<R>, count: usize) -> Result<Self> {
        let bitmaps = (0..count)
            .map(|_| ThumbnailBitmap::decode(r, PARTIAL_THUMBNAIL))
            .collect::<Result<Vec<_>>>()?;
        let colors = (0..count)
            .map(|_| Rgb::decode(r))
            .collect::<Result<Vec<_>>>()?;
        let partials = bitmaps
            .into_iter()
            .zip(colors)
            .map(|(bitmap, color)| PartialThumbnail { bitmap, color })
            .collect();
        let full = ThumbnailBitmap::decode(r, FULL_THUMBNAIL)?;
        let physical_width = r.read_i16()?;
        let physical_height = r.read_i16()?;
        let huge = ThumbnailBitmap::decode(r, HUGE_THUMBNAIL)?;
        Ok(Self {
            partials,
            full,
            physical_width,
            physical_height,
            huge,
        })
    }

    fn encode<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        for p in &self.partials {
            p.bitmap.encode(w, PARTIAL_THUMBNAIL)?;
        }
        for p in &self.partials {
            p.color.encode(w)?;
        }
        self.full.encode(w, FULL_THUMBNAIL)?;
        w.write_i16(self.physical_width)?;
        w.write_i16(self.physical_height)?;
        self.huge.encode(w, HUGE_THUMBNAIL)
    }
}

/// Ordered machine documents sharing one interleaved layout.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PecBatch {
    pub documents: Vec<MachineDocument>,
    /// `None` when the stored partial-thumbnail count is zero.
    pub section_thumbnails: Option<SectionThumbnails>,
}

impl PecBatch {
    #[must_use]
    pub fn new(documents: Vec<MachineDocument>) -> Self {
        Self {
            documents,
            section_thumbnails: None,
        }
    }

    /// Decode `count` co-resident documents starting at the current offset.
    pub fn decode<R: Read + Seek>(r: &mut ByteReader<R>, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(CodecError::malformed("machine document count", r.offset()));
        }
        debug!(offset = r.offset(), count, "decoding PEC batch");

        let mut documents = Vec::with_capacity(count);
        for _ in 0..count {
            documents.push(MachineDocument::decode_prologue(r)?);
        }
        for doc in &documents {
            doc.decode_redundant_indexes(r)?;
        }
        for doc in &mut documents {
            doc.decode_thread_bitmaps(r)?;
        }
        for doc in &mut documents {
            doc.decode_thread_colors(r)?;
        }

        let n_partials = usize::from(r.read_u16()?);
        let section_thumbnails = if n_partials > 0 {
            debug!(offset = r.offset(), n_partials, "decoding section thumbnails");
            Some(SectionThumbnails::decode(r, n_partials)?)
        } else {
            None
        };

        for doc in &mut documents {
            doc.decode_thread_specs(r)?;
        }
        debug!(offset = r.offset(), "decoded PEC batch");
        Ok(Self {
            documents,
            section_thumbnails,
        })
    }

    /// Encode every pass in order. A section block with no partials is written as a zero count.
    pub fn encode<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        if self.documents.is_empty() {
            return Err(CodecError::malformed("machine document count", w.offset()));
        }
        for doc in &self.documents {
            doc.validate(w.offset())?;
        }
        debug!(offset = w.offset(), count = self.documents.len(), "encoding PEC batch");

        for doc in &self.documents {
            doc.encode_prologue(w)?;
        }
        for doc in &self.documents {
            doc.encode_redundant_indexes(w)?;
        }
        for doc in &self.documents {
            doc.encode_thread_bitmaps(w)?;
        }
        for doc in &self.documents {
            doc.encode_thread_colors(w)?;
        }

        match &self.section_thumbnails {
            Some(section) if !section.partials.is_empty() => {
                let n = u16::try_from(section.partials.len()).map_err(|_| {
                    CodecError::overflow(
                        "partial thumbnail count",
                        section.partials.len() as u64,
                        w.offset(),
                    )
                })?;
                w.write_u16(n)?;
                section.encode(w)?;
            }
            _ => w.write_u16(0)?,
        }

        for doc in &self.documents {
            doc.encode_thread_specs(w)?;
        }
        Ok(())
    }
}

/// Standalone machine file: version literal followed by a batch of one document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PecFile {
    pub batch: PecBatch,
}

impl PecFile {
    #[must_use]
    pub fn new(document: MachineDocument) -> Self {
        Self {
            batch: PecBatch::new(vec![document]),
        }
    }

    /// The single machine document, if the batch is well formed.
    #[must_use]
    pub fn document(&self) -> Option<&MachineDocument> {
        self.batch.documents.first()
    }

    pub fn decode<R: Read + Seek>(r: &mut ByteReader<R>) -> Result<Self> {
        let offset = r.offset();
        let version: [u8; 8] = r.read_array()?;
        if version != PEC_V1_VERSION {
            return Err(if version[..4] == PEC_MAGIC {
                CodecError::UnsupportedVersion {
                    version: String::from_utf8_lossy(&version).into_owned(),
                    offset,
                }
            } else {
                CodecError::malformed("PEC version literal", offset)
            });
        }
        Ok(Self {
            batch: PecBatch::decode(r, 1)?,
        })
    }

    pub fn encode<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        if self.batch.documents.len() != 1 {
            return Err(CodecError::InconsistentLength {
                field: "standalone machine documents",
                expected: 1,
                found: self.batch.documents.len(),
                offset: w.offset(),
            });
        }
        w.write_bytes(&PEC_V1_VERSION)?;
        self.batch.encode(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stitch::Instruction;
    use std::io::Cursor;

    fn doc(label: &str, colors: &[Rgb]) -> MachineDocument {
        let mut layers: Vec<Vec<Instruction>> = colors
            .iter()
            .enumerate()
            .map(|(i, _)| vec![Instruction::Stitch { dx: i as i16, dy: 1 }, Instruction::ColorChange(i as u8 + 1)])
            .collect();
        if let Some(last) = layers.last_mut() {
            *last.last_mut().unwrap() = Instruction::Stop;
        }
        MachineDocument::new(label, layers, colors.to_vec()).unwrap()
    }

    fn encode(batch: &PecBatch) -> Vec<u8> {
        let mut w = ByteWriter::new(Cursor::new(Vec::new())).unwrap();
        batch.encode(&mut w).unwrap();
        w.finish().unwrap().into_inner()
    }

    #[test]
    fn two_documents_round_trip_through_passes() {
        let a = doc("first", &[Rgb::new(1, 2, 3), Rgb::new(4, 5, 6)]);
        let b = doc("second", &[Rgb::new(7, 8, 9)]);
        let batch = PecBatch::new(vec![a, b]);
        let bytes = encode(&batch);

        let mut r = ByteReader::new(Cursor::new(bytes.clone())).unwrap();
        let back = PecBatch::decode(&mut r, 2).unwrap();
        assert_eq!(r.remaining(), 0);
        assert_eq!(back.documents.len(), 2);
        assert_eq!(back.documents[0].thread_colors, batch.documents[0].thread_colors);
        assert_eq!(back.documents[1].layers, batch.documents[1].layers);
        assert!(back.section_thumbnails.is_none());
        assert_eq!(encode(&back), bytes);
    }

    #[test]
    fn colour_pass_follows_all_bitmap_passes() {
        let a = doc("a", &[Rgb::new(0xAA, 0xAA, 0xAA)]);
        let b = doc("b", &[Rgb::new(0xBB, 0xBB, 0xBB)]);
        let bytes = encode(&PecBatch::new(vec![a, b]));
        // Tail: colours a, b, zero section count, specs a, b.
        let tail = &bytes[bytes.len() - (3 + 3 + 2 + 3 + 3)..];
        assert_eq!(&tail[..6], &[0xAA, 0xAA, 0xAA, 0xBB, 0xBB, 0xBB]);
        assert_eq!(&tail[6..8], &[0, 0]);
    }

    #[test]
    fn section_thumbnails_round_trip() {
        let mut batch = PecBatch::new(vec![doc("s", &[Rgb::new(1, 1, 1)])]);
        let mut full = ThumbnailBitmap::blank(FULL_THUMBNAIL);
        full.set_pixel(3, 4, true);
        batch.section_thumbnails = Some(SectionThumbnails {
            partials: vec![PartialThumbnail {
                bitmap: ThumbnailBitmap::blank(PARTIAL_THUMBNAIL),
                color: Rgb::new(9, 9, 9),
            }],
            full,
            physical_width: 1000,
            physical_height: -5,
            huge: ThumbnailBitmap::blank(HUGE_THUMBNAIL),
        });
        let bytes = encode(&batch);
        let mut r = ByteReader::new(Cursor::new(bytes)).unwrap();
        let back = PecBatch::decode(&mut r, 1).unwrap();
        assert_eq!(back.section_thumbnails, batch.section_thumbnails);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let mut w = ByteWriter::new(Cursor::new(Vec::new())).unwrap();
        assert!(PecBatch::new(Vec::new()).encode(&mut w).is_err());
        let mut r = ByteReader::new(Cursor::new(vec![0u8; 4])).unwrap();
        assert!(PecBatch::decode(&mut r, 0).is_err());
    }

    #[test]
    fn standalone_file_checks_version() {
        let mut w = ByteWriter::new(Cursor::new(Vec::new())).unwrap();
        PecFile::new(doc("solo", &[Rgb::new(0, 0, 0)])).encode(&mut w).unwrap();
        let mut bytes = w.finish().unwrap().into_inner();
        assert_eq!(&bytes[..8], b"#PEC0001");

        bytes[7] = b'2';
        let mut r = ByteReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            PecFile::decode(&mut r),
            Err(CodecError::UnsupportedVersion { offset: 0, .. })
        ));
    }
}
