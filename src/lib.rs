//! pescodec: byte-exact reader and writer for PES v6 embroidery designs and PEC machine files.
//!
//! This crate provides:
//! - **Field codecs** (`cursor`): offset-tracking `ByteReader` / `ByteWriter` for every scalar and text field.
//! - **Coordinates and stitches** (`coord`, `stitch`): the 1/2-byte coordinate words and the per-layer instruction stream.
//! - **Machine documents** (`pec`, `batch`): PEC blocks and the fixed pass order shared by co-resident blocks.
//! - **Design documents** (`pes`, `thread`, `object`): header, thread catalogue and design objects.
//! - **Front door** (`reader`, `writer`): `EmbroideryFile::open(path)` / `save(path)` with format detection.
//!
//! Fields whose meaning is unknown are kept as opaque bytes so decoded files re-encode
//! byte for byte.

pub mod batch;
pub mod bitmap;
pub mod coord;
pub mod cursor;
mod error;
pub mod format;
pub mod object;
pub mod pec;
pub mod pes;
pub mod reader;
pub mod stitch;
pub mod thread;
pub mod writer;

pub use batch::{PartialThumbnail, PecBatch, PecFile, SectionThumbnails};
pub use bitmap::ThumbnailBitmap;
pub use coord::CoordWord;
pub use cursor::{ByteReader, ByteWriter};
pub use error::{CodecError, Result};
pub use format::{Geometry, PEC_V1_VERSION, PES_V6_VERSION};
pub use object::{ColorEntry, DesignObject, ObjectHeader, ObjectKind, StitchBlock, StitchSegment};
pub use pec::{MachineDocument, Rgb, ThreadIndexTable, ThreadSpec};
pub use pes::{DesignDocument, DesignHeader};
pub use reader::{read_document, EmbroideryFile, FileFormat};
pub use stitch::{decode_layer, encode_layer, Instruction, Layer};
pub use thread::Thread;
pub use writer::write_document;
