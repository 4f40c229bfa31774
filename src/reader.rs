//! Reader front door: detect the file type from its version literal and decode it.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use tracing::debug;

use crate::batch::PecFile;
use crate::cursor::ByteReader;
use crate::error::{CodecError, Result};
use crate::format::{PEC_MAGIC, PEC_V1_VERSION, PES_MAGIC, PES_V6_VERSION};
use crate::pes::DesignDocument;

/// Supported layouts, identified by their 8-byte version literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `#PES0060`: design document wrapping a machine-document batch.
    PesV6,
    /// `#PEC0001`: standalone machine document.
    PecV1,
}

impl FileFormat {
    /// Classify a version literal.
    pub fn detect(version: &[u8; 8], offset: u64) -> Result<Self> {
        if *version == PES_V6_VERSION {
            return Ok(Self::PesV6);
        }
        if *version == PEC_V1_VERSION {
            return Ok(Self::PecV1);
        }
        if version[..4] == PES_MAGIC || version[..4] == PEC_MAGIC {
            return Err(CodecError::UnsupportedVersion {
                version: String::from_utf8_lossy(version).into_owned(),
                offset,
            });
        }
        Err(CodecError::malformed("version literal", offset))
    }
}

/// A decoded file of either supported layout.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmbroideryFile {
    Design(DesignDocument),
    Machine(PecFile),
}

impl EmbroideryFile {
    /// Open and decode a file. The handle is released on every return path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        read_document(BufReader::new(file))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        read_document(Cursor::new(bytes))
    }

    #[must_use]
    pub fn format(&self) -> FileFormat {
        match self {
            Self::Design(_) => FileFormat::PesV6,
            Self::Machine(_) => FileFormat::PecV1,
        }
    }
}

/// Decode a file of either layout from a stream positioned at its first byte.
pub fn read_document<R: Read + Seek>(stream: R) -> Result<EmbroideryFile> {
    let mut r = ByteReader::new(stream)?;
    let start = r.offset();
    let version: [u8; 8] = r.read_array()?;
    let format = FileFormat::detect(&version, start)?;
    r.seek(start)?;
    debug!(?format, len = r.remaining(), "detected file format");
    match format {
        FileFormat::PesV6 => Ok(EmbroideryFile::Design(DesignDocument::decode(&mut r)?)),
        FileFormat::PecV1 => Ok(EmbroideryFile::Machine(PecFile::decode(&mut r)?)),
    }
}

impl DesignDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode(&mut ByteReader::new(Cursor::new(bytes))?)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::decode(&mut ByteReader::new(BufReader::new(file))?)
    }
}

impl PecFile {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode(&mut ByteReader::new(Cursor::new(bytes))?)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::decode(&mut ByteReader::new(BufReader::new(file))?)
    }
}
