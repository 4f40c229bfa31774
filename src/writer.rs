//! Writer front door: encode either layout to a stream, a byte vector or a path.

use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

use crate::batch::PecFile;
use crate::cursor::ByteWriter;
use crate::error::Result;
use crate::pes::DesignDocument;
use crate::reader::EmbroideryFile;

/// Encode `file` into `out` starting at its current position. Returns the number of
/// bytes written.
pub fn write_document<W: Write + Seek>(out: &mut W, file: &EmbroideryFile) -> Result<u64> {
    let mut w = ByteWriter::new(out)?;
    let start = w.offset();
    match file {
        EmbroideryFile::Design(doc) => doc.encode(&mut w)?,
        EmbroideryFile::Machine(pec) => pec.encode(&mut w)?,
    }
    let written = w.offset() - start;
    w.finish()?;
    Ok(written)
}

/// The file is created only once the whole document has encoded.
fn save_with<F>(path: &Path, encode: F) -> Result<u64>
where
    F: FnOnce(&mut ByteWriter<Cursor<Vec<u8>>>) -> Result<()>,
{
    let bytes = bytes_with(encode)?;
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&bytes)?;
    out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(bytes.len() as u64)
}

fn bytes_with<F>(encode: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut ByteWriter<Cursor<Vec<u8>>>) -> Result<()>,
{
    let mut w = ByteWriter::new(Cursor::new(Vec::new()))?;
    encode(&mut w)?;
    Ok(w.finish()?.into_inner())
}

impl EmbroideryFile {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        write_document(&mut out, self)?;
        Ok(out.into_inner())
    }

    /// Write to `path`, replacing any existing file. Returns the number of bytes written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        match self {
            Self::Design(doc) => doc.save(path),
            Self::Machine(pec) => pec.save(path),
        }
    }
}

impl DesignDocument {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bytes_with(|w| self.encode(w))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        save_with(path.as_ref(), |w| self.encode(w))
    }
}

impl PecFile {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bytes_with(|w| self.encode(w))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        save_with(path.as_ref(), |w| self.encode(w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pec::{MachineDocument, Rgb};
    use crate::stitch::Instruction;

    fn pec() -> PecFile {
        PecFile::new(
            MachineDocument::new(
                "w",
                vec![vec![Instruction::Trim { dx: 0, dy: 0 }, Instruction::Stop]],
                vec![Rgb::default()],
            )
            .unwrap(),
        )
    }

    #[test]
    fn write_document_reports_length() {
        let file = EmbroideryFile::Machine(pec());
        let mut out = Cursor::new(vec![0xAA; 3]);
        out.set_position(3);
        let written = write_document(&mut out, &file).unwrap();
        let bytes = out.into_inner();
        assert_eq!(written as usize, bytes.len() - 3);
        assert_eq!(&bytes[3..11], b"#PEC0001");
    }

    #[test]
    fn to_bytes_agrees_across_entry_points() {
        let pec = pec();
        let direct = pec.to_bytes().unwrap();
        let wrapped = EmbroideryFile::Machine(pec).to_bytes().unwrap();
        assert_eq!(direct, wrapped);
    }
}
