//! Thread catalogue entries of a design document.

use std::io::{Read, Seek, Write};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::Result;
use crate::pec::Rgb;

/// One physical thread as described by the design document's catalogue.
///
/// Related to a machine document's colour table only through explicit indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Thread {
    pub catalog_number: String,
    pub color: Rgb,
    /// Fourth byte of the stored colour, kept verbatim.
    pub color_reserved: u8,
    pub color_type: u32,
    pub chart_index: String,
    pub brand: String,
    pub chart_name: String,
}

impl Thread {
    pub fn decode<R: Read + Seek>(r: &mut ByteReader<R>) -> Result<Self> {
        let catalog_number = r.read_tagged("thread catalog number")?;
        let [red, green, blue, color_reserved] = r.read_array()?;
        Ok(Self {
            catalog_number,
            color: Rgb::new(red, green, blue),
            color_reserved,
            color_type: r.read_u32()?,
            chart_index: r.read_tagged("thread chart index")?,
            brand: r.read_tagged("thread brand")?,
            chart_name: r.read_tagged("thread chart name")?,
        })
    }

    pub fn encode<W: Write + Seek>(&self, w: &mut ByteWriter<W>) -> Result<()> {
        w.write_tagged(&self.catalog_number, "thread catalog number")?;
        w.write_bytes(&[self.color.r, self.color.g, self.color.b, self.color_reserved])?;
        w.write_u32(self.color_type)?;
        w.write_tagged(&self.chart_index, "thread chart index")?;
        w.write_tagged(&self.brand, "thread brand")?;
        w.write_tagged(&self.chart_name, "thread chart name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn thread_round_trip() {
        let thread = Thread {
            catalog_number: "1147".into(),
            color: Rgb::new(0xC0, 0x10, 0x20),
            color_reserved: 0,
            color_type: 0xB,
            chart_index: "12".into(),
            brand: "Madeira Rayon".into(),
            chart_name: "Rayon 40".into(),
        };
        let mut w = ByteWriter::new(Cursor::new(Vec::new())).unwrap();
        thread.encode(&mut w).unwrap();
        let bytes = w.finish().unwrap().into_inner();
        // Tagged "1147": marker, count, four UTF-16 units; then rgb + reserved byte.
        assert_eq!(&bytes[12..16], &[0xC0, 0x10, 0x20, 0x00]);

        let mut r = ByteReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(Thread::decode(&mut r).unwrap(), thread);
        assert_eq!(r.remaining(), 0);
    }
}
