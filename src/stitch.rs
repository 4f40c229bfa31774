//! Stitch instruction stream of a PEC layer.

use std::io::{Read, Seek, Write};

use crate::coord::{self, CoordWord};
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{CodecError, Result};
use crate::format::{COLOR_CHANGE_MARKER, STOP_BYTE};

/// One machine instruction. Movements are relative deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instruction {
    Stitch { dx: i16, dy: i16 },
    Jump { dx: i16, dy: i16 },
    Trim { dx: i16, dy: i16 },
    ColorChange(u8),
    Stop,
}

impl Instruction {
    /// True for the two instructions that end a layer.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(self, Self::ColorChange(_) | Self::Stop)
    }

    fn movement(class: u8, dx: i16, dy: i16) -> Option<Self> {
        match class {
            0 => Some(Self::Stitch { dx, dy }),
            1 => Some(Self::Jump { dx, dy }),
            2 => Some(Self::Trim { dx, dy }),
            _ => None,
        }
    }
}

/// Instructions of one layer in stitch order; the last one is its terminator.
pub type Layer = Vec<Instruction>;

/// Decode one instruction.
pub fn decode_instruction<R: Read + Seek>(r: &mut ByteReader<R>) -> Result<Instruction> {
    let offset = r.offset();
    let (class, dx) = match coord::decode(r)? {
        CoordWord::End => return Ok(Instruction::Stop),
        CoordWord::ColorMarker => return Ok(Instruction::ColorChange(r.read_u8()?)),
        CoordWord::Value { class, value } => (class, value),
    };
    let second = r.offset();
    let dy = match coord::decode(r)? {
        CoordWord::Value { class: c, value } if c == class => value,
        CoordWord::Value { class: c, .. } => {
            return Err(CodecError::ClassMismatch {
                first: class,
                second: c,
                offset: second,
            })
        }
        CoordWord::End | CoordWord::ColorMarker => {
            return Err(CodecError::malformed("second coordinate", second))
        }
    };
    Instruction::movement(class, dx, dy)
        .ok_or(CodecError::InvalidCommandClass { class, offset })
}

/// Encode one instruction.
pub fn encode_instruction<W: Write + Seek>(w: &mut ByteWriter<W>, ins: &Instruction) -> Result<()> {
    let (class, dx, dy) = match *ins {
        Instruction::Stop => return w.write_u8(STOP_BYTE),
        Instruction::ColorChange(index) => {
            w.write_bytes(&COLOR_CHANGE_MARKER)?;
            return w.write_u8(index);
        }
        Instruction::Stitch { dx, dy } => (0, dx, dy),
        Instruction::Jump { dx, dy } => (1, dx, dy),
        Instruction::Trim { dx, dy } => (2, dx, dy),
    };
    coord::encode(w, class, dx)?;
    coord::encode(w, class, dy)
}

/// Decode instructions up to and including the next Stop or ColorChange.
pub fn decode_layer<R: Read + Seek>(r: &mut ByteReader<R>) -> Result<Layer> {
    let mut layer = Vec::new();
    loop {
        let ins = decode_instruction(r)?;
        layer.push(ins);
        if ins.is_terminator() {
            return Ok(layer);
        }
    }
}

/// Encode a layer. It must end with its terminator and contain no other.
pub fn encode_layer<W: Write + Seek>(w: &mut ByteWriter<W>, layer: &[Instruction]) -> Result<()> {
    let terminators = layer.iter().filter(|i| i.is_terminator()).count();
    if terminators != 1 || !layer.last().is_some_and(Instruction::is_terminator) {
        return Err(CodecError::malformed("layer terminator", w.offset()));
    }
    layer.iter().try_for_each(|ins| encode_instruction(w, ins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_bytes(layer: &[Instruction]) -> Vec<u8> {
        let mut w = ByteWriter::new(Cursor::new(Vec::new())).unwrap();
        encode_layer(&mut w, layer).unwrap();
        w.finish().unwrap().into_inner()
    }

    #[test]
    fn layer_encoding_matches_wire_format() {
        let layer = vec![Instruction::Stitch { dx: 5, dy: -3 }, Instruction::ColorChange(1)];
        assert_eq!(encode_bytes(&layer), [0x05, 0x7D, 0xFE, 0xB0, 0x01]);

        let layer = vec![Instruction::Jump { dx: -700, dy: 10 }, Instruction::Stop];
        assert_eq!(encode_bytes(&layer), [0x9D, 0x44, 0x90, 0x0A, 0xFF]);
    }

    #[test]
    fn decode_stops_at_terminator_without_over_reading() {
        let bytes = vec![0x05, 0x7D, 0xFE, 0xB0, 0x02, 0x01, 0x01, 0xFF];
        let mut r = ByteReader::new(Cursor::new(bytes)).unwrap();
        let first = decode_layer(&mut r).unwrap();
        assert_eq!(
            first,
            vec![Instruction::Stitch { dx: 5, dy: -3 }, Instruction::ColorChange(2)]
        );
        assert_eq!(r.offset(), 5);
        let second = decode_layer(&mut r).unwrap();
        assert_eq!(second, vec![Instruction::Stitch { dx: 1, dy: 1 }, Instruction::Stop]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn mismatched_classes_are_corrupt() {
        // Jump dx followed by a trim dy.
        let mut r = ByteReader::new(Cursor::new(vec![0x90, 0x01, 0xA0, 0x01])).unwrap();
        assert!(matches!(
            decode_layer(&mut r),
            Err(CodecError::ClassMismatch { first: 1, second: 2, offset: 2 })
        ));
    }

    #[test]
    fn unknown_movement_class_is_rejected() {
        let mut r = ByteReader::new(Cursor::new(vec![0xB0, 0x01, 0xB0, 0x01])).unwrap();
        assert!(matches!(
            decode_instruction(&mut r),
            Err(CodecError::InvalidCommandClass { class: 3, offset: 0 })
        ));
    }

    #[test]
    fn layer_without_terminator_is_not_encoded() {
        let mut w = ByteWriter::new(Cursor::new(Vec::new())).unwrap();
        let err = encode_layer(&mut w, &[Instruction::Stitch { dx: 1, dy: 1 }]).unwrap_err();
        assert!(matches!(err, CodecError::MalformedHeader { .. }));
    }
}
