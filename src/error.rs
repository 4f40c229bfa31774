//! Error type shared by every decoder and encoder in the crate.
//!
//! Every format error carries the byte offset at which it was detected. Offsets and
//! counts in this format depend on each other, so every error is fatal for the
//! document being processed.

use thiserror::Error;

/// Errors produced while decoding or encoding PES / PEC data.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed {what} at offset {offset:#x}")]
    MalformedHeader { what: &'static str, offset: u64 },
    #[error("unsupported version {version:?} at offset {offset:#x}")]
    UnsupportedVersion { version: String, offset: u64 },
    #[error("coordinate class {class} value {value} not encodable at offset {offset:#x}")]
    InvalidCoordinateRange { class: u8, value: i32, offset: u64 },
    #[error("coordinate class mismatch ({first} then {second}) at offset {offset:#x}")]
    ClassMismatch { first: u8, second: u8, offset: u64 },
    #[error("invalid command class {class} at offset {offset:#x}")]
    InvalidCommandClass { class: u8, offset: u64 },
    #[error("{section} offset mismatch: stored {stored:#x}, computed {computed:#x} (at {offset:#x})")]
    OffsetInconsistency {
        section: &'static str,
        stored: u64,
        computed: u64,
        offset: u64,
    },
    #[error("unsupported object variant {name:?} at offset {offset:#x}")]
    UnsupportedVariant { name: String, offset: u64 },
    #[error("input truncated at offset {offset:#x}")]
    TruncatedInput { offset: u64 },
    #[error("invalid text in {field} at offset {offset:#x}")]
    InvalidText { field: &'static str, offset: u64 },
    #[error("{field} value {value} does not fit its field at offset {offset:#x}")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        offset: u64,
    },
    #[error("{field}: expected {expected} entries, found {found} (at {offset:#x})")]
    InconsistentLength {
        field: &'static str,
        expected: usize,
        found: usize,
        offset: u64,
    },
    #[error("redundant thread index table differs from the full table at offset {offset:#x}")]
    IndexTableMismatch { offset: u64 },
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    /// Byte offset at which the error was detected, if the error came from the format layer.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::Io(_) => None,
            Self::MalformedHeader { offset, .. }
            | Self::UnsupportedVersion { offset, .. }
            | Self::InvalidCoordinateRange { offset, .. }
            | Self::ClassMismatch { offset, .. }
            | Self::InvalidCommandClass { offset, .. }
            | Self::OffsetInconsistency { offset, .. }
            | Self::UnsupportedVariant { offset, .. }
            | Self::TruncatedInput { offset }
            | Self::InvalidText { offset, .. }
            | Self::FieldOverflow { offset, .. }
            | Self::InconsistentLength { offset, .. }
            | Self::IndexTableMismatch { offset } => Some(*offset),
        }
    }

    pub(crate) fn malformed(what: &'static str, offset: u64) -> Self {
        Self::MalformedHeader { what, offset }
    }

    pub(crate) fn overflow(field: &'static str, value: u64, offset: u64) -> Self {
        Self::FieldOverflow {
            field,
            value,
            offset,
        }
    }
}
