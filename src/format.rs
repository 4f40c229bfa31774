//! PES / PEC layout constants.
//!
//! Literals, markers, table sizes and bitmap geometries shared by the decoders and
//! encoders. Scalar fields are little-endian; two-byte coordinate words are big-endian.

/// Version literal at the start of a PES v6 design file.
pub const PES_V6_VERSION: [u8; 8] = *b"#PES0060";

/// Version literal at the start of a standalone PEC machine file.
pub const PEC_V1_VERSION: [u8; 8] = *b"#PEC0001";

/// Magic prefix shared by every PES version literal.
pub const PES_MAGIC: [u8; 4] = *b"#PES";

/// Magic prefix shared by every PEC version literal.
pub const PEC_MAGIC: [u8; 4] = *b"#PEC";

/// Marker that opens every PEC label.
pub const PEC_LABEL_MARKER: [u8; 3] = *b"LA:";

/// Length of the fixed-width PEC label.
pub const PEC_LABEL_LEN: usize = 16;

/// Byte that follows the PEC label.
pub const PEC_LABEL_TERMINATOR: u8 = b'\r';

/// Entries in the full thread index table of a PEC prologue.
pub const FULL_INDEX_LEN: usize = 463;

/// Entries in the redundant thread index table written after all prologues.
pub const REDUNDANT_INDEX_LEN: usize = 127;

/// Filler used for unused thread index slots in newly built documents.
pub const INDEX_PADDING: u8 = 0x20;

/// Marker preceding every tagged (UTF-16) string.
pub const TAGGED_STRING_MARKER: u32 = 0x00FF_FEFF;

/// End-of-header and end-of-object-header marker.
pub const END_MARKER: u32 = 0x0000_FFFF;

/// Tag string that opens the design-object list.
pub const OBJECT_LIST_TAG: &str = "CEmbOne";

/// Code separating consecutive stitch blocks of a stitch segment.
pub const BLOCK_CONTINUATION: u16 = 0x8003;

/// Single byte that ends a layer with a stop.
pub const STOP_BYTE: u8 = 0xFF;

/// Two bytes that introduce a colour change, followed by the raw index byte.
pub const COLOR_CHANGE_MARKER: [u8; 2] = [0xFE, 0xB0];

/// Stride and height of a bitmap class, in bytes and scanlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    pub stride: usize,
    pub height: usize,
}

impl Geometry {
    pub const fn new(stride: usize, height: usize) -> Self {
        Self { stride, height }
    }

    /// Number of bytes one bitmap of this class occupies.
    pub const fn byte_len(self) -> usize {
        self.stride.saturating_mul(self.height)
    }
}

/// Typical PEC header thumbnail; the real geometry is stored in each prologue.
pub const HEADER_THUMBNAIL: Geometry = Geometry::new(6, 38);

/// Per-thread bitmap.
pub const THREAD_BITMAP: Geometry = Geometry::new(6, 24);

/// Partial thumbnail of the shared section block.
pub const PARTIAL_THUMBNAIL: Geometry = Geometry::new(11, 69);

/// Full thumbnail of the shared section block.
pub const FULL_THUMBNAIL: Geometry = Geometry::new(11, 69);

/// Huge thumbnail of the shared section block.
pub const HUGE_THUMBNAIL: Geometry = Geometry::new(30, 456);
