//! MRV stream format: container transport, header, frame records, index and
//! decoder.
//!
//! # File Format
//!
//! The binary stream is stored as a single entry inside a zip archive
//! (`data.bin` for the pixel layout, `movie.abin` for the glyph layout):
//!
//! ```text
//! Header:
//!   Pixel:  width:u16 height:u16 fps:u8                                (5 bytes)
//!   Glyph:  "ASCI" reserved:[u8; 2] width:u16 height:u16 fps:u16 frames:u32  (16 bytes)
//!
//! Frames (repeated):
//!   marker:u8
//!   Keyframe: palette [256 x RGB] + width*height cells
//!   Delta:    edit_count:u32 + edit_count edits
//!
//! Markers:  Pixel 0xFF keyframe / 0xFE delta / anything else ends the stream
//!           Glyph 0x00 keyframe / nonzero delta
//! Cells:    Pixel (palette:u8)          edit: (palette:u8, index:u32)
//!           Glyph (glyph:u8, palette:u8) edit: (glyph:u8, palette:u8, index:u32)
//! ```
//!
//! All integers are little-endian.

mod container;
mod decoder;
mod frame;
mod header;
mod index;
mod layout;

pub use container::{Container, ContainerError};
pub use decoder::FrameDecoder;
pub use frame::{DeltaFrame, FrameKind, FrameRecord, Keyframe, ReadStop, read_record};
pub use header::{GLYPH_MAGIC, StreamHeader};
pub use index::{FrameIndex, StreamTruncation, TruncationReason};
pub use layout::{Cell, CellLayout, EDIT_COUNT_BYTES, Edit, Marker, PALETTE_BYTES, SOLID_GLYPH};

/// Errors that make a stream unplayable.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Header needs {needed} bytes but only {available} are present")]
    HeaderTooShort { needed: usize, available: usize },

    #[error("Invalid magic bytes {found:?}, expected \"ASCI\"")]
    BadMagic { found: [u8; 4] },

    #[error("Grid dimensions {width}x{height} contain no cells")]
    EmptyGrid { width: u16, height: u16 },

    #[error("Frame rate must be non-zero")]
    ZeroFps,

    #[error("Stream contains no readable frames: {0}")]
    NoFrames(TruncationReason),

    #[error("Frame {frame} out of range (stream has {total} frames)")]
    FrameOutOfRange { frame: usize, total: usize },
}
