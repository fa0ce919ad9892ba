//! Stream header parsing for both layouts.

use super::FormatError;
use super::layout::CellLayout;

/// Magic bytes opening a glyph-layout stream.
pub const GLYPH_MAGIC: &[u8; 4] = b"ASCI";

/// Parsed stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub layout: CellLayout,
    /// Grid width in cells.
    pub width: u16,
    /// Grid height in cells.
    pub height: u16,
    /// Nominal frames per second.
    pub fps: u16,
    /// Frame count declared by the header (glyph layout only).
    pub declared_frames: Option<u32>,
}

impl StreamHeader {
    /// Parse the fixed-size header at the start of `bytes`.
    ///
    /// ```text
    /// Pixel (5 bytes):  width:u16 height:u16 fps:u8
    /// Glyph (16 bytes): "ASCI" reserved:[u8; 2] width:u16 height:u16 fps:u16 frames:u32
    /// ```
    /// All integers are little-endian.
    pub fn parse(bytes: &[u8], layout: CellLayout) -> Result<Self, FormatError> {
        let needed = layout.header_size();
        if bytes.len() < needed {
            return Err(FormatError::HeaderTooShort {
                needed,
                available: bytes.len(),
            });
        }

        let header = match layout {
            CellLayout::Pixel => Self {
                layout,
                width: read_u16(bytes, 0),
                height: read_u16(bytes, 2),
                fps: bytes[4] as u16,
                declared_frames: None,
            },
            CellLayout::Glyph => {
                let found = [bytes[0], bytes[1], bytes[2], bytes[3]];
                if &found != GLYPH_MAGIC {
                    return Err(FormatError::BadMagic { found });
                }
                // bytes[4..6] are reserved
                Self {
                    layout,
                    width: read_u16(bytes, 6),
                    height: read_u16(bytes, 8),
                    fps: read_u16(bytes, 10),
                    declared_frames: Some(read_u32(bytes, 12)),
                }
            }
        };

        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<(), FormatError> {
        if self.cell_count() == 0 {
            return Err(FormatError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        if self.fps == 0 {
            return Err(FormatError::ZeroFps);
        }
        Ok(())
    }

    /// Header size in bytes; frame data starts here.
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.header_size()
    }

    /// Number of cells in one frame (`width * height`).
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Nominal duration of one frame in milliseconds.
    #[inline]
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.fps as f64
    }

    /// Map a linear cell index to its `(x, y)` grid position.
    #[inline]
    pub fn position(&self, index: u32) -> (u32, u32) {
        let width = self.width as u32;
        (index % width, index / width)
    }
}

#[inline]
pub(crate) fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
pub(crate) fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
