//! Cell codecs for the two stream layouts.
//!
//! Both layouts share the keyframe/delta state machine and differ only in how
//! wide a cell is on disk, how a frame marker is tagged, and how a cell maps to
//! a visual attribute.

use serde::{Deserialize, Serialize};

/// Bytes of a keyframe palette block (256 RGB triples).
pub const PALETTE_BYTES: usize = 256 * 3;

/// Size of the little-endian edit count that opens a delta frame.
pub const EDIT_COUNT_BYTES: usize = 4;

/// Glyph byte stored for pixel-layout cells; maps to full coverage.
pub const SOLID_GLYPH: u8 = 0xFF;

/// ASCII density ramp, darkest to brightest, used for glyph coverage.
const GLYPH_RAMP: &[u8] = b" .'`^\",:;Il!i><~+_-?][}{1)(|\\/tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@$";

/// One addressable unit of a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Index into the 256-entry palette.
    pub palette: u8,
    /// Glyph byte. Always [`SOLID_GLYPH`] for the pixel layout.
    pub glyph: u8,
}

impl Cell {
    pub const fn pixel(palette: u8) -> Self {
        Self {
            palette,
            glyph: SOLID_GLYPH,
        }
    }

    pub const fn glyph(glyph: u8, palette: u8) -> Self {
        Self { palette, glyph }
    }
}

/// A single delta-frame edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    /// Linear cell index `y * width + x`.
    pub index: u32,
    pub cell: Cell,
}

/// Classification of a frame marker byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Keyframe,
    Delta,
    /// Not a frame marker; the stream ends here.
    End,
}

/// Which on-disk layout a stream uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellLayout {
    /// Variant A: 5-byte header, one palette-index byte per cell,
    /// `0xFF` keyframe / `0xFE` delta markers.
    Pixel,
    /// Variant B: 16-byte `"ASCI"` header, `(glyph, palette)` byte pairs,
    /// `0x00` keyframe / nonzero delta markers.
    Glyph,
}

impl CellLayout {
    /// Bytes per cell inside a keyframe.
    #[inline]
    pub const fn cell_stride(self) -> usize {
        match self {
            CellLayout::Pixel => 1,
            CellLayout::Glyph => 2,
        }
    }

    /// Bytes per edit inside a delta frame (cell bytes + u32 index).
    #[inline]
    pub const fn edit_stride(self) -> usize {
        self.cell_stride() + 4
    }

    /// Fixed header size in bytes.
    #[inline]
    pub const fn header_size(self) -> usize {
        match self {
            CellLayout::Pixel => 5,
            CellLayout::Glyph => 16,
        }
    }

    /// Bytes following the marker of a keyframe for a grid of `cells` cells.
    #[inline]
    pub const fn keyframe_payload(self, cells: usize) -> usize {
        PALETTE_BYTES + cells * self.cell_stride()
    }

    pub fn classify(self, marker: u8) -> Marker {
        match (self, marker) {
            (CellLayout::Pixel, 0xFF) => Marker::Keyframe,
            (CellLayout::Pixel, 0xFE) => Marker::Delta,
            (CellLayout::Pixel, _) => Marker::End,
            (CellLayout::Glyph, 0x00) => Marker::Keyframe,
            (CellLayout::Glyph, _) => Marker::Delta,
        }
    }

    /// Decode one keyframe cell from exactly `cell_stride()` bytes.
    #[inline]
    pub fn read_cell(self, bytes: &[u8]) -> Cell {
        match self {
            CellLayout::Pixel => Cell::pixel(bytes[0]),
            CellLayout::Glyph => Cell::glyph(bytes[0], bytes[1]),
        }
    }

    /// Decode one edit from exactly `edit_stride()` bytes.
    #[inline]
    pub fn read_edit(self, bytes: &[u8]) -> Edit {
        let stride = self.cell_stride();
        let cell = self.read_cell(&bytes[..stride]);
        let index = u32::from_le_bytes([
            bytes[stride],
            bytes[stride + 1],
            bytes[stride + 2],
            bytes[stride + 3],
        ]);
        Edit { index, cell }
    }

    /// Coverage (0-255) drawn for a glyph byte.
    ///
    /// The pixel layout always draws solid cells.
    pub fn coverage(self, glyph: u8) -> u8 {
        match self {
            CellLayout::Pixel => 255,
            CellLayout::Glyph => glyph_coverage(glyph),
        }
    }

    /// Coverage for every glyph byte, uploaded as a lookup table.
    pub fn coverage_table(self) -> [u8; 256] {
        let mut table = [0u8; 256];
        for (glyph, slot) in table.iter_mut().enumerate() {
            *slot = self.coverage(glyph as u8);
        }
        table
    }

    /// Name used for this layout in logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            CellLayout::Pixel => "pixel",
            CellLayout::Glyph => "glyph",
        }
    }
}

fn glyph_coverage(glyph: u8) -> u8 {
    match GLYPH_RAMP.iter().position(|&c| c == glyph) {
        Some(pos) => {
            let last = (GLYPH_RAMP.len() - 1) as u32;
            (pos as u32 * 255 / last) as u8
        }
        // Non-ramp printable characters read as mid density, control bytes as blank.
        None if glyph.is_ascii_graphic() || glyph >= 0x80 => 160,
        None => 0,
    }
}
