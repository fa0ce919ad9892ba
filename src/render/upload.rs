//! Partial upload planning and texel encoding.
//!
//! The presenter keeps GPU copies of the palette and the cell raster. Each
//! present uploads only what went stale since the previous one, widened by
//! the rows whose changed-cell highlight flag flips.

use std::ops::Range;

use crate::cells::{CellBuffer, StaleRegion};

/// Bytes per cell texel: `[palette, glyph, highlight, 0]`.
pub const CELL_TEXEL_BYTES: usize = 4;

/// Bytes of the RGBA palette texture (256 x 1).
pub const PALETTE_TEXEL_BYTES: usize = 256 * 4;

/// What one present must upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPlan {
    pub palette: bool,
    /// Cell rows to re-encode and upload.
    pub rows: Option<Range<u32>>,
    /// Rows that carry the highlight flag after this upload.
    pub highlight_rows: Option<Range<u32>>,
}

impl UploadPlan {
    /// Plan an upload from the accumulated stale region.
    ///
    /// `previous_highlight` are rows flagged on the GPU side from the last
    /// present; `highlight` the rows to flag now (`None` when highlighting is
    /// off or nothing changed).
    pub fn new(
        stale: StaleRegion,
        previous_highlight: Option<Range<u32>>,
        highlight: Option<Range<u32>>,
    ) -> Self {
        let rows = union(union(stale.rows, previous_highlight), highlight.clone());
        Self {
            palette: stale.palette,
            rows,
            highlight_rows: highlight,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.palette && self.rows.is_none()
    }

    /// Number of cell texels uploaded for a grid `width` cells wide.
    pub fn texel_count(&self, width: u32) -> usize {
        self.rows
            .as_ref()
            .map_or(0, |rows| rows.len() * width as usize)
    }
}

fn union(a: Option<Range<u32>>, b: Option<Range<u32>>) -> Option<Range<u32>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.start.min(b.start)..a.end.max(b.end)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Encode the cells of `rows` into `out` as RGBA8 texels.
///
/// The highlight channel is set for cells in the buffer's dirty set when
/// `highlight` is on.
pub fn encode_rows(cells: &CellBuffer, rows: Range<u32>, highlight: bool, out: &mut Vec<u8>) {
    out.clear();
    let width = cells.width() as u32;
    out.reserve(rows.len() * width as usize * CELL_TEXEL_BYTES);
    let dirty = cells.dirty();
    for y in rows {
        let base = y * width;
        for (x, cell) in cells.row(y).unwrap_or_default().iter().enumerate() {
            let flagged = highlight && dirty.contains(base + x as u32);
            out.extend_from_slice(&[cell.palette, cell.glyph, u8::from(flagged), 0]);
        }
    }
}

/// Expand the RGB palette to RGBA texels.
pub fn palette_texels(cells: &CellBuffer) -> [u8; PALETTE_TEXEL_BYTES] {
    let mut texels = [255u8; PALETTE_TEXEL_BYTES];
    for (rgba, rgb) in texels.chunks_exact_mut(4).zip(cells.palette().chunks_exact(3)) {
        rgba[..3].copy_from_slice(rgb);
    }
    texels
}
