//! Cell buffer: the live palette and raster mutated frame by frame.

use std::ops::Range;

use crate::format::{
    Cell, CellLayout, DeltaFrame, FrameKind, FrameRecord, Keyframe, PALETTE_BYTES, StreamHeader,
};

/// Indices touched by the most recently applied frame.
///
/// A keyframe marks every cell; a delta frame marks exactly the indices it
/// edits. Membership checks are O(1) and clearing is proportional to the
/// number of marked cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtySet {
    full: bool,
    indices: Vec<u32>,
    marks: Vec<bool>,
}

impl DirtySet {
    pub fn new(cell_count: usize) -> Self {
        Self {
            full: false,
            indices: Vec::new(),
            marks: vec![false; cell_count],
        }
    }

    pub fn clear(&mut self) {
        if self.full {
            self.full = false;
        } else {
            for &i in &self.indices {
                self.marks[i as usize] = false;
            }
        }
        self.indices.clear();
    }

    /// Mark every cell (keyframe refresh).
    pub fn mark_all(&mut self) {
        self.clear();
        self.full = true;
    }

    /// Mark one index. Repeated and out-of-range inserts are ignored.
    pub fn insert(&mut self, index: u32) {
        if self.full {
            return;
        }
        if let Some(mark) = self.marks.get_mut(index as usize)
            && !*mark
        {
            *mark = true;
            self.indices.push(index);
        }
    }

    #[inline]
    pub fn contains(&self, index: u32) -> bool {
        self.full || self.marks.get(index as usize).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.indices.is_empty()
    }

    /// Number of marked cells.
    pub fn len(&self) -> usize {
        if self.full {
            self.marks.len()
        } else {
            self.indices.len()
        }
    }

    /// Marked indices in first-touch order. Empty when the set is full.
    pub fn sparse_indices(&self) -> &[u32] {
        &self.indices
    }

    /// Smallest row range covering every marked cell.
    pub fn rows(&self, width: u32, height: u32) -> Option<Range<u32>> {
        if self.full {
            return Some(0..height);
        }
        let (min, max) = self
            .indices
            .iter()
            .fold((u32::MAX, 0), |(lo, hi), &i| (lo.min(i), hi.max(i)));
        if min > max {
            return None;
        }
        Some(min / width..max / width + 1)
    }
}

/// Region of GPU-side state that is stale relative to the cell buffer.
///
/// Accumulates across every frame applied since the last upload, so frames
/// decoded without being presented are still covered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaleRegion {
    pub palette: bool,
    pub rows: Option<Range<u32>>,
}

impl StaleRegion {
    pub fn include_rows(&mut self, rows: Range<u32>) {
        self.rows = Some(match self.rows.take() {
            Some(current) => current.start.min(rows.start)..current.end.max(rows.end),
            None => rows,
        });
    }

    pub fn is_empty(&self) -> bool {
        !self.palette && self.rows.is_none()
    }
}

/// Outcome of applying one frame record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedFrame {
    pub kind: FrameKind,
    /// Edits applied (delta) or cells written (keyframe).
    pub cells_written: usize,
    /// Edits dropped because their index was outside the grid.
    pub out_of_range: usize,
}

/// Mutable palette and raster for one playback session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBuffer {
    layout: CellLayout,
    width: u16,
    height: u16,
    palette: [u8; PALETTE_BYTES],
    cells: Vec<Cell>,
    dirty: DirtySet,
    last_kind: Option<FrameKind>,
    stale: StaleRegion,
}

impl CellBuffer {
    /// Allocate a zeroed buffer sized for `header`.
    pub fn new(header: &StreamHeader) -> Self {
        let count = header.cell_count();
        Self {
            layout: header.layout,
            width: header.width,
            height: header.height,
            palette: [0; PALETTE_BYTES],
            cells: vec![Self::blank(header.layout); count],
            dirty: DirtySet::new(count),
            last_kind: None,
            stale: StaleRegion {
                palette: true,
                rows: Some(0..header.height as u32),
            },
        }
    }

    fn blank(layout: CellLayout) -> Cell {
        match layout {
            CellLayout::Pixel => Cell::pixel(0),
            CellLayout::Glyph => Cell::default(),
        }
    }

    /// Zero palette and cells, as on a fresh load.
    pub fn reset(&mut self) {
        self.palette = [0; PALETTE_BYTES];
        self.cells.fill(Self::blank(self.layout));
        self.dirty.clear();
        self.last_kind = None;
        self.invalidate();
    }

    /// Apply one frame record.
    pub fn apply(&mut self, record: &FrameRecord<'_>) -> AppliedFrame {
        let applied = match record {
            FrameRecord::Keyframe(key) => self.apply_keyframe(key),
            FrameRecord::Delta(delta) => self.apply_delta(delta),
        };
        self.last_kind = Some(applied.kind);
        applied
    }

    fn apply_keyframe(&mut self, key: &Keyframe<'_>) -> AppliedFrame {
        self.palette.copy_from_slice(key.palette);
        let layout = self.layout;
        for (cell, bytes) in self
            .cells
            .iter_mut()
            .zip(key.cells.chunks_exact(layout.cell_stride()))
        {
            *cell = layout.read_cell(bytes);
        }
        self.dirty.mark_all();
        self.stale.palette = true;
        self.stale.include_rows(0..self.height as u32);

        AppliedFrame {
            kind: FrameKind::Keyframe,
            cells_written: self.cells.len(),
            out_of_range: 0,
        }
    }

    fn apply_delta(&mut self, delta: &DeltaFrame<'_>) -> AppliedFrame {
        self.dirty.clear();
        let mut written = 0;
        let mut out_of_range = 0;
        for edit in delta.edits() {
            match self.cells.get_mut(edit.index as usize) {
                Some(cell) => {
                    *cell = edit.cell;
                    self.dirty.insert(edit.index);
                    written += 1;
                }
                None => out_of_range += 1,
            }
        }
        if out_of_range > 0 {
            log::warn!(
                "delta frame skipped {out_of_range} edits outside the {}x{} grid",
                self.width,
                self.height
            );
        }
        if let Some(rows) = self.dirty.rows(self.width as u32, self.height as u32) {
            self.stale.include_rows(rows);
        }

        AppliedFrame {
            kind: FrameKind::Delta,
            cells_written: written,
            out_of_range,
        }
    }

    #[inline]
    pub fn layout(&self) -> CellLayout {
        self.layout
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn palette(&self) -> &[u8; PALETTE_BYTES] {
        &self.palette
    }

    /// RGB color of palette entry `index`.
    #[inline]
    pub fn color(&self, index: u8) -> [u8; 3] {
        let i = index as usize * 3;
        [self.palette[i], self.palette[i + 1], self.palette[i + 2]]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Cells of row `y`, or `None` past the last row.
    pub fn row(&self, y: u32) -> Option<&[Cell]> {
        let width = self.width as usize;
        let start = y as usize * width;
        self.cells.get(start..start + width)
    }

    pub fn dirty(&self) -> &DirtySet {
        &self.dirty
    }

    /// Kind of the most recently applied frame.
    pub fn last_kind(&self) -> Option<FrameKind> {
        self.last_kind
    }

    /// GPU-side state not yet refreshed from this buffer.
    pub fn stale(&self) -> &StaleRegion {
        &self.stale
    }

    /// Mark palette and every row stale, e.g. for a freshly created presenter.
    pub fn invalidate(&mut self) {
        self.stale = StaleRegion {
            palette: true,
            rows: Some(0..self.height as u32),
        };
    }

    /// Take the stale region, leaving it empty. Called after an upload.
    pub fn take_stale(&mut self) -> StaleRegion {
        std::mem::take(&mut self.stale)
    }

    /// True when palette and raster match `other`, ignoring dirty tracking.
    pub fn same_image(&self, other: &CellBuffer) -> bool {
        self.palette == other.palette && self.cells == other.cells
    }
}
