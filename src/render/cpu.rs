//! Software presenter: resolves the cell buffer to RGBA on the CPU.
//!
//! Produces the same image the GPU presenter draws for an identity view
//! transform, and serves as the reference in GPU tests.

use super::{FrameView, PresentError, Presenter};
use crate::cells::CellBuffer;

/// Resolve every cell to an RGBA8 pixel.
///
/// Colors are the palette entry scaled by the glyph's coverage. With
/// `highlight` set, cells in the dirty set are drawn in that color instead.
pub fn resolve(cells: &CellBuffer, highlight: Option<[u8; 3]>) -> Vec<u8> {
    let coverage = cells.layout().coverage_table();
    let dirty = cells.dirty();
    let mut pixels = Vec::with_capacity(cells.cells().len() * 4);

    for (i, cell) in cells.cells().iter().enumerate() {
        let rgb = match highlight {
            Some(color) if dirty.contains(i as u32) => color,
            _ => {
                let weight = coverage[cell.glyph as usize] as u32;
                cells
                    .color(cell.palette)
                    .map(|c| ((c as u32 * weight + 127) / 255) as u8)
            }
        };
        pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
    }
    pixels
}

/// Presenter that keeps the last resolved frame in memory.
#[derive(Debug, Default)]
pub struct CpuPresenter {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    presented: u64,
}

impl CpuPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// RGBA8 pixels of the last presented frame.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Presenter for CpuPresenter {
    fn present(&mut self, frame: FrameView<'_>) -> Result<(), PresentError> {
        let cells = frame.cells;
        self.pixels = resolve(cells, frame.highlight);
        self.width = cells.width() as u32;
        self.height = cells.height() as u32;
        self.presented += 1;
        Ok(())
    }
}
