//! Frame presentation.
//!
//! A [`Presenter`] receives the cell buffer once per presented frame together
//! with the region that changed since the previous present. The GPU presenter
//! uploads only that region and issues one draw; the CPU presenter resolves
//! the whole image in software.

pub mod cpu;
pub mod gpu;
pub mod upload;

pub use cpu::CpuPresenter;
pub use gpu::{GpuError, GpuPresenter};
pub use upload::UploadPlan;

use crate::cells::{CellBuffer, StaleRegion};
use crate::format::StreamHeader;
use crate::playback::ViewTransform;

/// Everything a presenter needs for one frame.
#[derive(Debug, Clone)]
pub struct FrameView<'a> {
    pub cells: &'a CellBuffer,
    /// Palette and rows changed since the previous present.
    pub stale: StaleRegion,
    pub transform: ViewTransform,
    /// Highlight color for changed cells, when highlighting is on.
    pub highlight: Option<[u8; 3]>,
}

/// Draws frames.
pub trait Presenter {
    /// Prepare for a newly loaded stream. Called before its first present.
    fn resize(&mut self, header: &StreamHeader) -> Result<(), PresentError> {
        let _ = header;
        Ok(())
    }

    fn present(&mut self, frame: FrameView<'_>) -> Result<(), PresentError>;
}

/// Errors raised while presenting a frame.
#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("Presenter is sized {expected:?} but the frame is {actual:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}
