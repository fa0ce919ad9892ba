//! GPU presentation backend.
//!
//! Draws the cell buffer with WebGPU (wgpu) into an offscreen target the size
//! of the cell grid.

mod presenter;

pub use presenter::GpuPresenter;

/// Error type for GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Grid {width}x{height} exceeds the device texture limit of {max}")]
    GridTooLarge { width: u32, height: u32, max: u32 },

    #[error("Shader compilation failed: {0}")]
    ShaderCompile(String),

    #[error("Buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),
}
