//! MRV Player - Palette/glyph delta-video decoding and playback.
//!
//! An MRV movie is a zip archive holding one binary stream of full keyframes
//! (a 256-color palette plus every cell) and sparse delta frames (a list of
//! cell edits). This crate extracts and indexes the stream, keeps a cell
//! buffer in sync with the playback position and presents it through the CPU
//! or a wgpu backend.
//!
//! # Architecture
//!
//! - `format`: Container extraction, header, frame records, index, decoder
//! - `cells`: The decoded cell buffer and its change tracking
//! - `playback`: Clock, view transform, commands and the [`Player`] session
//! - `render`: Presenters (CPU resolve and GPU upload/draw)
//! - `schema`: Player configuration
//! - `progress`: Load progress reporting
//!
//! # Example
//!
//! ```rust,no_run
//! use mrv_player::{CpuPresenter, Player, PlayerConfig};
//!
//! let mut player = Player::new(PlayerConfig::default())?;
//! player.set_presenter(Box::new(CpuPresenter::new()));
//!
//! let report = player.load_file("clip.mrv", &mut |percent: f32, message: &str| {
//!     println!("{percent:5.1}% {message}");
//! })?;
//! println!("{} frames at {} fps", report.frames, report.fps);
//!
//! player.play(0.0)?;
//! for k in 1..=report.frames {
//!     player.tick(k as f64 * 1000.0 / report.fps as f64)?;
//! }
//! # Ok::<(), mrv_player::PlayerError>(())
//! ```

pub mod cells;
pub mod format;
pub mod playback;
pub mod progress;
pub mod render;
pub mod schema;

// WebAssembly bindings (only for wasm32 target)
#[cfg(target_arch = "wasm32")]
pub mod wasm;

// Re-export commonly used types
pub use cells::CellBuffer;
pub use format::{CellLayout, Container, FrameDecoder, StreamHeader};
pub use playback::{Command, LoadOutcome, LoadReport, Player, PlayerError};
pub use progress::{NoProgress, ProgressSink};
pub use render::{CpuPresenter, GpuPresenter, Presenter};
pub use schema::PlayerConfig;
