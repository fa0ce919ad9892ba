//! Playback module - Clock, view transform, commands and the player session.
//!
//! The [`Player`] owns one loaded movie. Time is passed in by the caller as
//! milliseconds on any monotonic scale, so the same session runs under a
//! browser animation loop, a native event loop or a test.

mod clock;
mod command;
mod debug;
mod player;
mod transform;

pub use clock::*;
pub use command::*;
pub use debug::*;
pub use player::*;
pub use transform::*;
