//! User commands accepted by a playback session.

use serde::{Deserialize, Serialize};

/// One user interaction, decoupled from the input device that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    TogglePlay,
    Play,
    Pause,
    /// Pause and step by this many frames (wraps).
    Seek { delta: i64 },
    /// Raise the playback rate by one configured step.
    RateUp,
    RateDown,
    SetRate { rate: f64 },
    /// Rotate by one configured step; `clockwise = false` rotates back.
    Rotate { clockwise: bool },
    SetRotation { degrees: f32 },
    ResetRotation,
    /// Reset scale and translation.
    ResetView,
    /// Wheel zoom around a screen-space anchor.
    Zoom { x: f32, y: f32, wheel_delta: f32 },
    /// Drag pan by pointer deltas.
    Pan { dx: f32, dy: f32 },
    ToggleHighlight,
}

impl Command {
    /// Map a keyboard `code` (as reported by DOM `KeyboardEvent.code`).
    pub fn from_key(code: &str) -> Option<Self> {
        let command = match code {
            "Space" => Command::TogglePlay,
            "ArrowRight" => Command::Seek { delta: 1 },
            "ArrowLeft" => Command::Seek { delta: -1 },
            "ArrowUp" => Command::RateUp,
            "ArrowDown" => Command::RateDown,
            "BracketRight" => Command::Rotate { clockwise: true },
            "BracketLeft" => Command::Rotate { clockwise: false },
            "KeyR" => Command::ResetRotation,
            "KeyF" => Command::ResetView,
            "KeyH" => Command::ToggleHighlight,
            _ => return None,
        };
        Some(command)
    }
}
