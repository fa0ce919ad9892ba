//! Playback clock and scheduler.
//!
//! The clock is driven by [`PlaybackClock::tick`] with a millisecond timestamp,
//! either from a display-refresh driver or from a test's fake clock. It never
//! decodes anything itself: each tick returns a [`TickPlan`] telling the
//! session which frames to decode before presenting once.

use serde::Serialize;

use super::transform::ViewTransform;
use crate::schema::{RateLimits, SchedulingMode};

/// Slack added before flooring elapsed frame counts so that ticks landing
/// exactly on a frame boundary are not lost to rounding.
const FRAME_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Work requested by one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPlan {
    /// Nothing to decode or present.
    Idle,
    /// Decode every frame in `from + 1..=to` in order, then present once.
    Advance { from: usize, to: usize },
    /// Playback wrapped: bring the buffer to frame 0 and present it.
    Loop,
}

/// Playback state owned by the clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlaybackState {
    pub current_frame: usize,
    pub play_state: PlayState,
    pub rate: f64,
    /// Timestamp (ms) the scheduler measures elapsed time from.
    pub anchor_ms: f64,
    pub transform: ViewTransform,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_frame: 0,
            play_state: PlayState::Stopped,
            rate: 1.0,
            anchor_ms: 0.0,
            transform: ViewTransform::default(),
        }
    }
}

impl PlaybackState {
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.play_state == PlayState::Playing
    }
}

/// Maps wall-clock time to frame numbers.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    mode: SchedulingMode,
    fps: f64,
    total: usize,
    state: PlaybackState,
    /// Frame number at `anchor_ms` (timeline mode).
    anchor_frame: usize,
}

impl PlaybackClock {
    pub fn new(fps: f64, total: usize, mode: SchedulingMode) -> Self {
        Self {
            mode,
            fps,
            total,
            state: PlaybackState::default(),
            anchor_frame: 0,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.state.transform
    }

    pub fn transform_mut(&mut self) -> &mut ViewTransform {
        &mut self.state.transform
    }

    #[inline]
    pub fn current_frame(&self) -> usize {
        self.state.current_frame
    }

    #[inline]
    pub fn total_frames(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn mode(&self) -> SchedulingMode {
        self.mode
    }

    /// Unscaled frame interval in milliseconds.
    #[inline]
    pub fn base_interval_ms(&self) -> f64 {
        1000.0 / self.fps
    }

    /// Frame interval at the current rate.
    #[inline]
    pub fn interval_ms(&self) -> f64 {
        self.base_interval_ms() / self.state.rate
    }

    /// Start or resume playback, anchoring elapsed time at `now_ms`.
    ///
    /// Returns false if already playing.
    pub fn play(&mut self, now_ms: f64) -> bool {
        if self.is_playing() || self.total == 0 {
            return false;
        }
        self.state.play_state = PlayState::Playing;
        self.anchor(now_ms);
        true
    }

    /// Returns false if not playing.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.state.play_state = PlayState::Paused;
        true
    }

    pub fn toggle(&mut self, now_ms: f64) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play(now_ms);
        }
    }

    /// Back to the initial state: stopped at frame 0, rate and view reset.
    pub fn reset(&mut self) {
        self.state = PlaybackState::default();
        self.anchor_frame = 0;
    }

    fn anchor(&mut self, now_ms: f64) {
        self.state.anchor_ms = now_ms;
        self.anchor_frame = self.state.current_frame;
    }

    /// Change the playback rate, clamped into `limits`.
    ///
    /// Non-finite rates are ignored and the current rate is returned.
    /// In timeline mode the anchor is moved so the fractional progress toward
    /// the next frame is kept and the target frame does not jump.
    pub fn set_rate(&mut self, rate: f64, limits: &RateLimits, now_ms: f64) -> f64 {
        if !rate.is_finite() {
            log::debug!("ignoring non-finite rate {rate}");
            return self.state.rate;
        }
        let rate = limits.clamp(rate);
        if self.mode == SchedulingMode::Timeline && self.is_playing() {
            let position = self.anchor_frame as f64
                + (now_ms - self.state.anchor_ms) * self.fps * self.state.rate / 1000.0;
            let progress = (position - self.state.current_frame as f64).clamp(0.0, 1.0 - FRAME_EPSILON);
            self.anchor_frame = self.state.current_frame;
            self.state.anchor_ms = now_ms - progress * 1000.0 / (self.fps * rate);
        }
        self.state.rate = rate;
        rate
    }

    /// Pause and move `delta` frames, wrapping in both directions.
    pub fn seek_by(&mut self, delta: i64) -> usize {
        self.pause();
        if self.total == 0 {
            return 0;
        }
        let total = self.total as i64;
        let step = delta.rem_euclid(total);
        let frame = ((self.state.current_frame as i64 + step) % total) as usize;
        self.state.current_frame = frame;
        self.anchor_frame = frame;
        frame
    }

    /// Advance the schedule to `now_ms`.
    pub fn tick(&mut self, now_ms: f64) -> TickPlan {
        if !self.is_playing() || self.total == 0 {
            return TickPlan::Idle;
        }
        match self.mode {
            SchedulingMode::Timeline => self.tick_timeline(now_ms),
            SchedulingMode::Interval => self.tick_interval(now_ms),
        }
    }

    fn tick_timeline(&mut self, now_ms: f64) -> TickPlan {
        let elapsed = (now_ms - self.state.anchor_ms).max(0.0);
        let steps = (elapsed * self.fps * self.state.rate / 1000.0 + FRAME_EPSILON).floor();
        let target = self.anchor_frame.saturating_add(steps as usize);

        if target >= self.total {
            self.state.current_frame = 0;
            self.anchor(now_ms);
            return TickPlan::Loop;
        }
        if target > self.state.current_frame {
            let from = self.state.current_frame;
            self.state.current_frame = target;
            return TickPlan::Advance { from, to: target };
        }
        TickPlan::Idle
    }

    fn tick_interval(&mut self, now_ms: f64) -> TickPlan {
        let interval = self.interval_ms();
        let elapsed = now_ms - self.state.anchor_ms;
        if elapsed + FRAME_EPSILON < interval {
            return TickPlan::Idle;
        }
        self.state.anchor_ms = now_ms - (elapsed % interval);

        let from = self.state.current_frame;
        let next = (from + 1) % self.total;
        self.state.current_frame = next;
        if next == 0 {
            TickPlan::Loop
        } else {
            TickPlan::Advance { from, to: next }
        }
    }
}
