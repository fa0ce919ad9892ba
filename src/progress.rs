//! Load progress reporting.
//!
//! Every load stage reports `(percent, message)` pairs on its own 0-100 scale.
//! [`StageProgress`] maps a stage's scale onto a band of the overall load bar
//! before forwarding to the caller's sink.

use serde::{Deserialize, Serialize};

/// Receiver of `(percent, message)` progress updates.
///
/// Implemented for every `FnMut(f32, &str)`, so closures can be passed directly.
pub trait ProgressSink {
    fn report(&mut self, percent: f32, message: &str);
}

impl<F: FnMut(f32, &str)> ProgressSink for F {
    fn report(&mut self, percent: f32, message: &str) {
        self(percent, message)
    }
}

/// Sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: f32, _message: &str) {}
}

/// A band `[start, start + span]` of the overall progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressBand {
    pub start: f32,
    pub span: f32,
}

impl ProgressBand {
    pub const fn new(start: f32, end: f32) -> Self {
        Self {
            start,
            span: end - start,
        }
    }

    /// Map a stage-local percentage (0-100) into this band.
    #[inline]
    pub fn map(&self, stage_percent: f32) -> f32 {
        self.start + stage_percent.clamp(0.0, 100.0) * self.span / 100.0
    }
}

/// Overall progress layout of a load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressStages {
    /// Opening the archive.
    pub unzip: ProgressBand,
    /// Decompressing the movie entry.
    pub read: ProgressBand,
    /// Scanning and decoding the binary stream.
    pub parse: ProgressBand,
}

impl Default for ProgressStages {
    fn default() -> Self {
        Self {
            unzip: ProgressBand::new(0.0, 5.0),
            read: ProgressBand::new(5.0, 85.0),
            parse: ProgressBand::new(85.0, 99.0),
        }
    }
}

/// Forwards a stage's local progress into a band of an outer sink.
pub struct StageProgress<'a> {
    inner: &'a mut dyn ProgressSink,
    band: ProgressBand,
}

impl<'a> StageProgress<'a> {
    pub fn new(inner: &'a mut dyn ProgressSink, band: ProgressBand) -> Self {
        Self { inner, band }
    }
}

impl ProgressSink for StageProgress<'_> {
    fn report(&mut self, percent: f32, message: &str) {
        let overall = self.band.map(percent);
        self.inner.report(overall, message);
    }
}

/// Percentage reported for frame `frame` of `total` while a pass is running.
///
/// Never reaches 100 before the terminal report.
#[inline]
pub fn frame_percent(frame: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (frame as f32 / total as f32 * 100.0).min(99.9)
}
