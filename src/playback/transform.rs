//! Display transform applied on top of the rendered frame.
//!
//! Pan, zoom and rotation never touch the cell buffer; they only change how
//! the presented image is placed on screen.

use serde::{Deserialize, Serialize};

use crate::schema::ZoomLimits;

/// Scale, translation (screen pixels) and rotation (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
    /// Degrees in `[-180, 180]`.
    pub rotation: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
            rotation: 0.0,
        }
    }
}

impl ViewTransform {
    /// Set the scale, clamped into `limits`. NaN is ignored.
    pub fn set_scale(&mut self, scale: f32, limits: &ZoomLimits) {
        if !scale.is_nan() {
            self.scale = scale.clamp(limits.min, limits.max);
        }
    }

    /// Wheel zoom keeping the point under `(anchor_x, anchor_y)` fixed.
    ///
    /// Positive `wheel_delta` zooms out. Non-finite inputs are ignored.
    pub fn zoom_at(&mut self, anchor_x: f32, anchor_y: f32, wheel_delta: f32, limits: &ZoomLimits) {
        if ![anchor_x, anchor_y, wheel_delta].iter().all(|v| v.is_finite()) {
            return;
        }
        let canvas_x = (anchor_x - self.translate_x) / self.scale;
        let canvas_y = (anchor_y - self.translate_y) / self.scale;
        let factor = 1.0 - wheel_delta * limits.wheel_sensitivity;
        let scale = (self.scale * factor).clamp(limits.min, limits.max);

        self.translate_x = anchor_x - canvas_x * scale;
        self.translate_y = anchor_y - canvas_y * scale;
        self.scale = scale;
    }

    /// Drag pan by pointer deltas.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        self.translate_x += dx;
        self.translate_y += dy;
    }

    /// Rotate by `degrees`, wrapping back into `[-180, 180]`.
    ///
    /// Non-finite angles are ignored.
    pub fn rotate(&mut self, degrees: f32) {
        if !degrees.is_finite() {
            return;
        }
        let rotation = self.rotation + degrees;
        self.rotation = if (-180.0..=180.0).contains(&rotation) {
            rotation
        } else {
            (rotation + 180.0).rem_euclid(360.0) - 180.0
        };
    }

    /// Reset scale and translation, keeping rotation.
    pub fn reset_view(&mut self) {
        self.scale = 1.0;
        self.translate_x = 0.0;
        self.translate_y = 0.0;
    }

    pub fn reset_rotation(&mut self) {
        self.rotation = 0.0;
    }

    /// Rotation in radians.
    #[inline]
    pub fn radians(&self) -> f32 {
        self.rotation.to_radians()
    }
}
