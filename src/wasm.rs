//! WebAssembly bindings for the MRV player.
//!
//! Provides thin wrappers around [`Player`] for browser environments. The
//! page owns the animation loop and the canvas: it calls `tick` from
//! `requestAnimationFrame` and, when a redraw is due, copies `pixels` into an
//! `ImageData`.
//!
//! [`WasmPlayer`] resolves frames on the CPU and leaves the view transform to
//! CSS. [`WasmGpuPlayer`] presents through WebGPU, uploading only the rows
//! each frame changed and applying the transform in the shader.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{
    format::{CellLayout, StreamHeader},
    playback::{Command, LoadOutcome, LoadTicket, Player, TickPlan},
    progress::ProgressSink,
    render::{GpuPresenter, cpu},
    schema::PlayerConfig,
};

/// Initialize WASM module with panic hook and logging.
#[wasm_bindgen(start)]
pub fn init() {
    // Set panic hook for better error messages in browser
    console_error_panic_hook::set_once();

    // Initialize WASM logger
    wasm_logger::init(wasm_logger::Config::default());
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Forwards progress to a JavaScript `(percent, message) => void` callback.
struct JsProgress<'a>(Option<&'a js_sys::Function>);

impl ProgressSink for JsProgress<'_> {
    fn report(&mut self, percent: f32, message: &str) {
        if let Some(callback) = self.0 {
            let _ = callback.call2(
                &JsValue::NULL,
                &JsValue::from_f64(percent as f64),
                &JsValue::from_str(message),
            );
        }
    }
}

/// WebAssembly wrapper for a playback session.
#[wasm_bindgen]
pub struct WasmPlayer {
    player: Player,
    pending: Option<LoadTicket>,
    redraw: bool,
}

#[wasm_bindgen]
impl WasmPlayer {
    /// Create a player from JSON configuration (empty string for defaults).
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmPlayer, JsValue> {
        let config = if config_json.trim().is_empty() {
            PlayerConfig::default()
        } else {
            PlayerConfig::from_json(config_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid config JSON: {e}")))?
        };
        let player = Player::new(config).map_err(js_error)?;
        Ok(WasmPlayer {
            player,
            pending: None,
            redraw: false,
        })
    }

    /// Start a load and return its generation.
    ///
    /// Call before reading the file so that a later selection supersedes an
    /// earlier one still being read.
    #[wasm_bindgen(js_name = beginLoad)]
    pub fn begin_load(&mut self) -> f64 {
        let ticket = self.player.begin_load();
        self.pending = Some(ticket);
        ticket.generation() as f64
    }

    /// Finish load `generation` with the archive bytes.
    ///
    /// Returns the load report, or `null` when a newer load superseded this
    /// one.
    #[wasm_bindgen]
    pub fn load(
        &mut self,
        generation: f64,
        archive: &[u8],
        progress: Option<js_sys::Function>,
    ) -> Result<JsValue, JsValue> {
        let Some(ticket) = self
            .pending
            .filter(|ticket| ticket.generation() as f64 == generation)
        else {
            log::debug!("ignoring superseded load {generation}");
            return Ok(JsValue::NULL);
        };
        self.pending = None;

        let mut sink = JsProgress(progress.as_ref());
        let prepared = Player::prepare(ticket, archive, self.player.config(), &mut sink);
        match self.player.finish_load(ticket, prepared).map_err(js_error)? {
            LoadOutcome::Loaded(report) => {
                self.redraw = true;
                to_js(&report)
            }
            LoadOutcome::Superseded { .. } => Ok(JsValue::NULL),
        }
    }

    /// Advance to `now_ms`. Returns true when the frame should be redrawn.
    #[wasm_bindgen]
    pub fn tick(&mut self, now_ms: f64) -> Result<bool, JsValue> {
        if !self.player.is_loaded() {
            return Ok(false);
        }
        let plan = self.player.tick(now_ms).map_err(js_error)?;
        let redraw = self.redraw || plan != TickPlan::Idle;
        self.redraw = false;
        Ok(redraw)
    }

    /// Handle a DOM `KeyboardEvent.code`. Returns false for unmapped keys.
    #[wasm_bindgen]
    pub fn key(&mut self, code: &str, now_ms: f64) -> Result<bool, JsValue> {
        let Some(command) = Command::from_key(code) else {
            return Ok(false);
        };
        self.apply(command, now_ms)?;
        Ok(true)
    }

    /// Apply a command object, e.g. `{ type: "zoom", x, y, wheel_delta }`.
    #[wasm_bindgen]
    pub fn command(&mut self, command: JsValue, now_ms: f64) -> Result<(), JsValue> {
        let command: Command = serde_wasm_bindgen::from_value(command)
            .map_err(|e| JsValue::from_str(&format!("Invalid command: {e}")))?;
        self.apply(command, now_ms)
    }

    /// RGBA pixels of the current frame, `width * height * 4` bytes.
    #[wasm_bindgen]
    pub fn pixels(&self) -> Vec<u8> {
        let highlight = self
            .player
            .highlight()
            .then_some(self.player.config().highlight_color);
        self.player
            .cells()
            .map(|cells| cpu::resolve(cells, highlight))
            .unwrap_or_default()
    }

    /// Get playback state (frame, rate, view transform) as JSON.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        match self.player.state() {
            Some(state) => to_js(state),
            None => Ok(JsValue::NULL),
        }
    }

    /// Get debug variables and the keys changed since the last call.
    #[wasm_bindgen(js_name = getDebug)]
    pub fn get_debug(&mut self) -> Result<JsValue, JsValue> {
        #[derive(Serialize)]
        struct DebugUpdate {
            values: crate::playback::DebugSnapshot,
            changed: Vec<&'static str>,
        }

        match self.player.debug_update() {
            Some((values, changed)) => to_js(&DebugUpdate { values, changed }),
            None => Ok(JsValue::NULL),
        }
    }

    /// Get the current frame's delta listing.
    #[wasm_bindgen(js_name = getDeltas)]
    pub fn get_deltas(&self) -> Result<JsValue, JsValue> {
        if !self.player.is_loaded() {
            return Ok(JsValue::NULL);
        }
        let listing = self.player.delta_listing().map_err(js_error)?;
        to_js(&listing)
    }

    /// Whether playback is running.
    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    /// Get grid width.
    #[wasm_bindgen(js_name = getWidth)]
    pub fn get_width(&self) -> u32 {
        self.player.header().map_or(0, |h| h.width as u32)
    }

    /// Get grid height.
    #[wasm_bindgen(js_name = getHeight)]
    pub fn get_height(&self) -> u32 {
        self.player.header().map_or(0, |h| h.height as u32)
    }

    /// Get frame count.
    #[wasm_bindgen(js_name = getFrameCount)]
    pub fn get_frame_count(&self) -> usize {
        self.player.frame_count()
    }
}

impl WasmPlayer {
    fn apply(&mut self, command: Command, now_ms: f64) -> Result<(), JsValue> {
        if !self.player.is_loaded() {
            return Ok(());
        }
        self.player.apply(command, now_ms).map_err(js_error)?;
        self.redraw = true;
        Ok(())
    }
}

// ============================================================================
// GPU Player (WebGPU)
// ============================================================================

/// WebAssembly wrapper for a playback session presented with WebGPU.
#[wasm_bindgen]
pub struct WasmGpuPlayer {
    session: WasmPlayer,
    presenter: GpuPresenter,
}

#[wasm_bindgen]
impl WasmGpuPlayer {
    /// Create a GPU player from JSON configuration (empty string for defaults).
    ///
    /// This is async because GPU initialization requires async adapter/device requests.
    #[wasm_bindgen(constructor)]
    pub async fn new(config_json: &str) -> Result<WasmGpuPlayer, JsValue> {
        let session = WasmPlayer::new(config_json)?;

        // Sized to the movie's grid once one loads.
        let placeholder = StreamHeader {
            layout: CellLayout::Pixel,
            width: 1,
            height: 1,
            fps: 1,
            declared_frames: None,
        };
        let presenter = GpuPresenter::new(&placeholder)
            .await
            .map_err(|e| JsValue::from_str(&format!("GPU initialization failed: {e}")))?;

        Ok(WasmGpuPlayer { session, presenter })
    }

    /// Start a load and return its generation.
    #[wasm_bindgen(js_name = beginLoad)]
    pub fn begin_load(&mut self) -> f64 {
        self.session.begin_load()
    }

    /// Finish load `generation`; `null` when superseded.
    #[wasm_bindgen]
    pub fn load(
        &mut self,
        generation: f64,
        archive: &[u8],
        progress: Option<js_sys::Function>,
    ) -> Result<JsValue, JsValue> {
        let report = self.session.load(generation, archive, progress)?;
        if !report.is_null()
            && let Some(header) = self.session.player.header()
            && let Err(e) = self.presenter.resize_to(header)
        {
            self.session.player.unload();
            return Err(js_error(e));
        }
        Ok(report)
    }

    /// Advance to `now_ms` and draw on the GPU when the frame changed.
    ///
    /// Returns true when a new image is ready for `pixels`.
    #[wasm_bindgen]
    pub fn tick(&mut self, now_ms: f64) -> Result<bool, JsValue> {
        let redraw = self.session.tick(now_ms)?;
        if redraw {
            self.session
                .player
                .present_to(&mut self.presenter)
                .map_err(js_error)?;
        }
        Ok(redraw)
    }

    /// Handle a DOM `KeyboardEvent.code`. Returns false for unmapped keys.
    #[wasm_bindgen]
    pub fn key(&mut self, code: &str, now_ms: f64) -> Result<bool, JsValue> {
        self.session.key(code, now_ms)
    }

    /// Apply a command object; drawn on the next `tick`.
    #[wasm_bindgen]
    pub fn command(&mut self, command: JsValue, now_ms: f64) -> Result<(), JsValue> {
        self.session.command(command, now_ms)
    }

    /// RGBA pixels of the last GPU present (async to allow GPU readback).
    ///
    /// Await the result before the next `tick`.
    #[wasm_bindgen]
    pub async fn pixels(&self) -> Result<Vec<u8>, JsValue> {
        self.presenter.read_pixels_async().await.map_err(js_error)
    }

    /// Get playback state (frame, rate, view transform) as JSON.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        self.session.get_state()
    }

    /// Get debug variables and the keys changed since the last call.
    #[wasm_bindgen(js_name = getDebug)]
    pub fn get_debug(&mut self) -> Result<JsValue, JsValue> {
        self.session.get_debug()
    }

    /// Get the current frame's delta listing.
    #[wasm_bindgen(js_name = getDeltas)]
    pub fn get_deltas(&self) -> Result<JsValue, JsValue> {
        self.session.get_deltas()
    }

    /// Whether playback is running.
    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    /// Get grid width.
    #[wasm_bindgen(js_name = getWidth)]
    pub fn get_width(&self) -> u32 {
        self.session.get_width()
    }

    /// Get grid height.
    #[wasm_bindgen(js_name = getHeight)]
    pub fn get_height(&self) -> u32 {
        self.session.get_height()
    }

    /// Get frame count.
    #[wasm_bindgen(js_name = getFrameCount)]
    pub fn get_frame_count(&self) -> usize {
        self.session.get_frame_count()
    }
}
