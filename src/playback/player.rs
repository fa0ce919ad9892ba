//! Playback session: owns the loaded movie, its cell buffer and clock, and
//! drives a presenter.

use std::path::Path;

use super::clock::{PlaybackClock, PlaybackState, TickPlan};
use super::command::Command;
use super::debug::{DebugSnapshot, DeltaListing};
use crate::cells::CellBuffer;
use crate::format::{
    CellLayout, Container, ContainerError, FormatError, FrameDecoder, StreamHeader,
    StreamTruncation,
};
use crate::progress::{ProgressSink, StageProgress};
use crate::render::{FrameView, GpuError, PresentError, Presenter};
use crate::schema::{ConfigError, PlayerConfig};

/// Errors surfaced by a playback session.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Present(#[from] PresentError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("No movie loaded")]
    NotLoaded,
}

/// Handle for one load request. Only the most recent ticket can install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A movie extracted, indexed and validated, not yet installed.
#[derive(Debug)]
pub struct PreparedMovie {
    generation: u64,
    decoder: FrameDecoder,
}

impl PreparedMovie {
    pub fn header(&self) -> &StreamHeader {
        self.decoder.header()
    }
}

/// Summary of an installed movie.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LoadReport {
    pub entry: String,
    pub layout: CellLayout,
    pub width: u16,
    pub height: u16,
    pub fps: u16,
    pub frames: usize,
    pub keyframes: usize,
    pub bytes: usize,
    #[serde(skip)]
    pub truncation: Option<StreamTruncation>,
}

/// Result of finishing a load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(LoadReport),
    /// A newer load started after this one; its result was discarded.
    Superseded { generation: u64 },
}

/// State that exists only while a movie is loaded.
struct Movie {
    decoder: FrameDecoder,
    cells: CellBuffer,
    clock: PlaybackClock,
}

/// One playback session.
///
/// Usage:
/// ```ignore
/// let mut player = Player::new(PlayerConfig::default())?;
/// player.set_presenter(Box::new(CpuPresenter::new()));
/// player.load_file("clip.mrv", &mut |p: f32, m: &str| println!("{p:5.1}% {m}"))?;
/// player.play(now);
/// loop {
///     player.tick(now)?;
/// }
/// ```
pub struct Player {
    config: PlayerConfig,
    presenter: Option<Box<dyn Presenter>>,
    movie: Option<Movie>,
    generation: u64,
    highlight: bool,
    /// The view or highlight changed without a frame change.
    needs_present: bool,
    presented: u64,
    previous_snapshot: Option<DebugSnapshot>,
}

impl Player {
    pub fn new(config: PlayerConfig) -> Result<Self, PlayerError> {
        config.validate()?;
        Ok(Self {
            config,
            presenter: None,
            movie: None,
            generation: 0,
            highlight: false,
            needs_present: false,
            presented: 0,
            previous_snapshot: None,
        })
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Attach a presenter. The next tick uploads and draws everything.
    pub fn set_presenter(&mut self, presenter: Box<dyn Presenter>) {
        self.presenter = Some(presenter);
        if let Some(movie) = self.movie.as_mut() {
            movie.cells.invalidate();
            self.needs_present = true;
        }
    }

    pub fn take_presenter(&mut self) -> Option<Box<dyn Presenter>> {
        self.presenter.take()
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Start a load: pauses playback and supersedes any load in flight.
    pub fn begin_load(&mut self) -> LoadTicket {
        if let Some(movie) = self.movie.as_mut() {
            movie.clock.pause();
        }
        self.generation += 1;
        log::debug!("load generation {} started", self.generation);
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Extract, index and stream-decode an archive.
    ///
    /// Touches no session state, so it can run while the session keeps
    /// playing. Reports overall progress through the configured bands.
    pub fn prepare(
        ticket: LoadTicket,
        archive: &[u8],
        config: &PlayerConfig,
        progress: &mut dyn ProgressSink,
    ) -> Result<PreparedMovie, PlayerError> {
        let container =
            Container::from_archive(archive, &config.entry_names, &config.progress, progress)?;
        Self::prepare_container(ticket, container, config, progress)
    }

    /// [`Player::prepare`] for an already-extracted container.
    pub fn prepare_container(
        ticket: LoadTicket,
        container: Container,
        config: &PlayerConfig,
        progress: &mut dyn ProgressSink,
    ) -> Result<PreparedMovie, PlayerError> {
        let mut stage = StageProgress::new(progress, config.progress.parse);
        let decoder = FrameDecoder::new(container, &mut stage)?;
        let mut scratch = CellBuffer::new(decoder.header());
        decoder.decode_stream(&mut scratch, &mut stage, |_, _, _| {})?;

        progress.report(config.progress.parse.map(100.0), "Finalizing data...");
        progress.report(100.0, "Load complete!");
        Ok(PreparedMovie {
            generation: ticket.generation,
            decoder,
        })
    }

    /// Install a prepared movie, or report a failed load.
    ///
    /// Results of superseded tickets are discarded without touching the
    /// session, errors included. A failed current load unloads the session.
    /// The attached presenter is resized for the new stream, and the movie is
    /// positioned at frame 0 and left stopped.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        prepared: Result<PreparedMovie, PlayerError>,
    ) -> Result<LoadOutcome, PlayerError> {
        if ticket.generation != self.generation {
            log::debug!(
                "discarding load generation {} (current {})",
                ticket.generation,
                self.generation
            );
            return Ok(LoadOutcome::Superseded {
                generation: ticket.generation,
            });
        }
        let prepared = match prepared {
            Ok(prepared) if prepared.generation == ticket.generation => prepared,
            Ok(prepared) => {
                return Ok(LoadOutcome::Superseded {
                    generation: prepared.generation,
                });
            }
            Err(err) => {
                log::error!("load failed: {err}");
                self.unload();
                return Err(err);
            }
        };

        let decoder = prepared.decoder;
        let header = *decoder.header();
        let mut cells = CellBuffer::new(&header);
        decoder.seek(0, &mut cells)?;
        if let Some(presenter) = self.presenter.as_mut()
            && let Err(err) = presenter.resize(&header)
        {
            log::error!("presenter cannot show the new movie: {err}");
            self.unload();
            return Err(err.into());
        }
        let clock = PlaybackClock::new(
            header.fps as f64,
            decoder.frame_count(),
            self.config.scheduling,
        );

        let report = LoadReport {
            entry: decoder.container().entry().to_string(),
            layout: header.layout,
            width: header.width,
            height: header.height,
            fps: header.fps,
            frames: decoder.frame_count(),
            keyframes: decoder.index().keyframes().len(),
            bytes: decoder.container().len(),
            truncation: decoder.truncation().copied(),
        };
        log::info!(
            "loaded {}x{} {} movie: {} frames at {} fps",
            report.width,
            report.height,
            report.layout.name(),
            report.frames,
            report.fps
        );

        self.movie = Some(Movie {
            decoder,
            cells,
            clock,
        });
        self.needs_present = true;
        self.previous_snapshot = None;
        Ok(LoadOutcome::Loaded(report))
    }

    /// Load an archive synchronously.
    pub fn load_bytes(
        &mut self,
        archive: &[u8],
        progress: &mut dyn ProgressSink,
    ) -> Result<LoadReport, PlayerError> {
        let ticket = self.begin_load();
        let prepared = Self::prepare(ticket, archive, &self.config, progress);
        self.installed(ticket, prepared)
    }

    /// Load an archive from disk.
    pub fn load_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        progress: &mut dyn ProgressSink,
    ) -> Result<LoadReport, PlayerError> {
        let ticket = self.begin_load();
        let prepared = Container::open(
            path,
            &self.config.entry_names,
            &self.config.progress,
            progress,
        )
        .map_err(PlayerError::from)
        .and_then(|container| Self::prepare_container(ticket, container, &self.config, progress));
        self.installed(ticket, prepared)
    }

    /// Load a bare stream that is not wrapped in an archive.
    pub fn load_stream(
        &mut self,
        data: Vec<u8>,
        layout: CellLayout,
        progress: &mut dyn ProgressSink,
    ) -> Result<LoadReport, PlayerError> {
        let ticket = self.begin_load();
        let container = Container::from_stream(data, layout);
        let prepared = Self::prepare_container(ticket, container, &self.config, progress);
        self.installed(ticket, prepared)
    }

    fn installed(
        &mut self,
        ticket: LoadTicket,
        prepared: Result<PreparedMovie, PlayerError>,
    ) -> Result<LoadReport, PlayerError> {
        match self.finish_load(ticket, prepared)? {
            LoadOutcome::Loaded(report) => Ok(report),
            // A synchronous load holds the latest ticket throughout.
            LoadOutcome::Superseded { .. } => Err(PlayerError::NotLoaded),
        }
    }

    /// Drop the loaded movie and return to the idle state.
    pub fn unload(&mut self) {
        self.movie = None;
        self.needs_present = false;
        self.previous_snapshot = None;
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.movie.is_some()
    }

    /// Generation of the most recent load request.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    fn movie(&self) -> Result<&Movie, PlayerError> {
        self.movie.as_ref().ok_or(PlayerError::NotLoaded)
    }

    fn movie_mut(&mut self) -> Result<&mut Movie, PlayerError> {
        self.movie.as_mut().ok_or(PlayerError::NotLoaded)
    }

    pub fn play(&mut self, now_ms: f64) -> Result<bool, PlayerError> {
        Ok(self.movie_mut()?.clock.play(now_ms))
    }

    pub fn pause(&mut self) -> Result<bool, PlayerError> {
        Ok(self.movie_mut()?.clock.pause())
    }

    pub fn toggle(&mut self, now_ms: f64) -> Result<(), PlayerError> {
        self.movie_mut()?.clock.toggle(now_ms);
        Ok(())
    }

    /// Advance playback to `now_ms`, decoding every frame passed and
    /// presenting at most once.
    pub fn tick(&mut self, now_ms: f64) -> Result<TickPlan, PlayerError> {
        let movie = self.movie_mut()?;
        let plan = movie.clock.tick(now_ms);
        match plan {
            TickPlan::Idle => {
                if self.needs_present {
                    self.present()?;
                }
            }
            TickPlan::Advance { from, to } => {
                movie.decoder.decode_range(from + 1, to, &mut movie.cells)?;
                self.present()?;
            }
            TickPlan::Loop => {
                movie.decoder.seek(0, &mut movie.cells)?;
                self.present()?;
            }
        }
        Ok(plan)
    }

    /// Pause and step `delta` frames (wrapping), then present immediately.
    pub fn seek(&mut self, delta: i64) -> Result<usize, PlayerError> {
        let movie = self.movie_mut()?;
        let from = movie.clock.current_frame();
        let frame = movie.clock.seek_by(delta);
        if frame == from + 1 {
            movie.decoder.decode_frame(frame, &mut movie.cells)?;
        } else if frame != from {
            movie.decoder.seek(frame, &mut movie.cells)?;
        }
        self.present()?;
        Ok(frame)
    }

    /// Pause and jump to an absolute frame, then present immediately.
    pub fn seek_to(&mut self, frame: usize) -> Result<usize, PlayerError> {
        let movie = self.movie()?;
        let target = frame.min(movie.clock.total_frames().saturating_sub(1));
        let delta = target as i64 - movie.clock.current_frame() as i64;
        self.seek(delta)
    }

    /// Set the playback rate; returns the clamped rate.
    pub fn set_rate(&mut self, rate: f64, now_ms: f64) -> Result<f64, PlayerError> {
        let limits = self.config.rate;
        Ok(self.movie_mut()?.clock.set_rate(rate, &limits, now_ms))
    }

    pub fn toggle_highlight(&mut self) -> bool {
        self.set_highlight(!self.highlight);
        self.highlight
    }

    pub fn set_highlight(&mut self, enabled: bool) {
        if self.highlight != enabled {
            self.highlight = enabled;
            self.needs_present = self.movie.is_some();
        }
    }

    pub fn highlight(&self) -> bool {
        self.highlight
    }

    /// Apply one user command at time `now_ms`.
    pub fn apply(&mut self, command: Command, now_ms: f64) -> Result<(), PlayerError> {
        let limits = self.config.rate;
        let zoom = self.config.zoom;
        let rotation_step = self.config.rotation_step_degrees;
        match command {
            Command::TogglePlay => self.toggle(now_ms)?,
            Command::Play => {
                self.play(now_ms)?;
            }
            Command::Pause => {
                self.pause()?;
            }
            Command::Seek { delta } => {
                self.seek(delta)?;
            }
            Command::RateUp | Command::RateDown => {
                let step = if command == Command::RateUp {
                    limits.step
                } else {
                    -limits.step
                };
                let current = self.movie()?.clock.state().rate;
                self.set_rate(current + step, now_ms)?;
            }
            Command::SetRate { rate } => {
                self.set_rate(rate, now_ms)?;
            }
            Command::ToggleHighlight => {
                self.toggle_highlight();
            }
            view_command => {
                let view = self.movie_mut()?.clock.transform_mut();
                match view_command {
                    Command::Rotate { clockwise: true } => view.rotate(rotation_step),
                    Command::Rotate { clockwise: false } => view.rotate(-rotation_step),
                    Command::SetRotation { degrees } => {
                        view.reset_rotation();
                        view.rotate(degrees);
                    }
                    Command::ResetRotation => view.reset_rotation(),
                    Command::ResetView => view.reset_view(),
                    Command::Zoom { x, y, wheel_delta } => view.zoom_at(x, y, wheel_delta, &zoom),
                    Command::Pan { dx, dy } => view.pan(dx, dy),
                    _ => {}
                }
                self.needs_present = true;
            }
        }
        Ok(())
    }

    /// Present the current frame now, if a presenter is attached.
    pub fn present(&mut self) -> Result<(), PlayerError> {
        self.movie()?;
        let Some(mut presenter) = self.presenter.take() else {
            return Ok(());
        };
        let result = self.present_to(presenter.as_mut());
        self.presenter = Some(presenter);
        result
    }

    /// Present the current frame to `presenter` instead of the attached one.
    ///
    /// Hands over everything that changed since the last present, so a
    /// session without an attached presenter can be drawn on demand.
    pub fn present_to(&mut self, presenter: &mut dyn Presenter) -> Result<(), PlayerError> {
        let movie = self.movie.as_mut().ok_or(PlayerError::NotLoaded)?;
        let stale = movie.cells.take_stale();
        let highlight = self.highlight.then_some(self.config.highlight_color);
        presenter.present(FrameView {
            cells: &movie.cells,
            stale,
            transform: *movie.clock.transform(),
            highlight,
        })?;
        self.needs_present = false;
        self.presented += 1;
        Ok(())
    }

    /// Number of presents issued since the session was created.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn header(&self) -> Option<&StreamHeader> {
        self.movie.as_ref().map(|movie| movie.decoder.header())
    }

    pub fn decoder(&self) -> Option<&FrameDecoder> {
        self.movie.as_ref().map(|movie| &movie.decoder)
    }

    pub fn cells(&self) -> Option<&CellBuffer> {
        self.movie.as_ref().map(|movie| &movie.cells)
    }

    pub fn state(&self) -> Option<&PlaybackState> {
        self.movie.as_ref().map(|movie| movie.clock.state())
    }

    pub fn current_frame(&self) -> Option<usize> {
        self.movie.as_ref().map(|movie| movie.clock.current_frame())
    }

    pub fn frame_count(&self) -> usize {
        self.movie
            .as_ref()
            .map_or(0, |movie| movie.clock.total_frames())
    }

    pub fn is_playing(&self) -> bool {
        self.movie
            .as_ref()
            .is_some_and(|movie| movie.clock.is_playing())
    }

    /// Current debug variables.
    pub fn snapshot(&self) -> Option<DebugSnapshot> {
        let movie = self.movie.as_ref()?;
        Some(DebugSnapshot::capture(
            movie.clock.state(),
            movie.clock.total_frames(),
        ))
    }

    /// Capture the debug variables and the keys changed since the last call.
    pub fn debug_update(&mut self) -> Option<(DebugSnapshot, Vec<&'static str>)> {
        let snapshot = self.snapshot()?;
        let changed = snapshot.changed_keys(self.previous_snapshot.as_ref());
        self.previous_snapshot = Some(snapshot.clone());
        Some((snapshot, changed))
    }

    /// What the current frame changed, with colors from the live palette.
    pub fn delta_listing(&self) -> Result<DeltaListing, PlayerError> {
        let movie = self.movie()?;
        let record = movie.decoder.record(movie.clock.current_frame())?;
        Ok(DeltaListing::build(
            &record,
            &movie.cells,
            self.config.delta_sample_limit,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PALETTE_BYTES;
    use crate::playback::PlayState;
    use crate::progress::NoProgress;
    use crate::render::CpuPresenter;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn keyframe(fill: u8) -> Vec<u8> {
        let mut frame = vec![0xFF];
        frame.extend(std::iter::repeat_n(fill, PALETTE_BYTES));
        frame.extend(std::iter::repeat_n(fill, 8));
        frame
    }

    fn delta(edits: &[(u8, u32)]) -> Vec<u8> {
        let mut frame = vec![0xFE];
        frame.extend_from_slice(&(edits.len() as u32).to_le_bytes());
        for (value, index) in edits {
            frame.push(*value);
            frame.extend_from_slice(&index.to_le_bytes());
        }
        frame
    }

    fn stream() -> Vec<u8> {
        let mut bytes = vec![4, 0, 2, 0, 10];
        for frame in [
            keyframe(7),
            delta(&[(9, 5)]),
            delta(&[(1, 0)]),
            delta(&[(2, 7)]),
        ] {
            bytes.extend_from_slice(&frame);
        }
        bytes
    }

    fn loaded() -> Player {
        let mut player = Player::new(PlayerConfig::default()).unwrap();
        player
            .load_stream(stream(), CellLayout::Pixel, &mut NoProgress)
            .unwrap();
        player
    }

    /// Presenter that records the stale regions it was handed.
    #[derive(Default, Clone)]
    struct Recorder(Rc<RefCell<Vec<PresentLog>>>);

    /// Presenter that, like the GPU one, only draws grids it was sized for.
    #[derive(Default, Clone)]
    struct GridBound(Rc<RefCell<Option<(u16, u16)>>>);

    impl Presenter for GridBound {
        fn resize(&mut self, header: &StreamHeader) -> Result<(), PresentError> {
            if header.width > 64 {
                return Err(PresentError::Gpu(GpuError::GridTooLarge {
                    width: header.width as u32,
                    height: header.height as u32,
                    max: 64,
                }));
            }
            *self.0.borrow_mut() = Some((header.width, header.height));
            Ok(())
        }

        fn present(&mut self, frame: FrameView<'_>) -> Result<(), PresentError> {
            let actual = (frame.cells.width(), frame.cells.height());
            match *self.0.borrow() {
                Some(expected) if expected == actual => Ok(()),
                expected => Err(PresentError::SizeMismatch {
                    expected: expected.map_or((0, 0), |(w, h)| (w as u32, h as u32)),
                    actual: (actual.0 as u32, actual.1 as u32),
                }),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct PresentLog {
        rows: Option<std::ops::Range<u32>>,
        palette: bool,
        highlight: bool,
    }

    impl Presenter for Recorder {
        fn present(&mut self, frame: FrameView<'_>) -> Result<(), PresentError> {
            self.0.borrow_mut().push(PresentLog {
                rows: frame.stale.rows,
                palette: frame.stale.palette,
                highlight: frame.highlight.is_some(),
            });
            Ok(())
        }
    }

    #[test]
    fn test_load_positions_at_frame_zero() {
        let player = loaded();
        assert_eq!(player.frame_count(), 4);
        assert_eq!(player.current_frame(), Some(0));
        assert_eq!(player.state().unwrap().play_state, PlayState::Stopped);
        assert!(player.cells().unwrap().cells().iter().all(|c| c.palette == 7));
    }

    #[test]
    fn test_tick_requires_movie() {
        let mut player = Player::new(PlayerConfig::default()).unwrap();
        assert!(matches!(player.tick(0.0), Err(PlayerError::NotLoaded)));
    }

    #[test]
    fn test_tick_decodes_skipped_frames_in_order() {
        let mut player = loaded();
        let recorder = Recorder::default();
        player.set_presenter(Box::new(recorder.clone()));
        player.play(0.0).unwrap();

        assert_eq!(player.tick(10.0).unwrap(), TickPlan::Idle);
        assert_eq!(
            player.tick(310.0).unwrap(),
            TickPlan::Advance { from: 0, to: 3 }
        );

        let cells = player.cells().unwrap();
        assert_eq!(cells.cell(5).unwrap().palette, 9);
        assert_eq!(cells.cell(0).unwrap().palette, 1);
        assert_eq!(cells.cell(7).unwrap().palette, 2);

        let log = recorder.0.borrow();
        assert_eq!(log.len(), 2);
        // Load-time present: everything.
        assert_eq!(log[0].rows, Some(0..2));
        assert!(log[0].palette);
        // Three coalesced deltas touching both rows.
        assert_eq!(log[1].rows, Some(0..2));
        assert!(!log[1].palette);
    }

    #[test]
    fn test_loop_restores_first_frame() {
        let mut player = loaded();
        player.set_presenter(Box::new(CpuPresenter::new()));
        let first = player.cells().unwrap().clone();
        player.play(0.0).unwrap();
        for k in 1..=4 {
            player.tick(100.0 * k as f64).unwrap();
        }
        assert_eq!(player.current_frame(), Some(0));
        assert!(player.cells().unwrap().same_image(&first));
    }

    #[test]
    fn test_seek_wraps_and_pauses() {
        let mut player = loaded();
        player.play(0.0).unwrap();
        assert_eq!(player.seek(-1).unwrap(), 3);
        assert!(!player.is_playing());
        assert_eq!(player.cells().unwrap().cell(7).unwrap().palette, 2);
        assert_eq!(player.seek(1).unwrap(), 0);
        assert!(player.cells().unwrap().cells().iter().all(|c| c.palette == 7));
        assert_eq!(player.seek_to(2).unwrap(), 2);
        assert_eq!(player.cells().unwrap().cell(0).unwrap().palette, 1);
    }

    #[test]
    fn test_superseded_load_is_discarded() {
        let mut player = loaded();
        let config = player.config().clone();
        let stale_ticket = player.begin_load();
        let fresh_ticket = player.begin_load();

        let container = Container::from_stream(stream(), CellLayout::Pixel);
        let prepared =
            Player::prepare_container(stale_ticket, container, &config, &mut NoProgress);
        let outcome = player.finish_load(stale_ticket, prepared).unwrap();
        assert_eq!(outcome, LoadOutcome::Superseded { generation: 2 });

        // A failure from the stale ticket is ignored too.
        let outcome = player
            .finish_load(stale_ticket, Err(PlayerError::NotLoaded))
            .unwrap();
        assert!(matches!(outcome, LoadOutcome::Superseded { .. }));
        assert!(player.is_loaded());

        let container = Container::from_stream(stream(), CellLayout::Pixel);
        let prepared =
            Player::prepare_container(fresh_ticket, container, &config, &mut NoProgress);
        assert!(matches!(
            player.finish_load(fresh_ticket, prepared).unwrap(),
            LoadOutcome::Loaded(_)
        ));
    }

    #[test]
    fn test_failed_load_unloads() {
        let mut player = loaded();
        let err = player
            .load_stream(vec![4, 0, 2, 0], CellLayout::Pixel, &mut NoProgress)
            .unwrap_err();
        assert!(matches!(
            err,
            PlayerError::Format(FormatError::HeaderTooShort { .. })
        ));
        assert!(!player.is_loaded());
    }

    #[test]
    fn test_load_progress_bands() {
        let mut player = Player::new(PlayerConfig::default()).unwrap();
        let mut reports = Vec::new();
        player
            .load_stream(stream(), CellLayout::Pixel, &mut |p: f32, m: &str| {
                reports.push((p, m.to_string()))
            })
            .unwrap();

        assert_eq!(reports[0], (85.0, "Reading header (width, height, fps)...".to_string()));
        assert!(reports.iter().all(|(p, _)| (85.0..=100.0).contains(p)));
        let n = reports.len();
        assert_eq!(reports[n - 2], (99.0, "Finalizing data...".to_string()));
        assert_eq!(reports[n - 1], (100.0, "Load complete!".to_string()));
    }

    #[test]
    fn test_view_commands_request_present() {
        let mut player = loaded();
        let recorder = Recorder::default();
        player.set_presenter(Box::new(recorder.clone()));
        player.tick(0.0).unwrap();

        player.apply(Command::Zoom { x: 0.0, y: 0.0, wheel_delta: -100.0 }, 0.0).unwrap();
        player.apply(Command::from_key("BracketRight").unwrap(), 0.0).unwrap();
        player.apply(Command::from_key("ArrowUp").unwrap(), 0.0).unwrap();
        player.apply(Command::ToggleHighlight, 0.0).unwrap();
        player.tick(1.0).unwrap();

        let state = player.state().unwrap();
        assert!((state.transform.scale - 1.1).abs() < 1e-6);
        assert_eq!(state.transform.rotation, 5.0);
        assert!((state.rate - 1.1).abs() < 1e-9);

        let log = recorder.0.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].rows, None);
        assert!(log[1].highlight);
    }

    #[test]
    fn test_debug_views() {
        let mut player = loaded();
        let (snapshot, changed) = player.debug_update().unwrap();
        assert_eq!(snapshot.frame, "0 / 4");
        assert_eq!(changed.len(), 7);

        player.seek(1).unwrap();
        let (_, changed) = player.debug_update().unwrap();
        assert_eq!(changed, ["Frame"]);

        let listing = player.delta_listing().unwrap();
        assert_eq!(listing.title(), "P-FRAME: 1 pixels changed");
    }

    #[test]
    fn test_reload_resizes_presenter() {
        let mut player = Player::new(PlayerConfig::default()).unwrap();
        let sized = GridBound::default();
        player.set_presenter(Box::new(sized.clone()));
        player
            .load_stream(stream(), CellLayout::Pixel, &mut NoProgress)
            .unwrap();
        player.tick(0.0).unwrap();
        assert_eq!(*sized.0.borrow(), Some((4, 2)));

        let mut larger = vec![8, 0, 8, 0, 10, 0xFF];
        larger.extend(std::iter::repeat_n(3, PALETTE_BYTES + 64));
        player
            .load_stream(larger, CellLayout::Pixel, &mut NoProgress)
            .unwrap();
        assert_eq!(*sized.0.borrow(), Some((8, 8)));
        let presented = player.presented();
        player.tick(0.0).unwrap();
        assert_eq!(player.presented(), presented + 1);
    }

    #[test]
    fn test_presenter_rejecting_movie_unloads() {
        let mut player = loaded();
        player.set_presenter(Box::new(GridBound::default()));
        let mut wide = vec![100, 0, 1, 0, 10, 0xFF];
        wide.extend(std::iter::repeat_n(3, PALETTE_BYTES + 100));
        let err = player
            .load_stream(wide, CellLayout::Pixel, &mut NoProgress)
            .unwrap_err();
        assert!(matches!(
            err,
            PlayerError::Present(PresentError::Gpu(GpuError::GridTooLarge { .. }))
        ));
        assert!(!player.is_loaded());
    }

    #[test]
    fn test_extreme_commands_stay_in_range() {
        let mut player = loaded();
        player.apply(Command::SetRotation { degrees: 1.0e10 }, 0.0).unwrap();
        player.apply(Command::Seek { delta: 1 }, 0.0).unwrap();
        player.apply(Command::Seek { delta: i64::MAX }, 0.0).unwrap();
        player.apply(Command::SetRate { rate: f64::NAN }, 0.0).unwrap();
        player
            .apply(Command::Zoom { x: 0.0, y: 0.0, wheel_delta: f32::NAN }, 0.0)
            .unwrap();

        let state = player.state().unwrap();
        assert!((-180.0..=180.0).contains(&state.transform.rotation));
        assert_eq!(state.transform.scale, 1.0);
        assert_eq!(state.rate, 1.0);
        // (1 + i64::MAX) mod 4
        assert_eq!(player.current_frame(), Some(0));
    }

    #[test]
    fn test_present_to_detached_presenter() {
        let mut player = loaded();
        player.play(0.0).unwrap();
        // Nothing attached: frames decode, nothing is drawn.
        player.tick(110.0).unwrap();
        player.tick(210.0).unwrap();
        assert_eq!(player.presented(), 0);

        let mut recorder = Recorder::default();
        player.present_to(&mut recorder).unwrap();
        let log = recorder.0.borrow();
        assert_eq!(log.len(), 1);
        // Load-time keyframe and both deltas, accumulated.
        assert_eq!(log[0].rows, Some(0..2));
        assert!(log[0].palette);
        assert_eq!(player.presented(), 1);
    }
}
