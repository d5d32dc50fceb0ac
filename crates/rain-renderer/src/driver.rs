// ABOUTME: Frame driver: the lifecycle state machine that owns time, viewport and configuration.
// ABOUTME: Renders one composited, post-processed frame per tick and hands it to a presenter.

use std::sync::Arc;
use std::time::Instant;

use rain_core::{Config, ConfigError};

use crate::atlas::{AtlasError, GlyphAtlas};
use crate::depth::{DepthCompositor, Grid};
use crate::field::FieldModel;
use crate::fonts::{build_atlas, same_atlas_inputs};
use crate::frame::Frame;
use crate::hash::{Pcg3dSeed, Seed};
use crate::post::{PostProcessStack, StageContext};
use crate::present::{FrameError, Presenter};
use crate::ripple::Ripple;

/// Consecutive transient presentation failures tolerated before the session is torn down
pub const MAX_TRANSIENT_FAILURES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Atlas error: {0}")]
    Atlas(#[from] AtlasError),

    #[error("Render resources lost: {0}")]
    Resource(String),

    #[error("Cannot {action} while {state:?}")]
    InvalidState {
        action: &'static str,
        state: DriverState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Ready,
    Running,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Presented,
    /// Presentation failed transiently; a rebuild runs on the next tick
    Skipped,
}

/// Output surface size in device pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            device_pixel_ratio: if device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            },
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Size of the internal frame for a render scale
    pub fn render_size(&self, scale: f32) -> (u32, u32) {
        let w = ((self.width as f32 * scale).round() as u32).max(1);
        let h = ((self.height as f32 * scale).round() as u32).max(1);
        (w, h)
    }
}

/// Source of animation time in seconds
pub trait Clock {
    fn now(&mut self) -> f64;

    /// Restart from zero
    fn reset(&mut self) {}
}

/// Wall-clock time since the driver started
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn reset(&mut self) {
        self.origin = Instant::now();
    }
}

/// Advances a fixed step on every read. Deterministic rendering and tests.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    start: f64,
    step: f64,
    reads: u64,
}

impl FixedStepClock {
    pub fn new(step: f64) -> Self {
        Self::starting_at(0.0, step)
    }

    /// First read returns `start`
    pub fn starting_at(start: f64, step: f64) -> Self {
        Self {
            start,
            step,
            reads: 0,
        }
    }
}

impl Clock for FixedStepClock {
    fn now(&mut self) -> f64 {
        let t = self.start + self.step * self.reads as f64;
        self.reads += 1;
        t
    }

    fn reset(&mut self) {
        self.reads = 0;
    }
}

/// Everything that changes between frames. Written only by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    pub time: f32,
    pub delta: f32,
    pub frame_index: u64,
    pub viewport: Viewport,
    pub grid: Grid,
    pub ripple: Ripple,
}

/// One configuration's worth of render objects. Replaced whole, never patched.
pub struct Pipeline {
    config: Arc<Config>,
    atlas: Arc<GlyphAtlas>,
    field: FieldModel,
    compositor: DepthCompositor,
    post: PostProcessStack,
}

impl Pipeline {
    pub fn build(config: Arc<Config>, atlas: Arc<GlyphAtlas>, seed: Arc<dyn Seed>) -> Self {
        let field = FieldModel::new(&config.rain, &config.tuning, atlas.glyph_count(), seed);
        let compositor = DepthCompositor::new(&config.rain, &config.palette, &config.ripple);
        let post = PostProcessStack::from_settings(&config.post);
        tracing::info!(
            "Pipeline built: {} columns, {} layers, {} glyphs",
            config.rain.columns,
            config.rain.depth_layers,
            atlas.glyph_count()
        );
        Self {
            config,
            atlas,
            field,
            compositor,
            post,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn atlas(&self) -> &Arc<GlyphAtlas> {
        &self.atlas
    }

    pub fn render(&self, state: &FrameState) -> Frame {
        let frame = self.compositor.render(
            &self.field,
            &self.atlas,
            &state.grid,
            state.time,
            &state.ripple,
        );
        let ctx = StageContext {
            time: state.time,
            device_pixel_ratio: state.viewport.device_pixel_ratio * self.config.render_scale,
            frame_index: state.frame_index,
        };
        self.post.run(frame, &ctx)
    }
}

fn grid_for(config: &Config, viewport: &Viewport) -> Grid {
    let (w, h) = viewport.render_size(config.render_scale);
    Grid::new(config.rain.columns, w, h)
}

pub struct FrameDriver {
    state: DriverState,
    config: Arc<Config>,
    seed: Arc<dyn Seed>,
    pipeline: Option<Pipeline>,
    frame: FrameState,
    clock: Box<dyn Clock>,
    presenter: Option<Box<dyn Presenter>>,
    last_time: Option<f64>,
    transient_failures: u32,
    needs_rebuild: bool,
}

impl FrameDriver {
    pub fn new(
        config: Config,
        viewport: Viewport,
        clock: Box<dyn Clock>,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        let grid = grid_for(&config, &viewport);
        Self {
            state: DriverState::Uninitialized,
            config: Arc::new(config),
            seed: Arc::new(Pcg3dSeed),
            pipeline: None,
            frame: FrameState {
                time: 0.0,
                delta: 0.0,
                frame_index: 0,
                viewport,
                grid,
                ripple: Ripple::Inert,
            },
            clock,
            presenter: Some(presenter),
            last_time: None,
            transient_failures: 0,
            needs_rebuild: false,
        }
    }

    /// Swap the hash used by the field model. Takes effect at `initialize`.
    pub fn with_seed(mut self, seed: Arc<dyn Seed>) -> Self {
        self.seed = seed;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn frame_state(&self) -> &FrameState {
        &self.frame
    }

    pub fn atlas(&self) -> Option<&Arc<GlyphAtlas>> {
        self.pipeline.as_ref().map(|p| p.atlas())
    }

    fn require(&self, action: &'static str, allowed: &[DriverState]) -> Result<(), RenderError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(RenderError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    pub fn initialize(&mut self) -> Result<(), RenderError> {
        self.require("initialize", &[DriverState::Uninitialized])?;
        self.config.validate()?;
        let atlas = Arc::new(build_atlas(&self.config.rain)?);
        self.pipeline = Some(Pipeline::build(self.config.clone(), atlas, self.seed.clone()));
        self.frame.grid = grid_for(&self.config, &self.frame.viewport);
        self.state = DriverState::Ready;
        tracing::info!(
            "Frame driver ready: {}x{} @ {}x, grid {}x{}",
            self.frame.viewport.width,
            self.frame.viewport.height,
            self.frame.viewport.device_pixel_ratio,
            self.frame.grid.columns,
            self.frame.grid.rows
        );
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), RenderError> {
        self.require("start", &[DriverState::Ready])?;
        self.clock.reset();
        self.last_time = None;
        self.state = DriverState::Running;
        tracing::info!("Frame driver running");
        Ok(())
    }

    pub fn tick(&mut self) -> Result<TickOutcome, RenderError> {
        self.require("tick", &[DriverState::Running])?;
        let started = Instant::now();

        if self.needs_rebuild {
            self.rebuild()?;
        }
        self.advance();

        let frame = match &self.pipeline {
            Some(pipeline) => pipeline.render(&self.frame),
            None => return Err(RenderError::Resource("pipeline missing".to_string())),
        };
        let result = match self.presenter.as_mut() {
            Some(presenter) => presenter.present(&frame),
            None => Err(FrameError::Resource("presenter missing".to_string())),
        };

        let outcome = match result {
            Ok(()) => {
                self.transient_failures = 0;
                TickOutcome::Presented
            }
            Err(FrameError::Transient(reason)) => {
                self.transient_failures += 1;
                if self.transient_failures > MAX_TRANSIENT_FAILURES {
                    tracing::error!(
                        "Giving up after {} consecutive transient failures: {}",
                        self.transient_failures,
                        reason
                    );
                    self.dispose();
                    return Err(RenderError::Resource(reason));
                }
                tracing::warn!(
                    "Frame {} skipped ({}/{}): {}",
                    self.frame.frame_index,
                    self.transient_failures,
                    MAX_TRANSIENT_FAILURES,
                    reason
                );
                self.needs_rebuild = true;
                TickOutcome::Skipped
            }
            Err(FrameError::Resource(reason)) => {
                tracing::error!("Presenter resource failure: {}", reason);
                self.dispose();
                return Err(RenderError::Resource(reason));
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;
        if elapsed_ms > self.config.frame_budget_ms {
            tracing::warn!(
                "Frame {} took {:.1}ms (budget {:.1}ms)",
                self.frame.frame_index,
                elapsed_ms,
                self.config.frame_budget_ms
            );
        } else {
            tracing::debug!("Frame {} took {:.1}ms", self.frame.frame_index, elapsed_ms);
        }
        Ok(outcome)
    }

    fn advance(&mut self) {
        let now = self.clock.now();
        let delta = self.last_time.map_or(0.0, |last| (now - last).max(0.0));
        self.last_time = Some(now);
        self.frame.time = now as f32;
        self.frame.delta = delta as f32;
        self.frame.frame_index += 1;
        self.frame.ripple = self.frame.ripple.advance(delta as f32, &self.config.ripple);
    }

    /// Recreate presenter resources and the pipeline after a transient failure
    fn rebuild(&mut self) -> Result<(), RenderError> {
        tracing::info!("Rebuilding after transient failure");
        if let Some(presenter) = self.presenter.as_mut() {
            match presenter.rebuild() {
                Ok(()) => {}
                Err(FrameError::Transient(reason)) => {
                    tracing::warn!("Presenter rebuild deferred: {}", reason);
                    return Ok(());
                }
                Err(FrameError::Resource(reason)) => {
                    tracing::error!("Presenter rebuild failed: {}", reason);
                    self.dispose();
                    return Err(RenderError::Resource(reason));
                }
            }
        }
        let atlas = Arc::new(build_atlas(&self.config.rain)?);
        self.pipeline = Some(Pipeline::build(self.config.clone(), atlas, self.seed.clone()));
        self.needs_rebuild = false;
        Ok(())
    }

    /// Zero sizes (minimized windows) are ignored
    pub fn resize(
        &mut self,
        width: u32,
        height: u32,
        device_pixel_ratio: f32,
    ) -> Result<(), RenderError> {
        self.require(
            "resize",
            &[
                DriverState::Uninitialized,
                DriverState::Ready,
                DriverState::Running,
            ],
        )?;
        if width == 0 || height == 0 {
            tracing::debug!("Ignoring zero-sized resize {}x{}", width, height);
            return Ok(());
        }
        self.frame.viewport = Viewport::new(width, height, device_pixel_ratio);
        self.frame.grid = grid_for(&self.config, &self.frame.viewport);
        if let Some(presenter) = self.presenter.as_mut() {
            presenter.resize(width, height);
        }
        tracing::debug!(
            "Resized to {}x{}, grid {}x{}",
            width,
            height,
            self.frame.grid.columns,
            self.frame.grid.rows
        );
        Ok(())
    }

    /// Start a ripple at a normalized position, origin top-left
    pub fn pointer(&mut self, x: f32, y: f32) {
        if matches!(self.state, DriverState::Ready | DriverState::Running) {
            self.frame.ripple = Ripple::spawn([x, y], &self.config.ripple);
        }
    }

    /// Validate and swap in a new configuration between frames. On error the
    /// current pipeline keeps running.
    pub fn replace_config(&mut self, config: Config) -> Result<(), RenderError> {
        self.require(
            "replace configuration",
            &[
                DriverState::Uninitialized,
                DriverState::Ready,
                DriverState::Running,
            ],
        )?;
        config.validate()?;
        let config = Arc::new(config);

        if self.state != DriverState::Uninitialized {
            let reused = self
                .pipeline
                .as_ref()
                .filter(|p| same_atlas_inputs(&p.config().rain, &config.rain))
                .map(|p| p.atlas().clone());
            let atlas = match reused {
                Some(atlas) => atlas,
                None => Arc::new(build_atlas(&config.rain)?),
            };
            self.pipeline = Some(Pipeline::build(config.clone(), atlas, self.seed.clone()));
        }

        self.config = config;
        self.frame.grid = grid_for(&self.config, &self.frame.viewport);
        tracing::info!("Configuration replaced (palette {})", self.config.palette.name);
        Ok(())
    }

    /// Render the current frame state without presenting it
    pub fn snapshot(&self) -> Result<Frame, RenderError> {
        self.require("snapshot", &[DriverState::Ready, DriverState::Running])?;
        match &self.pipeline {
            Some(pipeline) => Ok(pipeline.render(&self.frame)),
            None => Err(RenderError::Resource("pipeline missing".to_string())),
        }
    }

    /// Release the pipeline and presenter. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.state == DriverState::Disposed {
            return;
        }
        self.pipeline = None;
        if let Some(mut presenter) = self.presenter.take() {
            presenter.dispose();
        }
        self.frame.ripple = Ripple::Inert;
        self.state = DriverState::Disposed;
        tracing::info!("Frame driver disposed");
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use rain_core::PostSettings;

    use super::*;

    #[derive(Default)]
    struct Log {
        presented: u32,
        rebuilds: u32,
        resizes: Vec<(u32, u32)>,
        disposed: bool,
        script: VecDeque<Result<(), FrameError>>,
        last_size: Option<(u32, u32)>,
    }

    struct ScriptedPresenter(Arc<Mutex<Log>>);

    impl Presenter for ScriptedPresenter {
        fn present(&mut self, frame: &Frame) -> Result<(), FrameError> {
            let mut log = self.0.lock().unwrap();
            let result = log.script.pop_front().unwrap_or(Ok(()));
            if result.is_ok() {
                log.presented += 1;
                log.last_size = Some((frame.width(), frame.height()));
            }
            result
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.0.lock().unwrap().resizes.push((width, height));
        }

        fn rebuild(&mut self) -> Result<(), FrameError> {
            self.0.lock().unwrap().rebuilds += 1;
            Ok(())
        }

        fn dispose(&mut self) {
            self.0.lock().unwrap().disposed = true;
        }
    }

    fn small_config() -> Config {
        Config {
            render_scale: 1.0,
            post: PostSettings::disabled(),
            rain: rain_core::RainSettings {
                columns: 8,
                glyph_cell_px: 8,
                ..Default::default()
            },
            ..Config::default()
        }
    }

    fn driver_with(script: Vec<Result<(), FrameError>>) -> (FrameDriver, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log {
            script: script.into(),
            ..Log::default()
        }));
        let driver = FrameDriver::new(
            small_config(),
            Viewport::new(64, 48, 1.0),
            Box::new(FixedStepClock::new(1.0 / 60.0)),
            Box::new(ScriptedPresenter(log.clone())),
        );
        (driver, log)
    }

    fn running(script: Vec<Result<(), FrameError>>) -> (FrameDriver, Arc<Mutex<Log>>) {
        let (mut driver, log) = driver_with(script);
        driver.initialize().unwrap();
        driver.start().unwrap();
        (driver, log)
    }

    fn transient() -> Result<(), FrameError> {
        Err(FrameError::Transient("surface lost".to_string()))
    }

    #[test]
    fn lifecycle_follows_state_machine() {
        let (mut driver, log) = driver_with(vec![]);
        assert_eq!(driver.state(), DriverState::Uninitialized);
        assert!(matches!(
            driver.tick(),
            Err(RenderError::InvalidState { action: "tick", .. })
        ));
        assert!(driver.start().is_err());
        assert!(driver.snapshot().is_err());

        driver.initialize().unwrap();
        assert_eq!(driver.state(), DriverState::Ready);
        assert!(driver.initialize().is_err());
        assert!(driver.tick().is_err());

        driver.start().unwrap();
        assert_eq!(driver.state(), DriverState::Running);
        assert_eq!(driver.tick().unwrap(), TickOutcome::Presented);
        assert_eq!(driver.frame_state().frame_index, 1);

        driver.dispose();
        assert_eq!(driver.state(), DriverState::Disposed);
        assert!(log.lock().unwrap().disposed);
        assert!(driver.tick().is_err());
        assert!(driver.resize(10, 10, 1.0).is_err());
        // Second dispose is a no-op
        driver.dispose();
    }

    #[test]
    fn initialize_rejects_invalid_config() {
        let mut config = small_config();
        config.rain.fall_speed = 0.0;
        let mut driver = FrameDriver::new(
            config,
            Viewport::new(64, 48, 1.0),
            Box::new(FixedStepClock::new(0.1)),
            Box::new(crate::present::ImagePresenter::new()),
        );
        assert!(matches!(driver.initialize(), Err(RenderError::Config(_))));
        assert_eq!(driver.state(), DriverState::Uninitialized);
    }

    #[test]
    fn time_advances_with_the_clock() {
        let (mut driver, _log) = running(vec![]);
        driver.tick().unwrap();
        assert_eq!(driver.frame_state().time, 0.0);
        assert_eq!(driver.frame_state().delta, 0.0);
        driver.tick().unwrap();
        driver.tick().unwrap();
        let state = driver.frame_state();
        assert!((state.time - 2.0 / 60.0).abs() < 1e-6);
        assert!((state.delta - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(state.frame_index, 3);
    }

    #[test]
    fn resize_while_running_updates_grid() {
        let (mut driver, log) = running(vec![]);
        driver.tick().unwrap();
        assert_eq!(driver.frame_state().grid.rows, 6);

        driver.resize(64, 128, 2.0).unwrap();
        assert_eq!(driver.state(), DriverState::Running);
        assert_eq!(driver.frame_state().grid.rows, 16);
        assert_eq!(driver.frame_state().viewport.device_pixel_ratio, 2.0);
        driver.tick().unwrap();

        // Minimized windows report zero sizes
        driver.resize(0, 0, 2.0).unwrap();
        assert_eq!(driver.frame_state().viewport.height, 128);

        let log = log.lock().unwrap();
        assert_eq!(log.resizes, vec![(64, 128)]);
        assert_eq!(log.last_size, Some((64, 128)));
    }

    #[test]
    fn transient_failure_skips_then_rebuilds() {
        let (mut driver, log) = running(vec![transient()]);
        assert_eq!(driver.tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(log.lock().unwrap().rebuilds, 0);
        assert_eq!(driver.tick().unwrap(), TickOutcome::Presented);
        let log = log.lock().unwrap();
        assert_eq!(log.rebuilds, 1);
        assert_eq!(log.presented, 1);
        assert_eq!(driver.state(), DriverState::Running);
    }

    #[test]
    fn repeated_transient_failures_escalate() {
        let script = vec![transient(), transient(), transient(), transient()];
        let (mut driver, log) = running(script);
        for _ in 0..MAX_TRANSIENT_FAILURES {
            assert_eq!(driver.tick().unwrap(), TickOutcome::Skipped);
        }
        assert!(matches!(driver.tick(), Err(RenderError::Resource(_))));
        assert_eq!(driver.state(), DriverState::Disposed);
        assert!(log.lock().unwrap().disposed);
    }

    #[test]
    fn success_resets_transient_count() {
        let script = vec![transient(), transient(), transient(), Ok(()), transient()];
        let (mut driver, _log) = running(script);
        for _ in 0..3 {
            driver.tick().unwrap();
        }
        assert_eq!(driver.tick().unwrap(), TickOutcome::Presented);
        assert_eq!(driver.tick().unwrap(), TickOutcome::Skipped);
        assert_eq!(driver.state(), DriverState::Running);
    }

    #[test]
    fn resource_failure_is_fatal() {
        let script = vec![Err(FrameError::Resource("out of memory".to_string()))];
        let (mut driver, log) = running(script);
        assert!(matches!(driver.tick(), Err(RenderError::Resource(_))));
        assert_eq!(driver.state(), DriverState::Disposed);
        assert!(log.lock().unwrap().disposed);
    }

    #[test]
    fn config_replacement_swaps_whole_pipeline() {
        let (mut driver, _log) = running(vec![]);
        driver.tick().unwrap();
        let old_config = driver.config().clone();
        let old_atlas = driver.atlas().unwrap().clone();

        // Unchanged glyph inputs keep the atlas
        let mut faster = small_config();
        faster.rain.fall_speed = 20.0;
        faster.rain.columns = 16;
        driver.replace_config(faster).unwrap();
        assert!(Arc::ptr_eq(driver.atlas().unwrap(), &old_atlas));
        assert_eq!(driver.config().rain.fall_speed, 20.0);
        assert_eq!(driver.frame_state().grid.columns, 16);
        // Frames in flight still see the old configuration
        assert_eq!(old_config.rain.fall_speed, 6.0);

        // A new character set rebuilds it
        let mut digits = small_config();
        digits.rain.character_set = "0123456789".to_string();
        driver.replace_config(digits).unwrap();
        assert!(!Arc::ptr_eq(driver.atlas().unwrap(), &old_atlas));
        assert_eq!(driver.atlas().unwrap().glyph_count(), 10);
        assert_eq!(driver.tick().unwrap(), TickOutcome::Presented);
    }

    #[test]
    fn invalid_replacement_keeps_current_pipeline() {
        let (mut driver, _log) = running(vec![]);
        let atlas = driver.atlas().unwrap().clone();
        let mut broken = small_config();
        broken.rain.depth_layers = 0;
        assert!(matches!(
            driver.replace_config(broken),
            Err(RenderError::Config(_))
        ));
        assert!(Arc::ptr_eq(driver.atlas().unwrap(), &atlas));
        assert_eq!(driver.config().rain.depth_layers, 3);
        assert_eq!(driver.tick().unwrap(), TickOutcome::Presented);
    }

    #[test]
    fn pointer_ripple_decays_each_tick() {
        let (mut driver, _log) = running(vec![]);
        driver.pointer(0.5, 0.5);
        let settings = driver.config().ripple.clone();
        for n in 1..=5 {
            driver.tick().unwrap();
            let expected = settings.strength * settings.decay.powi(n);
            assert!((driver.frame_state().ripple.strength() - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn snapshot_is_deterministic() {
        let (mut a, _) = running(vec![]);
        let (mut b, _) = running(vec![]);
        for _ in 0..4 {
            a.tick().unwrap();
            b.tick().unwrap();
        }
        let frame = a.snapshot().unwrap();
        assert_eq!(frame, b.snapshot().unwrap());
        assert_eq!((frame.width(), frame.height()), (64, 48));
    }

    #[test]
    fn swapped_seed_changes_the_rain() {
        let (mut pcg, _) = running(vec![]);
        let log = Arc::new(Mutex::new(Log::default()));
        let mut sine = FrameDriver::new(
            small_config(),
            Viewport::new(64, 48, 1.0),
            Box::new(FixedStepClock::new(1.0 / 60.0)),
            Box::new(ScriptedPresenter(log)),
        )
        .with_seed(Arc::new(crate::hash::SineSeed));
        sine.initialize().unwrap();
        sine.start().unwrap();
        for _ in 0..3 {
            pcg.tick().unwrap();
            sine.tick().unwrap();
        }
        assert_eq!(pcg.frame_state(), sine.frame_state());
        assert_ne!(pcg.snapshot().unwrap(), sine.snapshot().unwrap());
    }

    #[test]
    fn dispose_releases_atlas() {
        let (mut driver, _log) = running(vec![]);
        let weak = Arc::downgrade(driver.atlas().unwrap());
        driver.dispose();
        assert!(driver.atlas().is_none());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn drop_disposes_presenter() {
        let (driver, log) = running(vec![]);
        drop(driver);
        assert!(log.lock().unwrap().disposed);
    }
}
