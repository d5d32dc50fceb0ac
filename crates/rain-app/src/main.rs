// ABOUTME: Main application entry point.
// ABOUTME: Opens the rain window and forwards resize, pointer and key events to the frame driver.

mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::Parser;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use cli::Args;
use rain_core::Config;
use rain_renderer::{
    FixedStepClock, FrameDriver, ImagePresenter, SurfacePresenter, SystemClock, Viewport,
};

struct App {
    args: Args,
    /// Taken when the window is created
    config: Option<Config>,
    window: Option<Arc<Window>>,
    driver: Option<FrameDriver>,
    cursor: PhysicalPosition<f64>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(args: Args, config: Config) -> Self {
        Self {
            args,
            config: Some(config),
            window: None,
            driver: None,
            cursor: PhysicalPosition::new(0.0, 0.0),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn create_driver(&self, window: &Arc<Window>, config: Config) -> Result<FrameDriver> {
        let presenter = pollster::block_on(SurfacePresenter::new(Arc::clone(window)))?;
        let size = window.inner_size();
        let mut driver = FrameDriver::new(
            config,
            Viewport::new(size.width, size.height, window.scale_factor() as f32),
            Box::new(SystemClock::new()),
            Box::new(presenter),
        );
        driver.initialize()?;
        driver.start()?;
        Ok(driver)
    }

    fn reload_config(&mut self) {
        let Some(driver) = self.driver.as_mut() else {
            return;
        };
        let result = self
            .args
            .load_config()
            .and_then(|config| driver.replace_config(config).map_err(Into::into));
        match result {
            Ok(()) => tracing::info!("Configuration reloaded"),
            Err(e) => tracing::warn!("Keeping current configuration: {:#}", e),
        }
    }

    fn save_snapshot(&self) {
        let Some(driver) = &self.driver else {
            return;
        };
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = PathBuf::from(format!("digital-rain-{stamp}.png"));
        match driver.snapshot() {
            Ok(frame) => match frame.save_png(&path) {
                Ok(()) => tracing::info!("Snapshot written to {}", path.display()),
                Err(e) => tracing::warn!("Failed to write snapshot: {}", e),
            },
            Err(e) => tracing::warn!("Failed to render snapshot: {}", e),
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let (Some(window), Some(driver)) = (&self.window, self.driver.as_mut()) else {
            return;
        };
        if let Err(e) = driver.resize(size.width, size.height, window.scale_factor() as f32) {
            tracing::warn!("Resize failed: {}", e);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let Some(config) = self.config.take() else {
            return;
        };

        let window_attrs = WindowAttributes::default()
            .with_title("digital-rain")
            .with_inner_size(PhysicalSize::new(config.window_width, config.window_height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let size = window.inner_size();
        tracing::info!(
            "Window created: {}x{} physical pixels, scale factor: {}",
            size.width,
            size.height,
            window.scale_factor()
        );

        match self.create_driver(&window, config) {
            Ok(driver) => {
                self.driver = Some(driver);
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => self.resize(new_size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.resize(size);
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(driver) = self.driver.as_mut() else {
                    return;
                };
                if let Err(e) = driver.tick() {
                    return self.fail(event_loop, e.into());
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                let (Some(window), Some(driver)) = (&self.window, self.driver.as_mut()) else {
                    return;
                };
                let size = window.inner_size();
                let x = self.cursor.x as f32 / size.width.max(1) as f32;
                let y = self.cursor.y as f32 / size.height.max(1) as f32;
                driver.pointer(x, y);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match &event.logical_key {
                    Key::Named(NamedKey::Escape) => {
                        tracing::info!("Escape pressed, exiting");
                        event_loop.exit();
                    }
                    Key::Character(c) if c.eq_ignore_ascii_case("r") => self.reload_config(),
                    Key::Character(c) if c.eq_ignore_ascii_case("s") => self.save_snapshot(),
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

/// Render a single frame at a fixed time without opening a window
fn render_snapshot(args: &Args, mut config: Config, path: &Path) -> Result<()> {
    let (width, height) = args.snapshot_size(&config);
    // Snapshots are written at full resolution
    config.render_scale = 1.0;
    let mut driver = FrameDriver::new(
        config,
        Viewport::new(width, height, 1.0),
        Box::new(FixedStepClock::starting_at(args.time, 1.0 / 60.0)),
        Box::new(ImagePresenter::new()),
    );
    driver.initialize()?;
    driver.start()?;
    driver.tick()?;
    let frame = driver.snapshot()?;
    frame.save_png(path)?;
    tracing::info!(
        "Wrote {}x{} snapshot at t={}s to {}",
        frame.width(),
        frame.height(),
        args.time,
        path.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = args.load_config()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }
    if args.save_config {
        let path = config.save_to_default()?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }
    if let Some(path) = &args.snapshot {
        return render_snapshot(&args, config, path);
    }

    tracing::info!("Starting digital-rain");

    let event_loop = EventLoop::new()?;
    let mut app = App::new(args, config);

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
