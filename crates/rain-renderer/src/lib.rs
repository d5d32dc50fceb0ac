// ABOUTME: Digital rain simulation, depth compositing and post-processing.
// ABOUTME: A frame driver renders on the CPU in parallel and hands frames to a presenter.

pub mod atlas;
mod blur;
pub mod depth;
pub mod driver;
pub mod field;
pub mod fonts;
pub mod frame;
mod gpu;
pub mod hash;
pub mod post;
pub mod present;
pub mod ripple;
pub mod surface;

pub use atlas::{AtlasError, GlyphAtlas, GlyphRasterizer};
pub use depth::{CellArena, DepthCompositor, Grid};
pub use driver::{
    Clock, DriverState, FixedStepClock, FrameDriver, FrameState, RenderError, SystemClock,
    TickOutcome, Viewport,
};
pub use field::{CellSample, FieldModel};
pub use frame::Frame;
pub use gpu::GpuError;
pub use hash::{Pcg3dSeed, Seed, SineSeed};
pub use post::{PostProcessStack, PostStage};
pub use present::{FrameError, ImagePresenter, Presenter};
pub use ripple::Ripple;
pub use surface::SurfacePresenter;
