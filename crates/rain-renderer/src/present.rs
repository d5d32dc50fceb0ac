// ABOUTME: Presenter boundary between the frame driver and whatever displays a frame.
// ABOUTME: Defines the presenter trait, its failure classes, and an in-memory image presenter.

use std::path::Path;

use crate::frame::Frame;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Recoverable by rebuilding the presenter (lost or outdated surface, timeout)
    #[error("Transient presentation failure: {0}")]
    Transient(String),

    /// Unrecoverable for this session (out of memory, allocation failure)
    #[error("Presentation resource failure: {0}")]
    Resource(String),
}

pub trait Presenter {
    fn present(&mut self, frame: &Frame) -> Result<(), FrameError>;

    /// Output size changed, in device pixels
    fn resize(&mut self, _width: u32, _height: u32) {}

    /// Recreate lost resources after a transient failure
    fn rebuild(&mut self) -> Result<(), FrameError> {
        Ok(())
    }

    fn dispose(&mut self) {}
}

/// Keeps the most recent frame in memory. Used for headless snapshots and tests.
#[derive(Debug, Default)]
pub struct ImagePresenter {
    last: Option<Frame>,
    presented: u64,
}

impl ImagePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last.as_ref()
    }

    pub fn frames_presented(&self) -> u64 {
        self.presented
    }

    /// Write the last presented frame. Returns false when nothing was presented yet.
    pub fn save_png(&self, path: &Path) -> Result<bool, image::ImageError> {
        match &self.last {
            Some(frame) => frame.save_png(path).map(|_| true),
            None => Ok(false),
        }
    }
}

impl Presenter for ImagePresenter {
    fn present(&mut self, frame: &Frame) -> Result<(), FrameError> {
        self.last = Some(frame.clone());
        self.presented += 1;
        Ok(())
    }

    fn dispose(&mut self) {
        self.last = None;
    }
}
