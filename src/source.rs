//! Video Source boundary
//!
//! Stream acquisition and permissions live outside this crate. The capture
//! path only needs to know whether a frame is available, which way the
//! camera faces, and the current frame's pixels.

use std::path::Path;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// One snapshot of pixels at the source's native resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: RgbaImage,
}

impl Frame {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl From<RgbaImage> for Frame {
    fn from(pixels: RgbaImage) -> Self {
        Self::new(pixels)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Self-facing; captures are flipped so they read like a mirror.
    Front,
    #[default]
    Back,
}

impl Facing {
    pub fn is_mirrored(self) -> bool {
        matches!(self, Facing::Front)
    }

    pub fn toggled(self) -> Self {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SourceFault {
    PermissionDenied,
    Device(String),
}

impl SourceFault {
    /// Text suitable for the blocking "camera unavailable" state.
    pub fn user_message(&self) -> &'static str {
        match self {
            SourceFault::PermissionDenied => {
                "Please enable camera permissions in your browser settings to use Lumina Film."
            }
            SourceFault::Device(_) => {
                "An error occurred while initializing the camera. Please try refreshing."
            }
        }
    }
}

impl std::fmt::Display for SourceFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFault::PermissionDenied => f.write_str("camera permission denied"),
            SourceFault::Device(detail) => write!(f, "camera device error: {}", detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Ready,
    Unavailable(SourceFault),
}

impl SourceStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, SourceStatus::Ready)
    }
}

pub trait VideoSource {
    fn status(&self) -> SourceStatus;

    fn facing(&self) -> Facing;

    /// Current frame size; `(0, 0)` while not ready.
    fn dimensions(&self) -> (u32, u32);

    /// Synchronously read the current frame, if one is ready.
    fn read_frame(&self) -> Option<Frame>;
}

/// A still image standing in for a live camera.
#[derive(Debug, Clone)]
pub struct StillSource {
    frame: Option<Frame>,
    facing: Facing,
    fault: Option<SourceFault>,
}

impl StillSource {
    pub fn new(frame: impl Into<Frame>) -> Self {
        Self {
            frame: Some(frame.into()),
            facing: Facing::Back,
            fault: None,
        }
    }

    pub fn open(path: &Path) -> Result<Self, image::ImageError> {
        let pixels = image::open(path)?.into_rgba8();
        Ok(Self::new(pixels))
    }

    /// A source that never became ready.
    pub fn unavailable(fault: SourceFault) -> Self {
        Self {
            frame: None,
            facing: Facing::Back,
            fault: Some(fault),
        }
    }

    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    pub fn set_facing(&mut self, facing: Facing) {
        self.facing = facing;
    }

    pub fn set_fault(&mut self, fault: Option<SourceFault>) {
        self.fault = fault;
    }
}

impl VideoSource for StillSource {
    fn status(&self) -> SourceStatus {
        match &self.fault {
            Some(fault) => SourceStatus::Unavailable(fault.clone()),
            None => SourceStatus::Ready,
        }
    }

    fn facing(&self) -> Facing {
        self.facing
    }

    fn dimensions(&self) -> (u32, u32) {
        match (&self.fault, &self.frame) {
            (None, Some(frame)) => (frame.width(), frame.height()),
            _ => (0, 0),
        }
    }

    fn read_frame(&self) -> Option<Frame> {
        if self.fault.is_some() {
            return None;
        }
        self.frame.clone()
    }
}
