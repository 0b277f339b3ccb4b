//! Lumina Film Core - Simulated Film Camera
//!
//! # Capture Rules (Non-Negotiable)
//! 1. Recipes Are Fixed At Startup
//! 2. Unknown Recipes Fall Back To The Default
//! 3. Grain Before Tint, Always
//! 4. Grain Never Shifts Hue
//! 5. No Artifact Without Finished Pixels
//! 6. Captions Are Always Text

pub mod artifact;
pub mod blend;
pub mod canvas;
pub mod compositor;
pub mod filters;
pub mod grain;
pub mod oracle;
pub mod pipeline;
pub mod recipes;
pub mod source;
pub mod store;
pub mod validation;

pub use artifact::{Artifact, ArtifactSummary};
pub use blend::BlendMode;
pub use compositor::{CaptureError, EncodedImage, FrameCompositor, JPEG_QUALITY};
pub use filters::{FilterChain, FilterOp, FilterParseError};
pub use grain::GrainSynthesizer;
pub use oracle::{CommandBackend, DescriptionOracle, GuardedOracle, FALLBACK_CAPTION};
pub use pipeline::{enrich, CaptureEvent, CapturePipeline, EnrichError};
pub use recipes::{CatalogError, Recipe, RecipeCatalog, TintOverlay};
pub use source::{Facing, Frame, SourceFault, SourceStatus, StillSource, VideoSource};
pub use store::ArtifactStore;
pub use validation::{RecipeValidator, ValidationResult, ValidationViolation, ViolationSeverity};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
