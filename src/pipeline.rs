//! Capture Pipeline - Single Entry Point
//!
//! CRITICAL: an artifact reaches the store only after compositing has
//! fully succeeded. A refused or failed capture leaves the store untouched.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::Artifact;
use crate::compositor::{CaptureError, FrameCompositor};
use crate::oracle::{DescriptionOracle, EMPTY_CAPTION};
use crate::recipes::{Recipe, RecipeCatalog};
use crate::source::{Frame, SourceStatus, VideoSource};
use crate::store::ArtifactStore;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),
}

/// Notifications for the presentation layer. Timing is theirs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CaptureEvent {
    /// Shutter acknowledged; drive a brief flash.
    Flash,
    Captured { id: String },
}

type Subscriber = Box<dyn Fn(&CaptureEvent) + Send + Sync>;

pub struct CapturePipeline<R = StdRng> {
    catalog: RecipeCatalog,
    compositor: FrameCompositor<R>,
    store: ArtifactStore,
    subscribers: Vec<Subscriber>,
}

impl CapturePipeline<StdRng> {
    pub fn new(catalog: RecipeCatalog) -> Self {
        Self::with_compositor(catalog, FrameCompositor::from_entropy())
    }
}

impl<R: Rng> CapturePipeline<R> {
    pub fn with_compositor(catalog: RecipeCatalog, compositor: FrameCompositor<R>) -> Self {
        Self {
            catalog,
            compositor,
            store: ArtifactStore::new(),
            subscribers: vec![],
        }
    }

    pub fn catalog(&self) -> &RecipeCatalog {
        &self.catalog
    }

    /// Shared handle; clones see the same artifacts.
    pub fn store(&self) -> ArtifactStore {
        self.store.clone()
    }

    /// Resolve with fallback to the default recipe.
    pub fn recipe(&self, id: Option<&str>) -> &Recipe {
        self.catalog.lookup(id)
    }

    pub fn subscribe<F>(&mut self, f: F)
    where
        F: Fn(&CaptureEvent) + Send + Sync + 'static,
    {
        self.subscribers.push(Box::new(f));
    }

    /// Whether the shutter should be enabled for this source.
    pub fn can_capture(&self, source: &dyn VideoSource) -> bool {
        source.status().is_ready()
    }

    fn emit(&self, event: CaptureEvent) {
        for subscriber in &self.subscribers {
            subscriber(&event);
        }
    }

    /// Capture from a live source.
    ///
    /// Refuses with `SourceUnavailable` before any side effect while the
    /// source is not ready. Mirroring follows the source's facing.
    #[tracing::instrument(skip(self, source), fields(facing = ?source.facing()))]
    pub fn capture(
        &mut self,
        source: &dyn VideoSource,
        recipe_id: Option<&str>,
    ) -> Result<Artifact, CaptureError> {
        if let SourceStatus::Unavailable(fault) = source.status() {
            tracing::debug!(%fault, "capture refused");
            return Err(CaptureError::SourceUnavailable(fault));
        }

        self.emit(CaptureEvent::Flash);

        let frame = source.read_frame().ok_or_else(|| {
            CaptureError::CaptureUnavailable("source has no frame ready".to_string())
        })?;
        let mirrored = source.facing().is_mirrored();
        self.finish_capture(&frame, recipe_id, mirrored)
    }

    /// Capture an already-read frame.
    pub fn capture_frame(
        &mut self,
        frame: &Frame,
        recipe_id: Option<&str>,
        mirrored: bool,
    ) -> Result<Artifact, CaptureError> {
        self.emit(CaptureEvent::Flash);
        self.finish_capture(frame, recipe_id, mirrored)
    }

    fn finish_capture(
        &mut self,
        frame: &Frame,
        recipe_id: Option<&str>,
        mirrored: bool,
    ) -> Result<Artifact, CaptureError> {
        let recipe = self.catalog.lookup(recipe_id);
        let encoded = self.compositor.composite(frame, recipe, mirrored)?;

        let artifact = Artifact::new(encoded.bytes, recipe.id.clone());
        self.store.insert_head(artifact.clone());
        tracing::info!(
            id = %artifact.id,
            recipe = %artifact.recipe_id,
            bytes = artifact.image_data.len(),
            "captured"
        );

        self.emit(CaptureEvent::Captured { id: artifact.id.clone() });
        Ok(artifact)
    }

    /// Caption an artifact in the store. See [`enrich`].
    pub fn enrich(
        &self,
        artifact_id: &str,
        oracle: &dyn DescriptionOracle,
    ) -> Result<Artifact, EnrichError> {
        enrich(&self.store, oracle, artifact_id)
    }
}

impl Default for CapturePipeline<StdRng> {
    fn default() -> Self {
        Self::new(RecipeCatalog::builtin())
    }
}

/// Ask the oracle for a caption and store it on the artifact.
///
/// The store lock is not held while the oracle runs, so captures can
/// proceed meanwhile. Two enrichments of the same artifact race and the
/// last one to finish wins.
#[tracing::instrument(skip(store, oracle))]
pub fn enrich(
    store: &ArtifactStore,
    oracle: &dyn DescriptionOracle,
    artifact_id: &str,
) -> Result<Artifact, EnrichError> {
    let payload = store
        .get(artifact_id)
        .map(|a| a.base64_payload())
        .ok_or_else(|| EnrichError::ArtifactNotFound(artifact_id.to_string()))?;

    let text = oracle.describe(&payload);
    let caption = if text.trim().is_empty() {
        EMPTY_CAPTION.to_string()
    } else {
        text
    };

    store
        .update(artifact_id, |artifact| artifact.caption = Some(caption))
        .ok_or_else(|| EnrichError::ArtifactNotFound(artifact_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use image::{Rgba, RgbaImage};

    use crate::source::{SourceFault, StillSource};

    fn pipeline() -> CapturePipeline {
        CapturePipeline::with_compositor(RecipeCatalog::builtin(), FrameCompositor::seeded(11))
    }

    fn source() -> StillSource {
        StillSource::new(RgbaImage::from_pixel(8, 6, Rgba([120, 80, 40, 255])))
    }

    #[test]
    fn test_capture_tags_recipe_with_fallback() {
        let mut p = pipeline();
        let a = p.capture(&source(), Some("portra")).unwrap();
        let b = p.capture(&source(), Some("no-such-stock")).unwrap();
        assert_eq!(a.recipe_id, "portra");
        assert_eq!(b.recipe_id, "standard");
    }

    #[test]
    fn test_events_flash_then_captured() {
        let events = Arc::new(Mutex::new(vec![]));
        let sink = Arc::clone(&events);
        let mut p = pipeline();
        p.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        let artifact = p.capture(&source(), None).unwrap();
        let seen = events.lock().unwrap().clone();
        assert_eq!(seen, vec![CaptureEvent::Flash, CaptureEvent::Captured { id: artifact.id }]);
    }

    #[test]
    fn test_refused_capture_emits_nothing() {
        let events = Arc::new(Mutex::new(vec![]));
        let sink = Arc::clone(&events);
        let mut p = pipeline();
        p.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        let denied = StillSource::unavailable(SourceFault::PermissionDenied);
        assert!(matches!(
            p.capture(&denied, None),
            Err(CaptureError::SourceUnavailable(SourceFault::PermissionDenied))
        ));
        assert!(events.lock().unwrap().is_empty());
        assert!(p.store().is_empty());
    }

    #[test]
    fn test_enrich_unknown_artifact() {
        struct Never;
        impl DescriptionOracle for Never {
            fn describe(&self, _: &str) -> String {
                panic!("oracle must not be called")
            }
        }
        let p = pipeline();
        assert!(matches!(p.enrich("ghost", &Never), Err(EnrichError::ArtifactNotFound(_))));
    }

    #[test]
    fn test_enrich_sends_payload_without_prefix() {
        struct Echo;
        impl DescriptionOracle for Echo {
            fn describe(&self, image: &str) -> String {
                assert!(!image.starts_with("data:"));
                assert!(image.starts_with("/9j/"));
                "echo".to_string()
            }
        }
        let mut p = pipeline();
        let artifact = p.capture(&source(), None).unwrap();
        let updated = p.enrich(&artifact.id, &Echo).unwrap();
        assert_eq!(updated.caption.as_deref(), Some("echo"));
    }

    #[test]
    fn test_blank_reply_matches_guarded_oracle() {
        use crate::oracle::{CaptionRequest, GuardedOracle, OracleError};

        struct Blank;
        impl DescriptionOracle for Blank {
            fn describe(&self, _: &str) -> String {
                " \n".to_string()
            }
        }
        let guarded = GuardedOracle::new(|_: &CaptionRequest| -> Result<String, OracleError> {
            Ok(String::new())
        });

        let mut p = pipeline();
        let artifact = p.capture(&source(), None).unwrap();
        let direct = p.enrich(&artifact.id, &Blank).unwrap();
        let wrapped = p.enrich(&artifact.id, &guarded).unwrap();
        assert_eq!(direct.caption.as_deref(), Some(EMPTY_CAPTION));
        assert_eq!(direct.caption, wrapped.caption);
    }
}
