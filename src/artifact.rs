//! Artifact - one stored capture

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compositor::JPEG_MIME;
use crate::recipes::RecipeId;

/// Prefix for exported file names: `lumina_<id>.jpg`.
pub const EXPORT_PREFIX: &str = "lumina";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    #[serde(with = "base64_bytes")]
    pub image_data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
    pub recipe_id: RecipeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Artifact {
    /// Fresh artifact with a time-ordered unique id.
    pub fn new(image_data: Vec<u8>, recipe_id: impl Into<RecipeId>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            image_data,
            captured_at: Utc::now(),
            recipe_id: recipe_id.into(),
            caption: None,
        }
    }

    /// Encoded bytes without any framing.
    pub fn base64_payload(&self) -> String {
        STANDARD.encode(&self.image_data)
    }

    /// `data:image/jpeg;base64,...`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", JPEG_MIME, self.base64_payload())
    }

    pub fn export_filename(&self) -> String {
        format!("{}_{}.jpg", EXPORT_PREFIX, self.id)
    }

    /// Write the JPEG into `dir` and return its path.
    pub fn export_to(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(self.export_filename());
        fs::write(&path, &self.image_data)?;
        Ok(path)
    }

    /// Descriptor without image bytes, for listings.
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            id: self.id.clone(),
            captured_at: self.captured_at,
            recipe_id: self.recipe_id.clone(),
            caption: self.caption.clone(),
            filename: self.export_filename(),
            size_bytes: self.image_data.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub id: String,
    pub captured_at: DateTime<Utc>,
    pub recipe_id: RecipeId,
    pub caption: Option<String>,
    pub filename: String,
    pub size_bytes: usize,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}
