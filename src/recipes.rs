//! Recipe Catalog - Film Stocks
//!
//! A fixed, ordered table of film-stock recipes. The catalog is built once
//! at startup and is read-only afterwards.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blend::BlendMode;
use crate::filters::{FilterChain, FilterOp};
use crate::validation::RecipeValidator;

pub type RecipeId = String;

pub const DEFAULT_RECIPE_ID: &str = "standard";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog has no recipes")]
    Empty,

    #[error("Duplicate recipe id: {0}")]
    DuplicateId(String),

    #[error("Default recipe not in catalog: {0}")]
    UnknownDefault(String),

    #[error("Recipe {id} failed validation: {reasons}")]
    InvalidRecipe { id: String, reasons: String },

    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Cosmetic; only ever applied to the live viewfinder.
    #[serde(default)]
    pub preview_filter: FilterChain,
    #[serde(default)]
    pub capture_filter: FilterChain,
    #[serde(default)]
    pub grain_intensity: f32,
    #[serde(default)]
    pub tint: Option<TintOverlay>,
}

/// Flat colour laid over the whole frame after grain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TintOverlay {
    pub color: [u8; 3],
    pub opacity: f32,
    #[serde(default)]
    pub blend: BlendMode,
}

impl TintOverlay {
    pub fn new(color: [u8; 3], opacity: f32) -> Self {
        Self { color, opacity, blend: BlendMode::Normal }
    }
}

/// On-disk catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    #[serde(default = "default_recipe_id")]
    pub default_recipe: RecipeId,
    pub recipes: Vec<Recipe>,
}

fn default_recipe_id() -> RecipeId { DEFAULT_RECIPE_ID.to_string() }

#[derive(Debug, Clone)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
    default_index: usize,
}

impl RecipeCatalog {
    pub fn new(recipes: Vec<Recipe>, default_id: &str) -> Result<Self, CatalogError> {
        if recipes.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for recipe in &recipes {
            if !seen.insert(recipe.id.as_str()) {
                return Err(CatalogError::DuplicateId(recipe.id.clone()));
            }
        }

        let validator = RecipeValidator::new();
        for recipe in &recipes {
            let result = validator.validate(recipe);
            if result.has_errors() {
                let reasons: Vec<_> = result.errors()
                    .map(|v| format!("{}: {}", v.rule, v.message))
                    .collect();
                return Err(CatalogError::InvalidRecipe {
                    id: recipe.id.clone(),
                    reasons: reasons.join("; "),
                });
            }
        }

        let default_index = recipes.iter()
            .position(|r| r.id == default_id)
            .ok_or_else(|| CatalogError::UnknownDefault(default_id.to_string()))?;

        Ok(Self { recipes, default_index })
    }

    /// The five stocks shipped with the camera.
    pub fn builtin() -> Self {
        Self {
            recipes: builtin_recipes(),
            default_index: 0,
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(content)?;
        let catalog = Self::new(file.recipes, &file.default_recipe)?;
        tracing::info!(
            recipes = catalog.recipes.len(),
            default_recipe = %catalog.default_recipe().id,
            "loaded recipe catalog"
        );
        Ok(catalog)
    }

    pub fn to_file(&self) -> CatalogFile {
        CatalogFile {
            default_recipe: self.default_recipe().id.clone(),
            recipes: self.recipes.clone(),
        }
    }

    /// Resolve an id, falling back to the default recipe when it is
    /// unknown or absent. Never fails.
    pub fn lookup(&self, id: Option<&str>) -> &Recipe {
        id.and_then(|id| self.get(id)).unwrap_or_else(|| self.default_recipe())
    }

    /// Strict lookup
    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    pub fn default_recipe(&self) -> &Recipe {
        &self.recipes[self.default_index]
    }

    /// All recipes in definition order.
    pub fn all(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Next recipe in definition order, wrapping. Unknown ids start from the default.
    pub fn next_after(&self, id: &str) -> &Recipe {
        let i = self.index_of(id);
        &self.recipes[(i + 1) % self.recipes.len()]
    }

    pub fn previous_before(&self, id: &str) -> &Recipe {
        let i = self.index_of(id);
        &self.recipes[(i + self.recipes.len() - 1) % self.recipes.len()]
    }

    fn index_of(&self, id: &str) -> usize {
        self.recipes.iter()
            .position(|r| r.id == id)
            .unwrap_or(self.default_index)
    }
}

impl Default for RecipeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn stock(
    id: &str,
    name: &str,
    description: &str,
    ops: Vec<FilterOp>,
    grain_intensity: f32,
    tint: Option<TintOverlay>,
) -> Recipe {
    let chain = FilterChain::new(ops);
    Recipe {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        preview_filter: chain.clone(),
        capture_filter: chain,
        grain_intensity,
        tint,
    }
}

fn builtin_recipes() -> Vec<Recipe> {
    vec![
        stock(
            "standard",
            "Std. Color",
            "Natural, balanced colors suitable for everyday photography.",
            vec![FilterOp::Contrast(1.05), FilterOp::Saturate(1.1)],
            0.05,
            None,
        ),
        stock(
            "portra",
            "Portra 400",
            "Warm skin tones, fine grain, and soft highlights. Perfect for portraits.",
            vec![
                FilterOp::Sepia(0.2),
                FilterOp::Contrast(1.1),
                FilterOp::Saturate(1.2),
                FilterOp::Brightness(1.05),
            ],
            0.12,
            Some(TintOverlay::new([255, 200, 100], 0.05)),
        ),
        stock(
            "cine",
            "Cine 800T",
            "Cool teal shadows and warm highlights. Cinematic night aesthetic.",
            vec![
                FilterOp::HueRotate(-10.0),
                FilterOp::Contrast(1.2),
                FilterOp::Saturate(1.1),
                FilterOp::Brightness(0.9),
            ],
            0.15,
            Some(TintOverlay::new([0, 50, 100], 0.05)),
        ),
        stock(
            "mono",
            "Tri-X 400",
            "Classic high-contrast black and white with gritty grain.",
            vec![
                FilterOp::Grayscale(1.0),
                FilterOp::Contrast(1.3),
                FilterOp::Brightness(0.9),
            ],
            0.25,
            None,
        ),
        stock(
            "faded",
            "Expired 200",
            "Low contrast, faded shadows, and color shifts. Nostalgic feel.",
            vec![
                FilterOp::Sepia(0.3),
                FilterOp::Saturate(0.8),
                FilterOp::Contrast(0.9),
                FilterOp::Brightness(1.1),
            ],
            0.20,
            Some(TintOverlay::new([255, 100, 100], 0.02)),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order_and_default() {
        let catalog = RecipeCatalog::builtin();
        let ids: Vec<_> = catalog.all().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["standard", "portra", "cine", "mono", "faded"]);
        assert_eq!(catalog.default_recipe().id, DEFAULT_RECIPE_ID);
    }

    #[test]
    fn test_builtin_filters_match_stock_text() {
        let expected = [
            ("standard", "contrast(105%) saturate(110%)"),
            ("portra", "sepia(20%) contrast(110%) saturate(120%) brightness(105%)"),
            ("cine", "hue-rotate(-10deg) contrast(120%) saturate(110%) brightness(90%)"),
            ("mono", "grayscale(100%) contrast(130%) brightness(90%)"),
            ("faded", "sepia(30%) saturate(80%) contrast(90%) brightness(110%)"),
        ];
        let catalog = RecipeCatalog::builtin();
        for (id, text) in expected {
            let recipe = catalog.get(id).unwrap();
            let parsed: FilterChain = text.parse().unwrap();
            assert_eq!(recipe.capture_filter, parsed, "{id}");
            assert_eq!(recipe.capture_filter.to_string(), text);
        }
    }

    #[test]
    fn test_lookup_falls_back() {
        let catalog = RecipeCatalog::builtin();
        assert_eq!(catalog.lookup(Some("mono")).id, "mono");
        assert_eq!(catalog.lookup(Some("nonexistent-id")).id, "standard");
        assert_eq!(catalog.lookup(None).id, "standard");
        assert!(catalog.get("nonexistent-id").is_none());
    }

    #[test]
    fn test_sequential_selection_wraps() {
        let catalog = RecipeCatalog::builtin();
        assert_eq!(catalog.next_after("standard").id, "portra");
        assert_eq!(catalog.next_after("faded").id, "standard");
        assert_eq!(catalog.previous_before("standard").id, "faded");
        assert_eq!(catalog.next_after("bogus").id, "portra");
    }

    #[test]
    fn test_rejects_duplicates_and_unknown_default() {
        let recipes = builtin_recipes();
        let mut dup = recipes.clone();
        dup.push(recipes[0].clone());
        assert!(matches!(
            RecipeCatalog::new(dup, "standard"),
            Err(CatalogError::DuplicateId(id)) if id == "standard"
        ));
        assert!(matches!(
            RecipeCatalog::new(recipes, "velvia"),
            Err(CatalogError::UnknownDefault(_))
        ));
        assert!(matches!(RecipeCatalog::new(vec![], "standard"), Err(CatalogError::Empty)));
    }

    #[test]
    fn test_from_json_with_custom_default() {
        let json = r#"{
            "defaultRecipe": "mono",
            "recipes": [
                { "id": "standard", "name": "Std", "captureFilter": "none", "grainIntensity": 0.05 },
                { "id": "mono", "name": "Mono", "previewFilter": "grayscale(1)",
                  "captureFilter": "grayscale(100%)", "grainIntensity": 0.25,
                  "tint": { "color": [10, 20, 30], "opacity": 0.1, "blend": "soft-light" } }
            ]
        }"#;
        let catalog = RecipeCatalog::from_json(json).unwrap();
        assert_eq!(catalog.default_recipe().id, "mono");
        assert_eq!(catalog.lookup(Some("missing")).id, "mono");
        let tint = catalog.get("mono").and_then(|r| r.tint).unwrap();
        assert_eq!(tint.blend, BlendMode::SoftLight);
    }

    #[test]
    fn test_from_json_rejects_bad_grain() {
        let json = r#"{ "recipes": [ { "id": "standard", "name": "Std", "grainIntensity": 2.0 } ] }"#;
        assert!(matches!(
            RecipeCatalog::from_json(json),
            Err(CatalogError::InvalidRecipe { .. })
        ));
    }

    #[test]
    fn test_catalog_file_round_trip() {
        let catalog = RecipeCatalog::builtin();
        let text = serde_json::to_string(&catalog.to_file()).unwrap();
        let reloaded = RecipeCatalog::from_json(&text).unwrap();
        assert_eq!(reloaded.all(), catalog.all());
    }
}
