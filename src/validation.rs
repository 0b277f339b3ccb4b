//! Recipe Validation - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! The catalog refuses any recipe with an error-severity violation.

use serde::{Deserialize, Serialize};

use crate::recipes::Recipe;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub recipe_id: String,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Error)
    }
}

/// Validation rule trait - produces violations
pub trait RecipeRule {
    fn name(&self) -> &'static str;
    fn validate(&self, recipe: &Recipe) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct IdentityRule;

impl RecipeRule for IdentityRule {
    fn name(&self) -> &'static str { "identity" }

    fn validate(&self, recipe: &Recipe) -> Vec<ValidationViolation> {
        let id = recipe.id.as_str();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Recipe id must be a non-empty token".to_string(),
                expected: Some("short token without whitespace".to_string()),
                actual: Some(format!("{:?}", id)),
                remediation: vec!["Use a short identifier such as \"portra\"".to_string()],
            }]
        } else {
            vec![]
        }
    }
}

pub struct GrainRangeRule;

impl RecipeRule for GrainRangeRule {
    fn name(&self) -> &'static str { "grain_range" }

    fn validate(&self, recipe: &Recipe) -> Vec<ValidationViolation> {
        let g = recipe.grain_intensity;
        if g.is_finite() && (0.0..=1.0).contains(&g) {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            message: "Grain intensity out of range".to_string(),
            expected: Some("0.0 ..= 1.0".to_string()),
            actual: Some(format!("{}", g)),
            remediation: vec!["Clamp grainIntensity into [0, 1]".to_string()],
        }]
    }
}

pub struct TintOpacityRule;

impl RecipeRule for TintOpacityRule {
    fn name(&self) -> &'static str { "tint_opacity" }

    fn validate(&self, recipe: &Recipe) -> Vec<ValidationViolation> {
        let Some(tint) = &recipe.tint else {
            return vec![];
        };
        let o = tint.opacity;
        if !o.is_finite() || !(0.0..=1.0).contains(&o) {
            return vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: "Tint opacity out of range".to_string(),
                expected: Some("0.0 ..= 1.0".to_string()),
                actual: Some(format!("{}", o)),
                remediation: vec!["Set tint.opacity between 0 and 1".to_string()],
            }];
        }
        if o == 0.0 {
            return vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Info,
                message: "Tint has zero opacity and will not be visible".to_string(),
                expected: None,
                actual: Some("0".to_string()),
                remediation: vec!["Remove the tint or raise its opacity".to_string()],
            }];
        }
        vec![]
    }
}

/// The viewfinder should show what the shutter will store.
pub struct PreviewParityRule;

impl RecipeRule for PreviewParityRule {
    fn name(&self) -> &'static str { "preview_parity" }

    fn validate(&self, recipe: &Recipe) -> Vec<ValidationViolation> {
        if recipe.preview_filter == recipe.capture_filter {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Warning,
            message: "Preview filter differs from capture filter".to_string(),
            expected: Some(recipe.capture_filter.to_string()),
            actual: Some(recipe.preview_filter.to_string()),
            remediation: vec!["Keep previewFilter and captureFilter equivalent".to_string()],
        }]
    }
}

/// Validator orchestrates rules
pub struct RecipeValidator {
    rules: Vec<Box<dyn RecipeRule + Send + Sync>>,
}

impl RecipeValidator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(IdentityRule),
                Box::new(GrainRangeRule),
                Box::new(TintOpacityRule),
                Box::new(PreviewParityRule),
            ],
        }
    }

    pub fn validate(&self, recipe: &Recipe) -> ValidationResult {
        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(recipe))
            .collect();

        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        ValidationResult {
            valid,
            violations,
            recipe_id: recipe.id.clone(),
        }
    }
}

impl Default for RecipeValidator {
    fn default() -> Self {
        Self::new()
    }
}
