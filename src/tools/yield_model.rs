//! Yield regression tool
//!
//! Evaluates a pre-trained linear regression artifact (feature names,
//! coefficients, intercept serialized as JSON) for crop yield estimates.
//! Training is out of scope; this is inference over a frozen artifact.

use crate::tools::{Tool, ToolInput, ToolKind, ToolOutput};
use crate::types::{AppError, AppResult};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct YieldArtifact {
    /// Crop the model was fitted for, informational only.
    #[serde(default)]
    pub crop: Option<String>,
    /// Feature names, in coefficient order.
    pub features: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Unit of the prediction, e.g. "t/ha".
    #[serde(default)]
    pub unit: Option<String>,
}

pub struct YieldModel {
    artifact: YieldArtifact,
}

impl YieldModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading yield model artifact {}", path.display()))?;
        let artifact: YieldArtifact =
            serde_json::from_str(&raw).context("parsing yield model artifact")?;

        if artifact.features.is_empty() {
            bail!("yield model artifact has no features");
        }
        if artifact.features.len() != artifact.coefficients.len() {
            bail!(
                "yield model artifact mismatch: {} features vs {} coefficients",
                artifact.features.len(),
                artifact.coefficients.len()
            );
        }

        info!(
            path = %path.display(),
            features = artifact.features.len(),
            crop = artifact.crop.as_deref().unwrap_or("unspecified"),
            "Loaded yield regression artifact"
        );

        Ok(Self { artifact })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifact.features
    }

    pub fn unit(&self) -> &str {
        self.artifact.unit.as_deref().unwrap_or("t/ha")
    }

    /// `intercept + Σ coef_i * x_i`, features in artifact order.
    pub fn predict(&self, features: &[f64]) -> AppResult<f64> {
        if features.len() != self.artifact.coefficients.len() {
            return Err(AppError::InvalidRequest(format!(
                "expected {} features, got {}",
                self.artifact.coefficients.len(),
                features.len()
            )));
        }

        let sum: f64 = self
            .artifact
            .coefficients
            .iter()
            .zip(features)
            .map(|(c, x)| c * x)
            .sum();

        Ok(self.artifact.intercept + sum)
    }

    /// Predict from named features; every artifact feature must be present.
    pub fn predict_named(&self, features: &HashMap<String, f64>) -> AppResult<f64> {
        let missing: Vec<&str> = self
            .artifact
            .features
            .iter()
            .filter(|name| !features.contains_key(name.as_str()))
            .map(|name| name.as_str())
            .collect();

        if !missing.is_empty() {
            return Err(AppError::InvalidRequest(format!(
                "missing features: {}",
                missing.join(", ")
            )));
        }

        let ordered: Vec<f64> = self
            .artifact
            .features
            .iter()
            .map(|name| features[name.as_str()])
            .collect();

        self.predict(&ordered)
    }

    /// Pull `name value` / `name: value` / `name=value` pairs out of free
    /// text, matching feature names with `_` or space interchangeable.
    fn extract_features(&self, query: &str) -> HashMap<String, f64> {
        let mut found = HashMap::new();

        for name in &self.artifact.features {
            let pattern = format!(
                r"(?i)\b{}\s*[:=]?\s*(-?\d+(?:\.\d+)?)",
                regex::escape(name).replace('_', r"[ _]")
            );
            let Ok(re) = Regex::new(&pattern) else {
                continue;
            };
            if let Some(caps) = re.captures(query) {
                if let Ok(value) = caps[1].parse::<f64>() {
                    found.insert(name.clone(), value);
                }
            }
        }

        found
    }
}

#[async_trait]
impl Tool for YieldModel {
    fn kind(&self) -> ToolKind {
        ToolKind::YieldModel
    }

    fn description(&self) -> &'static str {
        "Estimates crop yield from growing-condition figures (rainfall, temperature, soil measurements) using a trained regression model"
    }

    async fn run(&self, input: &ToolInput) -> AppResult<ToolOutput> {
        let extracted = self.extract_features(&input.query);

        match self.predict_named(&extracted) {
            Ok(prediction) => {
                let inputs = self
                    .artifact
                    .features
                    .iter()
                    .map(|name| format!("{name}={}", extracted[name.as_str()]))
                    .collect::<Vec<_>>()
                    .join(", ");

                Ok(ToolOutput {
                    tool: self.kind(),
                    content: format!(
                        "Yield model estimate: {:.2} {} (inputs: {inputs})",
                        prediction,
                        self.unit()
                    ),
                    data: Some(serde_json::json!({
                        "prediction": prediction,
                        "unit": self.unit(),
                        "features": extracted,
                    })),
                })
            }
            Err(_) => {
                let missing: Vec<&str> = self
                    .artifact
                    .features
                    .iter()
                    .filter(|name| !extracted.contains_key(name.as_str()))
                    .map(|name| name.as_str())
                    .collect();

                Ok(ToolOutput {
                    tool: self.kind(),
                    content: format!(
                        "The yield model needs numeric values for: {}. Missing from the question: {}. \
                        Ask the user to provide them (e.g. \"rainfall_mm 520, temperature_c 24\").",
                        self.artifact.features.join(", "),
                        missing.join(", ")
                    ),
                    data: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_model() -> YieldModel {
        YieldModel {
            artifact: YieldArtifact {
                crop: Some("maize".to_string()),
                features: vec![
                    "rainfall_mm".to_string(),
                    "temperature_c".to_string(),
                    "soil_ph".to_string(),
                ],
                coefficients: vec![0.004, -0.05, 0.8],
                intercept: 1.5,
                unit: Some("t/ha".to_string()),
            },
        }
    }

    #[test]
    fn test_predict_linear_combination() {
        let model = test_model();
        let prediction = model.predict(&[500.0, 24.0, 6.5]).unwrap();
        let expected = 1.5 + 0.004 * 500.0 - 0.05 * 24.0 + 0.8 * 6.5;
        assert!((prediction - expected).abs() < 1e-9);
    }

    #[test]
    fn test_predict_rejects_wrong_arity() {
        let model = test_model();
        assert!(model.predict(&[500.0]).is_err());
    }

    #[test]
    fn test_predict_named_reports_missing() {
        let model = test_model();
        let mut features = HashMap::new();
        features.insert("rainfall_mm".to_string(), 500.0);

        let err = model.predict_named(&features).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("temperature_c"));
        assert!(message.contains("soil_ph"));
    }

    #[test]
    fn test_extract_features_from_text() {
        let model = test_model();
        let extracted = model
            .extract_features("Predict yield with rainfall mm 520, temperature_c: 24.5 and soil_ph=6.2");

        assert_eq!(extracted.get("rainfall_mm"), Some(&520.0));
        assert_eq!(extracted.get("temperature_c"), Some(&24.5));
        assert_eq!(extracted.get("soil_ph"), Some(&6.2));
    }

    #[tokio::test]
    async fn test_run_asks_for_missing_inputs() {
        let model = test_model();
        let out = model
            .run(&ToolInput::text("What yield can I expect this season?"))
            .await
            .unwrap();
        assert!(out.content.contains("rainfall_mm"));
        assert!(out.data.is_none());
    }

    #[tokio::test]
    async fn test_run_predicts_when_inputs_present() {
        let model = test_model();
        let out = model
            .run(&ToolInput::text(
                "yield for rainfall_mm 500 temperature_c 24 soil_ph 6.5",
            ))
            .await
            .unwrap();
        assert!(out.content.contains("Yield model estimate"));
        assert!(out.data.is_some());
    }
}
