//! Pest-image classifier tool
//!
//! Thin client for a remote inference endpoint serving the trained pest
//! classifier (base64 image in, label + confidence out), plus a static
//! label → treatment-advice table.

use crate::tools::{Tool, ToolInput, ToolKind, ToolOutput};
use crate::types::{AppError, AppResult};
use crate::utils::retry::with_retry;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

pub struct PestClassifier {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    image_base64: &'a str,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
    #[serde(default)]
    pub top_k: Vec<LabelScore>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabelScore {
    pub label: String,
    pub confidence: f32,
}

impl PestClassifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub async fn classify(&self, image_base64: &str) -> AppResult<Classification> {
        let response = with_retry(
            || async {
                self.client
                    .post(&self.endpoint)
                    .json(&ClassifyRequest { image_base64 })
                    .send()
                    .await
            },
            2,
        )
        .await
        .map_err(|e| AppError::Tool {
            tool: "pest_classifier",
            message: format!("inference request failed: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Tool {
                tool: "pest_classifier",
                message: format!("inference endpoint returned {status}: {text}"),
            });
        }

        let classification: Classification = response.json().await.map_err(|e| AppError::Tool {
            tool: "pest_classifier",
            message: format!("invalid inference response: {e}"),
        })?;

        info!(
            label = %classification.label,
            confidence = classification.confidence,
            "Pest classification complete"
        );

        Ok(classification)
    }
}

/// Treatment advice for the labels the classifier was trained on.
/// Unknown labels fall through to a generic recommendation.
pub fn advice_for(label: &str) -> &'static str {
    match label.to_lowercase().replace(' ', "_").as_str() {
        "aphids" => {
            "Aphids: spray neem oil or insecticidal soap on the undersides of leaves, \
            encourage ladybird beetles, and avoid excess nitrogen fertilizer."
        }
        "armyworm" | "fall_armyworm" => {
            "Armyworm: scout fields early morning, handpick larvae in small plots, \
            and apply Bacillus thuringiensis or approved insecticides before larvae reach the whorl."
        }
        "leaf_blight" => {
            "Leaf blight: remove and destroy infected leaves, rotate crops, \
            and apply a copper-based fungicide at first sign of lesions."
        }
        "leaf_rust" | "rust" => {
            "Rust: plant resistant varieties where available, avoid overhead irrigation late in the day, \
            and apply a protective fungicide if infection spreads."
        }
        "spider_mites" | "mites" => {
            "Spider mites: increase humidity around plants, rinse foliage with water, \
            and use miticides or predatory mites for heavy infestations."
        }
        "stem_borer" => {
            "Stem borer: destroy crop residues after harvest, intercrop with repellent plants \
            such as Desmodium, and release Trichogramma parasitoids where available."
        }
        "healthy" => "No pest or disease detected; the crop appears healthy. Continue regular scouting.",
        _ => {
            "Isolate affected plants, photograph the damage from several angles, \
            and consult a local extension officer to confirm the diagnosis before treating."
        }
    }
}

#[async_trait]
impl Tool for PestClassifier {
    fn kind(&self) -> ToolKind {
        ToolKind::PestClassifier
    }

    fn description(&self) -> &'static str {
        "Identifies crop pests and diseases from an attached photo and suggests treatment"
    }

    async fn run(&self, input: &ToolInput) -> AppResult<ToolOutput> {
        let image = input.image_base64.as_deref().ok_or_else(|| AppError::Tool {
            tool: "pest_classifier",
            message: "pest classification requires an attached image".to_string(),
        })?;

        let classification = self.classify(image).await?;
        let advice = advice_for(&classification.label);

        let content = format!(
            "Pest classifier result: {} ({:.0}% confidence). {}",
            classification.label.replace('_', " "),
            classification.confidence * 100.0,
            advice
        );

        Ok(ToolOutput {
            tool: self.kind(),
            content,
            data: Some(serde_json::json!({
                "label": classification.label,
                "confidence": classification.confidence,
                "advice": advice,
                "top_k": classification.top_k,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advice_known_labels() {
        assert!(advice_for("aphids").contains("neem"));
        assert!(advice_for("Fall Armyworm").contains("larvae"));
        assert!(advice_for("healthy").contains("healthy"));
    }

    #[test]
    fn test_advice_unknown_label_is_generic() {
        assert!(advice_for("unknown_bug_42").contains("extension officer"));
    }

    #[tokio::test]
    async fn test_run_requires_image() {
        let classifier = PestClassifier::new("http://localhost:9000/classify");
        let err = classifier
            .run(&ToolInput::text("what is eating my maize?"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Tool {
                tool: "pest_classifier",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_classify_parses_endpoint_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/classify")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"label":"aphids","confidence":0.93,"top_k":[{"label":"aphids","confidence":0.93},{"label":"mites","confidence":0.04}]}"#,
            )
            .create_async()
            .await;

        let classifier = PestClassifier::new(format!("{}/classify", server.url()));
        let result = classifier.classify("aGVsbG8=").await.unwrap();

        assert_eq!(result.label, "aphids");
        assert_eq!(result.top_k.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_classify_surfaces_endpoint_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/classify")
            .with_status(500)
            .with_body("model not loaded")
            .expect_at_least(1)
            .create_async()
            .await;

        let classifier = PestClassifier::new(format!("{}/classify", server.url()));
        let err = classifier.classify("aGVsbG8=").await.unwrap_err();
        assert!(err.to_string().contains("pest_classifier"));
    }
}
