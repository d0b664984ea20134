//! Label reading
//!
//! The vision model is asked for a JSON description of the package. Its
//! reply is decoded directly when possible; otherwise the raw text is handed
//! to the structured reasoning call for a second attempt. Any failure here
//! is fatal for the run.

use std::path::Path;

use async_trait::async_trait;
use base64::Engine as _;

use crate::config::Config;
use crate::errors::{AnalysisError, Result};
use crate::gateway::{decode_json, strip_code_fence, ReasoningGateway};
use crate::ollama::{Generation, OllamaClient};
use crate::types::{LabelExtraction, NutritionFacts};

const LABEL_PROMPT: &str = "\
Look at this food label image carefully. Scan every panel of the package, \
including side and back panels and any nutrition table.

Extract:
1. The product brand
2. The complete ingredients list, in label order, without quantities or claims
3. Every nutrition value in the nutrition table (convert kJ to kcal by dividing by 4.184)

Return JSON in exactly this shape:
{\"brand\": \"...\", \"ingredients\": [\"...\"], \"nutrition\": {\"serving_size\": \"25g\", \
\"calories\": 80, \"total_fat_g\": 0.5, \"saturated_fat_g\": 0.1, \"sodium_mg\": 10, \
\"carbohydrates_g\": 19.4, \"fiber_g\": 1.8, \"sugars_g\": 17.4, \"protein_g\": 0.8, \
\"potassium_mg\": 168.6, \"iron_mg\": 0.5}}

Use null only for values that are truly not visible. Do not estimate.";

/// Vision/OCR service: image bytes in, model text out
#[async_trait]
pub trait VisionService: Send + Sync {
    async fn describe_label(&self, image: &[u8]) -> Result<String>;
}

/// Vision service backed by an Ollama multimodal model
#[derive(Debug, Clone)]
pub struct OllamaVision {
    client: OllamaClient,
    model: String,
    temperature: f32,
}

impl OllamaVision {
    pub fn new(client: OllamaClient, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }

    pub fn from_config(client: OllamaClient, config: &Config) -> Self {
        Self::new(
            client,
            config.ollama.vision_model.clone(),
            config.ollama.temperature,
        )
    }
}

#[async_trait]
impl VisionService for OllamaVision {
    async fn describe_label(&self, image: &[u8]) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);

        tracing::info!(model = %self.model, bytes = image.len(), "reading label image");
        self.client
            .generate(Generation {
                model: &self.model,
                prompt: LABEL_PROMPT,
                temperature: self.temperature,
                images: vec![encoded],
                format: None,
            })
            .await
    }
}

/// Decode the vision reply into a label.
///
/// Missing brand becomes "Unknown", missing ingredients an empty list. A
/// nutrition block that does not fit the schema is dropped, not fatal.
pub fn decode_label(text: &str) -> Result<LabelExtraction> {
    let value: serde_json::Value = decode_json(text)?;
    let object = value
        .as_object()
        .ok_or_else(|| AnalysisError::Decode("label reply is not a JSON object".to_string()))?;

    let brand = object
        .get("brand")
        .and_then(|b| b.as_str())
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or("Unknown")
        .to_string();

    let ingredients = object
        .get("ingredients")
        .and_then(|i| i.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let nutrition = match object.get("nutrition") {
        None | Some(serde_json::Value::Null) => None,
        Some(raw) => match serde_json::from_value::<NutritionFacts>(raw.clone()) {
            Ok(facts) => Some(facts),
            Err(e) => {
                tracing::warn!(error = %e, "dropping unreadable nutrition block");
                None
            }
        },
    };

    Ok(LabelExtraction {
        brand,
        ingredients,
        nutrition,
    })
}

/// Read the label at `image_path`.
///
/// Errors are always `AnalysisError::FatalExtraction`.
pub async fn extract_label(
    vision: &dyn VisionService,
    gateway: &dyn ReasoningGateway,
    image_path: &Path,
) -> Result<LabelExtraction> {
    let image = tokio::fs::read(image_path).await.map_err(|e| {
        AnalysisError::FatalExtraction(format!("cannot read {}: {}", image_path.display(), e))
    })?;

    let raw = vision
        .describe_label(&image)
        .await
        .map_err(|e| AnalysisError::FatalExtraction(e.to_string()))?;

    let label = match decode_label(&raw) {
        Ok(label) => label,
        Err(decode_err) => {
            tracing::warn!(error = %decode_err, "vision reply is not JSON, re-parsing with structured call");
            let prompt = format!(
                "Extract brand, ingredients, and nutrition facts from this text:\n{}",
                strip_code_fence(&raw)
            );
            let value = gateway
                .structured(&prompt, &LabelExtraction::json_schema())
                .await
                .map_err(|e| AnalysisError::FatalExtraction(format!("fallback parse failed: {}", e)))?;
            decode_label(&value.to_string())
                .map_err(|e| AnalysisError::FatalExtraction(format!("fallback parse failed: {}", e)))?
        }
    };

    if label.is_empty() {
        return Err(AnalysisError::FatalExtraction(
            "no brand or ingredients found on the label".to_string(),
        ));
    }

    tracing::info!(
        brand = %label.brand,
        ingredients = label.ingredients.len(),
        has_nutrition = label.nutrition.is_some(),
        "label extracted"
    );
    Ok(label)
}
