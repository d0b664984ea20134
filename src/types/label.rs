//! Label extraction types
//!
//! What the vision service reads off a package: brand, ordered ingredients
//! and, when the nutrition table was legible, its values.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Nutrition facts from the label, every value optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    #[serde(default)]
    pub serving_size: Option<String>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub total_fat_g: Option<f64>,
    #[serde(default)]
    pub saturated_fat_g: Option<f64>,
    #[serde(default)]
    pub sodium_mg: Option<f64>,
    #[serde(default)]
    pub carbohydrates_g: Option<f64>,
    #[serde(default)]
    pub fiber_g: Option<f64>,
    #[serde(default)]
    pub sugars_g: Option<f64>,
    #[serde(default)]
    pub protein_g: Option<f64>,
    #[serde(default)]
    pub potassium_mg: Option<f64>,
    #[serde(default)]
    pub iron_mg: Option<f64>,
}

impl NutritionFacts {
    /// True when at least one value was actually read off the label.
    ///
    /// Numbers count only when positive; the serving size counts when it is
    /// non-blank and not a placeholder.
    pub fn has_data(&self) -> bool {
        let serving = self
            .serving_size
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| !s.eq_ignore_ascii_case("not listed") && !s.eq_ignore_ascii_case("unknown"))
            .unwrap_or(false);

        serving || self.numeric_values().iter().any(|v| v.map_or(false, |v| v > 0.0))
    }

    fn numeric_values(&self) -> [Option<f64>; 10] {
        [
            self.calories,
            self.total_fat_g,
            self.saturated_fat_g,
            self.sodium_mg,
            self.carbohydrates_g,
            self.fiber_g,
            self.sugars_g,
            self.protein_g,
            self.potassium_mg,
            self.iron_mg,
        ]
    }
}

/// Brand, ingredients and nutrition extracted from a label image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelExtraction {
    #[serde(default = "unknown_brand")]
    pub brand: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub nutrition: Option<NutritionFacts>,
}

fn unknown_brand() -> String {
    "Unknown".to_string()
}

impl LabelExtraction {
    /// A label with neither brand nor ingredients carries nothing to analyze
    pub fn is_empty(&self) -> bool {
        let brand = self.brand.trim();
        (brand.is_empty() || brand.eq_ignore_ascii_case("unknown")) && self.ingredients.is_empty()
    }

    /// JSON schema handed to the structured reasoning call
    pub fn json_schema() -> serde_json::Value {
        let number = json!({ "type": ["number", "null"] });
        json!({
            "type": "object",
            "properties": {
                "brand": { "type": "string" },
                "ingredients": { "type": "array", "items": { "type": "string" } },
                "nutrition": {
                    "type": ["object", "null"],
                    "properties": {
                        "serving_size": { "type": ["string", "null"] },
                        "calories": number,
                        "total_fat_g": number,
                        "saturated_fat_g": number,
                        "sodium_mg": number,
                        "carbohydrates_g": number,
                        "fiber_g": number,
                        "sugars_g": number,
                        "protein_g": number,
                        "potassium_mg": number,
                        "iron_mg": number
                    }
                }
            },
            "required": ["brand", "ingredients"]
        })
    }
}
