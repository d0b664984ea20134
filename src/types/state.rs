//! Run state threaded through the pipeline
//!
//! Stages never mutate `AnalysisState` directly. They read it and return a
//! `StatePatch`; the orchestrator merges patches in stage order, so each
//! field has exactly one writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::label::NutritionFacts;
use super::profile::IngredientProfile;

/// Accumulating state of a single analysis run
#[derive(Debug, Clone)]
pub struct AnalysisState {
    pub run_id: Uuid,
    pub image_path: PathBuf,
    pub user_raw_health: String,
    pub brand_name: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub nutrition: Option<NutritionFacts>,
    pub clinical_profile: Option<String>,
    pub knowledge_base: Option<Vec<IngredientProfile>>,
    pub risk_analysis: Option<String>,
    pub alternatives: Option<Vec<String>>,
    pub final_insight: Option<String>,
    pub decision_color: Option<String>,
}

/// Fields produced by one stage
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub brand_name: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub nutrition: Option<NutritionFacts>,
    pub clinical_profile: Option<String>,
    pub knowledge_base: Option<Vec<IngredientProfile>>,
    pub risk_analysis: Option<String>,
    pub alternatives: Option<Vec<String>>,
    pub final_insight: Option<String>,
    pub decision_color: Option<String>,
}

impl AnalysisState {
    pub fn new(image_path: impl Into<PathBuf>, user_raw_health: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            image_path: image_path.into(),
            user_raw_health: user_raw_health.into(),
            brand_name: None,
            ingredients: None,
            nutrition: None,
            clinical_profile: None,
            knowledge_base: None,
            risk_analysis: None,
            alternatives: None,
            final_insight: None,
            decision_color: None,
        }
    }

    /// Merge a stage patch; fields already set are never overwritten
    pub fn apply(&mut self, patch: StatePatch) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.brand_name, patch.brand_name);
        fill(&mut self.ingredients, patch.ingredients);
        fill(&mut self.nutrition, patch.nutrition);
        fill(&mut self.clinical_profile, patch.clinical_profile);
        fill(&mut self.knowledge_base, patch.knowledge_base);
        fill(&mut self.risk_analysis, patch.risk_analysis);
        fill(&mut self.alternatives, patch.alternatives);
        fill(&mut self.final_insight, patch.final_insight);
        fill(&mut self.decision_color, patch.decision_color);
    }

    pub fn brand(&self) -> &str {
        self.brand_name.as_deref().unwrap_or("Unknown")
    }

    pub fn ingredient_list(&self) -> &[String] {
        self.ingredients.as_deref().unwrap_or(&[])
    }

    pub fn profile_text(&self) -> &str {
        self.clinical_profile.as_deref().unwrap_or(&self.user_raw_health)
    }

    pub fn knowledge(&self) -> &[IngredientProfile] {
        self.knowledge_base.as_deref().unwrap_or(&[])
    }

    pub fn alternative_list(&self) -> &[String] {
        self.alternatives.as_deref().unwrap_or(&[])
    }

    /// Freeze the state into the result handed back to the caller
    pub fn into_result(self) -> AnalysisResult {
        AnalysisResult {
            success: true,
            run_id: self.run_id,
            analyzed_at: Utc::now(),
            brand_name: self.brand_name.unwrap_or_else(|| "Unknown".to_string()),
            ingredients_list: self.ingredients.unwrap_or_default(),
            nutrition_facts: self.nutrition,
            user_clinical_profile: self.clinical_profile.unwrap_or_default(),
            ingredient_knowledge_base: self.knowledge_base.unwrap_or_default(),
            clinical_risk_analysis: self.risk_analysis.unwrap_or_default(),
            product_alternatives: self.alternatives.unwrap_or_default(),
            final_conversational_insight: self.final_insight.unwrap_or_default(),
            decision_color: self
                .decision_color
                .unwrap_or_else(|| crate::decision::DEFAULT_COLOR.to_string()),
        }
    }
}

/// Outcome of a successful analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub run_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub brand_name: String,
    pub ingredients_list: Vec<String>,
    pub nutrition_facts: Option<NutritionFacts>,
    pub user_clinical_profile: String,
    pub ingredient_knowledge_base: Vec<IngredientProfile>,
    pub clinical_risk_analysis: String,
    pub product_alternatives: Vec<String>,
    pub final_conversational_insight: String,
    pub decision_color: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_fills_empty_fields() {
        let mut state = AnalysisState::new("label.jpg", "hypertension");
        state.apply(StatePatch {
            brand_name: Some("Lays".into()),
            ingredients: Some(vec!["Potato".into(), "Salt".into()]),
            ..Default::default()
        });

        assert_eq!(state.brand(), "Lays");
        assert_eq!(state.ingredient_list().len(), 2);
        assert!(state.clinical_profile.is_none());
    }

    #[test]
    fn test_patch_never_overwrites() {
        let mut state = AnalysisState::new("label.jpg", "");
        state.apply(StatePatch {
            risk_analysis: Some("first".into()),
            ..Default::default()
        });
        state.apply(StatePatch {
            risk_analysis: Some("second".into()),
            ..Default::default()
        });
        assert_eq!(state.risk_analysis.as_deref(), Some("first"));
    }

    #[test]
    fn test_profile_text_falls_back_to_raw_health() {
        let state = AnalysisState::new("label.jpg", "Allergies: Gluten");
        assert_eq!(state.profile_text(), "Allergies: Gluten");
    }

    #[test]
    fn test_into_result_defaults() {
        let result = AnalysisState::new("label.jpg", "").into_result();
        assert!(result.success);
        assert_eq!(result.brand_name, "Unknown");
        assert_eq!(result.decision_color, "#EAB308");
        assert!(result.ingredient_knowledge_base.is_empty());
    }
}
