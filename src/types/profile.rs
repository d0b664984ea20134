//! Ingredient knowledge profiles

use serde::{Deserialize, Serialize};

/// Lowest NOVA group (unprocessed or minimally processed)
pub const NOVA_MIN: u8 = 1;

/// Highest NOVA group (ultra-processed)
pub const NOVA_MAX: u8 = 4;

/// NOVA group assumed when nothing better is known
pub const DEFAULT_NOVA: u8 = 3;

/// Enriched knowledge about a single ingredient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientProfile {
    pub name: String,
    pub manufacturing: String,
    pub regulatory_gap: String,
    pub health_risks: String,
    pub nova_score: u8,
}

impl IngredientProfile {
    /// Profile substituted when the batched enrichment response was unusable
    pub fn unavailable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            manufacturing: "Unknown".to_string(),
            regulatory_gap: "No major regulatory restrictions identified".to_string(),
            health_risks: "Data unavailable due to API error".to_string(),
            nova_score: DEFAULT_NOVA,
        }
    }

    /// Profile substituted for a single malformed element of an otherwise parsed response
    pub fn malformed(name: &str) -> Self {
        Self {
            health_risks: "Data unavailable".to_string(),
            ..Self::unavailable(name)
        }
    }
}

/// Clamp any reported NOVA value into 1..=4
pub fn clamp_nova(value: i64) -> u8 {
    value.clamp(NOVA_MIN as i64, NOVA_MAX as i64) as u8
}
