//! Type definitions module
//!
//! Label, ingredient knowledge and run-state types shared by every stage.

pub mod label;
pub mod profile;
pub mod state;

// Re-export commonly used types
pub use label::{LabelExtraction, NutritionFacts};
pub use profile::IngredientProfile;
pub use state::{AnalysisResult, AnalysisState, StatePatch};
