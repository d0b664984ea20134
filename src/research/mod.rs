//! Ingredient research
//!
//! Turns the ingredient list into positionally aligned knowledge profiles.

pub mod aggregator;

pub use aggregator::{assemble_profiles, AggregatorLimits, EvidenceAggregator, IngredientEvidence};
