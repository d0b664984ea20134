//! Ingredisense - food label analysis
//!
//! Reads a packaged-food label from a photo and turns it into advice for a
//! specific user's health profile.
//!
//! # Architecture
//!
//! - **Pipeline**: Extract → Profile → Research → Analyze → Synthesize
//! - **Research**: parallel encyclopedia fan-out plus one batched enrichment call
//! - **Alternatives**: category lookup, constraint filters, deterministic ranking
//! - **Decision**: traffic-light color parsed from the final advisory

pub mod errors;
pub mod types;
pub mod config;
pub mod telemetry;

// Collaborator seams
pub mod ollama;
pub mod gateway;
pub mod vision;
pub mod sources;

// Core logic
pub mod prompts;
pub mod research;
pub mod category;
pub mod alternatives;
pub mod decision;
pub mod pipeline;

// Interface layer
pub mod cli;
pub mod doctor;

// Re-export commonly used types
pub use errors::{AnalysisError, Result};
pub use pipeline::{Pipeline, Stage};
pub use types::{AnalysisResult, AnalysisState};
