//! Analysis pipeline
//!
//! Fixed five-stage flow from a label photo to a personalized advisory.

pub mod orchestrator;
pub mod stage;

pub use orchestrator::{fallback_advisory, Collaborators, Pipeline, RISK_UNAVAILABLE};
pub use stage::Stage;
