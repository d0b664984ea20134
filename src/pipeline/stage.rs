//! Pipeline stage machine
//!
//! Stages only move forward, one edge at a time:
//! Extract → Profile → Research → Analyze → Synthesize → Complete.
//! Any non-terminal stage may move to Failed; in practice only Extract does.

use serde::Serialize;

use crate::errors::{AnalysisError, Result};

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Extract,
    Profile,
    Research,
    Analyze,
    Synthesize,

    /// Terminal: every stage ran
    Complete,

    /// Terminal: the run aborted
    Failed,
}

impl Stage {
    /// Stages that do work, in execution order
    pub const ORDER: [Stage; 5] = [
        Stage::Extract,
        Stage::Profile,
        Stage::Research,
        Stage::Analyze,
        Stage::Synthesize,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed)
    }

    /// The forward edge out of this stage
    pub fn next(&self) -> Option<Stage> {
        use Stage::*;
        match self {
            Extract => Some(Profile),
            Profile => Some(Research),
            Research => Some(Analyze),
            Analyze => Some(Synthesize),
            Synthesize => Some(Complete),
            Complete | Failed => None,
        }
    }

    /// Validate a transition
    pub fn transition(&self, to: Stage) -> Result<Stage> {
        let legal = match to {
            Stage::Failed => !self.is_terminal(),
            _ => self.next() == Some(to),
        };

        if legal {
            Ok(to)
        } else {
            Err(AnalysisError::InvalidTransition {
                from: format!("{:?}", self),
                to: format!("{:?}", to),
            })
        }
    }

    /// Whether a failure in this stage aborts the run
    pub fn is_fatal_on_error(&self) -> bool {
        matches!(self, Stage::Extract)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Extract => "Reading label",
            Stage::Profile => "Profiling health",
            Stage::Research => "Researching ingredients",
            Stage::Analyze => "Analyzing risks",
            Stage::Synthesize => "Writing advice",
            Stage::Complete => "Completed",
            Stage::Failed => "Failed",
        }
    }
}
