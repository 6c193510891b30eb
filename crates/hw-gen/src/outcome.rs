//! Terminal results of a generation session.

use std::fmt;

use serde::{Deserialize, Serialize};

use hw_core::World;
use hw_engine::EdgeValidationSummary;

use crate::progress::Stage;

/// Why the expansion loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The world holds `max_tiles` tiles.
    BudgetReached,
    /// No frontier position has any legal option.
    Exhausted,
    /// The oracle asked for nothing, or its answer was unusable.
    NoActions,
    /// A round changed nothing.
    NoChanges,
    /// `max_iterations` rounds ran.
    IterationCap,
    /// Cancellation was observed.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BudgetReached => "tile budget reached",
            Self::Exhausted => "no legal options left",
            Self::NoActions => "oracle returned no actions",
            Self::NoChanges => "round applied no changes",
            Self::IterationCap => "iteration cap reached",
            Self::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// A world was produced. Invalid edges are reported, not repaired.
    Success {
        /// The final world.
        world: World,
        /// Result of the final edge-validation pass.
        validation: EdgeValidationSummary,
    },
    /// The session could not produce a world.
    Error(String),
    /// The session was cancelled.
    Cancelled,
}

impl GenerationOutcome {
    /// Whether a world was produced.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The final world, on success.
    pub fn world(&self) -> Option<&World> {
        match self {
            Self::Success { world, .. } => Some(world),
            _ => None,
        }
    }

    /// The validation summary, on success.
    pub fn validation(&self) -> Option<&EdgeValidationSummary> {
        match self {
            Self::Success { validation, .. } => Some(validation),
            _ => None,
        }
    }

    /// The terminal stage this outcome corresponds to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Success { .. } => Stage::Complete,
            Self::Error(_) => Stage::Error,
            Self::Cancelled => Stage::Cancelled,
        }
    }
}
