//! The decision oracle boundary.
//!
//! A session hands the oracle a snapshot of the world, the legal options, and
//! the plan text; the oracle answers with a [`Decision`]. The plan and the
//! previous round's progress note travel in every request, so an oracle needs
//! no setters and keeps no hidden per-session state.

pub mod greedy;
pub mod scripted;

use serde::{Deserialize, Serialize};

use hw_core::{MutationBatch, WorldSnapshot};
use hw_engine::OptionSet;

use crate::error::GenResult;
use crate::progress::Stage;
use crate::session::SessionId;

pub use greedy::GreedyOracle;
pub use scripted::{ScriptedOracle, ScriptedResponse};

/// Everything the oracle sees in one round.
#[derive(Debug, Clone, Serialize)]
pub struct OracleRequest {
    /// The asking session.
    pub session: SessionId,
    /// `EXPANDING` or `HOLE_FILLING`.
    pub stage: Stage,
    /// Round number within the stage, starting at 1.
    pub iteration: usize,
    /// The world as it stands.
    pub world: WorldSnapshot,
    /// Legal placements; anything else in the answer is dropped.
    pub options: OptionSet,
    /// Free-form plan or theme text.
    pub plan: String,
    /// The oracle's progress note from the previous round.
    pub previous_progress: Option<String>,
    /// Tiles that may still be placed before the budget is hit.
    pub remaining_tiles: usize,
}

/// A structured answer from the oracle.
///
/// Only `actions` is interpreted. The free-text fields are stored in the
/// session journal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Requested changes.
    #[serde(flatten)]
    pub actions: MutationBatch,
    /// Why the oracle chose these actions.
    #[serde(default)]
    pub reasoning: String,
    /// A progress note to carry into the next round.
    #[serde(default)]
    pub progress: String,
}

impl Decision {
    /// A decision with the given actions and no commentary.
    pub fn from_actions(actions: MutationBatch) -> Self {
        Self {
            actions,
            ..Self::default()
        }
    }

    /// Parse a decision from raw response text. Text around the outermost
    /// JSON object (such as a markdown code fence) is ignored.
    pub fn from_json(text: &str) -> GenResult<Self> {
        let body = match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => &text[start..=end],
            _ => text,
        };
        Ok(serde_json::from_str(body)?)
    }

    /// Whether the decision asks for nothing.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Chooses which offered options to apply each round.
pub trait DecisionOracle {
    /// Answer one request. An `Err` is treated by the session as a round
    /// with no actions.
    fn decide(&mut self, request: &OracleRequest)
    -> impl Future<Output = GenResult<Decision>> + Send;
}
