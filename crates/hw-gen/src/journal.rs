//! Record of every oracle round in a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::Stage;

/// What happened to one oracle decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Round number within the stage, starting at 1.
    pub iteration: usize,
    /// Stage the round ran in.
    pub stage: Stage,
    /// The oracle's free-text reasoning.
    pub reasoning: String,
    /// The oracle's free-text progress note.
    pub progress: String,
    /// Items the decision asked for.
    pub requested: usize,
    /// Items dropped because they were not offered or repeated a position.
    pub filtered: usize,
    /// Tile placements pruned by conflict resolution.
    pub pruned: usize,
    /// Changes made to the world.
    pub applied: usize,
    /// Items the mutator refused.
    pub failed: usize,
    /// Whether the response could not be used at all.
    pub malformed: bool,
    /// When the round finished.
    pub timestamp: DateTime<Utc>,
}

/// A chronological log of oracle rounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the journal.
    pub fn append(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Get all entries.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent non-empty progress note, passed back to the oracle
    /// on the next round.
    pub fn last_progress(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .map(|e| e.progress.as_str())
            .find(|p| !p.trim().is_empty())
    }

    /// Total pruned placements across all rounds.
    pub fn total_pruned(&self) -> usize {
        self.entries.iter().map(|e| e.pruned).sum()
    }

    /// Export the journal as markdown.
    pub fn export_markdown(&self) -> String {
        let mut out = String::from("# Generation Journal\n\n");
        for e in &self.entries {
            out.push_str(&format!("## {} round {}\n\n", e.stage, e.iteration));
            if e.malformed {
                out.push_str("*Response was malformed; treated as no actions.*\n\n");
                continue;
            }
            if !e.reasoning.is_empty() {
                out.push_str(&format!("**Reasoning**: {}\n", e.reasoning));
            }
            if !e.progress.is_empty() {
                out.push_str(&format!("**Progress**: {}\n", e.progress));
            }
            out.push_str(&format!(
                "requested {}, filtered {}, pruned {}, applied {}, failed {}\n\n",
                e.requested, e.filtered, e.pruned, e.applied, e.failed
            ));
        }
        out
    }
}
