//! Oracle-driven generation sessions for Hexweave worlds.
//!
//! A [`GenerationSession`] grows a world round by round. Each round the
//! constraint engine lists the legal options, a [`DecisionOracle`] picks
//! among them, and the session filters, de-conflicts, and applies the
//! answer. A single hole-filling round and a final validation pass follow.
//! Progress is reported as an ordered event stream and every oracle round
//! is kept in a [`Journal`].

pub mod cancel;
pub mod config;
pub mod error;
pub mod journal;
pub mod oracle;
pub mod outcome;
pub mod progress;
pub mod session;

pub use cancel::CancelToken;
pub use config::{GenerationConfig, MAX_ITERATIONS};
pub use error::{GenError, GenResult};
pub use journal::{Journal, JournalEntry};
pub use oracle::{Decision, DecisionOracle, GreedyOracle, OracleRequest, ScriptedOracle};
pub use outcome::{GenerationOutcome, StopReason};
pub use progress::{ProgressEvent, ProgressLog, Stage};
pub use session::{GenerationSession, SessionId, StageEvent, next_stage};
