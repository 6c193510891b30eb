//! Session stages and the advisory progress stream.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use hw_core::World;

use crate::session::SessionId;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Checking the starting world against the catalog.
    Initializing,
    /// Growing the frontier round by round.
    Expanding,
    /// The single round offered for interior holes.
    HoleFilling,
    /// Final edge check over the finished world.
    Validating,
    /// Finished with a world.
    Complete,
    /// Finished without a usable world.
    Error,
    /// Stopped on request.
    Cancelled,
}

impl Stage {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "INITIALIZING",
            Self::Expanding => "EXPANDING",
            Self::HoleFilling => "HOLE_FILLING",
            Self::Validating => "VALIDATING",
            Self::Complete => "COMPLETE",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// One entry in the progress stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The emitting session.
    pub session: SessionId,
    /// Stage at the time of the event.
    pub stage: Stage,
    /// Round number within the stage.
    pub step: usize,
    /// Round budget for the stage.
    pub total: usize,
    /// Human-readable description.
    pub message: String,
    /// Tiles in the world after the event.
    pub tile_count: usize,
    /// Addons in the world after the event.
    pub addon_count: usize,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}/{} {} (tiles: {}, addons: {})",
            self.stage, self.step, self.total, self.message, self.tile_count, self.addon_count
        )
    }
}

/// Ordered log of a session's progress events, optionally mirrored to an
/// external observer.
#[derive(Debug)]
pub struct ProgressLog {
    session: SessionId,
    events: Vec<ProgressEvent>,
    sink: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressLog {
    /// An empty log for a session.
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            events: Vec::new(),
            sink: None,
        }
    }

    /// Mirror every subsequent event to `sink`.
    pub fn with_sink(mut self, sink: UnboundedSender<ProgressEvent>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Record an event with the world's running totals.
    pub fn emit(
        &mut self,
        stage: Stage,
        step: usize,
        total: usize,
        message: impl Into<String>,
        world: &World,
    ) {
        let event = ProgressEvent {
            session: self.session,
            stage,
            step,
            total,
            message: message.into(),
            tile_count: world.tile_count(),
            addon_count: world.addon_count(),
            timestamp: Utc::now(),
        };
        let delivered = self
            .sink
            .as_ref()
            .is_none_or(|sink| sink.send(event.clone()).is_ok());
        if !delivered {
            tracing::debug!(session = %self.session, "progress observer went away");
            self.sink = None;
        }
        self.events.push(event);
    }

    /// All events in emission order.
    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    /// The most recent event.
    pub fn last(&self) -> Option<&ProgressEvent> {
        self.events.last()
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn stage_names() {
        assert_eq!(Stage::HoleFilling.to_string(), "HOLE_FILLING");
        assert_eq!(
            serde_json::to_string(&Stage::HoleFilling).unwrap(),
            "\"HOLE_FILLING\""
        );
        assert!(Stage::Cancelled.is_terminal());
        assert!(!Stage::Validating.is_terminal());
    }

    #[test]
    fn events_carry_running_totals() {
        let world = World::new("roads");
        let mut log = ProgressLog::new(SessionId::new());
        log.emit(Stage::Expanding, 1, 50, "placed 0 tiles", &world);
        assert_eq!(log.len(), 1);
        let event = log.last().unwrap();
        assert_eq!(event.tile_count, 0);
        assert_eq!(
            event.to_string(),
            "[EXPANDING] 1/50 placed 0 tiles (tiles: 0, addons: 0)"
        );
    }

    #[test]
    fn sink_receives_events_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let world = World::new("roads");
        let mut log = ProgressLog::new(SessionId::new()).with_sink(tx);
        log.emit(Stage::Initializing, 0, 0, "start", &world);
        log.emit(Stage::Expanding, 1, 50, "round", &world);
        assert_eq!(rx.try_recv().unwrap().message, "start");
        assert_eq!(rx.try_recv().unwrap().message, "round");
    }

    #[test]
    fn dropped_observer_does_not_stop_logging() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let world = World::new("roads");
        let mut log = ProgressLog::new(SessionId::new()).with_sink(tx);
        log.emit(Stage::Expanding, 1, 50, "a", &world);
        log.emit(Stage::Expanding, 2, 50, "b", &world);
        assert_eq!(log.len(), 2);
    }
}
