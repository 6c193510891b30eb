//! Oracle-driven generation sessions.
//!
//! A [`GenerationSession`] owns one world and drives it through
//! `INITIALIZING -> EXPANDING -> HOLE_FILLING -> VALIDATING` to a terminal
//! stage. Each round offers the legal options to the oracle, keeps only
//! offered items from its answer, prunes conflicting placements, and applies
//! the rest through the world mutator. Stage transitions go through the pure
//! [`next_stage`] function.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use hw_core::{AxialCoord, Catalog, MutationBatch, World, WorldMutator};
use hw_engine::{
    ConflictResolver, ConstraintEvaluator, OptionSet, check_references, validate_edges,
};

use crate::cancel::CancelToken;
use crate::config::GenerationConfig;
use crate::error::{GenError, GenResult};
use crate::journal::{Journal, JournalEntry};
use crate::oracle::{Decision, DecisionOracle, OracleRequest};
use crate::outcome::{GenerationOutcome, StopReason};
use crate::progress::{ProgressEvent, ProgressLog, Stage};

/// Unique identifier of a generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// A fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

/// Inputs to the stage machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// Inputs checked; begin expanding.
    Started,
    /// The expansion loop ended.
    ExpansionStopped(StopReason),
    /// The hole-filling round ran or was skipped.
    HolesFilled,
    /// Final validation ran over a world with this many tiles.
    Validated {
        /// Tiles in the final world.
        tiles: usize,
    },
    /// Cancellation was observed.
    Cancelled,
    /// An unrecoverable fault.
    Failed,
}

/// The stage that follows `stage` on `event`. Terminal stages never change
/// and events that do not apply to a stage leave it as is.
pub fn next_stage(stage: Stage, event: StageEvent) -> Stage {
    if stage.is_terminal() {
        return stage;
    }
    match (stage, event) {
        (_, StageEvent::Cancelled) => Stage::Cancelled,
        (_, StageEvent::Failed) => Stage::Error,
        (Stage::Initializing, StageEvent::Started) => Stage::Expanding,
        (Stage::Expanding, StageEvent::ExpansionStopped(StopReason::Cancelled)) => Stage::Cancelled,
        (Stage::Expanding, StageEvent::ExpansionStopped(_)) => Stage::HoleFilling,
        (Stage::HoleFilling, StageEvent::HolesFilled) => Stage::Validating,
        (Stage::Validating, StageEvent::Validated { tiles: 0 }) => Stage::Error,
        (Stage::Validating, StageEvent::Validated { .. }) => Stage::Complete,
        (s, _) => s,
    }
}

/// What one oracle round amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Round {
    Applied { net_changes: usize },
    NoActions,
    Cancelled,
}

/// A decision with unoffered and repeated items removed.
struct Filtered {
    batch: MutationBatch,
    dropped: usize,
}

/// Keep only placements the option set offered, and only the first one per
/// position. Removals are not options and pass through to the mutator.
fn filter_decision(options: &OptionSet, actions: MutationBatch) -> Filtered {
    let requested = actions.tile_placements.len() + actions.addon_placements.len();

    let mut seen = BTreeSet::new();
    let tile_placements: Vec<_> = actions
        .tile_placements
        .into_iter()
        .filter(|p| options.offers_tile(p) && seen.insert(p.position))
        .collect();

    let mut seen: BTreeSet<AxialCoord> = BTreeSet::new();
    let addon_placements: Vec<_> = actions
        .addon_placements
        .into_iter()
        .filter(|a| options.offers_addon(a) && seen.insert(a.position))
        .collect();

    let dropped = requested - tile_placements.len() - addon_placements.len();
    Filtered {
        batch: MutationBatch {
            tile_placements,
            tile_removals: actions.tile_removals,
            addon_placements,
            addon_removals: actions.addon_removals,
        },
        dropped,
    }
}

/// One generation run over one world.
#[derive(Debug)]
pub struct GenerationSession<O> {
    id: SessionId,
    catalog: Arc<Catalog>,
    config: GenerationConfig,
    oracle: O,
    world: World,
    stage: Stage,
    plan: String,
    cancel: CancelToken,
    progress: ProgressLog,
    journal: Journal,
    stop_reason: Option<StopReason>,
    iterations: usize,
}

impl<O: DecisionOracle> GenerationSession<O> {
    /// A session over an empty world bound to the catalog.
    pub fn new(catalog: Arc<Catalog>, oracle: O, config: GenerationConfig) -> Self {
        let id = SessionId::new();
        let world = World::new(catalog.id());
        Self {
            id,
            catalog,
            config,
            oracle,
            world,
            stage: Stage::Initializing,
            plan: String::new(),
            cancel: CancelToken::new(),
            progress: ProgressLog::new(id),
            journal: Journal::new(),
            stop_reason: None,
            iterations: 0,
        }
    }

    /// Start from an existing world instead of an empty one. Its tile and
    /// addon ids are checked against the catalog when the session runs.
    pub fn with_world(mut self, world: World) -> GenResult<Self> {
        if world.catalog_id() != self.catalog.id() {
            return Err(GenError::CatalogMismatch {
                world: world.catalog_id().to_string(),
                catalog: self.catalog.id().to_string(),
            });
        }
        self.world = world;
        Ok(self)
    }

    /// Set the plan or theme text sent with every request.
    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = plan.into();
        self
    }

    /// Observe an externally owned cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Mirror progress events to an observer.
    pub fn with_progress_sink(mut self, sink: UnboundedSender<ProgressEvent>) -> Self {
        self.progress = ProgressLog::new(self.id).with_sink(sink);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The world as it stands.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The configuration.
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// The oracle.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// A handle that cancels this session.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Progress events so far.
    pub fn progress(&self) -> &ProgressLog {
        &self.progress
    }

    /// Oracle rounds so far.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Why expansion stopped, once it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Expansion rounds that reached the oracle.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    // -----------------------------------------------------------------------
    // Run
    // -----------------------------------------------------------------------

    /// Drive the session to a terminal stage.
    pub async fn run(&mut self) -> GenerationOutcome {
        if self.stage != Stage::Initializing {
            return GenerationOutcome::Error(format!("session {} has already run", self.id));
        }
        tracing::info!(
            session = %self.id,
            catalog = self.catalog.id(),
            max_tiles = self.config.max_tiles,
            max_iterations = self.config.max_iterations,
            "generation started"
        );
        self.progress.emit(Stage::Initializing, 0, 0, "session started", &self.world);
        if let Err(err) = self.check_inputs() {
            return self.failed(err);
        }
        if self.cancel.is_cancelled() {
            return self.cancelled();
        }
        self.transition(StageEvent::Started);

        let reason = self.expand().await;
        self.stop_reason = Some(reason);
        tracing::info!(
            session = %self.id,
            %reason,
            tiles = self.world.tile_count(),
            "expansion stopped"
        );
        self.transition(StageEvent::ExpansionStopped(reason));
        if self.stage == Stage::Cancelled {
            return self.cancelled();
        }

        if self.cancel.is_cancelled() || self.fill_holes().await == Round::Cancelled {
            return self.cancelled();
        }
        self.transition(StageEvent::HolesFilled);

        if self.cancel.is_cancelled() {
            return self.cancelled();
        }
        let validation = validate_edges(&self.world, &self.catalog);
        self.progress.emit(
            Stage::Validating,
            1,
            1,
            format!(
                "checked {} edges: {} valid, {} invalid",
                validation.checked, validation.valid, validation.invalid
            ),
            &self.world,
        );
        self.transition(StageEvent::Validated {
            tiles: self.world.tile_count(),
        });

        if self.stage == Stage::Complete {
            self.progress.emit(Stage::Complete, 0, 0, "generation complete", &self.world);
            tracing::info!(
                session = %self.id,
                tiles = self.world.tile_count(),
                addons = self.world.addon_count(),
                invalid_edges = validation.invalid,
                "generation complete"
            );
            GenerationOutcome::Success {
                world: self.world.clone(),
                validation,
            }
        } else {
            let message = "no tiles were placed".to_string();
            self.progress.emit(Stage::Error, 0, 0, message.clone(), &self.world);
            tracing::warn!(session = %self.id, "generation produced an empty world");
            GenerationOutcome::Error(message)
        }
    }

    fn transition(&mut self, event: StageEvent) {
        let next = next_stage(self.stage, event);
        if next != self.stage {
            tracing::info!(session = %self.id, from = %self.stage, to = %next, "stage changed");
            self.stage = next;
        }
    }

    /// Reject a starting world that refers to ids the catalog lacks.
    fn check_inputs(&self) -> GenResult<()> {
        check_references(&self.world, &self.catalog)?;
        Ok(())
    }

    fn failed(&mut self, err: GenError) -> GenerationOutcome {
        self.transition(StageEvent::Failed);
        let message = err.to_string();
        self.progress.emit(Stage::Error, 0, 0, message.clone(), &self.world);
        tracing::warn!(session = %self.id, error = %err, "generation rejected its inputs");
        GenerationOutcome::Error(message)
    }

    fn cancelled(&mut self) -> GenerationOutcome {
        self.transition(StageEvent::Cancelled);
        self.progress.emit(Stage::Cancelled, 0, 0, "generation cancelled", &self.world);
        tracing::info!(session = %self.id, tiles = self.world.tile_count(), "generation cancelled");
        GenerationOutcome::Cancelled
    }

    fn evaluator<'c>(&self, catalog: &'c Catalog) -> ConstraintEvaluator<'c> {
        ConstraintEvaluator::new(catalog)
            .with_diagnostics(self.config.diagnostics)
            .with_hole_threshold(self.config.hole_min_neighbors)
    }

    async fn expand(&mut self) -> StopReason {
        let catalog = Arc::clone(&self.catalog);
        let total = self.config.max_iterations;
        for iteration in 1..=total {
            if self.cancel.is_cancelled() {
                return StopReason::Cancelled;
            }
            if self.world.tile_count() >= self.config.max_tiles {
                return StopReason::BudgetReached;
            }
            let options = self.evaluator(&catalog).evaluate(&self.world);
            if options.is_exhausted() {
                return StopReason::Exhausted;
            }
            self.iterations = iteration;
            match self.round(Stage::Expanding, iteration, total, options).await {
                Round::Cancelled => return StopReason::Cancelled,
                Round::NoActions => return StopReason::NoActions,
                Round::Applied { net_changes: 0 } => return StopReason::NoChanges,
                Round::Applied { .. } => {}
            }
        }
        if self.world.tile_count() >= self.config.max_tiles {
            StopReason::BudgetReached
        } else {
            StopReason::IterationCap
        }
    }

    /// One round over interior holes, offering populatable holes and
    /// unpopulatable ones with their removable neighbors. Skipped when there
    /// are no holes.
    async fn fill_holes(&mut self) -> Round {
        let catalog = Arc::clone(&self.catalog);
        let options = self.evaluator(&catalog).evaluate_holes(&self.world);
        if options.positions.is_empty() {
            self.progress.emit(Stage::HoleFilling, 0, 1, "no interior holes", &self.world);
            return Round::Applied { net_changes: 0 };
        }
        tracing::debug!(
            session = %self.id,
            holes = options.positions.len(),
            unpopulatable = options.unpopulatable.len(),
            "offering interior holes"
        );
        self.round(Stage::HoleFilling, 1, 1, options).await
    }

    async fn round(
        &mut self,
        stage: Stage,
        iteration: usize,
        total: usize,
        options: OptionSet,
    ) -> Round {
        let request = OracleRequest {
            session: self.id,
            stage,
            iteration,
            world: self.world.snapshot(),
            options,
            plan: self.plan.clone(),
            previous_progress: self.journal.last_progress().map(str::to_owned),
            remaining_tiles: self.config.max_tiles.saturating_sub(self.world.tile_count()),
        };
        let response = self.oracle.decide(&request).await;

        if self.cancel.is_cancelled() {
            tracing::info!(
                session = %self.id,
                %stage,
                iteration,
                "cancelled during oracle call; decision discarded"
            );
            return Round::Cancelled;
        }

        let decision = match response {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(
                    session = %self.id,
                    %stage,
                    iteration,
                    error = %err,
                    "unusable oracle response treated as no actions"
                );
                self.record(stage, iteration, &Decision::default(), Tally::malformed());
                self.progress.emit(
                    stage,
                    iteration,
                    total,
                    format!("oracle response unusable: {err}"),
                    &self.world,
                );
                return Round::NoActions;
            }
        };

        if decision.is_empty() {
            self.record(stage, iteration, &decision, Tally::default());
            self.progress
                .emit(stage, iteration, total, "oracle returned no actions", &self.world);
            return Round::NoActions;
        }

        let requested = decision.actions.len();
        let Filtered { mut batch, dropped } =
            filter_decision(&request.options, decision.actions.clone());
        if dropped > 0 {
            tracing::warn!(
                session = %self.id,
                %stage,
                iteration,
                dropped,
                "dropped items that were not offered"
            );
        }

        let (kept, pruned) = ConflictResolver::new(&self.catalog).partition(batch.tile_placements);
        batch.tile_placements = kept;

        let report = WorldMutator::new(&mut self.world, &self.catalog)
            .apply(&batch, self.config.batch_limits());
        tracing::debug!(
            session = %self.id,
            %stage,
            iteration,
            placed = report.tiles_placed,
            removed = report.tiles_removed,
            addons_placed = report.addons_placed,
            addons_removed = report.addons_removed,
            failed = report.failures.len(),
            "round applied"
        );

        self.record(
            stage,
            iteration,
            &decision,
            Tally {
                requested,
                filtered: dropped,
                pruned: pruned.len(),
                applied: report.net_changes(),
                failed: report.failures.len()
                    + report.removals_capped
                    + report.placements_over_budget,
                malformed: false,
            },
        );
        self.progress.emit(
            stage,
            iteration,
            total,
            format!(
                "placed {}, removed {}, addons +{}/-{}, pruned {}, filtered {}",
                report.tiles_placed,
                report.tiles_removed,
                report.addons_placed,
                report.addons_removed,
                pruned.len(),
                dropped
            ),
            &self.world,
        );
        Round::Applied {
            net_changes: report.net_changes(),
        }
    }

    fn record(&mut self, stage: Stage, iteration: usize, decision: &Decision, tally: Tally) {
        self.journal.append(JournalEntry {
            iteration,
            stage,
            reasoning: decision.reasoning.clone(),
            progress: decision.progress.clone(),
            requested: tally.requested,
            filtered: tally.filtered,
            pruned: tally.pruned,
            applied: tally.applied,
            failed: tally.failed,
            malformed: tally.malformed,
            timestamp: Utc::now(),
        });
    }
}

/// Per-round counts for the journal.
#[derive(Debug, Default)]
struct Tally {
    requested: usize,
    filtered: usize,
    pruned: usize,
    applied: usize,
    failed: usize,
    malformed: bool,
}

impl Tally {
    fn malformed() -> Self {
        Self {
            malformed: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use tokio::sync::mpsc;

    use hw_core::{AddonPlacement, Removal, TilePlacement, WorldSnapshot};

    use super::*;
    use crate::oracle::GreedyOracle;
    use crate::oracle::scripted::{ScriptedOracle, ScriptedResponse};
    use hw_engine::test_support::{at, enclosed_world, place, road_catalog, rot};

    fn catalog() -> Arc<Catalog> {
        Arc::new(road_catalog())
    }

    fn place_at(q: i32, r: i32, tile: &str, k: u8) -> TilePlacement {
        TilePlacement::new(at(q, r), tile, rot(k))
    }

    fn decision(tile_placements: Vec<TilePlacement>) -> Decision {
        Decision::from_actions(MutationBatch {
            tile_placements,
            ..MutationBatch::default()
        })
    }

    fn scripted_session() -> GenerationSession<ScriptedOracle> {
        GenerationSession::new(catalog(), ScriptedOracle::default(), GenerationConfig::default())
    }

    fn grass_ring(catalog: &Catalog) -> World {
        let mut world = World::new(catalog.id());
        for n in AxialCoord::ORIGIN.neighbors().map(|(_, n)| n) {
            place(catalog, &mut world, (n.q, n.r), "grass", 0);
        }
        world
    }

    #[test]
    fn stage_machine_follows_the_happy_path() {
        let s = next_stage(Stage::Initializing, StageEvent::Started);
        assert_eq!(s, Stage::Expanding);
        let s = next_stage(s, StageEvent::ExpansionStopped(StopReason::NoActions));
        assert_eq!(s, Stage::HoleFilling);
        let s = next_stage(s, StageEvent::HolesFilled);
        assert_eq!(s, Stage::Validating);
        assert_eq!(next_stage(s, StageEvent::Validated { tiles: 3 }), Stage::Complete);
        assert_eq!(next_stage(s, StageEvent::Validated { tiles: 0 }), Stage::Error);
    }

    #[test]
    fn stage_machine_cancel_and_fail() {
        let live = [
            Stage::Initializing,
            Stage::Expanding,
            Stage::HoleFilling,
            Stage::Validating,
        ];
        for stage in live {
            assert_eq!(next_stage(stage, StageEvent::Cancelled), Stage::Cancelled);
            assert_eq!(next_stage(stage, StageEvent::Failed), Stage::Error);
        }
        assert_eq!(
            next_stage(Stage::Expanding, StageEvent::ExpansionStopped(StopReason::Cancelled)),
            Stage::Cancelled
        );
        assert_eq!(next_stage(Stage::Complete, StageEvent::Cancelled), Stage::Complete);
        assert_eq!(next_stage(Stage::Expanding, StageEvent::HolesFilled), Stage::Expanding);
    }

    #[test]
    fn session_id_display_is_short() {
        let id = SessionId::new();
        assert_eq!(id.to_string().len(), 8);
        assert_ne!(id, SessionId::new());
    }

    #[test]
    fn world_from_other_catalog_is_rejected() {
        let session = scripted_session();
        let err = session.with_world(World::new("desert")).unwrap_err();
        assert!(matches!(err, GenError::CatalogMismatch { .. }));
    }

    #[tokio::test]
    async fn greedy_run_completes_with_clean_edges() {
        let catalog = catalog();
        let oracle = GreedyOracle::new(Arc::clone(&catalog), 42);
        let config = GenerationConfig::default().with_max_tiles(20);
        let mut session = GenerationSession::new(catalog, oracle, config);

        let outcome = session.run().await;
        let world = outcome.world().unwrap();
        assert!(world.tile_count() > 0);
        assert!(world.tile_count() <= 20);
        assert!(outcome.validation().unwrap().is_clean());
        assert_eq!(session.stage(), Stage::Complete);

        let events = session.progress().events();
        assert_eq!(events.first().unwrap().stage, Stage::Initializing);
        assert_eq!(events.last().unwrap().stage, Stage::Complete);
        assert!(events.iter().any(|e| e.stage == Stage::Validating));
    }

    #[tokio::test]
    async fn unoffered_and_repeated_items_are_filtered() {
        let oracle = ScriptedOracle::new([decision(vec![
            place_at(0, 0, "grass", 0),
            place_at(5, 5, "grass", 0),
            place_at(0, 0, "road", 1),
        ])]);
        let mut session = GenerationSession::new(catalog(), oracle, GenerationConfig::default());
        let outcome = session.run().await;

        assert!(outcome.is_success());
        assert_eq!(session.world().tile_count(), 1);
        assert_eq!(session.world().tile_at(at(0, 0)).unwrap().tile.as_str(), "grass");
        let first = &session.journal().entries()[0];
        assert_eq!(first.requested, 3);
        assert_eq!(first.filtered, 2);
        assert_eq!(first.applied, 1);
        // second round gets an empty answer from the exhausted script
        assert_eq!(session.stop_reason(), Some(StopReason::NoActions));
        assert_eq!(session.oracle().requests().len(), 1);
    }

    #[tokio::test]
    async fn conflicting_placements_are_pruned() {
        let catalog = catalog();
        let mut world = World::new(catalog.id());
        place(&catalog, &mut world, (0, 0), "grass", 0);
        // both offered, but the road shows road toward the grass at (1,0)
        let oracle = ScriptedOracle::new([decision(vec![
            place_at(1, 0, "grass", 0),
            place_at(1, -1, "road", 1),
        ])]);
        let mut session = GenerationSession::new(catalog, oracle, GenerationConfig::default())
            .with_world(world)
            .unwrap();
        let outcome = session.run().await;

        assert!(outcome.validation().unwrap().is_clean());
        assert_eq!(session.world().tile_count(), 2);
        assert!(session.world().is_occupied(at(1, 0)));
        assert!(!session.world().is_occupied(at(1, -1)));
        assert_eq!(session.journal().entries()[0].pruned, 1);
    }

    #[tokio::test]
    async fn plan_and_previous_progress_reach_the_oracle() {
        let mut first = decision(vec![place_at(0, 0, "grass", 0)]);
        first.progress = "laid the first stone".into();
        let oracle = ScriptedOracle::new([first]);
        let mut session = GenerationSession::new(catalog(), oracle, GenerationConfig::default())
            .with_plan("harbor town");
        session.run().await;

        let requests = session.oracle().requests();
        assert_eq!(requests[0].plan, "harbor town");
        assert_eq!(requests[0].previous_progress, None);
        assert_eq!(requests[0].remaining_tiles, 40);
        assert_eq!(requests[1].plan, "harbor town");
        assert_eq!(requests[1].previous_progress.as_deref(), Some("laid the first stone"));
        assert_eq!(requests[1].world.tiles.len(), 1);
    }

    #[tokio::test]
    async fn malformed_response_is_no_actions() {
        let mut oracle = ScriptedOracle::default();
        oracle.push(ScriptedResponse::Raw("I would place a tile here".into()));
        let mut session = GenerationSession::new(catalog(), oracle, GenerationConfig::default());
        let outcome = session.run().await;

        assert_eq!(session.stop_reason(), Some(StopReason::NoActions));
        assert!(session.journal().entries()[0].malformed);
        // nothing was ever placed
        assert_eq!(outcome, GenerationOutcome::Error("no tiles were placed".into()));
        assert_eq!(session.stage(), Stage::Error);
    }

    #[tokio::test]
    async fn oracle_failure_is_no_actions() {
        let mut oracle = ScriptedOracle::default();
        oracle.push(ScriptedResponse::Fail("timeout".into()));
        let mut session = GenerationSession::new(catalog(), oracle, GenerationConfig::default());
        session.run().await;
        assert_eq!(session.stop_reason(), Some(StopReason::NoActions));
        assert_eq!(session.journal().len(), 1);
    }

    #[tokio::test]
    async fn zero_change_round_stops_expansion() {
        let catalog = catalog();
        let mut world = World::new(catalog.id());
        place(&catalog, &mut world, (0, 0), "grass", 0);
        let oracle = ScriptedOracle::new([Decision::from_actions(MutationBatch {
            addon_removals: vec![Removal { position: at(0, 0) }],
            ..MutationBatch::default()
        })]);
        let mut session = GenerationSession::new(catalog, oracle, GenerationConfig::default())
            .with_world(world)
            .unwrap();
        let outcome = session.run().await;

        assert!(outcome.is_success());
        assert_eq!(session.stop_reason(), Some(StopReason::NoChanges));
        assert_eq!(session.journal().entries()[0].failed, 1);
    }

    #[tokio::test]
    async fn budget_stops_expansion() {
        let catalog = catalog();
        let oracle = GreedyOracle::new(Arc::clone(&catalog), 9);
        let config = GenerationConfig::default().with_max_tiles(3);
        let mut session = GenerationSession::new(catalog, oracle, config);
        let outcome = session.run().await;

        assert_eq!(outcome.world().unwrap().tile_count(), 3);
        assert_eq!(session.stop_reason(), Some(StopReason::BudgetReached));
    }

    #[tokio::test]
    async fn iteration_cap_stops_expansion() {
        let catalog = catalog();
        let oracle = GreedyOracle::new(Arc::clone(&catalog), 9).with_per_round(1);
        let config = GenerationConfig::default().with_max_iterations(2);
        let mut session = GenerationSession::new(catalog, oracle, config);
        let outcome = session.run().await;

        assert_eq!(outcome.world().unwrap().tile_count(), 2);
        assert_eq!(session.stop_reason(), Some(StopReason::IterationCap));
        assert_eq!(session.iterations(), 2);
    }

    fn restored(value: serde_json::Value) -> World {
        let snapshot: WorldSnapshot = serde_json::from_value(value).unwrap();
        World::from_snapshot(snapshot)
    }

    async fn run_on(world: World) -> (GenerationSession<ScriptedOracle>, GenerationOutcome) {
        let mut session = scripted_session().with_world(world).unwrap();
        let outcome = session.run().await;
        (session, outcome)
    }

    #[tokio::test]
    async fn unknown_tile_in_starting_world_is_rejected() {
        let world = restored(serde_json::json!({
            "catalog_id": "roads",
            "tiles": [{ "tile": "ghost", "position": { "q": 0, "r": 0 }, "rotation": 0 }],
            "addons": []
        }));
        let (session, outcome) = run_on(world).await;

        assert_eq!(
            outcome,
            GenerationOutcome::Error(
                "catalog error: world places unknown tile \"ghost\" at (0, 0)".into()
            )
        );
        assert_eq!(session.stage(), Stage::Error);
        assert_eq!(session.stop_reason(), None);
        assert_eq!(session.iterations(), 0);
        assert!(session.oracle().requests().is_empty());
        assert_eq!(session.progress().last().unwrap().stage, Stage::Error);
    }

    #[tokio::test]
    async fn unknown_addon_in_starting_world_is_rejected() {
        let world = restored(serde_json::json!({
            "catalog_id": "roads",
            "tiles": [{ "tile": "grass", "position": { "q": 0, "r": 0 }, "rotation": 0 }],
            "addons": [{ "addon": "tre", "position": { "q": 0, "r": 0 } }]
        }));
        let (session, outcome) = run_on(world).await;

        let GenerationOutcome::Error(message) = outcome else {
            panic!("expected an error outcome, got {outcome:?}");
        };
        assert!(message.contains("unknown addon \"tre\""), "{message}");
        assert!(message.contains("did you mean \"tree\"?"), "{message}");
        assert!(session.oracle().requests().is_empty());
        assert_eq!(session.world().tile_count(), 1);
    }

    #[tokio::test]
    async fn known_ids_in_starting_world_are_accepted() {
        let world = restored(serde_json::json!({
            "catalog_id": "roads",
            "tiles": [{ "tile": "grass", "position": { "q": 0, "r": 0 }, "rotation": 0 }],
            "addons": [{ "addon": "tree", "position": { "q": 0, "r": 0 } }]
        }));
        let (session, outcome) = run_on(world).await;

        assert!(outcome.is_success());
        assert_eq!(session.stop_reason(), Some(StopReason::NoActions));
        assert_eq!(session.oracle().requests().len(), 1);
    }

    #[tokio::test]
    async fn hole_filling_runs_exactly_one_round() {
        let catalog = catalog();
        let world = grass_ring(&catalog);
        let oracle = ScriptedOracle::new([
            Decision::default(),
            decision(vec![place_at(0, 0, "grass", 0)]),
            decision(vec![place_at(0, 2, "grass", 0)]),
        ]);
        let mut session = GenerationSession::new(Arc::clone(&catalog), oracle, Default::default())
            .with_world(world)
            .unwrap();
        let outcome = session.run().await;

        assert!(outcome.is_success());
        let requests = session.oracle().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].stage, Stage::HoleFilling);
        assert_eq!(requests[1].options.positions.len(), 1);
        assert_eq!(requests[1].options.positions[0].position, AxialCoord::ORIGIN);
        assert!(requests[1].options.addons.is_empty());
        assert_eq!(session.world().tile_count(), 7);
        assert_eq!(session.oracle().remaining(), 1);
    }

    #[tokio::test]
    async fn unpopulatable_hole_is_offered_with_removable_tiles() {
        let catalog = catalog();
        let oracle = ScriptedOracle::new([
            Decision::default(),
            Decision::from_actions(MutationBatch {
                tile_removals: vec![
                    Removal { position: at(1, 0) },
                    Removal { position: at(0, 1) },
                ],
                ..MutationBatch::default()
            }),
        ]);
        let mut session = GenerationSession::new(Arc::clone(&catalog), oracle, Default::default())
            .with_world(enclosed_world(&catalog))
            .unwrap();
        let outcome = session.run().await;

        let hole_request = &session.oracle().requests()[1];
        assert_eq!(hole_request.options.unpopulatable.len(), 1);
        assert_eq!(hole_request.options.unpopulatable[0].removable.len(), 6);
        // six tiles allow one removal per round
        assert_eq!(outcome.world().unwrap().tile_count(), 5);
        assert_eq!(session.journal().entries()[1].failed, 1);
    }

    #[tokio::test]
    async fn addon_placements_must_be_offered() {
        let catalog = catalog();
        let mut world = World::new(catalog.id());
        place(&catalog, &mut world, (0, 0), "grass", 0);
        place(&catalog, &mut world, (1, 0), "road", 3);
        let oracle = ScriptedOracle::new([Decision::from_actions(MutationBatch {
            addon_placements: vec![
                AddonPlacement::new(at(0, 0), "tree"),
                AddonPlacement::new(at(1, 0), "tree"),
            ],
            ..MutationBatch::default()
        })]);
        let mut session = GenerationSession::new(catalog, oracle, GenerationConfig::default())
            .with_world(world)
            .unwrap();
        session.run().await;

        assert_eq!(session.world().addon_count(), 1);
        assert!(session.world().addon_at(at(0, 0)).is_some());
        assert_eq!(session.journal().entries()[0].filtered, 1);
    }

    #[tokio::test]
    async fn cancellation_during_oracle_call_discards_decision() {
        let token = CancelToken::new();
        let oracle = ScriptedOracle::new([decision(vec![place_at(0, 0, "grass", 0)])])
            .cancel_on_call(1, token.clone());
        let mut session = GenerationSession::new(catalog(), oracle, GenerationConfig::default())
            .with_cancel_token(token);
        let outcome = session.run().await;

        assert_eq!(outcome, GenerationOutcome::Cancelled);
        assert_eq!(session.stage(), Stage::Cancelled);
        assert!(session.world().is_empty());
        assert!(session.journal().is_empty());
        assert_eq!(session.stop_reason(), Some(StopReason::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_before_run_never_calls_oracle() {
        let mut session = scripted_session();
        session.cancel_token().cancel();
        let outcome = session.run().await;
        assert_eq!(outcome, GenerationOutcome::Cancelled);
        assert!(session.oracle().requests().is_empty());
    }

    #[tokio::test]
    async fn progress_sink_sees_ordered_events() {
        let catalog = catalog();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let oracle = GreedyOracle::new(Arc::clone(&catalog), 1);
        let config = GenerationConfig::default().with_max_tiles(5);
        let mut session = GenerationSession::new(catalog, oracle, config).with_progress_sink(tx);
        session.run().await;
        let id = session.id();
        drop(session);

        let mut received = Vec::new();
        while let Ok(event) = rx.try_recv() {
            received.push(event);
        }
        assert!(received.len() >= 4);
        assert!(received.iter().all(|e| e.session == id));
        assert_eq!(received[0].stage, Stage::Initializing);
        assert_eq!(received.last().unwrap().stage, Stage::Complete);
        assert!(received.iter().any(|e| e.stage == Stage::Expanding && e.tile_count > 0));
    }

    #[tokio::test]
    async fn second_run_is_an_error() {
        let mut session = scripted_session();
        session.run().await;
        assert!(matches!(session.run().await, GenerationOutcome::Error(_)));
    }

    fn arb_actions() -> impl Strategy<Value = MutationBatch> {
        let placement = (any::<bool>(), -2i32..=2, -2i32..=2, 0u8..6)
            .prop_map(|(road, q, r, k)| place_at(q, r, if road { "road" } else { "grass" }, k));
        let addon = (-2i32..=2, -2i32..=2).prop_map(|(q, r)| AddonPlacement::new(at(q, r), "tree"));
        let removal = (-2i32..=2, -2i32..=2).prop_map(|(q, r)| Removal { position: at(q, r) });
        (
            proptest::collection::vec(placement, 0..16),
            proptest::collection::vec(addon, 0..6),
            proptest::collection::vec(removal, 0..4),
        )
            .prop_map(|(tile_placements, addon_placements, tile_removals)| MutationBatch {
                tile_placements,
                tile_removals,
                addon_placements,
                ..MutationBatch::default()
            })
    }

    /// Three grass tiles around the origin so the option set has both
    /// frontier cells and addon slots.
    fn seeded_options() -> OptionSet {
        let catalog = road_catalog();
        let mut world = World::new(catalog.id());
        place(&catalog, &mut world, (0, 0), "grass", 0);
        place(&catalog, &mut world, (1, 0), "grass", 0);
        place(&catalog, &mut world, (0, 1), "grass", 0);
        ConstraintEvaluator::new(&catalog).evaluate(&world)
    }

    proptest! {
        #[test]
        fn filtering_keeps_only_offered_items_once_per_position(actions in arb_actions()) {
            let options = seeded_options();
            let requested = actions.tile_placements.len() + actions.addon_placements.len();
            let removals = actions.tile_removals.clone();
            let Filtered { batch, dropped } = filter_decision(&options, actions);

            prop_assert_eq!(
                batch.tile_placements.len() + batch.addon_placements.len() + dropped,
                requested
            );
            prop_assert_eq!(batch.tile_removals, removals);

            let mut tiles = BTreeSet::new();
            for p in &batch.tile_placements {
                prop_assert!(options.offers_tile(p));
                prop_assert!(tiles.insert(p.position));
            }
            let mut addons = BTreeSet::new();
            for a in &batch.addon_placements {
                prop_assert!(options.offers_addon(a));
                prop_assert!(addons.insert(a.position));
            }
        }

        #[test]
        fn terminal_stages_absorb_every_event(
            picks in proptest::collection::vec(0usize..7, 0..12),
        ) {
            let events = [
                StageEvent::Started,
                StageEvent::ExpansionStopped(StopReason::NoActions),
                StageEvent::ExpansionStopped(StopReason::Cancelled),
                StageEvent::HolesFilled,
                StageEvent::Validated { tiles: 2 },
                StageEvent::Cancelled,
                StageEvent::Failed,
            ];
            let mut stage = Stage::Initializing;
            let mut ended: Option<Stage> = None;
            for i in picks {
                stage = next_stage(stage, events[i]);
                if let Some(end) = ended {
                    prop_assert_eq!(stage, end);
                } else if stage.is_terminal() {
                    ended = Some(stage);
                }
            }
        }
    }
}
