//! A seeded, rule-based oracle.
//!
//! Fills the most enclosed positions first, nearest the origin on ties,
//! choosing one offered option per position that also agrees with what it
//! already proposed this round. Around unpopulatable holes it asks for one
//! surrounding tile to be removed. It needs no model and is fully
//! reproducible for a given seed.

use std::cmp::Reverse;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hw_core::{AddonPlacement, AxialCoord, Catalog, MutationBatch, Removal, TilePlacement};
use hw_engine::{PositionOptions, TileOption};

use crate::error::GenResult;

use super::{Decision, DecisionOracle, OracleRequest};

/// Placements proposed per round unless configured otherwise.
pub const DEFAULT_PER_ROUND: usize = 8;

/// Rule-based oracle driven by a seeded RNG.
#[derive(Debug)]
pub struct GreedyOracle {
    catalog: Arc<Catalog>,
    rng: StdRng,
    per_round: usize,
    addon_chance: f64,
}

impl GreedyOracle {
    /// Create an oracle for a catalog.
    pub fn new(catalog: Arc<Catalog>, seed: u64) -> Self {
        Self {
            catalog,
            rng: StdRng::seed_from_u64(seed),
            per_round: DEFAULT_PER_ROUND,
            addon_chance: 0.3,
        }
    }

    /// Set the most tile placements proposed in one round (at least 1).
    pub fn with_per_round(mut self, per_round: usize) -> Self {
        self.per_round = per_round.max(1);
        self
    }

    /// Set the chance of decorating each addon-free tile (clamped to 0.0-1.0).
    pub fn with_addon_chance(mut self, chance: f64) -> Self {
        self.addon_chance = if chance.is_nan() {
            0.0
        } else {
            chance.clamp(0.0, 1.0)
        };
        self
    }

    /// Build this round's decision.
    pub fn propose(&mut self, request: &OracleRequest) -> Decision {
        let mut actions = MutationBatch::default();

        for hole in &request.options.unpopulatable {
            if hole.removable.is_empty() {
                continue;
            }
            let pick = hole.removable[self.rng.random_range(0..hole.removable.len())];
            if !actions.tile_removals.iter().any(|r| r.position == pick) {
                actions.tile_removals.push(Removal { position: pick });
            }
        }

        let mut positions: Vec<&PositionOptions> = request.options.populatable().collect();
        positions.sort_by_key(|p| {
            (
                Reverse(p.occupied_neighbors),
                p.position.distance(AxialCoord::ORIGIN),
                p.position,
            )
        });

        let budget = request.remaining_tiles.min(self.per_round);
        for p in positions {
            if actions.tile_placements.len() >= budget {
                break;
            }
            let fitting: Vec<&TileOption> = p
                .options
                .iter()
                .filter(|o| self.agrees_with(&actions.tile_placements, p.position, o))
                .collect();
            if let Some(choice) = self.choose(&fitting) {
                actions.tile_placements.push(TilePlacement {
                    position: p.position,
                    tile: choice.tile.clone(),
                    rotation: choice.rotation,
                    elevation: 0,
                });
            }
        }

        for option in &request.options.addons {
            if actions.addon_placements.len() >= self.per_round {
                break;
            }
            if actions.tile_removals.iter().any(|r| r.position == option.position) {
                continue;
            }
            if option.addons.is_empty() || !self.rng.random_bool(self.addon_chance) {
                continue;
            }
            let addon = &option.addons[self.rng.random_range(0..option.addons.len())];
            actions.addon_placements.push(AddonPlacement {
                position: option.position,
                addon: addon.clone(),
                transform: None,
            });
        }

        let reasoning = format!(
            "{} placements, {} removals, {} addons",
            actions.tile_placements.len(),
            actions.tile_removals.len(),
            actions.addon_placements.len()
        );
        let progress = format!(
            "{} round {}: world has {} tiles",
            request.stage,
            request.iteration,
            request.world.tiles.len()
        );
        Decision {
            actions,
            reasoning,
            progress,
        }
    }

    /// Prefer the highest diagnostic score when scores are present, then pick
    /// uniformly among the best.
    fn choose<'o>(&mut self, fitting: &[&'o TileOption]) -> Option<&'o TileOption> {
        let best = fitting
            .iter()
            .map(|o| o.diagnostics.as_ref().map_or(0, |d| d.score))
            .max()?;
        let top: Vec<&TileOption> = fitting
            .iter()
            .copied()
            .filter(|o| o.diagnostics.as_ref().map_or(0, |d| d.score) == best)
            .collect();
        Some(top[self.rng.random_range(0..top.len())])
    }

    /// Whether `option` at `position` is edge-compatible with every adjacent
    /// placement already proposed.
    fn agrees_with(
        &self,
        proposed: &[TilePlacement],
        position: AxialCoord,
        option: &TileOption,
    ) -> bool {
        let Some(keys) = self.catalog.tile_edge_keys(&option.tile) else {
            return false;
        };
        let model = self.catalog.edge_model();
        proposed.iter().all(|other| {
            let Some(edge) = position.edge_to(other.position) else {
                return true;
            };
            let Some(other_keys) = self.catalog.tile_edge_keys(&other.tile) else {
                return true;
            };
            let own = keys[option.rotation.source_edge(edge).index()];
            let back = other_keys[other.rotation.source_edge(edge.opposite()).index()];
            model.compatible(own, back)
        })
    }
}

impl DecisionOracle for GreedyOracle {
    fn decide(
        &mut self,
        request: &OracleRequest,
    ) -> impl Future<Output = GenResult<Decision>> + Send {
        let decision = self.propose(request);
        tracing::debug!(
            stage = %request.stage,
            iteration = request.iteration,
            reasoning = %decision.reasoning,
            "greedy oracle answered"
        );
        async move { Ok(decision) }
    }
}
