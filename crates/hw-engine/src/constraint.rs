//! Legal-option enumeration for empty positions.
//!
//! A candidate `(tile, rotation)` is legal at a position only if its edge
//! facing every occupied neighbor is compatible with that neighbor's edge
//! facing back. The check is conjunctive: one incompatible neighbor rejects
//! the candidate.

use std::collections::BTreeSet;

use serde::Serialize;

use hw_core::{
    AddonId, AddonPlacement, AxialCoord, Catalog, Edge, EdgeKey, Rotation, TileId, TilePlacement,
    World,
};

/// Neighbor count at which an empty position counts as an interior hole.
pub const DEFAULT_HOLE_MIN_NEIGHBORS: usize = 4;

/// Why an option was accepted, for oracle prompts and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDiagnostics {
    /// Neighbor edges whose types match exactly (not just compatibly).
    pub score: u32,
    /// One line per occupied neighbor.
    pub reasons: Vec<String>,
}

/// One legal `(tile, rotation)` at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileOption {
    /// Tile definition id.
    pub tile: TileId,
    /// Clockwise rotation.
    pub rotation: Rotation,
    /// Present when the evaluator runs with diagnostics enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<OptionDiagnostics>,
}

/// The legal options at one empty position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionOptions {
    /// The empty position.
    pub position: AxialCoord,
    /// How many of its six neighbors hold a tile.
    pub occupied_neighbors: usize,
    /// Accepted candidates, tiles in catalog order, rotations ascending.
    pub options: Vec<TileOption>,
}

impl PositionOptions {
    /// Whether the candidate is among the options.
    pub fn offers(&self, tile: &TileId, rotation: Rotation) -> bool {
        self.options
            .iter()
            .any(|o| &o.tile == tile && o.rotation == rotation)
    }
}

/// Addons that may go on one occupied, addon-free position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonOption {
    /// The tile position.
    pub position: AxialCoord,
    /// Fitting addons in catalog order.
    pub addons: Vec<AddonId>,
}

/// An interior hole with no legal option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnpopulatableHole {
    /// The hole.
    pub position: AxialCoord,
    /// How many neighbors hold a tile.
    pub occupied_neighbors: usize,
    /// Surrounding tiles whose removal could open the hole up.
    pub removable: Vec<AxialCoord>,
}

/// Everything offered to the oracle in one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionSet {
    /// Evaluated empty positions, sorted by coordinate. Positions with no
    /// options are kept so callers can see the frontier is exhausted.
    pub positions: Vec<PositionOptions>,
    /// Addon options on existing tiles, sorted by coordinate.
    pub addons: Vec<AddonOption>,
    /// Evaluated holes with no options.
    pub unpopulatable: Vec<UnpopulatableHole>,
}

impl OptionSet {
    /// The evaluated entry for a position.
    pub fn position(&self, position: AxialCoord) -> Option<&PositionOptions> {
        self.positions
            .binary_search_by_key(&position, |p| p.position)
            .ok()
            .map(|i| &self.positions[i])
    }

    /// Whether the exact placement was offered.
    pub fn offers_tile(&self, placement: &TilePlacement) -> bool {
        self.position(placement.position)
            .is_some_and(|p| p.offers(&placement.tile, placement.rotation))
    }

    /// Whether the exact addon placement was offered.
    pub fn offers_addon(&self, placement: &AddonPlacement) -> bool {
        self.addons
            .binary_search_by_key(&placement.position, |a| a.position)
            .ok()
            .is_some_and(|i| self.addons[i].addons.contains(&placement.addon))
    }

    /// Positions that have at least one option.
    pub fn populatable(&self) -> impl Iterator<Item = &PositionOptions> {
        self.positions.iter().filter(|p| !p.options.is_empty())
    }

    /// True when no evaluated position has any tile option.
    pub fn is_exhausted(&self) -> bool {
        self.positions.iter().all(|p| p.options.is_empty())
    }

    /// Total number of tile options across all positions.
    pub fn tile_option_count(&self) -> usize {
        self.positions.iter().map(|p| p.options.len()).sum()
    }

    /// Whether there is nothing at all to offer.
    pub fn is_empty(&self) -> bool {
        self.is_exhausted() && self.addons.is_empty() && self.unpopulatable.is_empty()
    }
}

/// Enumerates legal options against the tiles already in a world.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintEvaluator<'a> {
    catalog: &'a Catalog,
    diagnostics: bool,
    hole_min_neighbors: usize,
}

/// A neighbor's edge facing back toward the evaluated position.
struct FacingEdge<'w> {
    edge: Edge,
    key: EdgeKey,
    neighbor: AxialCoord,
    tile: &'w TileId,
}

impl<'a> ConstraintEvaluator<'a> {
    /// Create an evaluator without diagnostics and the default hole threshold.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            diagnostics: false,
            hole_min_neighbors: DEFAULT_HOLE_MIN_NEIGHBORS,
        }
    }

    /// Attach scores and reasons to every accepted option.
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Set the occupied-neighbor count that makes an empty position a hole.
    pub fn with_hole_threshold(mut self, min_neighbors: usize) -> Self {
        self.hole_min_neighbors = min_neighbors.clamp(1, 6);
        self
    }

    /// The hole threshold in use.
    pub fn hole_threshold(&self) -> usize {
        self.hole_min_neighbors
    }

    /// Empty positions adjacent to at least one tile, sorted. An empty world
    /// has the origin as its only frontier position.
    pub fn frontier(&self, world: &World) -> Vec<AxialCoord> {
        if world.is_empty() {
            return vec![AxialCoord::ORIGIN];
        }
        let set: BTreeSet<AxialCoord> = world
            .tiles()
            .flat_map(|t| t.position.neighbors().map(|(_, n)| n))
            .filter(|n| !world.is_occupied(*n))
            .collect();
        set.into_iter().collect()
    }

    /// Frontier positions that qualify as interior holes.
    pub fn holes(&self, world: &World) -> Vec<AxialCoord> {
        self.frontier(world)
            .into_iter()
            .filter(|p| world.occupied_neighbor_count(*p) >= self.hole_min_neighbors)
            .collect()
    }

    /// Legal options at one position. An occupied position has none; a
    /// position without occupied neighbors accepts every candidate.
    pub fn options_at(&self, world: &World, position: AxialCoord) -> Vec<TileOption> {
        if world.is_occupied(position) {
            return Vec::new();
        }
        let Some(facing) = self.facing_edges(world, position) else {
            return Vec::new();
        };

        let model = self.catalog.edge_model();
        let mut options = Vec::new();
        for (tile, keys) in self.catalog.tiles_with_keys() {
            for rotation in Rotation::ALL {
                let accepted = facing.iter().all(|f| {
                    let own = keys[rotation.source_edge(f.edge).index()];
                    model.compatible(own, f.key)
                });
                if accepted {
                    let diagnostics = self
                        .diagnostics
                        .then(|| self.diagnose(keys, rotation, &facing));
                    options.push(TileOption {
                        tile: tile.id.clone(),
                        rotation,
                        diagnostics,
                    });
                }
            }
        }
        options
    }

    /// Evaluate one position.
    pub fn evaluate_position(&self, world: &World, position: AxialCoord) -> PositionOptions {
        PositionOptions {
            position,
            occupied_neighbors: world.occupied_neighbor_count(position),
            options: self.options_at(world, position),
        }
    }

    /// Options for the whole frontier plus addon options, with zero-option
    /// holes reported separately.
    pub fn evaluate(&self, world: &World) -> OptionSet {
        let positions: Vec<PositionOptions> = self
            .frontier(world)
            .into_iter()
            .map(|p| self.evaluate_position(world, p))
            .collect();
        let unpopulatable = self.unpopulatable(world, &positions);
        let set = OptionSet {
            positions,
            addons: self.addon_options(world),
            unpopulatable,
        };
        tracing::debug!(
            positions = set.positions.len(),
            options = set.tile_option_count(),
            addon_positions = set.addons.len(),
            unpopulatable = set.unpopulatable.len(),
            "frontier evaluated"
        );
        set
    }

    /// Options restricted to interior holes. Addon options are not included.
    pub fn evaluate_holes(&self, world: &World) -> OptionSet {
        let positions: Vec<PositionOptions> = self
            .holes(world)
            .into_iter()
            .map(|p| self.evaluate_position(world, p))
            .collect();
        let unpopulatable = self.unpopulatable(world, &positions);
        OptionSet {
            positions,
            addons: Vec::new(),
            unpopulatable,
        }
    }

    /// Addons that fit each addon-free tile.
    pub fn addon_options(&self, world: &World) -> Vec<AddonOption> {
        world
            .tiles()
            .filter(|t| world.addon_at(t.position).is_none())
            .filter_map(|placed| {
                let tile = self.catalog.tile(&placed.tile)?;
                let addons: Vec<AddonId> = self
                    .catalog
                    .addons()
                    .iter()
                    .filter(|a| a.fits(tile))
                    .map(|a| a.id.clone())
                    .collect();
                (!addons.is_empty()).then_some(AddonOption {
                    position: placed.position,
                    addons,
                })
            })
            .collect()
    }

    fn unpopulatable(
        &self,
        world: &World,
        positions: &[PositionOptions],
    ) -> Vec<UnpopulatableHole> {
        positions
            .iter()
            .filter(|p| p.options.is_empty() && p.occupied_neighbors >= self.hole_min_neighbors)
            .map(|p| UnpopulatableHole {
                position: p.position,
                occupied_neighbors: p.occupied_neighbors,
                removable: world
                    .occupied_neighbors(p.position)
                    .into_iter()
                    .map(|(_, t)| t.position)
                    .collect(),
            })
            .collect()
    }

    /// Resolve each occupied neighbor's edge facing `position`. `None` if a
    /// neighbor's tile is not in the catalog.
    fn facing_edges<'w>(
        &self,
        world: &'w World,
        position: AxialCoord,
    ) -> Option<Vec<FacingEdge<'w>>> {
        world
            .occupied_neighbors(position)
            .into_iter()
            .map(|(edge, placed)| {
                let keys = self.catalog.tile_edge_keys(&placed.tile)?;
                let back = placed.rotation.source_edge(edge.opposite());
                Some(FacingEdge {
                    edge,
                    key: keys[back.index()],
                    neighbor: placed.position,
                    tile: &placed.tile,
                })
            })
            .collect()
    }

    fn diagnose(
        &self,
        keys: &[EdgeKey; 6],
        rotation: Rotation,
        facing: &[FacingEdge<'_>],
    ) -> OptionDiagnostics {
        let model = self.catalog.edge_model();
        let mut score = 0;
        let mut reasons = Vec::with_capacity(facing.len());
        for f in facing {
            let own = keys[rotation.source_edge(f.edge).index()];
            let exact = own == f.key;
            if exact {
                score += 1;
            }
            reasons.push(format!(
                "edge {} ({}) meets {} at {} ({}): {}",
                f.edge,
                model.id(own),
                f.tile,
                f.neighbor,
                model.id(f.key),
                if exact { "exact" } else { "compatible" }
            ));
        }
        OptionDiagnostics { score, reasons }
    }
}
