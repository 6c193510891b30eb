//! The only write path into a [`World`].
//!
//! Single operations either succeed or leave the world untouched. Batches
//! apply in a fixed order (tile removals, addon removals, tile placements,
//! addon placements) and record per-item failures instead of aborting.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{AddonId, Catalog, TileId, Transform};
use crate::error::{MutationError, MutationResult};
use crate::hex::{AxialCoord, Rotation};
use crate::world::{PlacedAddon, PlacedTile, World};

/// A request to place a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePlacement {
    /// Target position.
    pub position: AxialCoord,
    /// Tile definition id.
    #[serde(alias = "tileId", alias = "tile_id")]
    pub tile: TileId,
    /// Clockwise rotation.
    pub rotation: Rotation,
    /// Height level.
    #[serde(default)]
    pub elevation: i32,
}

impl TilePlacement {
    /// A placement at elevation 0.
    pub fn new(position: AxialCoord, tile: &str, rotation: Rotation) -> Self {
        Self {
            position,
            tile: TileId::from(tile),
            rotation,
            elevation: 0,
        }
    }
}

/// A request to place an addon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonPlacement {
    /// Target tile position.
    pub position: AxialCoord,
    /// Addon definition id.
    #[serde(alias = "addonId", alias = "addon_id")]
    pub addon: AddonId,
    /// Optional local transform override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl AddonPlacement {
    /// A placement using the addon's default transform.
    pub fn new(position: AxialCoord, addon: &str) -> Self {
        Self {
            position,
            addon: AddonId::from(addon),
            transform: None,
        }
    }
}

/// A request to remove whatever of one kind sits at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Removal {
    /// Target position.
    pub position: AxialCoord,
}

/// Everything one decision cycle asks to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationBatch {
    /// Tiles to place.
    #[serde(alias = "tilePlacements")]
    pub tile_placements: Vec<TilePlacement>,
    /// Tiles to remove (co-located addons go with them).
    #[serde(alias = "tileRemovals")]
    pub tile_removals: Vec<Removal>,
    /// Addons to place.
    #[serde(alias = "addonPlacements")]
    pub addon_placements: Vec<AddonPlacement>,
    /// Addons to remove.
    #[serde(alias = "addonRemovals")]
    pub addon_removals: Vec<Removal>,
}

impl MutationBatch {
    /// Whether the batch asks for nothing.
    pub fn is_empty(&self) -> bool {
        self.tile_placements.is_empty()
            && self.tile_removals.is_empty()
            && self.addon_placements.is_empty()
            && self.addon_removals.is_empty()
    }

    /// Total number of requested items.
    pub fn len(&self) -> usize {
        self.tile_placements.len()
            + self.tile_removals.len()
            + self.addon_placements.len()
            + self.addon_removals.len()
    }
}

/// Safety limits for batch application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchLimits {
    /// Tile placements stop once the world holds this many tiles.
    pub max_tiles: usize,
    /// Fraction of the current tile count that may be removed per batch.
    pub removal_fraction: f64,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_tiles: usize::MAX,
            removal_fraction: 0.25,
        }
    }
}

impl BatchLimits {
    /// Removals allowed for a world holding `tile_count` tiles:
    /// `max(1, floor(fraction * tile_count))`.
    pub fn removal_cap(&self, tile_count: usize) -> usize {
        ((self.removal_fraction * tile_count as f64).floor() as usize).max(1)
    }
}

/// The kind of item a batch failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchCategory {
    /// Tile placement.
    TilePlacement,
    /// Tile removal.
    TileRemoval,
    /// Addon placement.
    AddonPlacement,
    /// Addon removal.
    AddonRemoval,
}

impl fmt::Display for BatchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TilePlacement => write!(f, "tile placement"),
            Self::TileRemoval => write!(f, "tile removal"),
            Self::AddonPlacement => write!(f, "addon placement"),
            Self::AddonRemoval => write!(f, "addon removal"),
        }
    }
}

/// One skipped batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Which list the item came from.
    pub category: BatchCategory,
    /// The item's position.
    pub position: AxialCoord,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of applying a [`MutationBatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Tiles placed.
    pub tiles_placed: usize,
    /// Tiles removed.
    pub tiles_removed: usize,
    /// Addons placed.
    pub addons_placed: usize,
    /// Addons removed, explicitly or along with their tile.
    pub addons_removed: usize,
    /// Tile removals dropped by the per-batch removal cap.
    pub removals_capped: usize,
    /// Tile placements not attempted because the tile budget was reached.
    pub placements_over_budget: usize,
    /// Items that were attempted and refused.
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    /// Number of world changes made.
    pub fn net_changes(&self) -> usize {
        self.tiles_placed + self.tiles_removed + self.addons_placed + self.addons_removed
    }

    /// Failures of one category.
    pub fn failures_in(&self, category: BatchCategory) -> impl Iterator<Item = &ItemFailure> {
        self.failures.iter().filter(move |f| f.category == category)
    }

    fn fail(&mut self, category: BatchCategory, position: AxialCoord, err: &MutationError) {
        tracing::debug!(%category, %position, reason = %err, "batch item skipped");
        self.failures.push(ItemFailure {
            category,
            position,
            reason: err.to_string(),
        });
    }
}

/// Applies validated changes to a world against its catalog.
#[derive(Debug)]
pub struct WorldMutator<'a> {
    world: &'a mut World,
    catalog: &'a Catalog,
}

impl<'a> WorldMutator<'a> {
    /// Borrow a world for mutation.
    pub fn new(world: &'a mut World, catalog: &'a Catalog) -> Self {
        Self { world, catalog }
    }

    /// Read access to the world being mutated.
    pub fn world(&self) -> &World {
        self.world
    }

    /// Place a tile on an empty position.
    pub fn add_tile(&mut self, placement: &TilePlacement) -> MutationResult<()> {
        if self.catalog.tile(&placement.tile).is_none() {
            return Err(MutationError::UnknownTile {
                id: placement.tile.to_string(),
                suggestion: self.catalog.suggest_tile(placement.tile.as_str()),
            });
        }
        if self.world.is_occupied(placement.position) {
            return Err(MutationError::Occupied(placement.position));
        }
        self.world.insert_tile(PlacedTile {
            tile: placement.tile.clone(),
            position: placement.position,
            rotation: placement.rotation,
            elevation: placement.elevation,
        });
        Ok(())
    }

    /// Remove a tile and any addon sitting on it.
    pub fn remove_tile(
        &mut self,
        position: AxialCoord,
    ) -> MutationResult<(PlacedTile, Option<PlacedAddon>)> {
        let tile = self
            .world
            .take_tile(position)
            .ok_or(MutationError::NoTile(position))?;
        let addon = self.world.take_addon(position);
        Ok((tile, addon))
    }

    /// Place an addon on a tile whose tags it matches.
    pub fn add_addon(&mut self, placement: &AddonPlacement) -> MutationResult<()> {
        let position = placement.position;
        let addon = self
            .catalog
            .addon(&placement.addon)
            .ok_or_else(|| MutationError::UnknownAddon {
                id: placement.addon.to_string(),
                suggestion: self.catalog.suggest_addon(placement.addon.as_str()),
            })?;
        let placed = self
            .world
            .tile_at(position)
            .ok_or(MutationError::NoTile(position))?;
        let tile = self
            .catalog
            .tile(&placed.tile)
            .ok_or_else(|| MutationError::UnknownTile {
                id: placed.tile.to_string(),
                suggestion: None,
            })?;
        if !addon.fits(tile) {
            return Err(MutationError::TagMismatch {
                position,
                addon: addon.id.to_string(),
                tile: tile.id.to_string(),
            });
        }
        if self.world.addon_at(position).is_some() {
            return Err(MutationError::AddonPresent(position));
        }
        self.world.insert_addon(PlacedAddon {
            addon: placement.addon.clone(),
            position,
            transform: placement.transform,
        });
        Ok(())
    }

    /// Remove the addon at a position.
    pub fn remove_addon(&mut self, position: AxialCoord) -> MutationResult<PlacedAddon> {
        self.world
            .take_addon(position)
            .ok_or(MutationError::NoAddon(position))
    }

    /// Apply a whole batch in order: tile removals (capped), addon removals,
    /// tile placements (until the budget is reached), addon placements.
    pub fn apply(&mut self, batch: &MutationBatch, limits: BatchLimits) -> BatchReport {
        let mut report = BatchReport::default();

        let cap = limits.removal_cap(self.world.tile_count());
        if batch.tile_removals.len() > cap {
            report.removals_capped = batch.tile_removals.len() - cap;
            tracing::warn!(
                requested = batch.tile_removals.len(),
                cap,
                "tile removals over the per-batch cap were dropped"
            );
        }
        for removal in batch.tile_removals.iter().take(cap) {
            match self.remove_tile(removal.position) {
                Ok((_, addon)) => {
                    report.tiles_removed += 1;
                    if addon.is_some() {
                        report.addons_removed += 1;
                    }
                }
                Err(e) => report.fail(BatchCategory::TileRemoval, removal.position, &e),
            }
        }

        for removal in &batch.addon_removals {
            match self.remove_addon(removal.position) {
                Ok(_) => report.addons_removed += 1,
                Err(e) => report.fail(BatchCategory::AddonRemoval, removal.position, &e),
            }
        }

        for (i, placement) in batch.tile_placements.iter().enumerate() {
            if self.world.tile_count() >= limits.max_tiles {
                report.placements_over_budget = batch.tile_placements.len() - i;
                break;
            }
            match self.add_tile(placement) {
                Ok(()) => report.tiles_placed += 1,
                Err(e) => report.fail(BatchCategory::TilePlacement, placement.position, &e),
            }
        }

        for placement in &batch.addon_placements {
            match self.add_addon(placement) {
                Ok(()) => report.addons_placed += 1,
                Err(e) => report.fail(BatchCategory::AddonPlacement, placement.position, &e),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::catalog::tests::road_catalog;

    fn rot(k: u8) -> Rotation {
        Rotation::new(k).unwrap()
    }

    fn at(q: i32, r: i32) -> AxialCoord {
        AxialCoord::new(q, r)
    }

    /// A world with `n` grass tiles in a row along q.
    fn grass_row(catalog: &Catalog, n: i32) -> World {
        let mut world = World::new(catalog.id());
        let mut m = WorldMutator::new(&mut world, catalog);
        for q in 0..n {
            m.add_tile(&TilePlacement::new(at(q, 0), "grass", rot(0))).unwrap();
        }
        world
    }

    #[test]
    fn add_tile_to_empty_position() {
        let catalog = road_catalog();
        let mut world = World::new(catalog.id());
        let mut m = WorldMutator::new(&mut world, &catalog);
        m.add_tile(&TilePlacement::new(at(0, 0), "road", rot(2))).unwrap();
        let placed = world.tile_at(at(0, 0)).unwrap();
        assert_eq!(placed.tile.as_str(), "road");
        assert_eq!(placed.rotation, rot(2));
    }

    #[test]
    fn add_tile_to_occupied_position_fails() {
        let catalog = road_catalog();
        let mut world = grass_row(&catalog, 1);
        let before = world.clone();
        let mut m = WorldMutator::new(&mut world, &catalog);
        let err = m
            .add_tile(&TilePlacement::new(at(0, 0), "road", rot(0)))
            .unwrap_err();
        assert_eq!(err, MutationError::Occupied(at(0, 0)));
        assert_eq!(world, before);
    }

    #[test]
    fn unknown_tile_rejected_with_suggestion() {
        let catalog = road_catalog();
        let mut world = World::new(catalog.id());
        let mut m = WorldMutator::new(&mut world, &catalog);
        let err = m
            .add_tile(&TilePlacement::new(at(0, 0), "raod", rot(0)))
            .unwrap_err();
        assert!(matches!(err, MutationError::UnknownTile { suggestion: Some(_), .. }));
        assert!(world.is_empty());
    }

    #[test]
    fn remove_tile_takes_addon_along() {
        let catalog = road_catalog();
        let mut world = grass_row(&catalog, 1);
        let mut m = WorldMutator::new(&mut world, &catalog);
        m.add_addon(&AddonPlacement::new(at(0, 0), "tree")).unwrap();
        let (tile, addon) = m.remove_tile(at(0, 0)).unwrap();
        assert_eq!(tile.tile.as_str(), "grass");
        assert!(addon.is_some());
        assert!(world.is_empty());
        assert_eq!(world.addon_count(), 0);
    }

    #[test]
    fn remove_missing_tile_fails() {
        let catalog = road_catalog();
        let mut world = World::new(catalog.id());
        let mut m = WorldMutator::new(&mut world, &catalog);
        assert_eq!(m.remove_tile(at(3, 3)).unwrap_err(), MutationError::NoTile(at(3, 3)));
    }

    #[test]
    fn addon_without_tile_fails_without_mutation() {
        let catalog = road_catalog();
        let mut world = World::new(catalog.id());
        let mut m = WorldMutator::new(&mut world, &catalog);
        let err = m.add_addon(&AddonPlacement::new(at(0, 0), "tree")).unwrap_err();
        assert_eq!(err, MutationError::NoTile(at(0, 0)));
        assert_eq!(world.addon_count(), 0);
    }

    #[test]
    fn addon_tag_mismatch_fails_without_mutation() {
        let catalog = road_catalog();
        let mut world = World::new(catalog.id());
        let mut m = WorldMutator::new(&mut world, &catalog);
        m.add_tile(&TilePlacement::new(at(0, 0), "road", rot(0))).unwrap();
        let before = m.world().clone();
        let err = m.add_addon(&AddonPlacement::new(at(0, 0), "tree")).unwrap_err();
        assert!(matches!(err, MutationError::TagMismatch { .. }));
        assert_eq!(world, before);
    }

    #[test]
    fn second_addon_at_position_fails() {
        let catalog = road_catalog();
        let mut world = grass_row(&catalog, 1);
        let mut m = WorldMutator::new(&mut world, &catalog);
        m.add_addon(&AddonPlacement::new(at(0, 0), "tree")).unwrap();
        let err = m.add_addon(&AddonPlacement::new(at(0, 0), "tree")).unwrap_err();
        assert_eq!(err, MutationError::AddonPresent(at(0, 0)));
        assert_eq!(world.addon_count(), 1);
    }

    #[test]
    fn remove_missing_addon_fails() {
        let catalog = road_catalog();
        let mut world = grass_row(&catalog, 1);
        let mut m = WorldMutator::new(&mut world, &catalog);
        assert_eq!(m.remove_addon(at(0, 0)).unwrap_err(), MutationError::NoAddon(at(0, 0)));
    }

    #[test]
    fn batch_replaces_addon_in_one_cycle() {
        let catalog = road_catalog();
        let mut world = grass_row(&catalog, 1);
        let mut m = WorldMutator::new(&mut world, &catalog);
        m.add_addon(&AddonPlacement::new(at(0, 0), "tree")).unwrap();

        let batch = MutationBatch {
            addon_removals: vec![Removal { position: at(0, 0) }],
            addon_placements: vec![AddonPlacement::new(at(0, 0), "tree")],
            ..MutationBatch::default()
        };
        let report = m.apply(&batch, BatchLimits::default());
        assert_eq!(report.addons_removed, 1);
        assert_eq!(report.addons_placed, 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn batch_records_failures_and_continues() {
        let catalog = road_catalog();
        let mut world = grass_row(&catalog, 2);
        let mut m = WorldMutator::new(&mut world, &catalog);
        let batch = MutationBatch {
            tile_placements: vec![
                TilePlacement::new(at(0, 0), "grass", rot(0)),
                TilePlacement::new(at(2, 0), "grass", rot(0)),
            ],
            addon_placements: vec![AddonPlacement::new(at(9, 9), "tree")],
            addon_removals: vec![Removal { position: at(1, 0) }],
            ..MutationBatch::default()
        };
        let report = m.apply(&batch, BatchLimits::default());
        assert_eq!(report.tiles_placed, 1);
        assert_eq!(report.failures.len(), 3);
        assert_eq!(report.failures_in(BatchCategory::TilePlacement).count(), 1);
        assert_eq!(report.failures_in(BatchCategory::AddonPlacement).count(), 1);
        assert_eq!(report.failures_in(BatchCategory::AddonRemoval).count(), 1);
        assert_eq!(report.net_changes(), 1);
    }

    #[test]
    fn batch_removes_before_placing() {
        let catalog = road_catalog();
        let mut world = grass_row(&catalog, 4);
        let mut m = WorldMutator::new(&mut world, &catalog);
        let batch = MutationBatch {
            tile_placements: vec![TilePlacement::new(at(0, 0), "road", rot(0))],
            tile_removals: vec![Removal { position: at(0, 0) }],
            ..MutationBatch::default()
        };
        let report = m.apply(&batch, BatchLimits::default());
        assert_eq!(report.tiles_removed, 1);
        assert_eq!(report.tiles_placed, 1);
        assert_eq!(world.tile_at(at(0, 0)).unwrap().tile.as_str(), "road");
    }

    #[test]
    fn batch_stops_placing_at_budget() {
        let catalog = road_catalog();
        let mut world = grass_row(&catalog, 2);
        let mut m = WorldMutator::new(&mut world, &catalog);
        let batch = MutationBatch {
            tile_placements: (2..6)
                .map(|q| TilePlacement::new(at(q, 0), "grass", rot(0)))
                .collect(),
            ..MutationBatch::default()
        };
        let limits = BatchLimits {
            max_tiles: 4,
            ..BatchLimits::default()
        };
        let report = m.apply(&batch, limits);
        assert_eq!(report.tiles_placed, 2);
        assert_eq!(report.placements_over_budget, 2);
        assert_eq!(world.tile_count(), 4);
    }

    #[test]
    fn removal_cap_floor_with_minimum_one() {
        let limits = BatchLimits::default();
        assert_eq!(limits.removal_cap(0), 1);
        assert_eq!(limits.removal_cap(3), 1);
        assert_eq!(limits.removal_cap(8), 2);
        assert_eq!(limits.removal_cap(11), 2);
        assert_eq!(limits.removal_cap(100), 25);
    }

    proptest! {
        #[test]
        fn removals_are_capped(tiles in 1i32..40, extra in 1usize..10) {
            let catalog = road_catalog();
            let mut world = grass_row(&catalog, tiles);
            let cap = BatchLimits::default().removal_cap(tiles as usize);
            let requested = (cap + extra).min(tiles as usize);
            prop_assume!(requested > cap);

            let batch = MutationBatch {
                tile_removals: (0..requested as i32)
                    .map(|q| Removal { position: at(q, 0) })
                    .collect(),
                ..MutationBatch::default()
            };
            let mut m = WorldMutator::new(&mut world, &catalog);
            let report = m.apply(&batch, BatchLimits::default());
            prop_assert_eq!(report.tiles_removed, cap);
            prop_assert_eq!(report.removals_capped, requested - cap);
            prop_assert_eq!(world.tile_count(), tiles as usize - cap);
        }
    }
}
