use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{AddonId, TileId, Transform};
use crate::hex::{AxialCoord, Edge, Rotation};

/// A tile instance on the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTile {
    /// Which tile definition.
    pub tile: TileId,
    /// Where it sits.
    pub position: AxialCoord,
    /// Clockwise rotation applied to the definition's edges.
    pub rotation: Rotation,
    /// Height level; carried for renderers, ignored by the constraint engine.
    #[serde(default)]
    pub elevation: i32,
}

/// An addon instance sitting on a placed tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedAddon {
    /// Which addon definition.
    pub addon: AddonId,
    /// The tile position it sits on.
    pub position: AxialCoord,
    /// Overrides the definition's default transform when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

/// Serializable, coordinate-ordered view of a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// The catalog the world is bound to.
    pub catalog_id: String,
    /// Placed tiles ordered by coordinate.
    pub tiles: Vec<PlacedTile>,
    /// Placed addons ordered by coordinate.
    pub addons: Vec<PlacedAddon>,
}

/// A hex tiling bound to one catalog.
///
/// At most one tile and at most one addon exist per coordinate; both are
/// keyed by position. Mutation goes through [`crate::WorldMutator`], which
/// also enforces that addons only sit on tiles whose tags they match.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    catalog_id: String,
    tiles: BTreeMap<AxialCoord, PlacedTile>,
    addons: BTreeMap<AxialCoord, PlacedAddon>,
}

impl World {
    /// Create an empty world bound to a catalog id.
    pub fn new(catalog_id: impl Into<String>) -> Self {
        Self {
            catalog_id: catalog_id.into(),
            tiles: BTreeMap::new(),
            addons: BTreeMap::new(),
        }
    }

    /// The catalog this world is bound to.
    pub fn catalog_id(&self) -> &str {
        &self.catalog_id
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// The tile at a position, if any.
    pub fn tile_at(&self, position: AxialCoord) -> Option<&PlacedTile> {
        self.tiles.get(&position)
    }

    /// The addon at a position, if any.
    pub fn addon_at(&self, position: AxialCoord) -> Option<&PlacedAddon> {
        self.addons.get(&position)
    }

    /// Whether a tile occupies the position.
    pub fn is_occupied(&self, position: AxialCoord) -> bool {
        self.tiles.contains_key(&position)
    }

    /// All placed tiles ordered by coordinate.
    pub fn tiles(&self) -> impl Iterator<Item = &PlacedTile> {
        self.tiles.values()
    }

    /// All placed addons ordered by coordinate.
    pub fn addons(&self) -> impl Iterator<Item = &PlacedAddon> {
        self.addons.values()
    }

    /// Occupied neighbors of a position, with the edge of `position` that
    /// faces each one.
    pub fn occupied_neighbors(&self, position: AxialCoord) -> Vec<(Edge, &PlacedTile)> {
        position
            .neighbors()
            .filter_map(|(edge, n)| self.tiles.get(&n).map(|t| (edge, t)))
            .collect()
    }

    /// Number of occupied neighbors of a position.
    pub fn occupied_neighbor_count(&self, position: AxialCoord) -> usize {
        position
            .neighbors()
            .filter(|(_, n)| self.tiles.contains_key(n))
            .count()
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    /// Number of placed tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Number of placed addons.
    pub fn addon_count(&self) -> usize {
        self.addons.len()
    }

    /// Whether no tile has been placed.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Rebuild a world from a snapshot without checking it against any
    /// catalog. Later entries win on duplicate coordinates. Run the engine's
    /// structural validation before trusting the result.
    pub fn from_snapshot(snapshot: WorldSnapshot) -> Self {
        let mut world = World::new(snapshot.catalog_id);
        for tile in snapshot.tiles {
            world.insert_tile(tile);
        }
        for addon in snapshot.addons {
            world.insert_addon(addon);
        }
        world
    }

    /// Copy out a serializable view.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            catalog_id: self.catalog_id.clone(),
            tiles: self.tiles.values().cloned().collect(),
            addons: self.addons.values().cloned().collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Raw mutation (invariants are checked by the mutator)
    // -----------------------------------------------------------------------

    pub(crate) fn insert_tile(&mut self, tile: PlacedTile) {
        self.tiles.insert(tile.position, tile);
    }

    pub(crate) fn take_tile(&mut self, position: AxialCoord) -> Option<PlacedTile> {
        self.tiles.remove(&position)
    }

    pub(crate) fn insert_addon(&mut self, addon: PlacedAddon) {
        self.addons.insert(addon.position, addon);
    }

    pub(crate) fn take_addon(&mut self, position: AxialCoord) -> Option<PlacedAddon> {
        self.addons.remove(&position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(tile: &str, q: i32, r: i32) -> PlacedTile {
        PlacedTile {
            tile: TileId::from(tile),
            position: AxialCoord::new(q, r),
            rotation: Rotation::default(),
            elevation: 0,
        }
    }

    #[test]
    fn new_world_is_empty() {
        let world = World::new("roads");
        assert!(world.is_empty());
        assert_eq!(world.catalog_id(), "roads");
        assert_eq!(world.tile_count(), 0);
        assert_eq!(world.addon_count(), 0);
    }

    #[test]
    fn neighbor_counts() {
        let mut world = World::new("roads");
        world.insert_tile(placed("grass", 1, 0));
        world.insert_tile(placed("grass", 0, 1));
        world.insert_tile(placed("grass", 5, 5));

        let o = AxialCoord::ORIGIN;
        assert_eq!(world.occupied_neighbor_count(o), 2);
        let faces: Vec<u8> = world
            .occupied_neighbors(o)
            .iter()
            .map(|(e, _)| u8::from(*e))
            .collect();
        assert_eq!(faces, vec![0, 1]);
    }

    #[test]
    fn snapshot_is_ordered_and_serializable() {
        let mut world = World::new("roads");
        world.insert_tile(placed("road", 1, 0));
        world.insert_tile(placed("grass", -1, 0));
        let snap = world.snapshot();
        assert_eq!(snap.tiles[0].position, AxialCoord::new(-1, 0));

        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"catalog_id\":\"roads\""));
        let back: WorldSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
        assert_eq!(World::from_snapshot(back), world);
    }
}
