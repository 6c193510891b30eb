//! The read-only catalog of edge types, tiles, and addons.
//!
//! A [`Catalog`] is validated once when it is built: every edge type a tile
//! or a compatibility list names must resolve, ids must be unique, and each
//! tile must list exactly six edges. After that it is immutable and meant to
//! be shared between sessions behind an `Arc`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edge::{EdgeKey, EdgeModel, EdgeType, EdgeTypeId};
use crate::error::{CatalogError, CatalogResult};
use crate::hex::Rotation;
use crate::suggest::closest_match;

/// Identifier of a tile definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub String);

/// Identifier of an addon definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddonId(pub String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            /// The id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(TileId);
string_id!(AddonId);

/// A tile type: six clockwise edges plus descriptive tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileDefinition {
    /// Unique id.
    pub id: TileId,
    /// Edge type of each side, clockwise from edge 0, before rotation.
    pub edges: [EdgeTypeId; 6],
    /// Free-form tags used to match addons.
    pub tags: BTreeSet<String>,
}

impl TileDefinition {
    /// The edge types this tile shows after `rotation`.
    pub fn rotated_edges(&self, rotation: Rotation) -> [EdgeTypeId; 6] {
        rotation.apply(&self.edges)
    }
}

/// Local placement of an addon model relative to its tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Translation from the tile center.
    pub offset: [f32; 3],
    /// Rotation about the vertical axis, in degrees.
    pub rotation_deg: f32,
    /// Uniform scale factor.
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            offset: [0.0; 3],
            rotation_deg: 0.0,
            scale: 1.0,
        }
    }
}

/// An addon type (a tree, a house, ...) that sits on a tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonDefinition {
    /// Unique id.
    pub id: AddonId,
    /// The addon fits any tile carrying at least one of these tags.
    pub required_tags: BTreeSet<String>,
    /// Default local transform.
    #[serde(default)]
    pub transform: Transform,
}

impl AddonDefinition {
    /// Whether this addon may sit on `tile`: the tag sets must intersect.
    pub fn fits(&self, tile: &TileDefinition) -> bool {
        !self.required_tags.is_disjoint(&tile.tags)
    }
}

/// A tile definition as authored, before its edge count is checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileSpec {
    /// Unique id.
    pub id: TileId,
    /// Edge type ids, clockwise. Must have exactly six entries.
    pub edges: Vec<EdgeTypeId>,
    /// Tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl TileSpec {
    /// Convenience constructor.
    pub fn new(id: &str, edges: &[&str], tags: &[&str]) -> Self {
        Self {
            id: TileId::from(id),
            edges: edges.iter().map(|e| EdgeTypeId::from(*e)).collect(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// The authored catalog document, as read from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Catalog id; worlds are bound to it.
    pub id: String,
    /// Edge types with their declared compatibility lists.
    pub edge_types: Vec<EdgeType>,
    /// Tile definitions.
    pub tiles: Vec<TileSpec>,
    /// Addon definitions.
    #[serde(default)]
    pub addons: Vec<AddonDefinition>,
}

/// A validated, immutable catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    id: String,
    edge_model: EdgeModel,
    tiles: Vec<TileDefinition>,
    tile_edges: Vec<[EdgeKey; 6]>,
    tile_index: HashMap<TileId, usize>,
    addons: Vec<AddonDefinition>,
    addon_index: HashMap<AddonId, usize>,
}

impl Catalog {
    /// Validate an authored catalog and precompute its edge model.
    pub fn new(file: CatalogFile) -> CatalogResult<Self> {
        let edge_model = EdgeModel::new(&file.edge_types)?;
        if file.tiles.is_empty() {
            return Err(CatalogError::NoTiles(file.id));
        }

        let mut tiles = Vec::with_capacity(file.tiles.len());
        let mut tile_edges = Vec::with_capacity(file.tiles.len());
        let mut tile_index = HashMap::with_capacity(file.tiles.len());
        for spec in file.tiles {
            let edges: [EdgeTypeId; 6] =
                spec.edges
                    .try_into()
                    .map_err(|e: Vec<EdgeTypeId>| CatalogError::EdgeCount {
                        tile: spec.id.to_string(),
                        found: e.len(),
                    })?;

            let mut keys = Vec::with_capacity(6);
            for edge in &edges {
                let key = edge_model
                    .key(edge)
                    .ok_or_else(|| CatalogError::UnknownEdgeType {
                        id: edge.to_string(),
                        referrer: format!("tile \"{}\"", spec.id),
                        suggestion: closest_match(
                            edge.as_str(),
                            edge_model.ids().iter().map(EdgeTypeId::as_str),
                        ),
                    })?;
                keys.push(key);
            }
            let keys: [EdgeKey; 6] = std::array::from_fn(|i| keys[i]);

            if tile_index.insert(spec.id.clone(), tiles.len()).is_some() {
                return Err(CatalogError::DuplicateId {
                    kind: "tile",
                    id: spec.id.to_string(),
                });
            }
            tiles.push(TileDefinition {
                id: spec.id,
                edges,
                tags: spec.tags,
            });
            tile_edges.push(keys);
        }

        let mut addon_index = HashMap::with_capacity(file.addons.len());
        for (i, addon) in file.addons.iter().enumerate() {
            if addon_index.insert(addon.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateId {
                    kind: "addon",
                    id: addon.id.to_string(),
                });
            }
        }

        tracing::debug!(
            catalog = %file.id,
            edge_types = edge_model.len(),
            tiles = tiles.len(),
            addons = file.addons.len(),
            "catalog loaded"
        );

        Ok(Self {
            id: file.id,
            edge_model,
            tiles,
            tile_edges,
            tile_index,
            addons: file.addons,
            addon_index,
        })
    }

    /// Parse and validate a catalog from JSON.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file)
    }

    /// Catalog id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The precomputed compatibility matrix.
    pub fn edge_model(&self) -> &EdgeModel {
        &self.edge_model
    }

    /// Tile definitions in authored order.
    pub fn tiles(&self) -> &[TileDefinition] {
        &self.tiles
    }

    /// Addon definitions in authored order.
    pub fn addons(&self) -> &[AddonDefinition] {
        &self.addons
    }

    /// Look up a tile definition.
    pub fn tile(&self, id: &TileId) -> Option<&TileDefinition> {
        self.tile_index.get(id).map(|&i| &self.tiles[i])
    }

    /// Look up an addon definition.
    pub fn addon(&self, id: &AddonId) -> Option<&AddonDefinition> {
        self.addon_index.get(id).map(|&i| &self.addons[i])
    }

    /// Resolved (unrotated) edge keys of a tile.
    pub fn tile_edge_keys(&self, id: &TileId) -> Option<&[EdgeKey; 6]> {
        self.tile_index.get(id).map(|&i| &self.tile_edges[i])
    }

    /// Tiles paired with their resolved edge keys, in authored order.
    pub fn tiles_with_keys(&self) -> impl Iterator<Item = (&TileDefinition, &[EdgeKey; 6])> {
        self.tiles.iter().zip(self.tile_edges.iter())
    }

    /// Closest tile id to an unknown one.
    pub fn suggest_tile(&self, unknown: &str) -> Option<String> {
        closest_match(unknown, self.tiles.iter().map(|t| t.id.as_str()))
    }

    /// Closest addon id to an unknown one.
    pub fn suggest_addon(&self, unknown: &str) -> Option<String> {
        closest_match(unknown, self.addons.iter().map(|a| a.id.as_str()))
    }
}
