//! Core types for Hexweave: hex grid math, edge compatibility, the tile
//! catalog, and the world model.
//!
//! Everything here is synchronous and free of generation policy. The
//! constraint engine (`hw-engine`) and the oracle-driven session (`hw-gen`)
//! build on these types.

/// Read-only catalog of edge types, tiles, and addons.
pub mod catalog;
/// Edge types and the symmetric compatibility matrix.
pub mod edge;
/// Error types used throughout the crate.
pub mod error;
/// Axial coordinates, edges, and rotations.
pub mod hex;
/// The validated write path into a world.
pub mod mutator;
/// Fuzzy suggestions for unknown ids.
pub mod suggest;
/// The tiling itself.
pub mod world;

/// Re-export catalog types.
pub use catalog::{
    AddonDefinition, AddonId, Catalog, CatalogFile, TileDefinition, TileId, TileSpec, Transform,
};
/// Re-export edge model types.
pub use edge::{EdgeKey, EdgeModel, EdgeType, EdgeTypeId};
/// Re-export error types.
pub use error::{CatalogError, CatalogResult, MutationError, MutationResult, StepOutOfRange};
/// Re-export hex math types.
pub use hex::{AxialCoord, Edge, Rotation};
/// Re-export mutation types.
pub use mutator::{
    AddonPlacement, BatchCategory, BatchLimits, BatchReport, ItemFailure, MutationBatch, Removal,
    TilePlacement, WorldMutator,
};
/// Re-export world model types.
pub use world::{PlacedAddon, PlacedTile, World, WorldSnapshot};
