//! Constraint engine for Hexweave.
//!
//! Given a [`hw_core::World`] and its [`hw_core::Catalog`], this crate
//! answers three questions: which `(tile, rotation)` candidates are legal at
//! each empty position, which candidates in a proposed batch conflict with
//! each other, and whether a finished world is edge-consistent.

/// Pairwise conflict graph and greedy pruning.
pub mod conflict;
/// Legal-option enumeration over the frontier and interior holes.
pub mod constraint;
/// Edge and structural validation of finished worlds.
pub mod validate;

/// Fixtures for unit tests here and in downstream crates.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Re-export conflict types.
pub use conflict::{ConflictGraph, ConflictResolver, PlacementCandidate, Resolution};
/// Re-export constraint types.
pub use constraint::{
    AddonOption, ConstraintEvaluator, DEFAULT_HOLE_MIN_NEIGHBORS, OptionDiagnostics, OptionSet,
    PositionOptions, TileOption, UnpopulatableHole,
};
/// Re-export validation types.
pub use validate::{
    EdgeValidationSummary, InvalidEdge, ValidationIssue, check_references, validate_edges,
    validate_structure,
};
