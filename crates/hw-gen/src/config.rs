//! Configuration for a generation session.

use hw_core::BatchLimits;
use hw_engine::DEFAULT_HOLE_MIN_NEIGHBORS;

/// Hard ceiling on expansion rounds per session.
pub const MAX_ITERATIONS: usize = 50;

/// Configuration for a generation session.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Tile budget; expansion stops once the world holds this many tiles.
    pub max_tiles: usize,
    /// Expansion rounds before giving up (at most [`MAX_ITERATIONS`]).
    pub max_iterations: usize,
    /// Fraction of placed tiles one round may remove.
    pub removal_fraction: f64,
    /// Occupied-neighbor count that makes an empty position a hole.
    pub hole_min_neighbors: usize,
    /// Attach scores and reasons to every offered option.
    pub diagnostics: bool,
    /// RNG seed for the built-in oracle.
    pub seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tiles: 40,
            max_iterations: MAX_ITERATIONS,
            removal_fraction: 0.25,
            hole_min_neighbors: DEFAULT_HOLE_MIN_NEIGHBORS,
            diagnostics: false,
            seed: 42,
        }
    }
}

impl GenerationConfig {
    /// Set the tile budget (at least 1).
    pub fn with_max_tiles(mut self, max_tiles: usize) -> Self {
        self.max_tiles = max_tiles.max(1);
        self
    }

    /// Set the iteration cap (clamped to 1-50).
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations.clamp(1, MAX_ITERATIONS);
        self
    }

    /// Set the per-round removal fraction (clamped to 0.0-1.0).
    pub fn with_removal_fraction(mut self, fraction: f64) -> Self {
        self.removal_fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self
    }

    /// Set the hole threshold (clamped to 1-6).
    pub fn with_hole_min_neighbors(mut self, neighbors: usize) -> Self {
        self.hole_min_neighbors = neighbors.clamp(1, 6);
        self
    }

    /// Enable or disable option diagnostics.
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Limits handed to the world mutator.
    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits {
            max_tiles: self.max_tiles,
            removal_fraction: self.removal_fraction,
        }
    }
}
