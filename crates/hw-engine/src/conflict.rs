//! Pairwise conflict resolution inside one proposal batch.
//!
//! Every candidate in a batch has already been checked against the world,
//! but not against the other candidates. Two candidates conflict when they
//! are hex-adjacent and their facing edges are incompatible. The resolver
//! greedily drops the candidate with the most remaining conflicts until
//! none are left. This always terminates with a conflict-free subset, but
//! not necessarily the largest one.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use hw_core::{AxialCoord, Catalog, Rotation, TileId, TilePlacement};

/// A proposed placement, used only while a batch is being resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementCandidate {
    /// Tile definition id.
    pub tile: TileId,
    /// Proposed position.
    pub position: AxialCoord,
    /// Proposed rotation.
    pub rotation: Rotation,
}

impl From<&TilePlacement> for PlacementCandidate {
    fn from(p: &TilePlacement) -> Self {
        Self {
            tile: p.tile.clone(),
            position: p.position,
            rotation: p.rotation,
        }
    }
}

/// Undirected conflict graph over candidate indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictGraph {
    adjacency: Vec<BTreeSet<usize>>,
}

impl ConflictGraph {
    /// Build the graph. Candidates whose tile is not in the catalog never
    /// conflict; they are expected to have been filtered out already.
    pub fn build(candidates: &[PlacementCandidate], catalog: &Catalog) -> Self {
        let mut adjacency = vec![BTreeSet::new(); candidates.len()];
        let mut by_position: HashMap<AxialCoord, Vec<usize>> = HashMap::new();
        for (i, c) in candidates.iter().enumerate() {
            by_position.entry(c.position).or_default().push(i);
        }

        let model = catalog.edge_model();
        for (i, a) in candidates.iter().enumerate() {
            let Some(a_keys) = catalog.tile_edge_keys(&a.tile) else {
                continue;
            };
            for (edge, n) in a.position.neighbors() {
                let Some(others) = by_position.get(&n) else {
                    continue;
                };
                for &j in others {
                    if j <= i {
                        continue;
                    }
                    let b = &candidates[j];
                    let Some(b_keys) = catalog.tile_edge_keys(&b.tile) else {
                        continue;
                    };
                    let a_edge = a_keys[a.rotation.source_edge(edge).index()];
                    let b_edge = b_keys[b.rotation.source_edge(edge.opposite()).index()];
                    if !model.compatible(a_edge, b_edge) {
                        adjacency[i].insert(j);
                        adjacency[j].insert(i);
                    }
                }
            }
        }
        Self { adjacency }
    }

    /// Number of candidates (vertices).
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Whether the graph has no vertices.
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Number of conflicting pairs.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Whether two candidates conflict.
    pub fn conflicts(&self, a: usize, b: usize) -> bool {
        self.adjacency.get(a).is_some_and(|s| s.contains(&b))
    }

    /// Candidates conflicting with `index`.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[index].iter().copied()
    }

    /// Greedy approximate minimum vertex removal.
    ///
    /// Repeatedly drops the included candidate with the most conflicts among
    /// the still-included ones. Ties go against the candidate that appears
    /// later in the batch, so earlier proposals survive.
    pub fn resolve(&self) -> Resolution {
        let n = self.len();
        let mut included = vec![true; n];
        let mut degree: Vec<usize> = self.adjacency.iter().map(BTreeSet::len).collect();
        let mut dropped = Vec::new();

        loop {
            let worst = (0..n)
                .filter(|&i| included[i] && degree[i] > 0)
                .max_by_key(|&i| (degree[i], i));
            let Some(victim) = worst else {
                break;
            };
            included[victim] = false;
            dropped.push(victim);
            for j in self.neighbors(victim) {
                if included[j] {
                    degree[j] -= 1;
                }
            }
        }

        dropped.sort_unstable();
        Resolution {
            kept: (0..n).filter(|&i| included[i]).collect(),
            dropped,
        }
    }
}

/// Indices into the original batch, each list in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Candidates that survive.
    pub kept: Vec<usize>,
    /// Candidates pruned to break conflicts.
    pub dropped: Vec<usize>,
}

/// Prunes conflicting tile placements from a batch.
#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> ConflictResolver<'a> {
    /// Create a resolver over a catalog's edge model.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Resolve a batch of candidates to kept/dropped indices.
    pub fn resolve(&self, candidates: &[PlacementCandidate]) -> Resolution {
        let graph = ConflictGraph::build(candidates, self.catalog);
        let resolution = graph.resolve();
        if !resolution.dropped.is_empty() {
            tracing::debug!(
                candidates = candidates.len(),
                conflicts = graph.edge_count(),
                dropped = resolution.dropped.len(),
                "pruned conflicting placements"
            );
        }
        resolution
    }

    /// Split placements into `(kept, pruned)`, both in original order.
    pub fn partition(
        &self,
        placements: Vec<TilePlacement>,
    ) -> (Vec<TilePlacement>, Vec<TilePlacement>) {
        let candidates: Vec<PlacementCandidate> =
            placements.iter().map(PlacementCandidate::from).collect();
        let resolution = self.resolve(&candidates);
        let mut keep = vec![false; placements.len()];
        for &i in &resolution.kept {
            keep[i] = true;
        }
        let mut kept = Vec::with_capacity(resolution.kept.len());
        let mut pruned = Vec::with_capacity(resolution.dropped.len());
        for (i, p) in placements.into_iter().enumerate() {
            if keep[i] {
                kept.push(p);
            } else {
                pruned.push(p);
            }
        }
        (kept, pruned)
    }
}
