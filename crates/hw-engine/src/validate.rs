//! Independent post-generation checks over a finished world.
//!
//! [`validate_edges`] re-checks every shared edge once and reports counts.
//! [`validate_structure`] checks referential and tag invariants. Neither
//! repairs anything. [`check_references`] is the fail-fast form used before
//! generation starts.

use serde::Serialize;

use hw_core::{
    AddonId, AxialCoord, Catalog, CatalogError, CatalogResult, Edge, EdgeTypeId, TileId, World,
};

/// A shared edge whose two sides are incompatible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidEdge {
    /// The lower-ordered tile of the pair.
    pub a: AxialCoord,
    /// Edge of `a` facing `b`.
    pub edge: Edge,
    /// The neighbor.
    pub b: AxialCoord,
    /// Edge type shown by `a`.
    pub a_type: EdgeTypeId,
    /// Edge type shown by `b`.
    pub b_type: EdgeTypeId,
}

impl std::fmt::Display for InvalidEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} edge {} ({}) meets {} ({})",
            self.a, self.edge, self.a_type, self.b, self.b_type
        )
    }
}

/// Result of an edge-validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeValidationSummary {
    /// Shared edges checked, each counted once.
    pub checked: usize,
    /// Edges whose sides are compatible.
    pub valid: usize,
    /// Edges whose sides are not compatible.
    pub invalid: usize,
    /// Details for every invalid edge, ordered by coordinate.
    pub invalid_edges: Vec<InvalidEdge>,
}

impl EdgeValidationSummary {
    /// Whether every shared edge is compatible.
    pub fn is_clean(&self) -> bool {
        self.invalid == 0
    }
}

/// Check every placed tile's six edges against its neighbors.
///
/// Each shared edge is visited from its lower-ordered endpoint only, so it
/// is counted once. Tiles missing from the catalog are skipped here and
/// reported by [`validate_structure`].
pub fn validate_edges(world: &World, catalog: &Catalog) -> EdgeValidationSummary {
    let model = catalog.edge_model();
    let mut summary = EdgeValidationSummary::default();

    for placed in world.tiles() {
        let Some(keys) = catalog.tile_edge_keys(&placed.tile) else {
            continue;
        };
        for (edge, n) in placed.position.neighbors() {
            if n <= placed.position {
                continue;
            }
            let Some(other) = world.tile_at(n) else {
                continue;
            };
            let Some(other_keys) = catalog.tile_edge_keys(&other.tile) else {
                continue;
            };
            let own = keys[placed.rotation.source_edge(edge).index()];
            let back = other_keys[other.rotation.source_edge(edge.opposite()).index()];

            summary.checked += 1;
            if model.compatible(own, back) {
                summary.valid += 1;
            } else {
                summary.invalid += 1;
                summary.invalid_edges.push(InvalidEdge {
                    a: placed.position,
                    edge,
                    b: n,
                    a_type: model.id(own).clone(),
                    b_type: model.id(back).clone(),
                });
            }
        }
    }

    if summary.invalid > 0 {
        tracing::warn!(
            checked = summary.checked,
            invalid = summary.invalid,
            "world has incompatible edges"
        );
    }
    summary
}

/// A warning or error found during structural validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Where the issue was found, if tied to a position.
    pub position: Option<AxialCoord>,
    /// A human-readable description of the issue.
    pub message: String,
    /// Whether this is an error (true) or a warning (false).
    pub is_error: bool,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = if self.is_error { "error" } else { "warning" };
        match self.position {
            Some(p) => write!(f, "{level}: {p}: {}", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}

/// Check that a world agrees with its catalog.
///
/// Reports a catalog id mismatch, tiles and addons whose ids do not resolve,
/// addons without a tile beneath them, and addons whose required tags do
/// not intersect their tile's tags. Returns an empty list for a sound world.
pub fn validate_structure(world: &World, catalog: &Catalog) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if world.catalog_id() != catalog.id() {
        issues.push(ValidationIssue {
            position: None,
            message: format!(
                "world is bound to catalog '{}' but was checked against '{}'",
                world.catalog_id(),
                catalog.id()
            ),
            is_error: true,
        });
    }

    for placed in world.tiles() {
        if catalog.tile(&placed.tile).is_none() {
            issues.push(ValidationIssue {
                position: Some(placed.position),
                message: unknown(
                    "tile",
                    placed.tile.as_str(),
                    catalog.suggest_tile(placed.tile.as_str()),
                ),
                is_error: true,
            });
        }
    }

    for placed in world.addons() {
        let Some(addon) = catalog.addon(&placed.addon) else {
            issues.push(ValidationIssue {
                position: Some(placed.position),
                message: unknown(
                    "addon",
                    placed.addon.as_str(),
                    catalog.suggest_addon(placed.addon.as_str()),
                ),
                is_error: true,
            });
            continue;
        };
        let Some(tile) = world.tile_at(placed.position) else {
            issues.push(ValidationIssue {
                position: Some(placed.position),
                message: format!("addon '{}' has no tile beneath it", placed.addon),
                is_error: true,
            });
            continue;
        };
        let Some(def) = catalog.tile(&tile.tile) else {
            continue;
        };
        if !addon.fits(def) {
            issues.push(ValidationIssue {
                position: Some(placed.position),
                message: tag_mismatch(&placed.addon, &tile.tile),
                is_error: true,
            });
        }
    }

    if world.is_empty() {
        issues.push(ValidationIssue {
            position: None,
            message: "world has no tiles".to_string(),
            is_error: false,
        });
    }

    issues
}

/// Fail on the first tile or addon id the catalog does not define.
///
/// Tiles are checked before addons, each in coordinate order.
pub fn check_references(world: &World, catalog: &Catalog) -> CatalogResult<()> {
    if let Some(placed) = world.tiles().find(|t| catalog.tile(&t.tile).is_none()) {
        return Err(CatalogError::UnresolvedReference {
            kind: "tile",
            id: placed.tile.to_string(),
            position: placed.position,
            suggestion: catalog.suggest_tile(placed.tile.as_str()),
        });
    }
    if let Some(placed) = world.addons().find(|a| catalog.addon(&a.addon).is_none()) {
        return Err(CatalogError::UnresolvedReference {
            kind: "addon",
            id: placed.addon.to_string(),
            position: placed.position,
            suggestion: catalog.suggest_addon(placed.addon.as_str()),
        });
    }
    Ok(())
}

fn unknown(kind: &str, id: &str, suggestion: Option<String>) -> String {
    match suggestion {
        Some(s) => format!("unknown {kind} '{id}' (did you mean '{s}'?)"),
        None => format!("unknown {kind} '{id}'"),
    }
}

fn tag_mismatch(addon: &AddonId, tile: &TileId) -> String {
    format!("addon '{addon}' requires tags that tile '{tile}' does not carry")
}
