use crate::hex::AxialCoord;

/// Alias for `Result<T, CatalogError>`.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Alias for `Result<T, MutationError>`.
pub type MutationResult<T> = Result<T, MutationError>;

/// A step value (edge index or rotation) outside `0..=5`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} out of range: {value} (expected 0-5)")]
pub struct StepOutOfRange {
    /// What the value was meant to be ("edge" or "rotation").
    pub kind: &'static str,
    /// The rejected value.
    pub value: u8,
}

/// Referential-integrity faults in a catalog. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog JSON could not be parsed.
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The catalog declares no tiles.
    #[error("catalog \"{0}\" declares no tiles")]
    NoTiles(String),

    /// Two definitions of the same kind share an id.
    #[error("duplicate {kind} id: \"{id}\"")]
    DuplicateId {
        /// The definition kind ("edge type", "tile", or "addon").
        kind: &'static str,
        /// The repeated id.
        id: String,
    },

    /// An edge type id that no edge type declares.
    #[error(
        "unknown edge type \"{id}\" referenced by {referrer}{}",
        suggestion_suffix(.suggestion)
    )]
    UnknownEdgeType {
        /// The unresolved edge type id.
        id: String,
        /// Which definition referenced it.
        referrer: String,
        /// Closest declared edge type id, if any is similar.
        suggestion: Option<String>,
    },

    /// A world refers to a tile or addon id the catalog does not define.
    #[error(
        "world places unknown {kind} \"{id}\" at {position}{}",
        suggestion_suffix(.suggestion)
    )]
    UnresolvedReference {
        /// What was referenced ("tile" or "addon").
        kind: &'static str,
        /// The unresolved id.
        id: String,
        /// Where the world places it.
        position: AxialCoord,
        /// Closest defined id, if any is similar.
        suggestion: Option<String>,
    },

    /// A tile that does not list exactly six edges.
    #[error("tile \"{tile}\" has {found} edges (expected 6)")]
    EdgeCount {
        /// The offending tile id.
        tile: String,
        /// Number of edges found.
        found: usize,
    },
}

/// Reasons a single world mutation is refused. The world is never changed
/// when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// A tile is already placed at the position.
    #[error("position {0} is already occupied")]
    Occupied(AxialCoord),

    /// No tile is placed at the position.
    #[error("no tile at {0}")]
    NoTile(AxialCoord),

    /// The tile id is not in the catalog.
    #[error("unknown tile \"{id}\"{}", suggestion_suffix(.suggestion))]
    UnknownTile {
        /// The unresolved tile id.
        id: String,
        /// Closest catalog tile id, if any is similar.
        suggestion: Option<String>,
    },

    /// The addon id is not in the catalog.
    #[error("unknown addon \"{id}\"{}", suggestion_suffix(.suggestion))]
    UnknownAddon {
        /// The unresolved addon id.
        id: String,
        /// Closest catalog addon id, if any is similar.
        suggestion: Option<String>,
    },

    /// The tile's tags share nothing with the addon's required tags.
    #[error("addon \"{addon}\" does not fit tile \"{tile}\" at {position}")]
    TagMismatch {
        /// Where the addon was requested.
        position: AxialCoord,
        /// The requested addon.
        addon: String,
        /// The tile placed at the position.
        tile: String,
    },

    /// An addon is already placed at the position.
    #[error("position {0} already has an addon")]
    AddonPresent(AxialCoord),

    /// No addon is placed at the position.
    #[error("no addon at {0}")]
    NoAddon(AxialCoord),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean \"{s}\"?)"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tile_mentions_suggestion() {
        let err = MutationError::UnknownTile {
            id: "gras".into(),
            suggestion: Some("grass".into()),
        };
        assert_eq!(
            err.to_string(),
            "unknown tile \"gras\" (did you mean \"grass\"?)"
        );
    }

    #[test]
    fn unknown_edge_without_suggestion() {
        let err = CatalogError::UnknownEdgeType {
            id: "lava".into(),
            referrer: "tile \"volcano\"".into(),
            suggestion: None,
        };
        assert_eq!(
            err.to_string(),
            "unknown edge type \"lava\" referenced by tile \"volcano\""
        );
    }

    #[test]
    fn unresolved_reference_names_position() {
        let err = CatalogError::UnresolvedReference {
            kind: "addon",
            id: "tre".into(),
            position: AxialCoord::new(2, -1),
            suggestion: Some("tree".into()),
        };
        assert_eq!(
            err.to_string(),
            "world places unknown addon \"tre\" at (2, -1) (did you mean \"tree\"?)"
        );
    }
}
