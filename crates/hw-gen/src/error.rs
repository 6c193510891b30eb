//! Error types for generation sessions.

use thiserror::Error;

use hw_core::CatalogError;

/// Result type for generation operations.
pub type GenResult<T> = Result<T, GenError>;

/// Errors that can occur while setting up or driving a generation session.
#[derive(Debug, Error)]
pub enum GenError {
    /// The catalog failed to load or validate.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The starting world is bound to a different catalog.
    #[error("world is bound to catalog '{world}', session uses '{catalog}'")]
    CatalogMismatch {
        /// Catalog id stored in the world.
        world: String,
        /// Catalog id of the session.
        catalog: String,
    },

    /// The oracle could not be reached or gave up.
    #[error("oracle failed: {0}")]
    Oracle(String),

    /// The oracle answered with something that is not a decision.
    #[error("malformed decision: {0}")]
    MalformedDecision(#[from] serde_json::Error),
}
