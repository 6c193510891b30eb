pub mod check;
pub mod generate;

use std::fs;
use std::path::Path;

use hw_core::{Catalog, World, WorldSnapshot};

/// Read and validate a catalog file.
fn load_catalog(path: &Path) -> Result<Catalog, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read catalog '{}': {e}", path.display()))?;
    Catalog::from_json(&text).map_err(|e| format!("{}: {e}", path.display()))
}

/// Read a world snapshot file. The world is not checked against any catalog.
fn load_world(path: &Path) -> Result<World, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read world '{}': {e}", path.display()))?;
    let snapshot: WorldSnapshot =
        serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(World::from_snapshot(snapshot))
}
