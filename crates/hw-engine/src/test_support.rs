//! Fixtures shared by the unit tests of this crate and of `hw-gen`.
//!
//! Compiled for this crate's own tests and, for downstream crates, behind
//! the `test-support` feature.

use hw_core::{
    AddonDefinition, AddonId, AxialCoord, Catalog, CatalogFile, Edge, EdgeType, Rotation,
    TilePlacement, TileSpec, Transform, World, WorldMutator,
};

/// Shorthand for an axial coordinate.
pub fn at(q: i32, r: i32) -> AxialCoord {
    AxialCoord::new(q, r)
}

/// Shorthand for a rotation; panics outside `0..=5`.
pub fn rot(k: u8) -> Rotation {
    Rotation::new(k).unwrap()
}

/// `grass:[grass x6]` and `road:[road,grass,grass,grass,grass,road]`; grass
/// and road are only compatible with themselves. Trees need a `nature` tile.
pub fn road_catalog() -> Catalog {
    Catalog::new(CatalogFile {
        id: "roads".into(),
        edge_types: vec![EdgeType::new("grass", &[]), EdgeType::new("road", &[])],
        tiles: vec![
            TileSpec::new("grass", &["grass"; 6], &["nature"]),
            TileSpec::new(
                "road",
                &["road", "grass", "grass", "grass", "grass", "road"],
                &["urban"],
            ),
        ],
        addons: vec![AddonDefinition {
            id: AddonId::from("tree"),
            required_tags: ["nature".to_string()].into(),
            transform: Transform::default(),
        }],
    })
    .unwrap()
}

/// Place a tile without checking edges.
pub fn place(catalog: &Catalog, world: &mut World, (q, r): (i32, i32), tile: &str, k: u8) {
    WorldMutator::new(world, catalog)
        .add_tile(&TilePlacement::new(at(q, r), tile, rot(k)))
        .unwrap();
}

/// Ring of six around the origin; the neighbors on edges 0, 2 and 4 face
/// back with road, the rest with grass. No tile has three non-adjacent
/// road edges, so the origin is unpopulatable.
pub fn enclosed_world(catalog: &Catalog) -> World {
    let mut world = World::new(catalog.id());
    for edge in Edge::ALL {
        let pos = AxialCoord::ORIGIN.neighbor(edge);
        if edge.index() % 2 == 0 {
            place(catalog, &mut world, (pos.q, pos.r), "road", u8::from(edge.opposite()));
        } else {
            place(catalog, &mut world, (pos.q, pos.r), "grass", 0);
        }
    }
    world
}
