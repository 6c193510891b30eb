//! Axial hex coordinate math.
//!
//! Edges are numbered `0..=5` clockwise in screen space (r grows downward),
//! starting at east: E, SE, SW, W, NW, NE. Edge `e` of a cell touches edge
//! `opposite(e)` of the neighbor across it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StepOutOfRange;

/// Axial offsets of the six neighbors, indexed by edge.
const NEIGHBOR_OFFSETS: [(i32, i32); 6] = [(1, 0), (0, 1), (-1, 1), (-1, 0), (0, -1), (1, -1)];

/// Integer (q, r) address of a hex cell.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AxialCoord {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
}

impl AxialCoord {
    /// The origin cell, where generation of an empty world starts.
    pub const ORIGIN: AxialCoord = AxialCoord { q: 0, r: 0 };

    /// Create a coordinate.
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The cell across the given edge.
    pub fn neighbor(self, edge: Edge) -> AxialCoord {
        let (dq, dr) = NEIGHBOR_OFFSETS[edge.index()];
        AxialCoord::new(self.q + dq, self.r + dr)
    }

    /// All six neighbors, paired with the edge that leads to each.
    pub fn neighbors(self) -> impl Iterator<Item = (Edge, AxialCoord)> {
        Edge::ALL.into_iter().map(move |e| (e, self.neighbor(e)))
    }

    /// The edge of `self` that faces `other`, or `None` if the two cells
    /// are not adjacent.
    pub fn edge_to(self, other: AxialCoord) -> Option<Edge> {
        let delta = (other.q - self.q, other.r - self.r);
        NEIGHBOR_OFFSETS
            .iter()
            .position(|off| *off == delta)
            .map(|i| Edge(i as u8))
    }

    /// Hex distance, via cube coordinates (x = q, y = r, z = -q - r).
    pub fn distance(self, other: AxialCoord) -> u32 {
        let dx = (self.q - other.q).unsigned_abs();
        let dy = (self.r - other.r).unsigned_abs();
        let dz = ((self.q + self.r) - (other.q + other.r)).unsigned_abs();
        (dx + dy + dz) / 2
    }

    /// Every cell within `radius` steps of `self`, sorted by `(q, r)`.
    pub fn within_radius(self, radius: u32) -> Vec<AxialCoord> {
        let n = radius as i32;
        let mut cells = Vec::new();
        for dq in -n..=n {
            let lo = (-n).max(-dq - n);
            let hi = n.min(-dq + n);
            for dr in lo..=hi {
                cells.push(AxialCoord::new(self.q + dq, self.r + dr));
            }
        }
        cells
    }
}

impl fmt::Display for AxialCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

impl From<(i32, i32)> for AxialCoord {
    fn from((q, r): (i32, i32)) -> Self {
        Self::new(q, r)
    }
}

/// One of the six sides of a cell, `0..=5` clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Edge(u8);

impl Edge {
    /// All six edges in index order.
    pub const ALL: [Edge; 6] = [Edge(0), Edge(1), Edge(2), Edge(3), Edge(4), Edge(5)];

    /// Create an edge, rejecting values above 5.
    pub fn new(value: u8) -> Result<Self, StepOutOfRange> {
        if value < 6 {
            Ok(Self(value))
        } else {
            Err(StepOutOfRange {
                kind: "edge",
                value,
            })
        }
    }

    /// The edge index as a `usize`, for array access.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The edge on the far side: `(e + 3) mod 6`.
    pub fn opposite(self) -> Edge {
        Edge((self.0 + 3) % 6)
    }
}

impl TryFrom<u8> for Edge {
    type Error = StepOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Edge> for u8 {
    fn from(edge: Edge) -> u8 {
        edge.0
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A number of 60° clockwise turns, `0..=5`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rotation(u8);

impl Rotation {
    /// All six rotations in ascending order.
    pub const ALL: [Rotation; 6] = [
        Rotation(0),
        Rotation(1),
        Rotation(2),
        Rotation(3),
        Rotation(4),
        Rotation(5),
    ];

    /// Create a rotation, rejecting values above 5.
    pub fn new(steps: u8) -> Result<Self, StepOutOfRange> {
        if steps < 6 {
            Ok(Self(steps))
        } else {
            Err(StepOutOfRange {
                kind: "rotation",
                value: steps,
            })
        }
    }

    /// Number of clockwise steps.
    pub fn steps(self) -> u8 {
        self.0
    }

    /// The rotation that undoes this one: `(6 - k) mod 6`.
    pub fn inverse(self) -> Rotation {
        Rotation((6 - self.0) % 6)
    }

    /// Rotate a clockwise six-edge array: `rotated[i] = original[(i - k + 6) mod 6]`.
    pub fn apply<T: Clone>(self, edges: &[T; 6]) -> [T; 6] {
        let k = self.0 as usize;
        std::array::from_fn(|i| edges[(i + 6 - k) % 6].clone())
    }

    /// The original-array edge that ends up at `edge` after this rotation.
    pub fn source_edge(self, edge: Edge) -> Edge {
        Edge((edge.0 + 6 - self.0) % 6)
    }
}

impl TryFrom<u8> for Rotation {
    type Error = StepOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rotation> for u8 {
    fn from(rotation: Rotation) -> u8 {
        rotation.0
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
