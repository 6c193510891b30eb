//! Edge types and the compatibility relation between them.
//!
//! Authors declare compatibility in one direction (`compatible_with`), but
//! the engine only ever uses the symmetric closure: `a ~ b` iff `a == b`,
//! `a` declares `b`, or `b` declares `a`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::suggest::closest_match;

/// Identifier of an edge type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeTypeId(pub String);

impl EdgeTypeId {
    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeTypeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An edge type as authored in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeType {
    /// Unique id.
    pub id: EdgeTypeId,
    /// Edge types this one declares itself compatible with.
    #[serde(default)]
    pub compatible_with: Vec<EdgeTypeId>,
}

impl EdgeType {
    /// Create an edge type with its declared compatibility list.
    pub fn new(id: &str, compatible_with: &[&str]) -> Self {
        Self {
            id: EdgeTypeId::from(id),
            compatible_with: compatible_with.iter().map(|s| EdgeTypeId::from(*s)).collect(),
        }
    }

    /// Whether this type lists `other` in its own declarations.
    pub fn declares(&self, other: &EdgeTypeId) -> bool {
        self.compatible_with.contains(other)
    }
}

/// Symmetric compatibility between two authored edge types.
pub fn declared_compatible(a: &EdgeType, b: &EdgeType) -> bool {
    a.id == b.id || a.declares(&b.id) || b.declares(&a.id)
}

/// Dense index of an edge type inside an [`EdgeModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(u32);

impl EdgeKey {
    /// The dense index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Precomputed compatibility matrix over every declared edge type.
///
/// Built once per catalog. Lookups by [`EdgeKey`] are a single indexed read.
#[derive(Debug, Clone)]
pub struct EdgeModel {
    ids: Vec<EdgeTypeId>,
    index: HashMap<EdgeTypeId, EdgeKey>,
    matrix: Vec<bool>,
}

impl EdgeModel {
    /// Build the matrix, rejecting duplicate ids and declarations that name
    /// undeclared types.
    pub fn new(types: &[EdgeType]) -> CatalogResult<Self> {
        let mut index = HashMap::with_capacity(types.len());
        for (i, ty) in types.iter().enumerate() {
            if index.insert(ty.id.clone(), EdgeKey(i as u32)).is_some() {
                return Err(CatalogError::DuplicateId {
                    kind: "edge type",
                    id: ty.id.to_string(),
                });
            }
        }

        for ty in types {
            for target in &ty.compatible_with {
                if !index.contains_key(target) {
                    return Err(CatalogError::UnknownEdgeType {
                        id: target.to_string(),
                        referrer: format!("edge type \"{}\"", ty.id),
                        suggestion: closest_match(
                            target.as_str(),
                            types.iter().map(|t| t.id.as_str()),
                        ),
                    });
                }
            }
        }

        let n = types.len();
        let mut matrix = vec![false; n * n];
        for (i, a) in types.iter().enumerate() {
            for (j, b) in types.iter().enumerate() {
                matrix[i * n + j] = declared_compatible(a, b);
            }
        }

        Ok(Self {
            ids: types.iter().map(|t| t.id.clone()).collect(),
            index,
            matrix,
        })
    }

    /// Number of edge types.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the model has no edge types.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolve an id to its dense key.
    pub fn key(&self, id: &EdgeTypeId) -> Option<EdgeKey> {
        self.index.get(id).copied()
    }

    /// The id behind a key.
    pub fn id(&self, key: EdgeKey) -> &EdgeTypeId {
        &self.ids[key.index()]
    }

    /// All declared ids in declaration order.
    pub fn ids(&self) -> &[EdgeTypeId] {
        &self.ids
    }

    /// O(1) compatibility check.
    pub fn compatible(&self, a: EdgeKey, b: EdgeKey) -> bool {
        self.matrix[a.index() * self.ids.len() + b.index()]
    }

    /// Compatibility by id. Identical ids are always compatible; an
    /// undeclared id is compatible with nothing else.
    pub fn are_compatible(&self, a: &EdgeTypeId, b: &EdgeTypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.key(a), self.key(b)) {
            (Some(ka), Some(kb)) => self.compatible(ka, kb),
            _ => false,
        }
    }
}
