//! Identifiers, coordinates and tag maps shared by every MapMerge crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Ordered tag mapping (`key=value`) carried by every entity.
pub type TagMap = BTreeMap<String, String>;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a vertex, polyline or group.
///
/// Identifiers come from a process-wide monotonic allocator, so they are
/// unique inside every graph and survive a move from one graph to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Allocates a fresh identifier.
    pub fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a graph entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Vertex,
    Polyline,
    Group,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Polyline => write!(f, "polyline"),
            Self::Group => write!(f, "group"),
        }
    }
}

/// Typed reference to an entity.
///
/// Ordering is by kind first, then by identifier. That order is the
/// iteration order of query results and selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "ref", rename_all = "lowercase")]
pub enum EntityRef {
    Vertex(EntityId),
    Polyline(EntityId),
    Group(EntityId),
}

impl EntityRef {
    pub fn id(self) -> EntityId {
        match self {
            Self::Vertex(id) | Self::Polyline(id) | Self::Group(id) => id,
        }
    }

    pub fn kind(self) -> EntityKind {
        match self {
            Self::Vertex(_) => EntityKind::Vertex,
            Self::Polyline(_) => EntityKind::Polyline,
            Self::Group(_) => EntityKind::Group,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Identifier of a layer inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Planar coordinate in projected distance units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    /// Creates a new coordinate.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculates the distance to another coordinate.
    pub fn distance_to(&self, other: &Coord) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}
