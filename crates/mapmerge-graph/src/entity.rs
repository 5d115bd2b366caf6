//! Graph entities and their detached snapshots.

use mapmerge_core::{Coord, EntityId, EntityKind, EntityRef, TagMap};

/// A shareable point: coordinate plus tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: EntityId,
    pub coord: Coord,
    pub tags: TagMap,
}

impl Vertex {
    /// Creates a vertex with a freshly allocated identifier.
    pub fn new(coord: Coord, tags: TagMap) -> Self {
        Self {
            id: EntityId::next(),
            coord,
            tags,
        }
    }
}

/// Ordered sequence of vertex references. Vertices are shared, not owned.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub id: EntityId,
    pub vertices: Vec<EntityId>,
    pub tags: TagMap,
}

impl Polyline {
    pub fn new(vertices: Vec<EntityId>, tags: TagMap) -> Self {
        Self {
            id: EntityId::next(),
            vertices,
            tags,
        }
    }

    /// First and last reference name the same vertex.
    pub fn is_closed(&self) -> bool {
        self.vertices.len() >= 3 && self.vertices.first() == self.vertices.last()
    }

    pub fn references(&self, vertex: EntityId) -> bool {
        self.vertices.contains(&vertex)
    }
}

/// Aggregate of other entities. Only stored and moved around as a whole;
/// the conflation scripts refuse to touch it.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: EntityId,
    pub members: Vec<EntityRef>,
    pub tags: TagMap,
}

impl Group {
    pub fn new(members: Vec<EntityRef>, tags: TagMap) -> Self {
        Self {
            id: EntityId::next(),
            members,
            tags,
        }
    }
}

/// Detached, graph-independent copy of one entity's state.
///
/// Holds identifiers rather than references, so it can be inserted into a
/// different graph as long as the vertices (or members) it names are there.
#[derive(Debug, Clone, PartialEq)]
pub enum EntitySnapshot {
    Vertex(Vertex),
    Polyline(Polyline),
    Group(Group),
}

impl EntitySnapshot {
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Self::Vertex(v) => EntityRef::Vertex(v.id),
            Self::Polyline(p) => EntityRef::Polyline(p.id),
            Self::Group(g) => EntityRef::Group(g.id),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.entity_ref().kind()
    }

    pub fn tags(&self) -> &TagMap {
        match self {
            Self::Vertex(v) => &v.tags,
            Self::Polyline(p) => &p.tags,
            Self::Group(g) => &g.tags,
        }
    }
}

impl From<Vertex> for EntitySnapshot {
    fn from(v: Vertex) -> Self {
        Self::Vertex(v)
    }
}

impl From<Polyline> for EntitySnapshot {
    fn from(p: Polyline) -> Self {
        Self::Polyline(p)
    }
}

impl From<Group> for EntitySnapshot {
    fn from(g: Group) -> Self {
        Self::Group(g)
    }
}

/// Builds a tag map from `key, value` pairs.
pub fn tags<K, V, I>(pairs: I) -> TagMap
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
