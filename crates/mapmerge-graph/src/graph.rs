//! Mutable feature graph.
//!
//! Vertices, polylines and groups live in separate arenas keyed by
//! [`EntityId`]. Polylines hold vertex identifiers and groups hold member
//! references; nothing owns anything else. Whether an entity is still in use
//! is answered by scanning for referrers, so removal can refuse instead of
//! leaving a dangling reference behind.
//!
//! All state changes of the edit engine end up in the handful of `&mut self`
//! methods here; commands only sequence calls into them.

use crate::entity::{EntitySnapshot, Group, Polyline, Vertex};
use mapmerge_core::geometry::BBox;
use mapmerge_core::{Coord, EntityId, EntityRef, GraphError, GraphResult, TagMap};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct Graph {
    origin: Option<String>,
    vertices: BTreeMap<EntityId, Vertex>,
    polylines: BTreeMap<EntityId, Polyline>,
    groups: BTreeMap<EntityId, Group>,
    selection: BTreeSet<EntityRef>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty graph whose data comes from `origin`.
    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
            ..Self::default()
        }
    }

    /// Provenance of the backing data source.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    // ---- creation -------------------------------------------------------

    pub fn add_vertex(&mut self, coord: Coord, tags: TagMap) -> EntityRef {
        let vertex = Vertex::new(coord, tags);
        let entity = EntityRef::Vertex(vertex.id);
        self.vertices.insert(vertex.id, vertex);
        trace!(%entity, "vertex added");
        entity
    }

    pub fn add_polyline(&mut self, vertices: Vec<EntityId>, tags: TagMap) -> GraphResult<EntityRef> {
        self.insert(Polyline::new(vertices, tags).into())
    }

    pub fn add_group(&mut self, members: Vec<EntityRef>, tags: TagMap) -> GraphResult<EntityRef> {
        self.insert(Group::new(members, tags).into())
    }

    /// Re-creates an entity from a detached snapshot, keeping its identifier.
    pub fn insert(&mut self, snapshot: EntitySnapshot) -> GraphResult<EntityRef> {
        let entity = snapshot.entity_ref();
        if self.contains_id(entity.id()) {
            return Err(GraphError::DuplicateEntity { entity });
        }
        match snapshot {
            EntitySnapshot::Vertex(v) => {
                self.vertices.insert(v.id, v);
            }
            EntitySnapshot::Polyline(p) => {
                if p.vertices.is_empty() {
                    return Err(GraphError::EmptyPolyline { polyline: entity });
                }
                if let Some(missing) = p.vertices.iter().find(|v| !self.vertices.contains_key(v)) {
                    return Err(GraphError::MissingVertex {
                        polyline: entity,
                        vertex: EntityRef::Vertex(*missing),
                    });
                }
                self.polylines.insert(p.id, p);
            }
            EntitySnapshot::Group(g) => {
                if let Some(missing) = g.members.iter().find(|m| !self.contains(**m)) {
                    return Err(GraphError::MissingMember {
                        group: entity,
                        member: *missing,
                    });
                }
                self.groups.insert(g.id, g);
            }
        }
        trace!(%entity, "entity inserted");
        Ok(entity)
    }

    // ---- deletion -------------------------------------------------------

    /// Removes an entity that nothing references any more.
    ///
    /// Returns the snapshot needed to put it back. The entity also leaves the
    /// selection.
    pub fn remove(&mut self, entity: EntityRef) -> GraphResult<EntitySnapshot> {
        if !self.contains(entity) {
            return Err(GraphError::EntityNotFound { entity });
        }
        if let Some(referrer) = self.referrers(entity).into_iter().next() {
            return Err(GraphError::EntityInUse { entity, referrer });
        }
        let snapshot = match entity {
            EntityRef::Vertex(id) => self.vertices.remove(&id).map(EntitySnapshot::Vertex),
            EntityRef::Polyline(id) => self.polylines.remove(&id).map(EntitySnapshot::Polyline),
            EntityRef::Group(id) => self.groups.remove(&id).map(EntitySnapshot::Group),
        }
        .ok_or(GraphError::EntityNotFound { entity })?;
        self.selection.remove(&entity);
        trace!(%entity, "entity removed");
        Ok(snapshot)
    }

    // ---- lookup ---------------------------------------------------------

    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Vertex(id) => self.vertices.contains_key(&id),
            EntityRef::Polyline(id) => self.polylines.contains_key(&id),
            EntityRef::Group(id) => self.groups.contains_key(&id),
        }
    }

    pub fn contains_id(&self, id: EntityId) -> bool {
        self.resolve(id).is_some()
    }

    /// Typed reference for a bare identifier.
    pub fn resolve(&self, id: EntityId) -> Option<EntityRef> {
        if self.vertices.contains_key(&id) {
            Some(EntityRef::Vertex(id))
        } else if self.polylines.contains_key(&id) {
            Some(EntityRef::Polyline(id))
        } else if self.groups.contains_key(&id) {
            Some(EntityRef::Group(id))
        } else {
            None
        }
    }

    pub fn vertex(&self, id: EntityId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    pub fn polyline(&self, id: EntityId) -> Option<&Polyline> {
        self.polylines.get(&id)
    }

    pub fn group(&self, id: EntityId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    pub fn polylines(&self) -> impl Iterator<Item = &Polyline> {
        self.polylines.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Every entity, in [`EntityRef`] order.
    pub fn entities(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.vertices
            .keys()
            .map(|id| EntityRef::Vertex(*id))
            .chain(self.polylines.keys().map(|id| EntityRef::Polyline(*id)))
            .chain(self.groups.keys().map(|id| EntityRef::Group(*id)))
    }

    pub fn len(&self) -> usize {
        self.vertices.len() + self.polylines.len() + self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full detached copy of an entity's current state.
    pub fn snapshot(&self, entity: EntityRef) -> Option<EntitySnapshot> {
        match entity {
            EntityRef::Vertex(id) => self.vertices.get(&id).cloned().map(EntitySnapshot::Vertex),
            EntityRef::Polyline(id) => self.polylines.get(&id).cloned().map(EntitySnapshot::Polyline),
            EntityRef::Group(id) => self.groups.get(&id).cloned().map(EntitySnapshot::Group),
        }
    }

    // ---- tags -----------------------------------------------------------

    pub fn tags(&self, entity: EntityRef) -> Option<&TagMap> {
        match entity {
            EntityRef::Vertex(id) => self.vertices.get(&id).map(|v| &v.tags),
            EntityRef::Polyline(id) => self.polylines.get(&id).map(|p| &p.tags),
            EntityRef::Group(id) => self.groups.get(&id).map(|g| &g.tags),
        }
    }

    /// Swaps in a new tag map and returns the previous one.
    pub fn replace_tags(&mut self, entity: EntityRef, tags: TagMap) -> GraphResult<TagMap> {
        let slot = match entity {
            EntityRef::Vertex(id) => self.vertices.get_mut(&id).map(|v| &mut v.tags),
            EntityRef::Polyline(id) => self.polylines.get_mut(&id).map(|p| &mut p.tags),
            EntityRef::Group(id) => self.groups.get_mut(&id).map(|g| &mut g.tags),
        }
        .ok_or(GraphError::EntityNotFound { entity })?;
        Ok(std::mem::replace(slot, tags))
    }

    // ---- topology -------------------------------------------------------

    /// Polylines and groups that still reference `entity`.
    pub fn referrers(&self, entity: EntityRef) -> Vec<EntityRef> {
        let mut out = Vec::new();
        if let EntityRef::Vertex(id) = entity {
            out.extend(
                self.polylines
                    .values()
                    .filter(|p| p.references(id))
                    .map(|p| EntityRef::Polyline(p.id)),
            );
        }
        out.extend(
            self.groups
                .values()
                .filter(|g| g.members.contains(&entity))
                .map(|g| EntityRef::Group(g.id)),
        );
        out
    }

    pub fn is_referenced(&self, entity: EntityRef) -> bool {
        !self.referrers(entity).is_empty()
    }

    /// Vertices that become garbage once `polylines` are gone: untagged and
    /// referenced by nothing outside that set.
    pub fn orphaned_vertices(&self, polylines: &BTreeSet<EntityId>) -> Vec<EntityId> {
        let candidates: BTreeSet<EntityId> = polylines
            .iter()
            .filter_map(|id| self.polylines.get(id))
            .flat_map(|p| p.vertices.iter().copied())
            .collect();
        candidates
            .into_iter()
            .filter(|id| {
                self.vertices.get(id).is_some_and(|v| v.tags.is_empty())
                    && self.referrers(EntityRef::Vertex(*id)).iter().all(|r| match r {
                        EntityRef::Polyline(p) => polylines.contains(p),
                        _ => false,
                    })
            })
            .collect()
    }

    // ---- geometry -------------------------------------------------------

    pub fn coord(&self, vertex: EntityId) -> Option<Coord> {
        self.vertices.get(&vertex).map(|v| v.coord)
    }

    /// Coordinates of a polyline's vertices, in order.
    pub fn polyline_coords(&self, polyline: EntityId) -> Option<Vec<Coord>> {
        let p = self.polylines.get(&polyline)?;
        p.vertices.iter().map(|v| self.coord(*v)).collect()
    }

    pub fn is_closed(&self, polyline: EntityId) -> bool {
        self.polylines.get(&polyline).is_some_and(Polyline::is_closed)
    }

    pub fn bbox(&self, entity: EntityRef) -> Option<BBox> {
        match entity {
            EntityRef::Vertex(id) => self.coord(id).and_then(|c| BBox::from_coords(&[c])),
            EntityRef::Polyline(id) => BBox::from_coords(&self.polyline_coords(id)?),
            EntityRef::Group(id) => self
                .groups
                .get(&id)?
                .members
                .iter()
                .filter(|m| m.kind() != mapmerge_core::EntityKind::Group)
                .filter_map(|m| self.bbox(*m))
                .reduce(|a, b| a.union(&b)),
        }
    }

    // ---- selection ------------------------------------------------------

    pub fn selection(&self) -> &BTreeSet<EntityRef> {
        &self.selection
    }

    pub fn is_selected(&self, entity: EntityRef) -> bool {
        self.selection.contains(&entity)
    }

    /// Replaces the selection and returns the previous one.
    ///
    /// Every entity must be present; on error the selection is unchanged.
    pub fn set_selection<I>(&mut self, entities: I) -> GraphResult<BTreeSet<EntityRef>>
    where
        I: IntoIterator<Item = EntityRef>,
    {
        let next: BTreeSet<EntityRef> = entities.into_iter().collect();
        if let Some(missing) = next.iter().find(|e| !self.contains(**e)) {
            return Err(GraphError::EntityNotFound { entity: *missing });
        }
        Ok(std::mem::replace(&mut self.selection, next))
    }
}
