//! Spatial association of point features with closed polylines.
//!
//! Points are matched to containers in two passes. The containment pass
//! claims every point that lies inside a container; the proximity pass then
//! assigns each remaining point to its nearest container, provided that
//! container is closer than the distance threshold. Containers and points are
//! visited in ascending identifier order and the first of several equally
//! near containers wins.

use mapmerge_core::geometry::{distance_point_to_polyline, point_in_polygon, polygon_intersection};
use mapmerge_core::{Coord, EntityRef};
use mapmerge_graph::Graph;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// How a point got attached to its container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    /// The point lies inside the container
    Contained,
    /// Nearest container, at the given distance
    Nearest(f64),
}

/// Result of [`associate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Association {
    /// Points attached to each container, in visiting order
    pub by_container: BTreeMap<EntityRef, Vec<EntityRef>>,
    /// Container and match kind of every associated point
    pub matches: BTreeMap<EntityRef, (EntityRef, MatchKind)>,
    /// Points that found no container
    pub unassociated: Vec<EntityRef>,
}

impl Association {
    fn attach(&mut self, container: EntityRef, point: EntityRef, kind: MatchKind) {
        self.by_container.entry(container).or_default().push(point);
        self.matches.insert(point, (container, kind));
    }

    /// `(point, container)` pairs of containers that received exactly one
    /// point.
    pub fn eligible(&self) -> impl Iterator<Item = (EntityRef, EntityRef)> + '_ {
        self.by_container
            .iter()
            .filter(|(_, points)| points.len() == 1)
            .map(|(container, points)| (points[0], *container))
    }

    pub fn container_of(&self, point: EntityRef) -> Option<EntityRef> {
        self.matches.get(&point).map(|(c, _)| *c)
    }

    pub fn match_kind(&self, point: EntityRef) -> Option<MatchKind> {
        self.matches.get(&point).map(|(_, k)| *k)
    }
}

/// Whether `candidate` in `graph` overlaps any of `members` in `other`.
///
/// Only polylines take part; anything else never intersects.
pub fn any_intersects(
    graph: &Graph,
    candidate: EntityRef,
    other: &Graph,
    members: &BTreeSet<EntityRef>,
    tolerance: f64,
) -> bool {
    let Some(coords) = polyline_coords(graph, candidate) else {
        return false;
    };
    let Some(bbox) = graph.bbox(candidate) else {
        return false;
    };
    members.iter().any(|member| {
        if !other.bbox(*member).is_some_and(|b| b.intersects(&bbox)) {
            return false;
        }
        let Some(member_coords) = polyline_coords(other, *member) else {
            return false;
        };
        let hit = !polygon_intersection(&coords, &member_coords, tolerance).is_outside();
        if hit {
            debug!(%candidate, %member, "candidate intersects existing feature");
        }
        hit
    })
}

/// Associates standalone points with closed polylines of the same graph.
///
/// Entries of `points` that are not standalone vertices, and entries of
/// `containers` that are not closed polylines, are ignored.
pub fn associate(
    graph: &Graph,
    points: &BTreeSet<EntityRef>,
    containers: &BTreeSet<EntityRef>,
    max_distance: f64,
) -> Association {
    let points: Vec<(EntityRef, Coord)> = points
        .iter()
        .filter_map(|p| standalone_coord(graph, *p).map(|c| (*p, c)))
        .collect();
    let containers: Vec<(EntityRef, Vec<Coord>)> = containers
        .iter()
        .filter(|c| matches!(c, EntityRef::Polyline(id) if graph.is_closed(*id)))
        .filter_map(|c| polyline_coords(graph, *c).map(|coords| (*c, coords)))
        .collect();

    let mut result = Association::default();
    let mut unmatched: BTreeSet<EntityRef> = points.iter().map(|(p, _)| *p).collect();

    for (container, ring) in &containers {
        for (point, coord) in &points {
            if unmatched.contains(point) && point_in_polygon(coord, ring) {
                debug!(%point, %container, "point inside container");
                result.attach(*container, *point, MatchKind::Contained);
                unmatched.remove(point);
            }
        }
    }

    for (point, coord) in points.iter().filter(|(p, _)| unmatched.contains(p)) {
        let mut nearest: Option<(EntityRef, f64)> = None;
        for (container, ring) in &containers {
            let distance = distance_point_to_polyline(coord, ring);
            if nearest.is_none_or(|(_, best)| distance < best) {
                nearest = Some((*container, distance));
            }
        }
        match nearest {
            Some((container, distance)) if distance < max_distance => {
                debug!(%point, %container, distance, "point near container");
                result.attach(container, *point, MatchKind::Nearest(distance));
            }
            _ => {
                debug!(%point, "point left unassociated");
                result.unassociated.push(*point);
            }
        }
    }

    result
}

fn polyline_coords(graph: &Graph, entity: EntityRef) -> Option<Vec<Coord>> {
    match entity {
        EntityRef::Polyline(id) => graph.polyline_coords(id),
        _ => None,
    }
}

fn standalone_coord(graph: &Graph, entity: EntityRef) -> Option<Coord> {
    match entity {
        EntityRef::Vertex(id) if !graph.is_referenced(entity) => graph.coord(id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapmerge_core::{EntityId, TagMap};
    use mapmerge_graph::tags;

    fn square(graph: &mut Graph, x0: f64, y0: f64, size: f64) -> EntityRef {
        let corners = [(x0, y0), (x0 + size, y0), (x0 + size, y0 + size), (x0, y0 + size)];
        let ids: Vec<EntityId> = corners
            .iter()
            .map(|(x, y)| graph.add_vertex(Coord::new(*x, *y), TagMap::new()).id())
            .collect();
        let mut refs = ids.clone();
        refs.push(ids[0]);
        graph.add_polyline(refs, tags([("building", "yes")])).unwrap()
    }

    fn point(graph: &mut Graph, x: f64, y: f64) -> EntityRef {
        graph.add_vertex(Coord::new(x, y), tags([("addr:housenumber", "1")]))
    }

    fn set(items: &[EntityRef]) -> BTreeSet<EntityRef> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_contained_point_never_uses_distance_pass() {
        let mut graph = Graph::new();
        let a = square(&mut graph, 0.0, 0.0, 10.0);
        // Also within reach of b
        let b = square(&mut graph, 10.5, 0.0, 10.0);
        let p = point(&mut graph, 9.8, 5.0);
        let result = associate(&graph, &set(&[p]), &set(&[a, b]), 12.0);
        assert_eq!(result.container_of(p), Some(a));
        assert_eq!(result.match_kind(p), Some(MatchKind::Contained));
    }

    #[test]
    fn test_far_point_stays_unassociated() {
        let mut graph = Graph::new();
        let a = square(&mut graph, 0.0, 0.0, 10.0);
        let near = point(&mut graph, 21.0, 5.0);
        let edge = point(&mut graph, 22.0, 5.0);
        let result = associate(&graph, &set(&[near, edge]), &set(&[a]), 12.0);
        assert_eq!(result.match_kind(near), Some(MatchKind::Nearest(11.0)));
        // Exactly at the threshold is not close enough
        assert_eq!(result.unassociated, vec![edge]);
    }

    #[test]
    fn test_tie_goes_to_first_container() {
        let mut graph = Graph::new();
        let a = square(&mut graph, 0.0, 0.0, 10.0);
        let b = square(&mut graph, 20.0, 0.0, 10.0);
        let p = point(&mut graph, 15.0, 5.0);
        let result = associate(&graph, &set(&[p]), &set(&[b, a]), 12.0);
        assert_eq!(result.container_of(p), Some(a));
    }

    #[test]
    fn test_only_single_point_containers_are_eligible() {
        let mut graph = Graph::new();
        let a = square(&mut graph, 0.0, 0.0, 10.0);
        let b = square(&mut graph, 100.0, 0.0, 10.0);
        let p1 = point(&mut graph, 2.0, 2.0);
        let p2 = point(&mut graph, 8.0, 8.0);
        let p3 = point(&mut graph, 105.0, 5.0);
        let result = associate(&graph, &set(&[p1, p2, p3]), &set(&[a, b]), 12.0);
        assert_eq!(result.by_container[&a], vec![p1, p2]);
        assert_eq!(result.eligible().collect::<Vec<_>>(), vec![(p3, b)]);
    }

    #[test]
    fn test_polyline_vertices_are_not_points() {
        let mut graph = Graph::new();
        let a = square(&mut graph, 0.0, 0.0, 10.0);
        let corner = graph.polyline(a.id()).unwrap().vertices[0];
        let result = associate(&graph, &set(&[EntityRef::Vertex(corner)]), &set(&[a]), 12.0);
        assert!(result.matches.is_empty());
        assert!(result.unassociated.is_empty());
    }

    #[test]
    fn test_any_intersects_across_graphs() {
        let mut source = Graph::new();
        let candidate = square(&mut source, 0.0, 0.0, 10.0);
        let mut dest = Graph::new();
        let overlapping = square(&mut dest, 5.0, 5.0, 10.0);
        let touching = square(&mut dest, 10.0, 0.0, 10.0);
        let far = square(&mut dest, 50.0, 50.0, 10.0);

        assert!(any_intersects(&source, candidate, &dest, &set(&[far, overlapping]), 1e-4));
        assert!(!any_intersects(&source, candidate, &dest, &set(&[touching, far]), 1e-4));
        assert!(!any_intersects(&source, candidate, &dest, &BTreeSet::new(), 1e-4));
    }
}
