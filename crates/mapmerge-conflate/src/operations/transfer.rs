use super::reject_groups;
use mapmerge_core::{EntityId, EntityRef, GraphError, LayerId, OperationError, Result};
use mapmerge_graph::{AddEntities, CompositeCommand, DeleteEntities, GraphCommand, Workspace};
use std::collections::BTreeSet;
use tracing::debug;

/// Moves points and polylines from `source` to `dest`, keeping identifiers.
///
/// Every vertex of a moved polyline moves along. A vertex that something
/// outside the moved set still uses is copied to `dest` and left in place in
/// `source`. Groups, and polylines or points that belong to a group, are
/// refused before anything is built. Returns `None` for an empty input.
pub fn build_transfer(
    ws: &Workspace,
    source: LayerId,
    dest: LayerId,
    entities: &BTreeSet<EntityRef>,
) -> Result<Option<CompositeCommand>> {
    if source == dest {
        return Err(OperationError::SameLayer { layer: source }.into());
    }
    let src = ws.graph(source)?;
    let dst = ws.graph(dest)?;
    if entities.is_empty() {
        return Ok(None);
    }
    reject_groups(entities)?;

    let mut polylines: BTreeSet<EntityId> = BTreeSet::new();
    let mut vertices: BTreeSet<EntityId> = BTreeSet::new();
    for entity in entities {
        if !src.contains(*entity) {
            return Err(GraphError::EntityNotFound { entity: *entity }.into());
        }
        if let Some(group) = src
            .referrers(*entity)
            .into_iter()
            .find(|r| matches!(r, EntityRef::Group(_)))
        {
            return Err(OperationError::UnsupportedEntity { entity: group }.into());
        }
        match entity {
            EntityRef::Polyline(id) => {
                polylines.insert(*id);
                if let Some(p) = src.polyline(*id) {
                    vertices.extend(p.vertices.iter().copied());
                }
            }
            EntityRef::Vertex(id) => {
                vertices.insert(*id);
            }
            EntityRef::Group(_) => {}
        }
    }

    // Vertices used only by moved polylines leave the source
    let (movable, shared): (Vec<EntityId>, Vec<EntityId>) =
        vertices.iter().partition(|id| {
            src.referrers(EntityRef::Vertex(**id))
                .iter()
                .all(|r| matches!(r, EntityRef::Polyline(p) if polylines.contains(p)))
        });
    if !shared.is_empty() {
        debug!(count = shared.len(), "shared vertices copied, kept in source");
    }

    let vertex_snapshots: Vec<_> = vertices
        .iter()
        .filter(|id| !dst.contains(EntityRef::Vertex(**id)))
        .filter_map(|id| src.snapshot(EntityRef::Vertex(*id)))
        .collect();
    let polyline_snapshots: Vec<_> = polylines
        .iter()
        .filter_map(|id| src.snapshot(EntityRef::Polyline(*id)))
        .collect();

    let mut commands: Vec<GraphCommand> = Vec::new();
    if !polylines.is_empty() {
        let refs = polylines.iter().map(|id| EntityRef::Polyline(*id)).collect();
        commands.push(DeleteEntities::new(source, refs).into());
    }
    if !movable.is_empty() {
        let refs = movable.into_iter().map(EntityRef::Vertex).collect();
        commands.push(DeleteEntities::new(source, refs).into());
    }
    if !vertex_snapshots.is_empty() {
        commands.push(AddEntities::new(dest, vertex_snapshots).into());
    }
    if !polyline_snapshots.is_empty() {
        commands.push(AddEntities::new(dest, polyline_snapshots).into());
    }

    debug!(
        polylines = polylines.len(),
        vertices = vertices.len(),
        "transfer built"
    );
    Ok(Some(CompositeCommand::new("Transfer", commands)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapmerge_core::{Coord, TagMap};
    use mapmerge_graph::{tags, Graph};

    fn square(graph: &mut Graph, x0: f64) -> (EntityRef, Vec<EntityId>) {
        let ids: Vec<EntityId> = [(x0, 0.0), (x0 + 1.0, 0.0), (x0 + 1.0, 1.0), (x0, 1.0)]
            .iter()
            .map(|(x, y)| graph.add_vertex(Coord::new(*x, *y), TagMap::new()).id())
            .collect();
        let mut refs = ids.clone();
        refs.push(ids[0]);
        (graph.add_polyline(refs, tags([("building", "yes")])).unwrap(), ids)
    }

    fn two_layers(source: Graph) -> (Workspace, LayerId, LayerId) {
        let mut ws = Workspace::new();
        let src = ws.add_layer("import", source);
        let dst = ws.add_layer("osm", Graph::new());
        (ws, src, dst)
    }

    #[test]
    fn test_transfer_moves_polyline_with_vertices() {
        let mut graph = Graph::new();
        let (way, ids) = square(&mut graph, 0.0);
        let (mut ws, src, dst) = two_layers(graph);
        let mut cmd = build_transfer(&ws, src, dst, &[way].into_iter().collect())
            .unwrap()
            .unwrap();
        assert_eq!(cmd.len(), 4);
        cmd.apply(&mut ws).unwrap();
        assert!(ws.graph(src).unwrap().is_empty());
        let dest = ws.graph(dst).unwrap();
        assert!(dest.contains(way));
        assert!(ids.iter().all(|id| dest.contains(EntityRef::Vertex(*id))));
    }

    #[test]
    fn test_shared_vertex_stays_in_source() {
        let mut graph = Graph::new();
        let (way, ids) = square(&mut graph, 0.0);
        let far = graph.add_vertex(Coord::new(5.0, 5.0), TagMap::new()).id();
        let road = graph.add_polyline(vec![ids[1], far], tags([("highway", "service")])).unwrap();
        let (mut ws, src, dst) = two_layers(graph);

        let mut cmd = build_transfer(&ws, src, dst, &[way].into_iter().collect())
            .unwrap()
            .unwrap();
        cmd.apply(&mut ws).unwrap();
        let source = ws.graph(src).unwrap();
        assert!(source.contains(road));
        assert!(source.contains(EntityRef::Vertex(ids[1])));
        assert!(!source.contains(EntityRef::Vertex(ids[0])));
        assert!(ws.graph(dst).unwrap().contains(EntityRef::Vertex(ids[1])));
    }

    #[test]
    fn test_group_member_is_refused() {
        let mut graph = Graph::new();
        let (way, _) = square(&mut graph, 0.0);
        let group = graph.add_group(vec![way], tags([("type", "multipolygon")])).unwrap();
        let (ws, src, dst) = two_layers(graph);

        let err = build_transfer(&ws, src, dst, &[way].into_iter().collect()).unwrap_err();
        assert!(err.is_unsupported_entity());
        let err = build_transfer(&ws, src, dst, &[group].into_iter().collect()).unwrap_err();
        assert!(err.is_unsupported_entity());
    }

    #[test]
    fn test_empty_and_same_layer() {
        let (ws, src, dst) = two_layers(Graph::new());
        assert!(build_transfer(&ws, src, dst, &BTreeSet::new()).unwrap().is_none());
        assert!(build_transfer(&ws, src, src, &BTreeSet::new()).is_err());
    }
}
