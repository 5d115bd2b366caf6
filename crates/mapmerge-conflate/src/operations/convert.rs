use super::{build_delete, reject_groups};
use mapmerge_core::geometry::centroid;
use mapmerge_core::{EntityRef, LayerId, Result};
use mapmerge_graph::{AddEntities, CompositeCommand, EntitySnapshot, Graph, GraphCommand, Vertex};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Replaces closed polylines by a point at their centroid.
///
/// The point keeps the polyline's tags except `kind_key`. Polylines go with
/// their orphaned vertices. Open polylines and points in the input are
/// skipped. Returns the command and the refs of the new points, or `None`
/// when nothing qualifies.
pub fn build_convert(
    graph: &Graph,
    layer: LayerId,
    shapes: &BTreeSet<EntityRef>,
    kind_key: &str,
) -> Result<Option<(CompositeCommand, Vec<EntityRef>)>> {
    reject_groups(shapes)?;

    let mut converted: BTreeSet<EntityRef> = BTreeSet::new();
    let mut points: Vec<EntitySnapshot> = Vec::new();
    for shape in shapes {
        let EntityRef::Polyline(id) = shape else {
            warn!(entity = %shape, "not a polyline, skipped");
            continue;
        };
        if !graph.is_closed(*id) {
            warn!(entity = %shape, "open polyline, skipped");
            continue;
        }
        let Some(center) = graph.polyline_coords(*id).and_then(|c| centroid(&c)) else {
            continue;
        };
        let mut tags = graph.tags(*shape).cloned().unwrap_or_default();
        tags.remove(kind_key);
        let point = Vertex::new(center, tags);
        debug!(entity = %shape, point = %point.id, "shape converted");
        points.push(point.into());
        converted.insert(*shape);
    }

    let Some(delete) = build_delete(graph, layer, &converted)? else {
        return Ok(None);
    };
    let created: Vec<EntityRef> = points.iter().map(EntitySnapshot::entity_ref).collect();
    let commands: Vec<GraphCommand> = vec![delete, AddEntities::new(layer, points).into()];
    Ok(Some((
        CompositeCommand::new("Convert selected buildings to points", commands),
        created,
    )))
}
