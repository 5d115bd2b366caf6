use super::reject_groups;
use mapmerge_core::{EntityId, EntityRef, GraphError, LayerId, Result};
use mapmerge_graph::{DeleteEntities, Graph, GraphCommand};
use std::collections::BTreeSet;
use tracing::debug;

/// Deletes `entities` together with the vertices only they kept alive.
///
/// A vertex of a deleted polyline goes too when it carries no tags and no
/// other polyline or group uses it. Explicitly listed vertices must not be
/// used by anything that stays. Returns `None` for an empty input.
pub fn build_delete(
    graph: &Graph,
    layer: LayerId,
    entities: &BTreeSet<EntityRef>,
) -> Result<Option<GraphCommand>> {
    if entities.is_empty() {
        return Ok(None);
    }
    reject_groups(entities)?;
    if let Some(missing) = entities.iter().find(|e| !graph.contains(**e)) {
        return Err(GraphError::EntityNotFound { entity: *missing }.into());
    }

    let polylines: BTreeSet<EntityId> = entities
        .iter()
        .filter_map(|e| match e {
            EntityRef::Polyline(id) => Some(*id),
            _ => None,
        })
        .collect();

    for entity in entities {
        let outside = graph.referrers(*entity).into_iter().find(|r| match r {
            EntityRef::Polyline(id) => !polylines.contains(id),
            _ => true,
        });
        if let Some(referrer) = outside {
            return Err(GraphError::EntityInUse {
                entity: *entity,
                referrer,
            }
            .into());
        }
    }

    let orphans = graph.orphaned_vertices(&polylines);
    debug!(
        polylines = polylines.len(),
        orphans = orphans.len(),
        "cascading delete"
    );

    let mut doomed: Vec<EntityRef> = entities.iter().copied().collect();
    doomed.extend(
        orphans
            .into_iter()
            .map(EntityRef::Vertex)
            .filter(|v| !entities.contains(v)),
    );
    Ok(Some(DeleteEntities::new(layer, doomed).into()))
}
