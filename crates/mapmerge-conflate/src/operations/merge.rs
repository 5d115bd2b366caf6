use super::{build_delete, reject_groups};
use crate::tags::merge_tags;
use mapmerge_core::{EntityRef, GraphError, LayerId, OperationError, Result};
use mapmerge_graph::{ChangeTags, CompositeCommand, Graph, GraphCommand};
use tracing::debug;

/// Folds `source` into `dest`: dest takes the merged tags, then source is
/// deleted (with its orphaned vertices when it is a polyline).
pub fn build_merge(
    graph: &Graph,
    layer: LayerId,
    source: EntityRef,
    dest: EntityRef,
    mergeable_keys: &[String],
) -> Result<CompositeCommand> {
    let pair = [source, dest].into_iter().collect();
    reject_groups(&pair)?;
    if source == dest {
        return Err(OperationError::SelfMerge { entity: source }.into());
    }
    let source_tags = graph
        .tags(source)
        .ok_or(GraphError::EntityNotFound { entity: source })?;
    let dest_tags = graph
        .tags(dest)
        .ok_or(GraphError::EntityNotFound { entity: dest })?;

    let merged = merge_tags(source_tags, dest_tags, mergeable_keys);
    debug!(%source, %dest, tags = merged.len(), "merge built");

    let mut commands: Vec<GraphCommand> = vec![ChangeTags::new(layer, dest, merged).into()];
    commands.extend(build_delete(graph, layer, &[source].into_iter().collect())?);
    Ok(CompositeCommand::new("Merge", commands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapmerge_core::{Coord, TagMap};
    use mapmerge_graph::{tags, Workspace};

    #[test]
    fn test_merge_moves_tags_and_deletes_source() {
        let mut graph = Graph::new();
        let a = graph.add_vertex(Coord::new(0.0, 0.0), TagMap::new()).id();
        let b = graph.add_vertex(Coord::new(1.0, 0.0), TagMap::new()).id();
        let c = graph.add_vertex(Coord::new(1.0, 1.0), TagMap::new()).id();
        let way = graph
            .add_polyline(vec![a, b, c, a], tags([("building", "yes"), ("source", "B;C")]))
            .unwrap();
        let point = graph.add_vertex(
            Coord::new(0.6, 0.3),
            tags([("addr:housenumber", "10"), ("source", "A;B")]),
        );
        let mut ws = Workspace::new();
        let layer = ws.add_layer("data", graph);

        let mut cmd = build_merge(
            ws.graph(layer).unwrap(),
            layer,
            point,
            way,
            &["source".to_string()],
        )
        .unwrap();
        cmd.apply(&mut ws).unwrap();

        let graph = ws.graph(layer).unwrap();
        assert!(!graph.contains(point));
        assert_eq!(
            graph.tags(way).unwrap(),
            &tags([("addr:housenumber", "10"), ("building", "yes"), ("source", "A;B;C")])
        );

        cmd.undo(&mut ws).unwrap();
        let graph = ws.graph(layer).unwrap();
        assert!(graph.contains(point));
        assert_eq!(graph.tags(way).unwrap().get("source").unwrap(), "B;C");
    }

    #[test]
    fn test_self_merge_is_refused() {
        let mut graph = Graph::new();
        let p = graph.add_vertex(Coord::new(0.0, 0.0), TagMap::new());
        assert!(build_merge(&graph, LayerId::new(), p, p, &[]).is_err());
    }
}
